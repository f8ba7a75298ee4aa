/// Connected components of runs, materialized as blobs
///
/// Runs of the same class that overlap in x on vertically adjacent rows are
/// joined with union-find. One blob is then built per component, in
/// row-major order of each component's first run.
use super::runs::RunArena;
use super::union_find::UnionFind;
use crate::models::{Blob, BlobId, LumaGrid};

/// Blobs of one frame plus the run-to-blob mapping
#[derive(Debug, Default)]
pub struct BlobSet {
    blobs: Vec<Blob>,
    run_blob: Vec<BlobId>,
    children: Vec<Vec<BlobId>>,
}

/// Join vertically overlapping same-class runs into components
pub fn label_components(arena: &mut RunArena) {
    let height = arena.height();
    let starts = arena.row_starts().to_vec();
    let widths: Vec<u32> = arena.runs().iter().map(|r| r.width).collect();
    let classes: Vec<_> = arena.runs().iter().map(|r| r.class).collect();
    let mut uf = UnionFind::new(arena.runs_mut());

    for i in 0..widths.len() {
        uf.make_set(i as u32);
    }

    for y in 1..height {
        let (mut i, prev_end) = (starts[y - 1], starts[y]);
        let (mut j, cur_end) = (starts[y], starts[y + 1]);
        let (mut px, mut cx) = (0usize, 0usize);
        while i < prev_end && j < cur_end {
            let p_end = px + widths[i] as usize;
            let c_end = cx + widths[j] as usize;
            // Spans [px, p_end) and [cx, c_end) overlap
            if px < c_end && cx < p_end && classes[i] == classes[j] {
                uf.union(j as u32, i as u32);
            }
            if p_end <= c_end {
                px = p_end;
                i += 1;
            }
            if c_end <= p_end {
                cx = c_end;
                j += 1;
            }
        }
    }
}

/// Count luminance reversals along one run.
///
/// Returns the number of direction changes and the narrowest stretch between
/// two of them.
fn run_slopes(samples: &[u16]) -> (usize, Option<usize>) {
    let mut slopes = 0;
    let mut min_width: Option<usize> = None;
    let mut direction = 0i8;
    let mut last_turn: Option<usize> = None;
    for i in 1..samples.len() {
        let d = match samples[i].cmp(&samples[i - 1]) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Equal => continue,
        };
        if direction != 0 && d != direction {
            slopes += 1;
            if let Some(prev) = last_turn {
                let w = i - prev;
                min_width = Some(min_width.map_or(w, |m| m.min(w)));
            }
            last_turn = Some(i);
        }
        direction = d;
    }
    (slopes, min_width)
}

impl BlobSet {
    /// Build one blob per component of a labeled arena.
    ///
    /// Pass the luminance grid the runs were classified from to collect
    /// slope statistics for foreground runs.
    pub fn build(arena: &mut RunArena, luma: Option<&LumaGrid>) -> Self {
        let (width, height) = (arena.width(), arena.height());
        let run_count = arena.runs().len();
        let mut root_blob: Vec<Option<BlobId>> = vec![None; run_count];
        let mut run_blob: Vec<BlobId> = vec![0; run_count];
        let mut blobs: Vec<Blob> = Vec::new();

        let view: &RunArena = arena;
        let spans: Vec<(usize, usize, usize, usize)> = (0..height)
            .flat_map(move |y| view.spans(y).map(move |(i, a, b)| (y, i, a, b)))
            .collect();
        let classes: Vec<_> = arena.runs().iter().map(|r| r.class).collect();
        let mut uf = UnionFind::new(arena.runs_mut());

        for (y, idx, x_start, x_end) in spans {
            let root = uf.find(idx as u32).unwrap_or(idx as u32);
            let class = classes[idx];
            let id = match root_blob[root as usize] {
                Some(id) => id,
                None => {
                    let mut blob = Blob::seed(root, class, y, x_start, x_end);
                    // First run of the component: whatever lies left of it encloses it
                    if x_start > 0 {
                        blob.parent = Some(run_blob[idx - 1]);
                    }
                    blobs.push(blob);
                    root_blob[root as usize] = Some(blobs.len() - 1);
                    blobs.len() - 1
                }
            };
            run_blob[idx] = id;

            let blob = &mut blobs[id];
            let run_width = x_end - x_start;
            blob.bounds.extend_span(y, x_start, x_end);
            blob.pixel_count += run_width;
            blob.run_count += 1;
            if y == 0 {
                blob.top_pixels += run_width;
            }
            if y + 1 == height {
                blob.bottom_pixels += run_width;
            }
            if x_start == 0 {
                blob.left_pixels += 1;
            }
            if x_end == width {
                blob.right_pixels += 1;
            }
            if let Some(grid) = luma.filter(|_| blob.is_foreground()) {
                let (slopes, min_width) = run_slopes(&grid.row(y)[x_start..x_end]);
                blob.slope_count += slopes;
                if let Some(w) = min_width {
                    blob.min_slope_width = Some(blob.min_slope_width.map_or(w, |m| m.min(w)));
                }
            }
        }

        let mut children = vec![Vec::new(); blobs.len()];
        for (id, blob) in blobs.iter().enumerate() {
            if let Some(parent) = blob.parent {
                children[parent].push(id);
            }
        }

        log::trace!("built {} blobs from {} runs", blobs.len(), run_count);
        Self {
            blobs,
            run_blob,
            children,
        }
    }

    /// All blobs in creation order
    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    /// All blobs, mutable (for detector bookkeeping)
    pub fn blobs_mut(&mut self) -> &mut [Blob] {
        &mut self.blobs
    }

    /// Blob by id
    pub fn get(&self, id: BlobId) -> &Blob {
        &self.blobs[id]
    }

    /// Number of blobs
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// True if the frame produced no blobs
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Blob containing run `run`
    pub fn blob_of_run(&self, run: usize) -> BlobId {
        self.run_blob[run]
    }

    /// Blobs directly enclosed by `id`
    pub fn children(&self, id: BlobId) -> &[BlobId] {
        &self.children[id]
    }

    /// Blob id of every pixel, row-major
    pub fn pixel_labels(&self, arena: &RunArena) -> Vec<BlobId> {
        let mut out = Vec::with_capacity(arena.width() * arena.height());
        for (i, run) in arena.runs().iter().enumerate() {
            out.extend(std::iter::repeat_n(self.blob_of_run(i), run.width as usize));
        }
        out
    }

    /// Hand the blob records over, dropping the run mapping
    pub fn into_blobs(self) -> Vec<Blob> {
        self.blobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PixelClass;

    fn analyze(grid: &LumaGrid, level: u16) -> (RunArena, BlobSet) {
        let mut arena = RunArena::new();
        arena.encode_threshold(grid, level).unwrap();
        label_components(&mut arena);
        let blobs = BlobSet::build(&mut arena, Some(grid));
        (arena, blobs)
    }

    fn grid_from_ascii(rows: &[&str]) -> LumaGrid {
        let width = rows[0].len();
        let data = rows
            .iter()
            .flat_map(|r| r.bytes().map(|b| if b == b'#' { 0 } else { 765 }))
            .collect();
        LumaGrid::from_vec(width, rows.len(), data).unwrap()
    }

    #[test]
    fn test_uniform_frame_is_one_background_blob() {
        let grid = LumaGrid::filled(64, 64, 765);
        let (_, blobs) = analyze(&grid, 100);
        assert_eq!(blobs.len(), 1);
        let b = blobs.get(0);
        assert_eq!(b.class, PixelClass::Background);
        assert_eq!(b.pixel_count, 64 * 64);
        assert_eq!(b.run_count, 64);
        assert_eq!((b.width(), b.height()), (64, 64));
        assert_eq!((b.top_pixels, b.bottom_pixels), (64, 64));
        assert_eq!((b.left_pixels, b.right_pixels), (64, 64));
        assert!(b.parent.is_none());
    }

    #[test]
    fn test_ring_and_hole() {
        let grid = grid_from_ascii(&[
            "........",
            ".#####..",
            ".#...#..",
            ".#.#.#..",
            ".#...#..",
            ".#####..",
            "........",
        ]);
        let (_, blobs) = analyze(&grid, 100);
        // outer background, ring, hole, dot
        assert_eq!(blobs.len(), 4);

        let ring = blobs.blobs().iter().position(|b| b.is_foreground() && b.pixel_count == 16).unwrap();
        let hole = blobs.blobs().iter().position(|b| !b.is_foreground() && b.pixel_count == 8).unwrap();
        let dot = blobs.blobs().iter().position(|b| b.is_foreground() && b.pixel_count == 1).unwrap();

        assert_eq!(blobs.get(ring).parent, Some(0));
        assert_eq!(blobs.get(hole).parent, Some(ring));
        assert_eq!(blobs.get(dot).parent, Some(hole));
        assert_eq!(blobs.children(ring), &[hole]);
        assert_eq!(blobs.children(hole), &[dot]);
        assert!(!blobs.get(ring).touches_edge());
        assert!(blobs.get(0).touches_edge());
    }

    #[test]
    fn test_u_shape_merges_late() {
        // Two arms only meet on the bottom row
        let grid = grid_from_ascii(&["#..#", "#..#", "####"]);
        let (arena, blobs) = analyze(&grid, 100);
        let fg: Vec<_> = blobs.blobs().iter().filter(|b| b.is_foreground()).collect();
        assert_eq!(fg.len(), 1);
        assert_eq!(fg[0].pixel_count, 8);
        assert_eq!(fg[0].run_count, 5);

        // Runs: row 0 is 0..=2, row 1 is 3..=5, row 2 is 6
        assert_eq!(arena.runs().len(), 7);
        let arm = blobs.blob_of_run(0);
        assert_eq!(blobs.blob_of_run(2), arm);
        assert_eq!(blobs.blob_of_run(6), arm);
        assert_ne!(blobs.blob_of_run(4), arm);
    }

    #[test]
    fn test_bounding_boxes_are_tight() {
        let grid = grid_from_ascii(&[
            "..##....#.",
            ".###..###.",
            "..#...#...",
            "......#.##",
            "##.....##.",
        ]);
        let (arena, blobs) = analyze(&grid, 100);
        let labels = blobs.pixel_labels(&arena);
        let w = grid.width();
        for (id, blob) in blobs.blobs().iter().enumerate() {
            let pixels: Vec<(usize, usize)> = labels
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == id)
                .map(|(i, _)| (i % w, i / w))
                .collect();
            assert_eq!(pixels.len(), blob.pixel_count);
            let bb = blob.bounds;
            assert!(pixels.iter().all(|&(x, y)| x >= bb.min_x && x <= bb.max_x && y >= bb.min_y && y <= bb.max_y));
            assert!(pixels.iter().any(|&(x, _)| x == bb.min_x));
            assert!(pixels.iter().any(|&(x, _)| x == bb.max_x));
            assert!(pixels.iter().any(|&(_, y)| y == bb.min_y));
            assert!(pixels.iter().any(|&(_, y)| y == bb.max_y));
        }
    }

    #[test]
    fn test_run_slopes() {
        assert_eq!(run_slopes(&[10, 20, 30]), (0, None));
        assert_eq!(run_slopes(&[10, 20, 10, 20, 20, 10]), (3, Some(1)));
    }

    #[test]
    fn test_slopes_only_for_foreground() {
        let grid = LumaGrid::from_vec(6, 1, vec![10, 50, 20, 60, 700, 710]).unwrap();
        let (_, blobs) = analyze(&grid, 100);
        let fg = blobs.blobs().iter().find(|b| b.is_foreground()).unwrap();
        assert_eq!(fg.slope_count, 2);
        let bg = blobs.blobs().iter().find(|b| !b.is_foreground()).unwrap();
        assert_eq!(bg.slope_count, 0);
    }
}
