/// Union-find over the runs of one frame
///
/// Each run's `component` link is `None` (not yet labeled), itself (the
/// representative) or another run closer to the representative. Union always
/// hangs one root under another, so the links stay a forest. There is no
/// union by size; path compression alone keeps lookups near-constant.
use super::runs::Run;

/// Disjoint-set view over a run arena
pub struct UnionFind<'a> {
    runs: &'a mut [Run],
}

impl<'a> UnionFind<'a> {
    /// Labeler over one frame of runs
    pub fn new(runs: &'a mut [Run]) -> Self {
        Self { runs }
    }

    /// Make `x` a singleton set if it has no component yet
    pub fn make_set(&mut self, x: u32) {
        let run = &mut self.runs[x as usize];
        if run.component.is_none() {
            run.component = Some(x);
        }
    }

    /// Representative of `x`'s set, or `None` if `x` is unlabeled.
    ///
    /// Every link on the walked path is rewritten to point at the root.
    pub fn find(&mut self, x: u32) -> Option<u32> {
        let mut root = x;
        loop {
            match self.runs[root as usize].component {
                None => return None,
                Some(next) if next == root => break,
                Some(next) => root = next,
            }
        }

        let mut cur = x;
        while cur != root {
            let next = self.runs[cur as usize].component.unwrap_or(root);
            self.runs[cur as usize].component = Some(root);
            cur = next;
        }
        Some(root)
    }

    /// Hang the set of `a` under the set of `b`.
    ///
    /// Unlabeled runs become singletons first. Joining runs of different
    /// classes is a caller bug.
    pub fn union(&mut self, a: u32, b: u32) {
        debug_assert_eq!(
            self.runs[a as usize].class,
            self.runs[b as usize].class,
            "union of runs {a} and {b} with different pixel classes"
        );
        self.make_set(a);
        self.make_set(b);
        let (Some(root_a), Some(root_b)) = (self.find(a), self.find(b)) else {
            return;
        };
        if root_a != root_b {
            self.runs[root_a as usize].component = Some(root_b);
        }
    }
}
