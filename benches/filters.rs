use criterion::{Criterion, black_box, criterion_group, criterion_main};
use qr_tally::models::LumaGrid;
use qr_tally::utils::filters::{box_blur_into, dilate_into, rect_downslopes};
use qr_tally::utils::luminance::to_luminance_into;
use qr_tally::utils::threshold::{histogram_full, otsu_threshold};
use qr_tally::{ChannelOrder, LuminanceModel, Rect};

fn noise_frame(width: usize, height: usize) -> Vec<u8> {
    let mut state = 12345u32;
    (0..width * height * 4)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            (state >> 16) as u8
        })
        .collect()
}

fn noise_grid(width: usize, height: usize) -> LumaGrid {
    let mut grid = LumaGrid::default();
    let pixels = noise_frame(width, height);
    to_luminance_into(&pixels, width, height, ChannelOrder::Rgba, LuminanceModel::Crude, &mut grid)
        .unwrap();
    grid
}

fn bench_luminance_640x480(c: &mut Criterion) {
    let pixels = noise_frame(640, 480);
    let mut out = LumaGrid::default();
    c.bench_function("to_luminance_crude_640x480", |b| {
        b.iter(|| {
            to_luminance_into(black_box(&pixels), 640, 480, ChannelOrder::Rgba, LuminanceModel::Crude, &mut out)
        })
    });
    c.bench_function("to_luminance_perceptual_640x480", |b| {
        b.iter(|| {
            to_luminance_into(
                black_box(&pixels),
                640,
                480,
                ChannelOrder::Bgra,
                LuminanceModel::Perceptual,
                &mut out,
            )
        })
    });
}

fn bench_dilate_640x480(c: &mut Criterion) {
    let grid = noise_grid(640, 480);
    let (mut out, mut tmp) = (LumaGrid::default(), LumaGrid::default());
    for radius in [1, 3] {
        c.bench_function(&format!("dilate_r{radius}_640x480"), |b| {
            b.iter(|| dilate_into(black_box(&grid), radius, &mut out, &mut tmp))
        });
    }
}

fn bench_box_blur_640x480(c: &mut Criterion) {
    let grid = noise_grid(640, 480);
    let (mut out, mut tmp) = (LumaGrid::default(), LumaGrid::default());
    for radius in [1, 8] {
        c.bench_function(&format!("box_blur_r{radius}_640x480"), |b| {
            b.iter(|| box_blur_into(black_box(&grid), radius, &mut out, &mut tmp))
        });
    }
}

fn bench_histogram_otsu_640x480(c: &mut Criterion) {
    let grid = noise_grid(640, 480);
    c.bench_function("histogram_otsu_640x480", |b| {
        b.iter(|| {
            let hist = histogram_full(black_box(&grid));
            otsu_threshold(&hist, 640 * 480)
        })
    });
}

fn bench_downslopes_640x480(c: &mut Criterion) {
    let grid = noise_grid(640, 480);
    c.bench_function("rect_downslopes_640x480", |b| {
        b.iter(|| rect_downslopes(black_box(&grid), Rect::new(0, 0, 640, 480), 2, 40))
    });
}

criterion_group!(
    benches,
    bench_luminance_640x480,
    bench_dilate_640x480,
    bench_box_blur_640x480,
    bench_histogram_otsu_640x480,
    bench_downslopes_640x480
);
criterion_main!(benches);
