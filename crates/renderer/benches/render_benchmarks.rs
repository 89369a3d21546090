//! Benchmarks for the fill, contour and encode stages of overlay rendering.
//!
//! Run with: cargo bench --package renderer --bench render_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use renderer::canvas::OverlayCanvas;
use renderer::colormap::{colorize, ramp};
use renderer::contour::{contour_levels, draw_contours, ContourStyle};
use renderer::png::encode_png;

/// Smooth pressure-like field with a little noise.
fn pressure_field(width: usize, height: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..width * height)
        .map(|i| {
            let fx = (i % width) as f32 / width as f32;
            let fy = (i / width) as f32 / height as f32;
            1012.0
                + (fx * std::f32::consts::PI * 3.0).sin() * 12.0
                + (fy * std::f32::consts::PI * 2.0).cos() * 8.0
                + rng.gen_range(-0.3..0.3)
        })
        .collect()
}

// =============================================================================
// FILL + ENCODE
// =============================================================================

fn bench_fill_and_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_encode");
    let lut = ramp("coolwarm");

    for &(w, h) in &[(256usize, 256usize), (834, 356), (2501, 1068)] {
        let data = pressure_field(w, h);
        group.throughput(Throughput::Elements((w * h) as u64));

        group.bench_with_input(BenchmarkId::new("colorize", format!("{}x{}", w, h)), &data, |b, d| {
            b.iter(|| colorize(black_box(d), &lut, 990.0, 1040.0, 0.8, None))
        });

        let pixels = colorize(&data, &lut, 990.0, 1040.0, 0.8, None);
        group.bench_with_input(BenchmarkId::new("encode_png", format!("{}x{}", w, h)), &pixels, |b, p| {
            b.iter(|| encode_png(black_box(p), w, h))
        });
    }
    group.finish();
}

// =============================================================================
// CONTOURS
// =============================================================================

fn bench_contour_layer(c: &mut Criterion) {
    let mut group = c.benchmark_group("contour_layer");
    group.sample_size(20);

    for &(w, h) in &[(256usize, 256usize), (834, 356)] {
        let data = pressure_field(w, h);
        let levels = contour_levels(990.0, 1034.0, 4.0);
        let style = ContourStyle::default();

        group.bench_function(BenchmarkId::new("draw_contours", format!("{}x{}", w, h)), |b| {
            b.iter(|| {
                let mut canvas = OverlayCanvas::new(w, h).unwrap();
                draw_contours(&mut canvas, black_box(&data), &levels, &style)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fill_and_encode, bench_contour_layer);
criterion_main!(benches);
