//! PNG encoder output decoded back with the `image` crate.

use image::GenericImageView;
use renderer::colormap::{build_ramp, colorize};
use renderer::png::{encode_png, encode_png_rgba};

// ============================================================================
// Helpers
// ============================================================================

/// A ramp-colored gradient with a transparent band, like an overlay fill.
fn overlay_like_pixels(width: usize, height: usize) -> Vec<u8> {
    let values: Vec<f32> = (0..width * height)
        .map(|i| {
            let (row, col) = (i / width, i % width);
            if row < height / 4 {
                f32::NAN
            } else {
                col as f32 / width as f32 * 40.0 - 10.0
            }
        })
        .collect();
    colorize(&values, &build_ramp("RdYlBu_r"), -10.0, 30.0, 0.8, None)
}

fn noisy_pixels(width: usize, height: usize) -> Vec<u8> {
    (0..width * height)
        .flat_map(|i| [(i % 251) as u8, (i / 7 % 253) as u8, (i / 13 % 255) as u8, 255])
        .collect()
}

fn color_type(png: &[u8]) -> u8 {
    png[25]
}

// ============================================================================
// Format selection
// ============================================================================

#[test]
fn test_ramp_fill_encodes_indexed() {
    let pixels = overlay_like_pixels(300, 200);
    let png = encode_png(&pixels, 300, 200).unwrap();
    assert_eq!(color_type(&png), 3);
}

#[test]
fn test_many_colors_fall_back_to_rgba() {
    let pixels = noisy_pixels(128, 128);
    let png = encode_png(&pixels, 128, 128).unwrap();
    assert_eq!(color_type(&png), 6);
}

#[test]
fn test_indexed_smaller_than_rgba_for_fills() {
    let pixels = overlay_like_pixels(256, 256);
    let indexed = encode_png(&pixels, 256, 256).unwrap();
    let rgba = encode_png_rgba(&pixels, 256, 256).unwrap();
    assert!(indexed.len() < rgba.len());
}

// ============================================================================
// Decoded content
// ============================================================================

#[test]
fn test_indexed_decodes_to_same_pixels() {
    let (w, h) = (97, 61);
    let pixels = overlay_like_pixels(w, h);
    let png = encode_png(&pixels, w, h).unwrap();

    let img = image::load_from_memory(&png).unwrap();
    assert_eq!(img.dimensions(), (w as u32, h as u32));
    assert_eq!(img.to_rgba8().into_raw(), pixels);
}

#[test]
fn test_rgba_decodes_to_same_pixels() {
    let (w, h) = (40, 30);
    let pixels = noisy_pixels(w, h);
    let png = encode_png_rgba(&pixels, w, h).unwrap();
    let img = image::load_from_memory(&png).unwrap();
    assert_eq!(img.to_rgba8().into_raw(), pixels);
}

#[test]
fn test_fully_transparent_image() {
    let pixels = vec![0u8; 16 * 8 * 4];
    let png = encode_png(&pixels, 16, 8).unwrap();
    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    assert!(img.pixels().all(|p| p.0[3] == 0));
}
