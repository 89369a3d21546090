//! PNG encoding for straight RGBA overlay images.
//!
//! Overlay fills drawn through a 256-entry ramp rarely exceed 256 distinct
//! colors, so `encode_png` writes an indexed image (color type 3 with a
//! tRNS alpha table) when the pixels fit a palette and falls back to full
//! RGBA (color type 6) otherwise.

use crate::error::{RenderError, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Write;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for an indexed PNG
const MAX_PALETTE_SIZE: usize = 256;

/// Images at least this many pixels scan for colors in parallel
const PARALLEL_THRESHOLD: usize = 4096;

/// Encode RGBA bytes, choosing indexed or RGBA color type automatically.
pub fn encode_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_len(pixels.len(), width, height, 4)?;

    let palette = if pixels.len() / 4 >= PARALLEL_THRESHOLD {
        palette_parallel(pixels)
    } else {
        palette_sequential(pixels)
    };

    match palette {
        Some((palette, indices)) => encode_png_indexed(width, height, &palette, &indices),
        None => encode_png_rgba(pixels, width, height),
    }
}

/// Encode RGBA bytes as color type 6.
pub fn encode_png_rgba(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_len(pixels.len(), width, height, 4)?;

    let mut png = Vec::with_capacity(pixels.len() / 2 + 64);
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));
    write_chunk(&mut png, b"IDAT", &deflate_scanlines(pixels, width * 4, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Encode palette indices as color type 3.
pub fn encode_png_indexed(
    width: usize,
    height: usize,
    palette: &[[u8; 4]],
    indices: &[u8],
) -> Result<Vec<u8>> {
    check_len(indices.len(), width, height, 1)?;

    let mut png = Vec::with_capacity(indices.len() / 4 + palette.len() * 4 + 64);
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    write_chunk(&mut png, b"IDAT", &deflate_scanlines(indices, width, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn check_len(actual: usize, width: usize, height: usize, bpp: usize) -> Result<()> {
    let expected = width * height * bpp;
    if width == 0 || height == 0 || actual != expected {
        return Err(RenderError::BufferSize {
            width,
            height,
            expected,
            actual,
        });
    }
    Ok(())
}

fn ihdr(width: usize, height: usize, color_type: u8) -> [u8; 13] {
    let mut data = [0u8; 13];
    data[0..4].copy_from_slice(&(width as u32).to_be_bytes());
    data[4..8].copy_from_slice(&(height as u32).to_be_bytes());
    data[8] = 8; // bit depth
    data[9] = color_type;
    // compression, filter and interlace methods stay 0
    data
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix each row with filter type 0 and zlib-compress.
fn deflate_scanlines(bytes: &[u8], row_len: usize, height: usize) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(height * (row_len + 1));
    for row in bytes.chunks_exact(row_len).take(height) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

#[inline(always)]
fn pack(px: &[u8]) -> u32 {
    u32::from_le_bytes([px[0], px[1], px[2], px[3]])
}

type Palette = (Vec<[u8; 4]>, Vec<u8>);

fn palette_sequential(pixels: &[u8]) -> Option<Palette> {
    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let key = pack(px);
        let index = match lookup.get(&key) {
            Some(&i) => i,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let i = palette.len() as u8;
                palette.push([px[0], px[1], px[2], px[3]]);
                lookup.insert(key, i);
                i
            }
        };
        indices.push(index);
    }
    Some((palette, indices))
}

/// Collect distinct colors per chunk in parallel, merge, then map pixels.
fn palette_parallel(pixels: &[u8]) -> Option<Palette> {
    let chunk_px = (pixels.len() / 4 / rayon::current_num_threads()).max(256);

    let mut chunk_colors: Vec<Vec<u32>> = pixels
        .par_chunks(chunk_px * 4)
        .map(|chunk| {
            let mut seen: Vec<u32> = Vec::new();
            let mut set: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
            for px in chunk.chunks_exact(4) {
                let key = pack(px);
                if set.insert(key, ()).is_none() {
                    seen.push(key);
                    if seen.len() > MAX_PALETTE_SIZE {
                        break;
                    }
                }
            }
            seen
        })
        .collect();

    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    for key in chunk_colors.drain(..).flatten() {
        if lookup.contains_key(&key) {
            continue;
        }
        if palette.len() >= MAX_PALETTE_SIZE {
            return None;
        }
        lookup.insert(key, palette.len() as u8);
        palette.push(key.to_le_bytes());
    }

    let indices = pixels
        .par_chunks(4)
        .map(|px| lookup.get(&pack(px)).copied().unwrap_or(0))
        .collect();
    Some((palette, indices))
}
