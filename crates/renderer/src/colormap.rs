//! 256-entry RGBA color ramps.
//!
//! Ramps are built once per name and shared process-wide. Named ramps are
//! defined by evenly spaced color stops (positioned stops for `hot`) and
//! linearly interpolated; a `_r` suffix reverses the base ramp. The
//! `NWSReflectivity` ramp is a piecewise table with a transparent floor.

use crate::color::Rgba;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// A 256-entry straight-alpha RGBA lookup table.
pub type Ramp = [Rgba; 256];

pub const RAMP_SIZE: usize = 256;

/// Ramp used for names that are not recognized.
pub const FALLBACK_RAMP: &str = "viridis";

/// Name of the piecewise reflectivity ramp.
pub const NWS_REFLECTIVITY: &str = "NWSReflectivity";

/// Process-wide ramp cache keyed by ramp name.
static RAMP_CACHE: Lazy<RwLock<HashMap<String, Arc<Ramp>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Get the ramp for `name`, building and caching it on first use.
///
/// Unknown names resolve to viridis and are cached under the requested name.
pub fn ramp(name: &str) -> Arc<Ramp> {
    // Fast path: read lock
    if let Ok(cache) = RAMP_CACHE.read() {
        if let Some(ramp) = cache.get(name) {
            return Arc::clone(ramp);
        }
    }

    let built = Arc::new(build_ramp(name));

    match RAMP_CACHE.write() {
        Ok(mut cache) => {
            // Another thread may have inserted while we were building
            Arc::clone(cache.entry(name.to_string()).or_insert(built))
        }
        Err(_) => built,
    }
}

/// Number of ramps currently cached.
pub fn cached_ramp_count() -> usize {
    RAMP_CACHE.read().map(|c| c.len()).unwrap_or(0)
}

/// Whether `name` resolves to a defined ramp rather than the fallback.
pub fn is_known_ramp(name: &str) -> bool {
    name == NWS_REFLECTIVITY || stops_for(name).is_some()
}

/// Build a ramp without touching the cache.
pub fn build_ramp(name: &str) -> Ramp {
    if name == NWS_REFLECTIVITY {
        return nws_reflectivity();
    }
    match stops_for(name) {
        Some(stops) => interpolate_stops(&stops),
        None => {
            debug!(ramp = %name, fallback = FALLBACK_RAMP, "Unknown ramp name");
            let stops = stops_for(FALLBACK_RAMP).unwrap_or_default();
            interpolate_stops(&stops)
        }
    }
}

/// Map a value into a ramp index, clipping to the range.
///
/// NaN maps to index 0; callers mask missing cells separately.
#[inline]
pub fn value_to_index(value: f32, vmin: f32, vmax: f32) -> u8 {
    let span = (vmax - vmin).max(1e-10);
    let norm = ((value - vmin) / span).clamp(0.0, 1.0);
    if norm.is_nan() {
        return 0;
    }
    (norm * 255.0) as u8
}

/// Positioned color stop: (position in [0, 1], rgb).
type Stop = (f32, [u8; 3]);

fn even(colors: &[u32]) -> Vec<Stop> {
    let last = (colors.len().max(2) - 1) as f32;
    colors
        .iter()
        .enumerate()
        .map(|(i, &hex)| (i as f32 / last, hex_rgb(hex)))
        .collect()
}

fn hex_rgb(hex: u32) -> [u8; 3] {
    [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8]
}

fn stops_for(name: &str) -> Option<Vec<Stop>> {
    if let Some(base) = name.strip_suffix("_r") {
        let mut stops = base_stops(base)?;
        stops.reverse();
        for stop in &mut stops {
            stop.0 = 1.0 - stop.0;
        }
        return Some(stops);
    }
    base_stops(name)
}

fn base_stops(name: &str) -> Option<Vec<Stop>> {
    let stops = match name {
        "viridis" => even(&[
            0x440154, 0x482878, 0x3e4989, 0x31688e, 0x26828e, 0x1f9e89, 0x35b779, 0x6ece58,
            0xb5de2b, 0xfde725,
        ]),
        "plasma" => even(&[
            0x0d0887, 0x46039f, 0x7201a8, 0x9c179e, 0xbd3786, 0xd8576b, 0xed7953, 0xfb9f3a,
            0xfdca26, 0xf0f921,
        ]),
        "RdYlBu" => even(&[
            0xa50026, 0xd73027, 0xf46d43, 0xfdae61, 0xfee090, 0xffffbf, 0xe0f3f8, 0xabd9e9,
            0x74add1, 0x4575b4, 0x313695,
        ]),
        "YlGn" => even(&[
            0xffffe5, 0xf7fcb9, 0xd9f0a3, 0xaddd8e, 0x78c679, 0x41ab5d, 0x238443, 0x006837,
            0x004529,
        ]),
        "YlOrRd" => even(&[
            0xffffcc, 0xffeda0, 0xfed976, 0xfeb24c, 0xfd8d3c, 0xfc4e2a, 0xe31a1c, 0xbd0026,
            0x800026,
        ]),
        "BrBG" => even(&[
            0x543005, 0x8c510a, 0xbf812d, 0xdfc27d, 0xf6e8c3, 0xf5f5f5, 0xc7eae5, 0x80cdc1,
            0x35978f, 0x01665e, 0x003c30,
        ]),
        "coolwarm" => even(&[
            0x3b4cc0, 0x6788ee, 0x9abbff, 0xc9d7f0, 0xedd1c2, 0xf7a889, 0xe26952, 0xb40426,
        ]),
        "RdBu" => even(&[
            0x67001f, 0xb2182b, 0xd6604d, 0xf4a582, 0xfddbc7, 0xf7f7f7, 0xd1e5f0, 0x92c5de,
            0x4393c3, 0x2166ac, 0x053061,
        ]),
        "Spectral" => even(&[
            0x9e0142, 0xd53e4f, 0xf46d43, 0xfdae61, 0xfee08b, 0xffffbf, 0xe6f598, 0xabdda4,
            0x66c2a5, 0x3288bd, 0x5e4fa2,
        ]),
        "Blues" => even(&[
            0xf7fbff, 0xdeebf7, 0xc6dbef, 0x9ecae1, 0x6baed6, 0x4292c6, 0x2171b5, 0x08519c,
            0x08306b,
        ]),
        "hot" => vec![
            (0.0, [0, 0, 0]),
            (0.365, [255, 0, 0]),
            (0.746, [255, 255, 0]),
            (1.0, [255, 255, 255]),
        ],
        "gray" => even(&[0x000000, 0xffffff]),
        "cool" => even(&[0x00ffff, 0xff00ff]),
        _ => return None,
    };
    Some(stops)
}

/// Linear interpolation between positioned stops into 256 opaque entries.
fn interpolate_stops(stops: &[Stop]) -> Ramp {
    let mut ramp = [[0u8, 0, 0, 255]; RAMP_SIZE];
    if stops.is_empty() {
        return ramp;
    }

    for (i, entry) in ramp.iter_mut().enumerate() {
        let t = i as f32 / (RAMP_SIZE - 1) as f32;
        let upper = stops.iter().position(|s| s.0 >= t).unwrap_or(stops.len() - 1);
        let rgb = if upper == 0 {
            stops[0].1.map(f32::from)
        } else {
            let (p0, c0) = stops[upper - 1];
            let (p1, c1) = stops[upper];
            let f = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
            [
                c0[0] as f32 + (c1[0] as f32 - c0[0] as f32) * f,
                c0[1] as f32 + (c1[1] as f32 - c0[1] as f32) * f,
                c0[2] as f32 + (c1[2] as f32 - c0[2] as f32) * f,
            ]
        };
        // Truncate like a float-to-u8 cast, tolerating rounding at the stops
        let channel = |c: f32| (c + 1e-3).min(255.0) as u8;
        *entry = [channel(rgb[0]), channel(rgb[1]), channel(rgb[2]), 255];
    }
    ramp
}

/// `k`-th of 48 evenly spaced values from `a` to `b`, truncated.
fn band(a: f32, b: f32, k: usize) -> u8 {
    (a + (b - a) * k as f32 / 47.0) as u8
}

fn nws_reflectivity() -> Ramp {
    let mut lut = [[0u8, 0, 0, 255]; RAMP_SIZE];
    for (i, entry) in lut.iter_mut().enumerate() {
        let k = i % 48;
        *entry = match i {
            0..=47 => [0, 0, 0, 0],
            // 5-20 dBZ greens
            48..=95 => [0, band(100.0, 255.0, k), 0, 255],
            // 20-35 dBZ yellows
            96..=143 => [band(200.0, 255.0, k), band(255.0, 200.0, k), 0, 255],
            // 35-50 dBZ reds
            144..=191 => [255, band(150.0, 0.0, k), 0, 255],
            // 50-65 dBZ magentas
            192..=239 => [band(255.0, 200.0, k), 0, band(100.0, 255.0, k), 255],
            _ => [255, 255, 255, 255],
        };
    }
    lut
}

/// Colorize `values` into straight RGBA bytes.
///
/// Non-finite cells, and cells below `transparent_below` when given, get
/// alpha 0. Alpha of colored cells is scaled by `opacity` with truncation.
pub fn colorize(
    values: &[f32],
    ramp: &Ramp,
    vmin: f32,
    vmax: f32,
    opacity: f32,
    transparent_below: Option<f32>,
) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * 4];
    for (px, &v) in out.chunks_exact_mut(4).zip(values) {
        if !v.is_finite() {
            continue;
        }
        let [r, g, b, a] = ramp[value_to_index(v, vmin, vmax) as usize];
        px[0] = r;
        px[1] = g;
        px[2] = b;
        px[3] = match transparent_below {
            Some(floor) if v < floor => 0,
            _ => (a as f32 * opacity) as u8,
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_index_clips_and_truncates() {
        assert_eq!(value_to_index(-5.0, 0.0, 10.0), 0);
        assert_eq!(value_to_index(50.0, 0.0, 10.0), 255);
        assert_eq!(value_to_index(5.0, 0.0, 10.0), 127);
        assert_eq!(value_to_index(1.0, 1.0, 1.0), 0);
        assert_eq!(value_to_index(f32::NAN, 0.0, 1.0), 0);
    }

    #[test]
    fn test_viridis_endpoints() {
        let r = build_ramp("viridis");
        assert_eq!(r[0], [0x44, 0x01, 0x54, 255]);
        assert_eq!(r[255], [0xfd, 0xe7, 0x25, 255]);
    }

    #[test]
    fn test_reversed_ramp() {
        let fwd = build_ramp("RdYlBu");
        let rev = build_ramp("RdYlBu_r");
        assert_eq!(fwd[0], rev[255]);
        assert_eq!(fwd[255], rev[0]);
    }

    #[test]
    fn test_hot_positions() {
        let r = build_ramp("hot");
        assert_eq!(r[0], [0, 0, 0, 255]);
        assert_eq!(r[255], [255, 255, 255, 255]);
        // 0.365 of the way is pure red
        assert_eq!(r[94][0], 255);
        assert!(r[94][1] < 5);
    }

    #[test]
    fn test_unknown_falls_back_to_viridis() {
        assert_eq!(build_ramp("not_a_ramp"), build_ramp("viridis"));
        assert!(!is_known_ramp("not_a_ramp"));
        assert!(is_known_ramp("Spectral_r"));
        assert!(is_known_ramp(NWS_REFLECTIVITY));
    }

    #[test]
    fn test_reflectivity_bands() {
        let lut = build_ramp(NWS_REFLECTIVITY);
        assert!(lut[..48].iter().all(|c| c[3] == 0));
        assert!(lut[48..].iter().all(|c| c[3] == 255));
        assert_eq!(lut[48], [0, 100, 0, 255]);
        assert_eq!(lut[95], [0, 255, 0, 255]);
        assert_eq!(lut[96], [200, 255, 0, 255]);
        assert_eq!(lut[191], [255, 0, 0, 255]);
        assert_eq!(lut[239], [200, 0, 255, 255]);
        assert_eq!(lut[240], [255, 255, 255, 255]);
    }

    #[test]
    fn test_cache_returns_shared_ramp() {
        let a = ramp("plasma");
        let b = ramp("plasma");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cached_ramp_count() >= 1);
    }

    #[test]
    fn test_colorize_masks() {
        let lut = build_ramp("viridis");
        let px = colorize(&[f32::NAN, 2.0, 10.0], &lut, 0.0, 10.0, 0.8, Some(5.0));
        assert_eq!(px[3], 0);
        assert_eq!(px[7], 0);
        assert_eq!(px[11], 204);
        assert_eq!(&px[8..11], &[0xfd, 0xe7, 0x25]);
    }
}
