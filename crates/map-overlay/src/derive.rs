//! Derived-field formulas.
//!
//! Every function is pure over equally sized slices. Temperatures come in
//! Kelvin, winds in m/s, pressures in hPa.

use crate::fields::{Derivation, HdwMode};
use crate::units::{k_to_c, k_to_f, ms_to_mph};
use overlay_common::{Field2D, Field3D};
use rayon::prelude::*;
use tracing::debug;

/// Depth of the near-surface layer scanned for HDW.
pub const HDW_LAYER_DEPTH_HPA: f32 = 50.0;
/// Extra margin when picking candidate levels above the lowest surface.
const HDW_CANDIDATE_MARGIN_HPA: f32 = 25.0;

pub fn wind_speed(u: &[f32], v: &[f32]) -> Vec<f32> {
    u.iter().zip(v).map(|(&u, &v)| (u * u + v * v).sqrt()).collect()
}

/// Magnus-Tetens exponent, `17.625·T/(243.04+T)` with T in °C.
#[inline]
fn magnus(t_c: f32) -> f32 {
    17.625 * t_c / (243.04 + t_c)
}

#[inline]
fn relative_humidity(t_k: f32, td_k: f32) -> f32 {
    let rh = 100.0 * magnus(k_to_c(td_k)).exp() / magnus(k_to_c(t_k)).exp();
    rh.clamp(0.0, 100.0)
}

/// Relative humidity (%) from temperature and dew point, clipped to 0..=100.
pub fn rh_from_t_td(t: &[f32], td: &[f32]) -> Vec<f32> {
    t.iter().zip(td).map(|(&t, &td)| relative_humidity(t, td)).collect()
}

/// NWS wind chill in °F, applied where the air is at or below 50 °F.
pub fn wind_chill_f(t: &[f32], u: &[f32], v: &[f32]) -> Vec<f32> {
    t.iter()
        .zip(u.iter().zip(v))
        .map(|(&t, (&u, &v))| {
            let tf = k_to_f(t);
            if tf > 50.0 {
                return tf;
            }
            let mph = ms_to_mph((u * u + v * v).sqrt()).max(0.5);
            let w = mph.powf(0.16);
            35.74 + 0.6215 * tf - 35.75 * w + 0.4275 * tf * w
        })
        .collect()
}

/// Rothfusz heat index in °F, applied where the air is at or above 80 °F.
pub fn heat_index_f(t: &[f32], td: &[f32]) -> Vec<f32> {
    t.iter()
        .zip(td)
        .map(|(&t, &td)| {
            let tf = k_to_f(t);
            if tf < 80.0 {
                return tf;
            }
            let rh = relative_humidity(t, td);
            -42.379 + 2.049_015_2 * tf + 10.143_331 * rh
                - 0.224_755_4 * tf * rh
                - 0.006_837_83 * tf * tf
                - 0.054_817_17 * rh * rh
                + 0.001_228_74 * tf * tf * rh
                + 0.000_852_82 * tf * rh * rh
                - 0.000_001_99 * tf * tf * rh * rh
        })
        .collect()
}

/// Saturation vapor pressure (hPa), T in °C.
#[inline]
pub fn saturation_vapor_pressure(t_c: f32) -> f32 {
    6.112 * (17.67 * t_c / (t_c + 243.5)).exp()
}

/// Vapor pressure deficit (hPa) from temperature and dew point in Kelvin.
#[inline]
pub fn vpd_hpa(t_k: f32, td_k: f32) -> f32 {
    (saturation_vapor_pressure(k_to_c(t_k)) - saturation_vapor_pressure(k_to_c(td_k))).max(0.0)
}

/// Surface-only HDW: VPD × wind speed.
pub fn hdw_surface(t2m: &[f32], d2m: &[f32], u10m: &[f32], v10m: &[f32]) -> Vec<f32> {
    (0..t2m.len())
        .map(|i| vpd_hpa(t2m[i], d2m[i]) * (u10m[i] * u10m[i] + v10m[i] * v10m[i]).sqrt())
        .collect()
}

/// Isobaric profile used to scan the lowest layer above each column's surface.
#[derive(Debug, Clone, Copy)]
pub struct HdwProfile<'a> {
    /// hPa, one per level
    pub pressure_levels: &'a [f32],
    pub temperature: &'a Field3D,
    pub dew_point: &'a Field3D,
    pub u_wind: &'a Field3D,
    pub v_wind: &'a Field3D,
    /// hPa
    pub surface_pressure: &'a Field2D,
}

impl HdwProfile<'_> {
    /// All stacks share one level shape matching the surface grid, with one
    /// pressure per level.
    fn is_consistent(&self, len: usize) -> bool {
        let shape = self.surface_pressure.shape();
        let stacks = [self.temperature, self.dew_point, self.u_wind, self.v_wind];
        shape.0 * shape.1 == len
            && stacks
                .iter()
                .all(|s| s.level_shape() == shape && s.nz() == self.pressure_levels.len())
    }
}

/// HDW over the lowest 50 hPa above ground, or surface-only without a profile.
///
/// Each column starts from its surface value. A level contributes where
/// `sp - 50 <= p <= sp`.
pub fn hdw(
    t2m: &[f32],
    d2m: &[f32],
    u10m: &[f32],
    v10m: &[f32],
    profile: Option<HdwProfile<'_>>,
    mode: HdwMode,
) -> Vec<f32> {
    let Some(profile) = profile else {
        return hdw_surface(t2m, d2m, u10m, v10m);
    };
    if !profile.is_consistent(t2m.len()) {
        debug!("Pressure-level profile does not match surface grid, using surface HDW");
        return hdw_surface(t2m, d2m, u10m, v10m);
    }

    let sp = profile.surface_pressure.data();
    let Some((min_sp, _)) = profile.surface_pressure.finite_range() else {
        return hdw_surface(t2m, d2m, u10m, v10m);
    };
    let floor = min_sp - HDW_LAYER_DEPTH_HPA - HDW_CANDIDATE_MARGIN_HPA;
    let candidates: Vec<usize> = profile
        .pressure_levels
        .iter()
        .enumerate()
        .filter(|(_, &p)| p >= floor)
        .map(|(k, _)| k)
        .collect();
    if candidates.is_empty() {
        return hdw_surface(t2m, d2m, u10m, v10m);
    }

    let (t, td, u, v) = (
        level_slices(profile.temperature, &candidates),
        level_slices(profile.dew_point, &candidates),
        level_slices(profile.u_wind, &candidates),
        level_slices(profile.v_wind, &candidates),
    );
    let pressures: Vec<f32> = candidates.iter().map(|&k| profile.pressure_levels[k]).collect();

    (0..t2m.len())
        .into_par_iter()
        .map(|i| {
            let sfc_vpd = vpd_hpa(t2m[i], d2m[i]);
            let sfc_ws = (u10m[i] * u10m[i] + v10m[i] * v10m[i]).sqrt();
            let mut max_vpd = sfc_vpd;
            let mut max_ws = sfc_ws;
            let mut max_product = sfc_vpd * sfc_ws;

            for (k, &p) in pressures.iter().enumerate() {
                if !(p <= sp[i] && p >= sp[i] - HDW_LAYER_DEPTH_HPA) {
                    continue;
                }
                let vpd = vpd_hpa(t[k][i], td[k][i]);
                let ws = (u[k][i] * u[k][i] + v[k][i] * v[k][i]).sqrt();
                match mode {
                    HdwMode::Paired => {
                        let product = vpd * ws;
                        if product > max_product {
                            max_product = product;
                        }
                    }
                    HdwMode::SeparateMaxima => {
                        if vpd > max_vpd {
                            max_vpd = vpd;
                        }
                        if ws > max_ws {
                            max_ws = ws;
                        }
                    }
                }
            }

            match mode {
                HdwMode::Paired => max_product,
                HdwMode::SeparateMaxima => max_vpd * max_ws,
            }
        })
        .collect()
}

fn level_slices<'a>(stack: &'a Field3D, levels: &[usize]) -> Vec<&'a [f32]> {
    levels.iter().filter_map(|&k| stack.level_data(k)).collect()
}

/// Apply a derivation to its component arrays (in registry order).
///
/// `profile` is consulted only by HDW. Returns `None` on an arity mismatch.
pub fn apply(recipe: Derivation, components: &[&[f32]], profile: Option<HdwProfile<'_>>) -> Option<Vec<f32>> {
    if components.len() != recipe.arity() {
        return None;
    }
    let out = match recipe {
        Derivation::WindSpeed => wind_speed(components[0], components[1]),
        Derivation::SurfaceRh => rh_from_t_td(components[0], components[1]),
        Derivation::WindChill => wind_chill_f(components[0], components[1], components[2]),
        Derivation::HeatIndex => heat_index_f(components[0], components[1]),
        Derivation::Hdw(mode) => hdw(components[0], components[1], components[2], components[3], profile, mode),
    };
    Some(out)
}
