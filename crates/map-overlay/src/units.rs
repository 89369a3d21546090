//! Unit conversions applied to fields before display.

use serde::{Deserialize, Serialize};

pub const KELVIN_OFFSET: f32 = 273.15;
pub const MS_TO_KT: f32 = 1.94384;
pub const MS_TO_MPH: f32 = 2.23694;
pub const METERS_PER_MILE: f32 = 1609.34;

/// Conversion applied to a field's native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitTransform {
    /// Kelvin to Celsius
    KToC,
    /// m/s to knots
    MsToKt,
    /// meters to statute miles
    MToMi,
    /// kg m⁻² s⁻¹ to mm/hr
    KgM2SToMmHr,
    /// geopotential meters to decameters
    GpmToDam,
    /// scale by 1e5 (vorticity)
    Scale1e5,
    /// Pa/s to hPa/hr
    PasToHPaHr,
}

impl UnitTransform {
    /// Parse a transform tag such as `K_to_C`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "K_to_C" => Some(Self::KToC),
            "ms_to_kt" => Some(Self::MsToKt),
            "m_to_mi" => Some(Self::MToMi),
            "kgm2s_to_mmhr" => Some(Self::KgM2SToMmHr),
            "gpm_to_dam" => Some(Self::GpmToDam),
            "scale_1e5" => Some(Self::Scale1e5),
            "Pas_to_hPahr" => Some(Self::PasToHPaHr),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::KToC => "K_to_C",
            Self::MsToKt => "ms_to_kt",
            Self::MToMi => "m_to_mi",
            Self::KgM2SToMmHr => "kgm2s_to_mmhr",
            Self::GpmToDam => "gpm_to_dam",
            Self::Scale1e5 => "scale_1e5",
            Self::PasToHPaHr => "Pas_to_hPahr",
        }
    }

    #[inline]
    pub fn apply(&self, v: f32) -> f32 {
        match self {
            Self::KToC => v - KELVIN_OFFSET,
            Self::MsToKt => v * MS_TO_KT,
            Self::MToMi => v / METERS_PER_MILE,
            Self::KgM2SToMmHr => v * 3600.0,
            Self::GpmToDam => v / 10.0,
            Self::Scale1e5 => v * 1e5,
            Self::PasToHPaHr => v * (3600.0 / 100.0),
        }
    }

    pub fn apply_slice(&self, values: &mut [f32]) {
        for v in values {
            *v = self.apply(*v);
        }
    }
}

/// Apply an optional transform in place.
pub fn apply_transform(transform: Option<UnitTransform>, values: &mut [f32]) {
    if let Some(t) = transform {
        t.apply_slice(values);
    }
}

#[inline]
pub fn k_to_c(k: f32) -> f32 {
    k - KELVIN_OFFSET
}

#[inline]
pub fn k_to_f(k: f32) -> f32 {
    (k - KELVIN_OFFSET) * 9.0 / 5.0 + 32.0
}

#[inline]
pub fn ms_to_kt(ms: f32) -> f32 {
    ms * MS_TO_KT
}

#[inline]
pub fn ms_to_mph(ms: f32) -> f32 {
    ms * MS_TO_MPH
}
