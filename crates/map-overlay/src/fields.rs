//! Registry of overlay-able fields.

use crate::units::UnitTransform;
use overlay_common::ForecastHour;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldCategory {
    Surface,
    Isobaric,
    Derived,
}

/// How the fire-weather index combines vapor pressure deficit and wind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdwMode {
    /// max(VPD) × max(wind), each maximum taken independently
    SeparateMaxima,
    /// max(VPD × wind) at a single level
    Paired,
}

/// Formula turning component arrays into a derived field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// `[u, v]` → speed
    WindSpeed,
    /// `[t (K), td (K)]` → %
    SurfaceRh,
    /// `[t (K), u, v]` → °F
    WindChill,
    /// `[t (K), td (K)]` → °F
    HeatIndex,
    /// `[t2m, d2m, u10m, v10m]`, with a 3-D scan of the lowest 50 hPa
    Hdw(HdwMode),
}

impl Derivation {
    /// Number of component arrays the formula takes.
    pub fn arity(&self) -> usize {
        match self {
            Derivation::WindSpeed | Derivation::SurfaceRh | Derivation::HeatIndex => 2,
            Derivation::WindChill => 3,
            Derivation::Hdw(_) => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Read directly from a forecast-hour attribute.
    Attribute(&'static str),
    /// Computed from component attributes.
    Derived {
        recipe: Derivation,
        components: &'static [&'static str],
    },
}

/// One overlay-able field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub units: &'static str,
    pub category: FieldCategory,
    pub source: FieldSource,
    pub default_ramp: &'static str,
    pub default_range: (f32, f32),
    pub transform: Option<UnitTransform>,
    pub needs_level: bool,
    /// Values below this (display units) are drawn fully transparent.
    pub transparent_below: Option<f32>,
}

impl FieldSpec {
    pub fn attr_name(&self) -> Option<&'static str> {
        match self.source {
            FieldSource::Attribute(name) => Some(name),
            FieldSource::Derived { .. } => None,
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.source, FieldSource::Derived { .. })
    }

    pub fn metadata(&self, available: bool) -> FieldMetadata {
        FieldMetadata {
            id: self.id.to_string(),
            name: self.name.to_string(),
            units: self.units.to_string(),
            category: self.category,
            needs_level: self.needs_level,
            default_cmap: self.default_ramp.to_string(),
            default_vmin: self.default_range.0,
            default_vmax: self.default_range.1,
            available,
        }
    }

    /// Whether the forecast hour has this field's source attribute.
    ///
    /// Derived fields always report available.
    pub fn is_available(&self, fh: &dyn ForecastHour) -> bool {
        match self.attr_name() {
            Some(attr) => fh.field(attr).is_some(),
            None => true,
        }
    }
}

/// Serializable field listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub id: String,
    pub name: String,
    pub units: String,
    pub category: FieldCategory,
    pub needs_level: bool,
    pub default_cmap: String,
    pub default_vmin: f32,
    pub default_vmax: f32,
    pub available: bool,
}

const fn surface(
    id: &'static str,
    name: &'static str,
    units: &'static str,
    ramp: &'static str,
    range: (f32, f32),
    transform: Option<UnitTransform>,
) -> FieldSpec {
    FieldSpec {
        id,
        name,
        units,
        category: FieldCategory::Surface,
        source: FieldSource::Attribute(id),
        default_ramp: ramp,
        default_range: range,
        transform,
        needs_level: false,
        transparent_below: None,
    }
}

const fn isobaric(
    id: &'static str,
    name: &'static str,
    units: &'static str,
    ramp: &'static str,
    range: (f32, f32),
    transform: Option<UnitTransform>,
) -> FieldSpec {
    FieldSpec {
        id,
        name,
        units,
        category: FieldCategory::Isobaric,
        source: FieldSource::Attribute(id),
        default_ramp: ramp,
        default_range: range,
        transform,
        needs_level: true,
        transparent_below: None,
    }
}

#[allow(clippy::too_many_arguments)]
const fn derived(
    id: &'static str,
    name: &'static str,
    units: &'static str,
    ramp: &'static str,
    range: (f32, f32),
    recipe: Derivation,
    components: &'static [&'static str],
    transform: Option<UnitTransform>,
) -> FieldSpec {
    FieldSpec {
        id,
        name,
        units,
        category: FieldCategory::Derived,
        source: FieldSource::Derived { recipe, components },
        default_ramp: ramp,
        default_range: range,
        transform,
        needs_level: false,
        transparent_below: None,
    }
}

const SURFACE_WIND: &[&str] = &["u10m", "v10m"];
const ISOBARIC_WIND: &[&str] = &["u_wind", "v_wind"];
const T_TD: &[&str] = &["t2m", "d2m"];
const HDW_COMPONENTS: &[&str] = &["t2m", "d2m", "u10m", "v10m"];

fn build_registry() -> Vec<FieldSpec> {
    use UnitTransform::*;

    let refc = FieldSpec {
        transparent_below: Some(5.0),
        ..surface("refc", "Reflectivity", "dBZ", "NWSReflectivity", (-10.0, 70.0), None)
    };
    let wind_speed = FieldSpec {
        needs_level: true,
        ..derived(
            "wind_speed",
            "Wind Speed",
            "kt",
            "plasma",
            (0.0, 120.0),
            Derivation::WindSpeed,
            ISOBARIC_WIND,
            Some(MsToKt),
        )
    };

    vec![
        surface("t2m", "2m Temperature", "°C", "RdYlBu_r", (-40.0, 45.0), Some(KToC)),
        surface("d2m", "2m Dew Point", "°C", "YlGn", (-30.0, 30.0), Some(KToC)),
        derived(
            "wind_speed_10m",
            "10m Wind Speed",
            "kt",
            "plasma",
            (0.0, 60.0),
            Derivation::WindSpeed,
            SURFACE_WIND,
            Some(MsToKt),
        ),
        refc,
        surface("cape_sfc", "Surface CAPE", "J/kg", "hot_r", (0.0, 4000.0), None),
        surface("mslp", "Sea Level Pressure", "hPa", "coolwarm", (990.0, 1040.0), None),
        surface("vis", "Visibility", "mi", "gray_r", (0.0, 10.0), Some(MToMi)),
        surface("gust", "Wind Gust", "kt", "plasma", (0.0, 80.0), Some(MsToKt)),
        surface("prate", "Precip Rate", "mm/hr", "Blues", (0.0, 25.0), Some(KgM2SToMmHr)),
        isobaric("temperature", "Temperature", "°C", "RdYlBu_r", (-60.0, 30.0), Some(KToC)),
        wind_speed,
        isobaric("rh", "Relative Humidity", "%", "BrBG", (0.0, 100.0), None),
        isobaric("geopotential_height", "Heights", "dam", "viridis", (480.0, 580.0), Some(GpmToDam)),
        isobaric("vorticity", "Abs Vorticity", "×10⁻⁵/s", "RdBu_r", (-30.0, 30.0), Some(Scale1e5)),
        isobaric("omega", "Vertical Velocity", "hPa/hr", "RdBu_r", (-20.0, 20.0), Some(PasToHPaHr)),
        isobaric("theta", "Potential Temp", "K", "Spectral_r", (280.0, 360.0), None),
        derived("rh_surface", "Surface RH", "%", "BrBG", (0.0, 100.0), Derivation::SurfaceRh, T_TD, None),
        derived(
            "wind_chill",
            "Wind Chill",
            "°F",
            "cool",
            (-40.0, 50.0),
            Derivation::WindChill,
            &["t2m", "u10m", "v10m"],
            None,
        ),
        derived("heat_index", "Heat Index", "°F", "YlOrRd", (70.0, 130.0), Derivation::HeatIndex, T_TD, None),
        derived(
            "hdw",
            "HDW (USFS)",
            "",
            "YlOrRd",
            (0.0, 200.0),
            Derivation::Hdw(HdwMode::SeparateMaxima),
            HDW_COMPONENTS,
            None,
        ),
        derived(
            "hdw_paired",
            "HDW (Paired)",
            "",
            "YlOrRd",
            (0.0, 200.0),
            Derivation::Hdw(HdwMode::Paired),
            HDW_COMPONENTS,
            None,
        ),
    ]
}

struct Registry {
    ordered: Vec<FieldSpec>,
    by_id: HashMap<&'static str, usize>,
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let ordered = build_registry();
    let by_id = ordered.iter().enumerate().map(|(i, f)| (f.id, i)).collect();
    Registry { ordered, by_id }
});

/// Look up a field by id.
pub fn field(id: &str) -> Option<&'static FieldSpec> {
    let registry = &*REGISTRY;
    registry.by_id.get(id).map(|&i| &registry.ordered[i])
}

/// All fields in registration order.
pub fn fields() -> &'static [FieldSpec] {
    &REGISTRY.ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_and_size() {
        let ids: Vec<_> = fields().iter().map(|f| f.id).collect();
        assert_eq!(ids.len(), 21);
        assert_eq!(ids[0], "t2m");
        assert_eq!(ids[3], "refc");
        assert_eq!(ids[20], "hdw_paired");
    }

    #[test]
    fn test_lookup() {
        let t2m = field("t2m").unwrap();
        assert_eq!(t2m.transform, Some(UnitTransform::KToC));
        assert_eq!(t2m.attr_name(), Some("t2m"));
        assert!(field("nope").is_none());
    }

    #[test]
    fn test_derivation_arity_matches_components() {
        for f in fields() {
            if let FieldSource::Derived { recipe, components } = f.source {
                assert_eq!(recipe.arity(), components.len(), "{}", f.id);
                assert_eq!(f.category, FieldCategory::Derived);
            }
        }
    }

    #[test]
    fn test_only_reflectivity_has_floor() {
        let floors: Vec<_> = fields().iter().filter(|f| f.transparent_below.is_some()).map(|f| f.id).collect();
        assert_eq!(floors, vec!["refc"]);
    }

    #[test]
    fn test_isobaric_fields_need_level() {
        for f in fields().iter().filter(|f| f.category == FieldCategory::Isobaric) {
            assert!(f.needs_level, "{}", f.id);
        }
        assert!(field("wind_speed").unwrap().needs_level);
        assert!(!field("wind_speed_10m").unwrap().needs_level);
    }
}
