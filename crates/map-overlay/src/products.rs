//! Composite map products: a fill field with optional contour and barb layers.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Contour lines of one field over a composite fill.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourSpec {
    pub field: &'static str,
    pub interval: f32,
    /// Explicit levels take precedence over `interval` when non-empty.
    pub levels: Option<Vec<f32>>,
    pub color: &'static str,
    pub linewidth: f32,
    pub label: bool,
}

impl ContourSpec {
    pub fn new(field: &'static str, interval: f32) -> Self {
        Self {
            field,
            interval,
            levels: None,
            color: "black",
            linewidth: 1.0,
            label: true,
        }
    }

    pub fn color(mut self, color: &'static str) -> Self {
        self.color = color;
        self
    }

    pub fn linewidth(mut self, linewidth: f32) -> Self {
        self.linewidth = linewidth;
        self
    }

    pub fn levels(mut self, levels: Vec<f32>) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn label(mut self, label: bool) -> Self {
        self.label = label;
        self
    }
}

/// Wind barbs drawn from a pair of wind component attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct BarbSpec {
    pub u_attr: &'static str,
    pub v_attr: &'static str,
    /// Fixed pressure level; falls back to the composite's level.
    pub level: Option<f64>,
    /// Grid stride between barbs.
    pub thin: usize,
    pub color: &'static str,
    pub length: f32,
}

impl BarbSpec {
    pub fn new(u_attr: &'static str, v_attr: &'static str) -> Self {
        Self {
            u_attr,
            v_attr,
            level: None,
            thin: 25,
            color: "black",
            length: 5.5,
        }
    }

    pub fn at_level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    pub fn thin(mut self, thin: usize) -> Self {
        self.thin = thin;
        self
    }

    pub fn color(mut self, color: &'static str) -> Self {
        self.color = color;
        self
    }
}

/// A complete map product.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub fill_field: &'static str,
    pub fill_ramp: Option<&'static str>,
    pub fill_range: Option<(f32, f32)>,
    pub contours: Vec<ContourSpec>,
    pub barbs: Option<BarbSpec>,
    /// Pressure level for isobaric fill and contour fields.
    pub level: Option<f64>,
    /// Extra field ids a client may show in hover tooltips.
    pub hover_extra: Vec<&'static str>,
}

impl CompositeSpec {
    fn new(id: &'static str, name: &'static str, description: &'static str, fill_field: &'static str) -> Self {
        Self {
            id,
            name,
            description,
            fill_field,
            fill_ramp: None,
            fill_range: None,
            contours: Vec::new(),
            barbs: None,
            level: None,
            hover_extra: Vec::new(),
        }
    }

    fn fill(mut self, ramp: &'static str, vmin: f32, vmax: f32) -> Self {
        self.fill_ramp = Some(ramp);
        self.fill_range = Some((vmin, vmax));
        self
    }

    fn contour(mut self, spec: ContourSpec) -> Self {
        self.contours.push(spec);
        self
    }

    fn barbs(mut self, spec: BarbSpec) -> Self {
        self.barbs = Some(spec);
        self
    }

    fn level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    pub fn metadata(&self) -> ProductMetadata {
        ProductMetadata {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            fill_field: self.fill_field.to_string(),
            contour_fields: self.contours.iter().map(|c| c.field.to_string()).collect(),
            has_barbs: self.barbs.is_some(),
            level: self.level,
            hover_extra: self.hover_extra.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Serializable product listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub fill_field: String,
    pub contour_fields: Vec<String>,
    pub has_barbs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub hover_extra: Vec<String>,
}

const DARK_GRAY: &str = "#333333";

fn surface_barbs() -> BarbSpec {
    BarbSpec::new("u10m", "v10m").color(DARK_GRAY)
}

fn mslp_contours() -> ContourSpec {
    ContourSpec::new("mslp", 4.0).color(DARK_GRAY)
}

fn build_presets() -> Vec<CompositeSpec> {
    vec![
        CompositeSpec::new(
            "surface_analysis",
            "Surface Analysis",
            "2m temp fill + MSLP contours + 10m wind barbs",
            "t2m",
        )
        .fill("RdYlBu_r", -40.0, 45.0)
        .contour(mslp_contours().linewidth(1.2))
        .barbs(surface_barbs()),
        CompositeSpec::new("radar_composite", "Reflectivity", "Composite reflectivity + MSLP contours", "refc")
            .fill("NWSReflectivity", -10.0, 70.0)
            .contour(ContourSpec::new("mslp", 4.0).color("white").linewidth(0.8)),
        CompositeSpec::new(
            "severe_weather",
            "Severe Weather",
            "CAPE fill + wind barbs + MSLP contours",
            "cape_sfc",
        )
        .fill("hot_r", 0.0, 4000.0)
        .contour(mslp_contours())
        .barbs(surface_barbs()),
        CompositeSpec::new(
            "upper_500",
            "500mb Analysis",
            "Temperature fill + height contours + wind barbs at 500 hPa",
            "temperature",
        )
        .fill("RdYlBu_r", -40.0, 10.0)
        .contour(ContourSpec::new("geopotential_height", 6.0).linewidth(1.5))
        .barbs(BarbSpec::new("u_wind", "v_wind").at_level(500.0).thin(20).color(DARK_GRAY))
        .level(500.0),
        CompositeSpec::new(
            "upper_250",
            "250mb Jet",
            "Wind speed fill + height contours at 250 hPa",
            "wind_speed",
        )
        .fill("plasma", 0.0, 120.0)
        .contour(ContourSpec::new("geopotential_height", 12.0).color("white"))
        .barbs(BarbSpec::new("u_wind", "v_wind").at_level(250.0).thin(15).color("white"))
        .level(250.0),
        CompositeSpec::new(
            "moisture",
            "Moisture",
            "Dew point fill + MSLP contours + 10m wind barbs",
            "d2m",
        )
        .fill("YlGn", -30.0, 30.0)
        .contour(mslp_contours())
        .barbs(surface_barbs()),
        CompositeSpec {
            hover_extra: vec!["hdw_paired", "t2m", "rh_surface", "wind_speed_10m"],
            ..CompositeSpec::new(
                "fire_weather",
                "Fire Weather (HDW)",
                "Hot-Dry-Windy Index fill + 10m wind barbs",
                "hdw",
            )
            .fill("YlOrRd", 0.0, 200.0)
            .barbs(surface_barbs())
        },
        CompositeSpec::new("precip", "Precipitation", "Precip rate fill + MSLP contours", "prate")
            .fill("Blues", 0.0, 25.0)
            .contour(mslp_contours()),
    ]
}

struct Presets {
    ordered: Vec<CompositeSpec>,
    by_id: HashMap<&'static str, usize>,
}

static PRESETS: Lazy<Presets> = Lazy::new(|| {
    let ordered = build_presets();
    let by_id = ordered.iter().enumerate().map(|(i, p)| (p.id, i)).collect();
    Presets { ordered, by_id }
});

/// Look up a product by id.
pub fn product(id: &str) -> Option<&'static CompositeSpec> {
    let presets = &*PRESETS;
    presets.by_id.get(id).map(|&i| &presets.ordered[i])
}

/// All products in registration order.
pub fn products() -> &'static [CompositeSpec] {
    &PRESETS.ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::field;

    #[test]
    fn test_eight_presets() {
        let ids: Vec<_> = products().iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec![
                "surface_analysis",
                "radar_composite",
                "severe_weather",
                "upper_500",
                "upper_250",
                "moisture",
                "fire_weather",
                "precip"
            ]
        );
    }

    #[test]
    fn test_every_referenced_field_is_registered() {
        for p in products() {
            assert!(field(p.fill_field).is_some(), "{} fill", p.id);
            for c in &p.contours {
                assert!(field(c.field).is_some(), "{} contour {}", p.id, c.field);
            }
            for extra in &p.hover_extra {
                assert!(field(extra).is_some(), "{} hover {}", p.id, extra);
            }
        }
    }

    #[test]
    fn test_barb_defaults() {
        let b = BarbSpec::new("u10m", "v10m");
        assert_eq!(b.thin, 25);
        assert_eq!(b.color, "black");
        assert_eq!(b.length, 5.5);
        assert_eq!(b.level, None);
    }

    #[test]
    fn test_upper_air_levels() {
        let p = product("upper_500").unwrap();
        assert_eq!(p.level, Some(500.0));
        let barbs = p.barbs.as_ref().unwrap();
        assert_eq!((barbs.level, barbs.thin), (Some(500.0), 20));
        assert_eq!(p.contours[0].interval, 6.0);
        assert!(product("upper_700").is_none());
    }

    #[test]
    fn test_metadata_serializes_hover_extra() {
        let json = serde_json::to_value(product("fire_weather").unwrap().metadata()).unwrap();
        assert_eq!(json["hover_extra"][0], "hdw_paired");
        assert_eq!(json["has_barbs"], true);

        let precip = serde_json::to_value(product("precip").unwrap().metadata()).unwrap();
        assert!(precip.get("hover_extra").is_none());
        assert_eq!(precip["contour_fields"][0], "mslp");
    }
}
