//! Rendered overlay payload plus the metadata a handler sends as headers.

use overlay_common::GeoBounds;
use serde::Serialize;

/// Header names carrying overlay metadata, in the order they are emitted.
pub const EXPOSED_HEADERS: &[&str] = &[
    "X-Grid-Nx",
    "X-Grid-Ny",
    "X-Bounds-South",
    "X-Bounds-North",
    "X-Bounds-West",
    "X-Bounds-East",
    "X-Value-Min",
    "X-Value-Max",
    "X-Units",
    "X-NaN-Value",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Little-endian f32, row-major, south row first
    Binary,
    /// PNG, north row first
    Png,
}

impl ContentKind {
    pub fn mime(&self) -> &'static str {
        match self {
            ContentKind::Binary => "application/octet-stream",
            ContentKind::Png => "image/png",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Binary => "binary",
            ContentKind::Png => "png",
        }
    }
}

/// One rendered overlay. Built per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayResult {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub content_kind: ContentKind,
    pub nx: usize,
    pub ny: usize,
    pub bounds: GeoBounds,
    pub vmin: f32,
    pub vmax: f32,
    pub units: String,
    /// Missing-data sentinel, binary payloads only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nan_value: Option<f32>,
}

impl OverlayResult {
    pub fn mime(&self) -> &'static str {
        self.content_kind.mime()
    }

    /// Response headers, `Content-Type` excluded.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("X-Grid-Nx", self.nx.to_string()),
            ("X-Grid-Ny", self.ny.to_string()),
            ("X-Bounds-South", format!("{:.4}", self.bounds.south)),
            ("X-Bounds-North", format!("{:.4}", self.bounds.north)),
            ("X-Bounds-West", format!("{:.4}", self.bounds.west)),
            ("X-Bounds-East", format!("{:.4}", self.bounds.east)),
            ("X-Value-Min", format!("{:.2}", self.vmin)),
            ("X-Value-Max", format!("{:.2}", self.vmax)),
            ("X-Units", self.units.clone()),
        ];
        if let Some(sentinel) = self.nan_value {
            headers.push(("X-NaN-Value", format!("{:.1}", sentinel)));
        }
        headers.push(("Access-Control-Expose-Headers", EXPOSED_HEADERS.join(", ")));
        headers
    }

    /// Decode a binary payload back into values. `None` for PNG results.
    pub fn values(&self) -> Option<Vec<f32>> {
        if self.content_kind != ContentKind::Binary {
            return None;
        }
        Some(
            self.data
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }
}
