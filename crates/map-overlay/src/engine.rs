//! Per-model overlay engine.
//!
//! One engine serves one native model grid. It owns the projection map for
//! that grid, built on first use (or loaded from the on-disk cache) and read
//! without locking afterwards. Render calls hold no mutable state and may run
//! concurrently from any number of threads.

use crate::config::{ModelOverlayConfig, OverlayConfig};
use crate::extract::extract_field;
use crate::fields::{self, FieldMetadata, FieldSpec};
use crate::metrics::{MetricsSnapshot, OverlayMetrics, RenderKind};
use crate::products::{self, CompositeSpec, ProductMetadata};
use crate::render::composite::CompositeContext;
use crate::render::flat::FlatImageOptions;
use crate::render::{binary, composite, flat, DEFAULT_OPACITY};
use crate::reproject::{Reprojected, Reprojector};
use crate::result::OverlayResult;
use overlay_common::{FieldArray, ForecastHour, GeoBounds, OutputGrid, OverlayError, Result};
use projection::{build_index_map, CacheKey, LazyProjection, ProjectionCache, ProjectionMap, ProjectionState};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct MapOverlayEngine {
    model: String,
    grid: OutputGrid,
    domain_threshold: f64,
    default_opacity: f32,
    cache: Option<ProjectionCache>,
    projection: LazyProjection<ProjectionMap>,
    metrics: OverlayMetrics,
}

impl MapOverlayEngine {
    /// Engine for `model` with the default threshold.
    ///
    /// Without a cache directory the projection is rebuilt each process start.
    /// The output grid defaults to CONUS at 0.03°.
    pub fn new(model: impl Into<String>, cache_dir: Option<PathBuf>, grid: Option<OutputGrid>) -> Result<Self> {
        let mut config = ModelOverlayConfig::named(model);
        if let Some(grid) = grid {
            config.output_grid = grid;
        }
        Self::with_config(config, cache_dir)
    }

    pub fn with_config(config: ModelOverlayConfig, cache_dir: Option<PathBuf>) -> Result<Self> {
        config.validate().map_err(OverlayError::Config)?;
        let cache = cache_dir.map(|dir| ProjectionCache::new(dir, &config.name));
        debug!(
            model = %config.name,
            ny = config.output_grid.ny(),
            nx = config.output_grid.nx(),
            threshold = config.domain_threshold,
            cached = cache.is_some(),
            "Created overlay engine"
        );
        Ok(Self {
            model: config.name,
            grid: config.output_grid,
            domain_threshold: config.domain_threshold,
            default_opacity: DEFAULT_OPACITY,
            cache,
            projection: LazyProjection::new(),
            metrics: OverlayMetrics::new(),
        })
    }

    /// Engine from process settings plus a model's YAML entry.
    pub fn from_config(overlay: &OverlayConfig, model: ModelOverlayConfig) -> Result<Self> {
        overlay.validate().map_err(OverlayError::Config)?;
        let mut engine = Self::with_config(model, Some(overlay.cache_dir.clone()))?;
        engine.default_opacity = overlay.default_opacity;
        Ok(engine)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn grid(&self) -> &OutputGrid {
        &self.grid
    }

    pub fn projection_state(&self) -> ProjectionState {
        self.projection.state()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Flat-image options carrying this engine's default opacity.
    pub fn default_flat_options(&self) -> FlatImageOptions {
        FlatImageOptions {
            opacity: self.default_opacity,
            ..FlatImageOptions::default()
        }
    }

    // ------------------------------------------------------------------
    // Projection
    // ------------------------------------------------------------------

    /// The projection map, building or loading it on first call.
    pub fn ensure_projection(&self, fh: &dyn ForecastHour) -> Result<&ProjectionMap> {
        self.projection.get_or_try_build(|| self.build_projection(fh))
    }

    fn build_projection(&self, fh: &dyn ForecastHour) -> Result<ProjectionMap> {
        let lats = fh.field("lats").ok_or_else(|| OverlayError::missing("lats"))?;
        let lons = fh.field("lons").ok_or_else(|| OverlayError::missing("lons"))?;

        match (lats.as_ref(), lons.as_ref()) {
            (FieldArray::Axis(lats), FieldArray::Axis(lons)) => {
                info!(
                    model = %self.model,
                    nlat = lats.len(),
                    nlon = lons.len(),
                    "Regular native grid, slicing directly"
                );
                Ok(ProjectionMap::regular(lats, lons))
            }
            (FieldArray::Grid2(lats), FieldArray::Grid2(lons)) => {
                self.curvilinear_projection(lats.data(), lons.data())
            }
            (lats, lons) => Err(OverlayError::Projection(format!(
                "lats ({}-D) and lons ({}-D) are not a usable coordinate pair",
                lats.ndim(),
                lons.ndim()
            ))),
        }
    }

    fn curvilinear_projection(&self, lats: &[f32], lons: &[f32]) -> Result<ProjectionMap> {
        let start = Instant::now();
        let key = CacheKey::new(&self.grid, lats.len(), self.domain_threshold);
        if let Some(map) = self.cache.as_ref().and_then(|c| c.load(&key)) {
            self.metrics.record_projection_build(start.elapsed(), true);
            return Ok(ProjectionMap::Curvilinear(map));
        }

        let map = build_index_map(lats, lons, &self.grid, self.domain_threshold)?;
        let elapsed = start.elapsed();
        self.metrics.record_projection_build(elapsed, false);
        info!(
            model = %self.model,
            native = lats.len(),
            ny = self.grid.ny(),
            nx = self.grid.nx(),
            masked = map.masked_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Built projection map"
        );

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&map, &key) {
                warn!(model = %self.model, error = %e, "Failed to persist projection map");
            }
        }
        Ok(ProjectionMap::Curvilinear(map))
    }

    fn reprojected(
        &self,
        fh: &dyn ForecastHour,
        spec: &FieldSpec,
        level: Option<f64>,
        bbox: Option<&GeoBounds>,
    ) -> Result<Reprojected> {
        let native = extract_field(fh, spec, level)?;
        let map = self.ensure_projection(fh)?;
        let reprojected = Reprojector::new(&self.grid, map).reproject(&native, bbox)?;
        if reprojected.field.is_empty() {
            return Err(OverlayError::EmptyReprojection);
        }
        Ok(reprojected)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    fn finish(&self, kind: RenderKind, start: Instant, outcome: Result<OverlayResult>) -> Result<OverlayResult> {
        match &outcome {
            Ok(result) => {
                self.metrics.record_render(kind, start.elapsed());
                debug!(
                    model = %self.model,
                    kind = kind.label(),
                    nx = result.nx,
                    ny = result.ny,
                    bytes = result.data.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Rendered overlay"
                );
            }
            Err(e) if e.is_no_data() => {
                self.metrics.record_no_data(kind);
                debug!(model = %self.model, kind = kind.label(), reason = %e, "No overlay data");
            }
            Err(e) => {
                self.metrics.record_failure(kind);
                warn!(model = %self.model, kind = kind.label(), error = %e, "Overlay render failed");
            }
        }
        outcome
    }

    /// Raw f32 payload of one field on the output grid.
    pub fn render_binary(
        &self,
        fh: &dyn ForecastHour,
        field_id: &str,
        level: Option<f64>,
        bbox: Option<&GeoBounds>,
    ) -> Result<OverlayResult> {
        let start = Instant::now();
        let outcome = fields::field(field_id)
            .ok_or_else(|| OverlayError::UnknownField(field_id.to_string()))
            .and_then(|spec| Ok(binary::render(self.reprojected(fh, spec, level, bbox)?, spec)));
        self.finish(RenderKind::Binary, start, outcome)
    }

    /// One field colored through a ramp, as a transparent PNG.
    pub fn render_flat_image(
        &self,
        fh: &dyn ForecastHour,
        field_id: &str,
        level: Option<f64>,
        bbox: Option<&GeoBounds>,
        options: &FlatImageOptions,
    ) -> Result<OverlayResult> {
        let start = Instant::now();
        let outcome = fields::field(field_id)
            .ok_or_else(|| OverlayError::UnknownField(field_id.to_string()))
            .and_then(|spec| flat::render(self.reprojected(fh, spec, level, bbox)?, spec, options));
        self.finish(RenderKind::Flat, start, outcome)
    }

    /// A registered composite product as PNG.
    pub fn render_composite(
        &self,
        fh: &dyn ForecastHour,
        product_id: &str,
        bbox: Option<&GeoBounds>,
        opacity: Option<f32>,
    ) -> Result<OverlayResult> {
        match products::product(product_id) {
            Some(product) => self.render_composite_spec(fh, product, bbox, opacity),
            None => {
                let outcome = Err(OverlayError::UnknownProduct(product_id.to_string()));
                self.finish(RenderKind::Composite, Instant::now(), outcome)
            }
        }
    }

    /// Any composite spec as PNG, registered or not.
    pub fn render_composite_spec(
        &self,
        fh: &dyn ForecastHour,
        product: &CompositeSpec,
        bbox: Option<&GeoBounds>,
        opacity: Option<f32>,
    ) -> Result<OverlayResult> {
        let start = Instant::now();
        let outcome = self.ensure_projection(fh).and_then(|map| {
            let ctx = CompositeContext {
                fh,
                reprojector: Reprojector::new(&self.grid, map),
                bbox,
                metrics: &self.metrics,
            };
            composite::render(&ctx, product, opacity.unwrap_or(self.default_opacity))
        });
        self.finish(RenderKind::Composite, start, outcome)
    }

    /// [`render_binary`](Self::render_binary), with every failure as `None`.
    pub fn try_render_binary(
        &self,
        fh: &dyn ForecastHour,
        field_id: &str,
        level: Option<f64>,
        bbox: Option<&GeoBounds>,
    ) -> Option<OverlayResult> {
        self.render_binary(fh, field_id, level, bbox).ok()
    }

    pub fn try_render_flat_image(
        &self,
        fh: &dyn ForecastHour,
        field_id: &str,
        level: Option<f64>,
        bbox: Option<&GeoBounds>,
        options: &FlatImageOptions,
    ) -> Option<OverlayResult> {
        self.render_flat_image(fh, field_id, level, bbox, options).ok()
    }

    pub fn try_render_composite(
        &self,
        fh: &dyn ForecastHour,
        product_id: &str,
        bbox: Option<&GeoBounds>,
        opacity: Option<f32>,
    ) -> Option<OverlayResult> {
        self.render_composite(fh, product_id, bbox, opacity).ok()
    }

    // ------------------------------------------------------------------
    // Registry queries
    // ------------------------------------------------------------------

    /// Every registered field. With a forecast hour, direct fields report
    /// whether their attribute is present; derived fields always report true.
    pub fn list_fields(&self, fh: Option<&dyn ForecastHour>) -> Vec<FieldMetadata> {
        fields::fields()
            .iter()
            .map(|spec| {
                let available = fh.map_or(true, |fh| spec.is_available(fh));
                spec.metadata(available)
            })
            .collect()
    }

    pub fn list_products(&self) -> Vec<ProductMetadata> {
        products::products().iter().map(CompositeSpec::metadata).collect()
    }
}

impl std::fmt::Debug for MapOverlayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapOverlayEngine")
            .field("model", &self.model)
            .field("grid", &self.grid)
            .field("domain_threshold", &self.domain_threshold)
            .field("projection", &self.projection_state())
            .finish()
    }
}
