//! Engine configuration.
//!
//! Process-wide settings come from environment variables. Per-model settings
//! (domain threshold, output grid) come from `models/*.yaml` under the model
//! config directory.

use overlay_common::OutputGrid;
use projection::DEFAULT_DOMAIN_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Process-wide overlay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Root for per-model projection caches.
    pub cache_dir: PathBuf,

    /// Directory holding `models/*.yaml`.
    pub model_config_dir: PathBuf,

    /// Fill opacity used when a request gives none.
    pub default_opacity: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("map-overlay"),
            model_config_dir: PathBuf::from("config"),
            default_opacity: crate::render::DEFAULT_OPACITY,
        }
    }
}

impl OverlayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("OVERLAY_CACHE_DIR") {
            config.cache_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("OVERLAY_MODEL_CONFIG_DIR") {
            config.model_config_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("OVERLAY_DEFAULT_OPACITY") {
            if let Ok(opacity) = val.parse() {
                config.default_opacity = opacity;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.default_opacity) {
            return Err("default_opacity must be within 0-1".to_string());
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err("cache_dir must not be empty".to_string());
        }

        Ok(())
    }
}

/// Per-model settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOverlayConfig {
    pub name: String,
    /// Out-of-domain cutoff as a chord length on the unit sphere.
    pub domain_threshold: f64,
    pub output_grid: OutputGrid,
}

impl ModelOverlayConfig {
    /// Defaults for a model with no YAML entry.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain_threshold: DEFAULT_DOMAIN_THRESHOLD,
            output_grid: OutputGrid::conus(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("model name must not be empty".to_string());
        }
        if !(self.domain_threshold.is_finite() && self.domain_threshold > 0.0) {
            return Err(format!("{}: domain_threshold must be > 0", self.name));
        }
        self.output_grid.validate().map_err(|e| format!("{}: {}", self.name, e))
    }
}

#[derive(Debug, Deserialize)]
struct YamlModelFile {
    model: YamlModelMetadata,
    #[serde(default)]
    overlay: Option<YamlOverlayConfig>,
}

#[derive(Debug, Deserialize)]
struct YamlModelMetadata {
    id: String,
}

#[derive(Debug, Deserialize)]
struct YamlOverlayConfig {
    #[serde(default)]
    domain_threshold: Option<f64>,
    #[serde(default)]
    output_grid: Option<OutputGrid>,
}

/// Per-model configs keyed by model id.
#[derive(Debug, Clone, Default)]
pub struct ModelConfigRegistry {
    configs: HashMap<String, ModelOverlayConfig>,
}

impl ModelConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `models/*.yaml` under `config_dir`.
    ///
    /// Unreadable or invalid files are logged and skipped.
    pub fn load_from_directory<P: AsRef<Path>>(config_dir: P) -> Self {
        let mut registry = Self::new();
        let models_dir = config_dir.as_ref().join("models");

        if !models_dir.exists() {
            warn!(path = ?models_dir, "Models config directory not found");
            return registry;
        }

        let entries = match fs::read_dir(&models_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, path = ?models_dir, "Failed to read models directory");
                return registry;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("yaml") {
                continue;
            }
            match Self::load_model_config(&path) {
                Ok(config) => {
                    debug!(
                        model = %config.name,
                        threshold = config.domain_threshold,
                        "Loaded overlay config"
                    );
                    registry.insert(config);
                }
                Err(e) => warn!(path = ?path, error = %e, "Skipping model config"),
            }
        }

        debug!(
            count = registry.configs.len(),
            models = ?registry.configs.keys().collect::<Vec<_>>(),
            "Loaded model overlay configs"
        );

        registry
    }

    fn load_model_config(path: &Path) -> Result<ModelOverlayConfig, String> {
        let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
        Self::parse_model_config(&contents)
    }

    /// Parse one model file.
    pub fn parse_model_config(contents: &str) -> Result<ModelOverlayConfig, String> {
        let yaml: YamlModelFile = serde_yaml::from_str(contents).map_err(|e| e.to_string())?;
        let mut config = ModelOverlayConfig::named(yaml.model.id);
        if let Some(overlay) = yaml.overlay {
            if let Some(threshold) = overlay.domain_threshold {
                config.domain_threshold = threshold;
            }
            if let Some(grid) = overlay.output_grid {
                config.output_grid = grid;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn insert(&mut self, config: ModelOverlayConfig) {
        self.configs.insert(config.name.clone(), config);
    }

    /// Config for `model`, or defaults when none was loaded.
    pub fn get(&self, model: &str) -> ModelOverlayConfig {
        self.configs
            .get(model)
            .cloned()
            .unwrap_or_else(|| ModelOverlayConfig::named(model))
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_valid() {
        assert!(OverlayConfig::default().validate().is_ok());
        let bad = OverlayConfig {
            default_opacity: 1.5,
            ..OverlayConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_parse_model_config() {
        let yaml = r#"
model:
  id: gfs
  name: GFS
overlay:
  domain_threshold: 0.01
"#;
        let config = ModelConfigRegistry::parse_model_config(yaml).unwrap();
        assert_eq!(config.name, "gfs");
        assert_eq!(config.domain_threshold, 0.01);
        assert_eq!(config.output_grid, OutputGrid::conus());
    }

    #[test]
    fn test_parse_rejects_bad_threshold() {
        let yaml = "model:\n  id: x\noverlay:\n  domain_threshold: -1.0\n";
        assert!(ModelConfigRegistry::parse_model_config(yaml).is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        fs::create_dir_all(&models).unwrap();
        let mut f = fs::File::create(models.join("hrrr.yaml")).unwrap();
        writeln!(
            f,
            "model:\n  id: hrrr\noverlay:\n  output_grid: {{south: 30.0, north: 40.0, west: -100.0, east: -90.0, dlat: 0.1, dlon: 0.1}}"
        )
        .unwrap();
        fs::write(models.join("broken.yaml"), "not: [valid").unwrap();
        fs::write(models.join("notes.txt"), "ignored").unwrap();

        let registry = ModelConfigRegistry::load_from_directory(dir.path());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("hrrr").output_grid.dlat, 0.1);
        assert_eq!(registry.get("rap").domain_threshold, DEFAULT_DOMAIN_THRESHOLD);
    }
}
