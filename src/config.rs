//! Configuration: compression bounds and processing settings.
//!
//! Settings come from stock defaults, optionally overridden by a TOML file,
//! optionally overridden again by CLI flags.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [compression]
//! max_width = 1920                 # Output width bound (pixels)
//! max_height = 1080                # Output height bound (pixels)
//! max_bytes = 102400               # Byte budget per output image
//! quality_search_iterations = 10   # Fixed number of search steps
//! min_quality = 0.0                # Lower quality bound (0.0-1.0)
//! max_quality = 1.0                # Upper quality bound (0.0-1.0)
//!
//! [processing]
//! max_processes = 4                # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use crate::imaging::QualityRange;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything a run needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Per-image compression bounds.
    pub compression: CompressionConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compression.validate()
    }
}

/// Bounds for one compression: pixel box, byte budget, and search budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Maximum output width in pixels.
    pub max_width: u32,
    /// Maximum output height in pixels.
    pub max_height: u32,
    /// Byte budget the encoded output must not exceed.
    pub max_bytes: u64,
    /// Number of bisection steps in the quality search.
    pub quality_search_iterations: u32,
    /// Lowest quality the search may settle on.
    pub min_quality: f64,
    /// Highest quality the search may settle on.
    pub max_quality: f64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            max_bytes: 100 * 1024,
            quality_search_iterations: 10,
            min_quality: 0.0,
            max_quality: 1.0,
        }
    }
}

impl CompressionConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(ConfigError::Validation(
                "compression.max_width and max_height must be positive".into(),
            ));
        }
        if self.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "compression.max_bytes must be positive".into(),
            ));
        }
        if self.quality_search_iterations == 0 {
            return Err(ConfigError::Validation(
                "compression.quality_search_iterations must be positive".into(),
            ));
        }
        let in_unit = |q: f64| (0.0..=1.0).contains(&q);
        if !in_unit(self.min_quality) || !in_unit(self.max_quality) {
            return Err(ConfigError::Validation(
                "compression.min_quality and max_quality must be within 0.0-1.0".into(),
            ));
        }
        if self.min_quality >= self.max_quality {
            return Err(ConfigError::Validation(
                "compression.min_quality must be less than max_quality".into(),
            ));
        }
        Ok(())
    }

    pub fn quality_range(&self) -> QualityRange {
        QualityRange::new(self.min_quality, self.max_quality)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel compression workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Loading and merging
// =============================================================================

/// Stock defaults as a TOML table, the base layer for user overrides.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Settings::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse TOML text over stock defaults, reject unknown keys, and validate.
pub fn parse_settings(content: &str) -> Result<Settings, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value()?, overlay);
    let settings: Settings = merged.try_into()?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_settings(&content)
}

/// Returns a fully-commented stock config file. Used by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# fitsize configuration
# =====================
# All settings are optional. Values shown are the defaults.
# Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Compression
# ---------------------------------------------------------------------------
[compression]
# Output pixel bounds. Images inside the box keep their size; larger images
# are scaled down to fit, preserving aspect ratio.
max_width = 1920
max_height = 1080

# Byte budget per output image (100 KiB).
max_bytes = 102400

# Number of bisection steps when searching for the best quality.
# Each step is one encode; more steps find a finer answer.
quality_search_iterations = 10

# Quality bounds for the search (0.0 = smallest file, 1.0 = best quality).
min_quality = 0.0
max_quality = 1.0

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel compression workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
