//! Parameter types for image operations.
//!
//! These describe *what* to ask of a backend, not *how* it does it.
//!
//! - [`Quality`]: normalized lossy quality in `[0.0, 1.0]`. Clamped on construction.
//! - [`QualityRange`]: the `[min, max]` interval the quality search explores.

/// Normalized quality knob passed to a lossy encoder (0.0 = smallest, 1.0 = best).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Quality(f64);

impl Quality {
    pub const MIN: Quality = Quality(0.0);
    pub const MAX: Quality = Quality(1.0);

    /// Build a quality value, clamping into `[0.0, 1.0]`. NaN maps to 0.0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Map onto the 1–100 integer scale used by JPEG/WebP style encoders.
    pub fn to_percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Inclusive bounds for the quality search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityRange {
    pub min: Quality,
    pub max: Quality,
}

impl QualityRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Quality::new(min),
            max: Quality::new(max),
        }
    }

    pub fn contains(&self, quality: Quality) -> bool {
        quality >= self.min && quality <= self.max
    }
}

impl Default for QualityRange {
    fn default() -> Self {
        Self {
            min: Quality::MIN,
            max: Quality::MAX,
        }
    }
}
