//! Shared record types produced by compression and consumed by the batch
//! collection, the CLI output, and the JSON summary.

use crate::imaging::{Dimensions, Quality};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier of one processed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub Uuid);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Outcome of compressing one image. Immutable once built: fields are only
/// writable inside the crate and read through accessors elsewhere.
///
/// Byte streams are reference-counted so records can be cloned into the
/// result collection and handed back to callers without copying pixels.
#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    pub(crate) id: ImageId,
    pub(crate) name: String,
    pub(crate) original_size: u64,
    #[serde(skip)]
    pub(crate) original: Arc<[u8]>,
    pub(crate) original_dimensions: Dimensions,
    pub(crate) output_dimensions: Dimensions,
    #[serde(skip)]
    pub(crate) compressed: Arc<[u8]>,
    pub(crate) compressed_size: u64,
    #[serde(serialize_with = "serialize_quality")]
    pub(crate) quality: Quality,
    pub(crate) budget_met: bool,
}

fn serialize_quality<S: serde::Serializer>(q: &Quality, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(q.value())
}

impl CompressionResult {
    pub fn id(&self) -> ImageId {
        self.id
    }

    /// Input name, usually the source file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    /// The untouched input bytes.
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    pub fn original_dimensions(&self) -> Dimensions {
        self.original_dimensions
    }

    pub fn output_dimensions(&self) -> Dimensions {
        self.output_dimensions
    }

    /// The encoded output kept by the quality search.
    pub fn compressed(&self) -> &[u8] {
        &self.compressed
    }

    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// `false` when no quality fit the budget and the smallest attainable
    /// output was kept instead.
    pub fn budget_met(&self) -> bool {
        self.budget_met
    }

    /// Percentage saved relative to the original (negative if the output grew).
    pub fn savings_percent(&self) -> f64 {
        percent_saved(self.original_size, self.compressed_size)
    }
}

/// Aggregate byte totals across a set of results.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Totals {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub percent_saved: f64,
}

impl Totals {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a CompressionResult>) -> Self {
        let (original_bytes, compressed_bytes) = results
            .into_iter()
            .fold((0u64, 0u64), |(orig, comp), r| {
                (orig + r.original_size, comp + r.compressed_size)
            });
        Self {
            original_bytes,
            compressed_bytes,
            percent_saved: percent_saved(original_bytes, compressed_bytes),
        }
    }
}

/// `(original - compressed) / original * 100`, defined as 0 for an empty original.
pub fn percent_saved(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - compressed as f64) / original as f64 * 100.0
}
