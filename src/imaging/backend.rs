//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the set of primitives the compression engine
//! consumes: decode bytes into pixels, scale pixels, encode pixels at a given
//! quality. Everything above this trait (dimension policy, quality search,
//! orchestration, batching) is backend-agnostic.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording mock in [`tests::MockBackend`].

use super::params::Quality;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Scale failed: {0}")]
    Scale(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of a decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Trait for image processing backends.
///
/// `Sync` so a single backend can be shared across rayon workers; each call
/// works only on the buffers it is handed.
pub trait ImageBackend: Sync {
    /// Decoded, uncompressed raster owned by one compression call.
    type Pixels: Send;

    /// Decode an encoded image (any supported input format) into pixels.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Pixels, BackendError>;

    /// Dimensions of a decoded buffer.
    fn dimensions(&self, pixels: &Self::Pixels) -> Dimensions;

    /// Scale a buffer to exactly `width` x `height`.
    fn scale(
        &self,
        pixels: &Self::Pixels,
        width: u32,
        height: u32,
    ) -> Result<Self::Pixels, BackendError>;

    /// Encode a buffer in the output codec at the given quality.
    fn encode(&self, pixels: &Self::Pixels, quality: Quality) -> Result<Vec<u8>, BackendError>;

    /// File extension of the output codec, without the dot.
    fn output_extension(&self) -> &'static str;
}
