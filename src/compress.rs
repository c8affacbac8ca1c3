//! Per-image compression: decode → fit dimensions → scale → quality search.
//!
//! [`compress`] is a pure function of its inputs plus the injected backend and
//! identifier generator. It performs no I/O and touches no shared state, so
//! any number of calls can run in parallel.

use crate::config::CompressionConfig;
use crate::ids::IdGenerator;
use crate::imaging::{BackendError, Dimensions, ImageBackend, compute_dimensions};
use crate::search::find_best_quality;
use crate::types::CompressionResult;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Failure scoped to one input image.
#[derive(Error, Debug)]
pub enum CompressError {
    #[error("{name}: could not read input: {source}")]
    Read {
        name: String,
        source: std::io::Error,
    },
    #[error("{name}: not a supported image: {source}")]
    Decode { name: String, source: BackendError },
    #[error("{name}: encoding failed: {source}")]
    Encode { name: String, source: BackendError },
    #[error("{name}: cancelled before processing")]
    Cancelled { name: String },
}

impl CompressError {
    /// Name of the input that failed.
    pub fn name(&self) -> &str {
        match self {
            CompressError::Read { name, .. }
            | CompressError::Decode { name, .. }
            | CompressError::Encode { name, .. }
            | CompressError::Cancelled { name } => name,
        }
    }
}

/// An input image once decoded. Lives for exactly one [`compress`] call.
#[derive(Debug)]
pub struct SourceImage<'a, P> {
    pub name: &'a str,
    pub bytes: &'a [u8],
    pub dimensions: Dimensions,
    pixels: P,
}

impl<'a, P> SourceImage<'a, P> {
    /// Decode `bytes` with the backend, recording its pixel dimensions.
    pub fn decode<B>(backend: &B, bytes: &'a [u8], name: &'a str) -> Result<Self, CompressError>
    where
        B: ImageBackend<Pixels = P>,
    {
        let pixels = backend
            .decode(bytes)
            .map_err(|source| CompressError::Decode {
                name: name.to_string(),
                source,
            })?;
        Ok(Self {
            name,
            bytes,
            dimensions: backend.dimensions(&pixels),
            pixels,
        })
    }

    /// Size of the encoded input in bytes.
    pub fn byte_len(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Compress one image to fit `config`.
///
/// Returns a fresh [`CompressionResult`] carrying the untouched original and
/// the best artifact the quality search found.
pub fn compress<B: ImageBackend>(
    backend: &B,
    ids: &impl IdGenerator,
    bytes: &[u8],
    name: &str,
    config: &CompressionConfig,
) -> Result<CompressionResult, CompressError> {
    let source = SourceImage::decode(backend, bytes, name)?;
    let Dimensions { width, height } = source.dimensions;

    let (target_w, target_h) =
        compute_dimensions(width, height, config.max_width, config.max_height);
    let output_dimensions = Dimensions::new(target_w, target_h);

    let encode_error = |source| CompressError::Encode {
        name: name.to_string(),
        source,
    };

    let scaled;
    let pixels = if output_dimensions == source.dimensions {
        &source.pixels
    } else {
        debug!(image = name, width, height, target_w, target_h, "scaling");
        scaled = backend
            .scale(&source.pixels, target_w, target_h)
            .map_err(encode_error)?;
        &scaled
    };

    let outcome = find_best_quality(
        |quality| {
            let encoded = backend.encode(pixels, quality)?;
            let size = encoded.len();
            Ok::<_, BackendError>((encoded, size))
        },
        config.quality_range(),
        config.max_bytes,
        config.quality_search_iterations,
    )
    .map_err(encode_error)?;

    debug!(
        image = name,
        quality = outcome.quality.value(),
        size = outcome.size,
        budget_met = outcome.budget_met,
        encodes = outcome.encodes,
        "compressed"
    );

    Ok(CompressionResult {
        id: ids.next_id(),
        name: name.to_string(),
        original_size: source.byte_len(),
        original: Arc::from(source.bytes),
        original_dimensions: source.dimensions,
        output_dimensions,
        compressed_size: outcome.size as u64,
        compressed: Arc::from(outcome.artifact),
        quality: outcome.quality,
        budget_met: outcome.budget_met,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp, mock_image};
    use crate::types::ImageId;
    use uuid::Uuid;

    #[test]
    fn downscales_and_searches() {
        let backend = MockBackend::new();
        let ids = SequentialIds::new();
        let bytes = mock_image(3840, 2160);

        let result =
            compress(&backend, &ids, &bytes, "big.png", &CompressionConfig::default()).unwrap();

        assert_eq!(result.id, ImageId(Uuid::from_u128(1)));
        assert_eq!(result.name, "big.png");
        assert_eq!(result.original_dimensions, Dimensions::new(3840, 2160));
        assert_eq!(result.output_dimensions, Dimensions::new(1920, 1080));
        assert_eq!(result.original_size, bytes.len() as u64);
        assert_eq!(&*result.original, bytes.as_slice());

        let ops = backend.get_operations();
        assert_eq!(ops[0], RecordedOp::Decode(bytes.len()));
        assert_eq!(
            ops[1],
            RecordedOp::Scale {
                width: 1920,
                height: 1080
            }
        );
        // Every encode works on the scaled buffer.
        assert!(ops[2..].iter().all(|op| matches!(
            op,
            RecordedOp::Encode {
                width: 1920,
                height: 1080,
                ..
            }
        )));
    }

    #[test]
    fn small_image_skips_scale() {
        let backend = MockBackend::new();
        let ids = SequentialIds::new();

        let result = compress(
            &backend,
            &ids,
            &mock_image(800, 600),
            "small.png",
            &CompressionConfig::default(),
        )
        .unwrap();

        assert_eq!(result.output_dimensions, Dimensions::new(800, 600));
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Scale { .. }))
        );
    }

    #[test]
    fn compressed_size_matches_bytes() {
        let backend = MockBackend::new();
        let ids = SequentialIds::new();

        let result = compress(
            &backend,
            &ids,
            &mock_image(3840, 2160),
            "big.png",
            &CompressionConfig::default(),
        )
        .unwrap();

        assert_eq!(result.compressed_size, result.compressed.len() as u64);
        assert!(result.budget_met);
        assert!(result.compressed_size <= 102_400);
        assert!(result.quality.value() > 0.0 && result.quality.value() < 1.0);
        assert_eq!(backend.encode_count(), 10);
    }

    #[test]
    fn budget_unreachable_reports_fallback() {
        // Never under 1 MiB, whatever the quality.
        let backend = MockBackend::with_size_fn(|_, _| 2 * 1024 * 1024);
        let ids = SequentialIds::new();

        let result = compress(
            &backend,
            &ids,
            &mock_image(640, 480),
            "stubborn.png",
            &CompressionConfig::default(),
        )
        .unwrap();

        assert!(!result.budget_met);
        assert_eq!(result.quality.value(), 0.0);
        assert_eq!(result.compressed_size, 2 * 1024 * 1024);
        assert_eq!(result.compressed_size, result.compressed.len() as u64);
        assert_eq!(backend.encode_count(), 11);
    }

    #[test]
    fn undecodable_input_is_decode_error() {
        let backend = MockBackend::new();
        let ids = SequentialIds::new();

        let err = compress(
            &backend,
            &ids,
            b"not an image",
            "notes.txt",
            &CompressionConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, CompressError::Decode { .. }));
        assert_eq!(err.name(), "notes.txt");
        assert_eq!(backend.encode_count(), 0);
    }

    #[test]
    fn encoder_failure_is_per_item_error() {
        let backend = MockBackend::failing_encoder();
        let ids = SequentialIds::new();

        let err = compress(
            &backend,
            &ids,
            &mock_image(100, 100),
            "a.png",
            &CompressionConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, CompressError::Encode { .. }));
        assert_eq!(err.name(), "a.png");
    }

    #[test]
    fn quality_stays_within_configured_range() {
        let backend = MockBackend::new();
        let ids = SequentialIds::new();
        let config = CompressionConfig {
            min_quality: 0.4,
            max_quality: 0.6,
            max_bytes: 1,
            ..Default::default()
        };

        let result = compress(&backend, &ids, &mock_image(500, 500), "x.png", &config).unwrap();
        assert!(!result.budget_met);
        assert_eq!(result.quality.value(), 0.4);
    }

    #[test]
    fn each_call_gets_fresh_id() {
        let backend = MockBackend::new();
        let ids = SequentialIds::new();
        let config = CompressionConfig::default();

        let a = compress(&backend, &ids, &mock_image(10, 10), "a", &config).unwrap();
        let b = compress(&backend, &ids, &mock_image(10, 10), "b", &config).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn source_image_records_dimensions_and_length() {
        let backend = MockBackend::new();
        let bytes = mock_image(1234, 567);
        let source = SourceImage::decode(&backend, &bytes, "s").unwrap();
        assert_eq!(source.dimensions, Dimensions::new(1234, 567));
        assert_eq!(source.byte_len(), bytes.len() as u64);
    }
}
