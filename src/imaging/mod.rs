//! Image primitives, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from bytes) |
//! | **Scale** | Lanczos3 `resize_exact` |
//! | **Encode** | JPEG at a normalized quality |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Quality and quality-range value types
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::compute_dimensions;
pub use params::{Quality, QualityRange};
pub use rust_backend::{RustBackend, supported_input_extensions};
