//! # fitsize
//!
//! Re-encode images so each fits a byte budget, at the highest quality that
//! still fits, without exceeding a pixel bounding box.
//!
//! # Pipeline
//!
//! ```text
//! bytes ─▶ decode ─▶ fit dimensions ─▶ scale ─▶ quality search ─▶ CompressionResult
//! ```
//!
//! Each image runs this pipeline on its own with no shared mutable state, so
//! a batch fans out across the rayon pool and the only synchronized piece is
//! the collection that gathers finished results.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Backend trait (decode / scale / encode), `image`-crate backend, dimension math |
//! | [`search`] | Fixed-step bisection for the best quality under a byte budget |
//! | [`compress`] | One image end to end: decode → fit → scale → search → result |
//! | [`batch`] | Parallel batches, cancellation, progress events, the result collection |
//! | [`config`] | Compression bounds and processing settings, TOML loading and validation |
//! | [`ids`] | Injectable result-identifier generators |
//! | [`types`] | `CompressionResult`, `ImageId`, `Totals` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fixed Iteration Budget
//!
//! The quality search always runs its configured number of steps instead of
//! stopping at a tolerance. Encoders differ wildly in how size responds to
//! quality; a fixed step count bounds the cost of every image the same way.
//!
//! ## Best-So-Far, Not Last-Probed
//!
//! The search returns the best probe that fit, so a late miss can never
//! replace an earlier fit with something worse. When nothing fits, it encodes
//! once more at the lower bound and flags the result as over budget.
//!
//! ## JPEG Output
//!
//! One lossy codec keeps the search one-dimensional. JPEG decodes everywhere
//! and the `image` crate's encoder is pure Rust.

pub mod batch;
pub mod compress;
pub mod config;
pub mod ids;
pub mod imaging;
pub mod output;
pub mod search;
pub mod types;

pub use batch::{BatchEvent, BatchRunner, CancelToken, ResultSet, SourceFile, process_all, process_paths};
pub use compress::{CompressError, compress};
pub use config::CompressionConfig;
pub use types::{CompressionResult, ImageId, Totals};
