//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Fit source dimensions inside a bounding box, preserving aspect ratio.
///
/// Images already inside the box are returned unchanged (never upscaled).
/// Otherwise the image is scaled by the tighter of the two axis ratios and
/// each side is rounded to the nearest pixel, clamped to at least 1.
///
/// # Examples
/// ```
/// # use fitsize::imaging::compute_dimensions;
/// // 4K frame into a 1080p box
/// assert_eq!(compute_dimensions(3840, 2160, 1920, 1080), (1920, 1080));
///
/// // Already fits: untouched
/// assert_eq!(compute_dimensions(800, 600, 1920, 1080), (800, 600));
/// ```
pub fn compute_dimensions(
    source_width: u32,
    source_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if source_width <= max_width && source_height <= max_height {
        return (source_width, source_height);
    }

    let ratio = (max_width as f64 / source_width as f64)
        .min(max_height as f64 / source_height as f64);

    let width = (source_width as f64 * ratio).round() as u32;
    let height = (source_height as f64 * ratio).round() as u32;

    (width.max(1), height.max(1))
}
