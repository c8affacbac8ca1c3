//! Quality search: the highest encoder quality whose output fits a byte budget.
//!
//! A fixed-step bisection over the quality interval. Each step encodes at the
//! midpoint; a fit moves the lower bound up (look for more quality), a miss
//! moves the upper bound down. The loop always runs the full step budget, so
//! worst-case cost per image is `max_iterations` encodes regardless of how the
//! encoder's size curve behaves.
//!
//! Encoders are assumed monotone (more quality, never fewer bytes). This is
//! not checked; on a non-monotone encoder the search still returns the best
//! fitting probe it saw, never a later worse one.
//!
//! When no probe fits, one extra encode runs at the final lower bound and is
//! returned as the smallest attainable output with `budget_met = false`. That
//! output may itself exceed the budget.

use crate::imaging::{Quality, QualityRange};
use tracing::debug;

/// What the search settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome<A> {
    pub quality: Quality,
    /// Byte size of `artifact`.
    pub size: usize,
    pub artifact: A,
    /// `true` when `artifact` came from a probe that fit the budget.
    pub budget_met: bool,
    /// Total encoder calls, including the fallback encode.
    pub encodes: u32,
}

/// Bisect `range` for the best quality whose encoded size is `<= max_bytes`.
///
/// `encode` is called with a quality and returns the artifact plus its byte
/// size. Encoder errors abort the search and are returned unchanged.
pub fn find_best_quality<A, E, F>(
    mut encode: F,
    range: QualityRange,
    max_bytes: u64,
    max_iterations: u32,
) -> Result<SearchOutcome<A>, E>
where
    F: FnMut(Quality) -> Result<(A, usize), E>,
{
    let mut lo = range.min.value();
    let mut hi = range.max.value();
    let mut best: Option<(Quality, usize, A)> = None;
    let mut encodes = 0;

    for step in 0..max_iterations {
        let mid = Quality::new((lo + hi) / 2.0);
        let (artifact, size) = encode(mid)?;
        encodes += 1;

        let fits = size as u64 <= max_bytes;
        debug!(
            step,
            quality = mid.value(),
            size,
            max_bytes,
            fits,
            "quality probe"
        );

        if fits {
            best = Some((mid, size, artifact));
            lo = mid.value();
        } else {
            hi = mid.value();
        }
    }

    if let Some((quality, size, artifact)) = best {
        return Ok(SearchOutcome {
            quality,
            size,
            artifact,
            budget_met: true,
            encodes,
        });
    }

    let quality = Quality::new(lo);
    let (artifact, size) = encode(quality)?;
    encodes += 1;
    debug!(
        quality = quality.value(),
        size, max_bytes, "no probe fit; falling back to lower bound"
    );

    Ok(SearchOutcome {
        quality,
        size,
        artifact,
        budget_met: false,
        encodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::convert::Infallible;

    /// Encoder whose size is `round(scale * quality)` bytes. Artifact is the quality probed.
    fn linear_encoder(scale: f64) -> impl FnMut(Quality) -> Result<(f64, usize), Infallible> {
        move |q| Ok((q.value(), (scale * q.value()).round() as usize))
    }

    // =========================================================================
    // Convergence
    // =========================================================================

    #[test]
    fn converges_on_linear_encoder() {
        // size = round(200000 * q), budget 100 KiB → supremum q = 0.512
        let outcome =
            find_best_quality(linear_encoder(200_000.0), QualityRange::default(), 102_400, 10)
                .unwrap();

        assert!(outcome.budget_met);
        assert!(outcome.size <= 102_400);
        assert!(outcome.quality.value() <= 0.512);
        assert!((outcome.quality.value() - 0.512).abs() < 1.0 / 1024.0);
        assert!((outcome.quality.value() - 0.5117).abs() < 0.001);
        assert_eq!(outcome.encodes, 10);
    }

    #[test]
    fn artifact_matches_returned_quality() {
        let outcome =
            find_best_quality(linear_encoder(200_000.0), QualityRange::default(), 102_400, 10)
                .unwrap();
        assert_eq!(outcome.artifact, outcome.quality.value());
        assert_eq!(
            outcome.size,
            (200_000.0 * outcome.quality.value()).round() as usize
        );
    }

    #[test]
    fn generous_budget_keeps_narrowing_toward_upper() {
        // Everything fits; the search must still walk up to the top of the range.
        let outcome =
            find_best_quality(linear_encoder(1_000.0), QualityRange::default(), 1_000_000, 10)
                .unwrap();
        assert!(outcome.budget_met);
        assert_eq!(outcome.encodes, 10);
        assert!((outcome.quality.value() - (1.0 - 1.0 / 1024.0)).abs() < 1e-12);
    }

    #[test]
    fn respects_custom_range() {
        let outcome = find_best_quality(
            linear_encoder(200_000.0),
            QualityRange::new(0.6, 0.9),
            102_400,
            8,
        )
        .unwrap();
        // Nothing in [0.6, 0.9] fits, so the fallback lands on the range minimum.
        assert!(!outcome.budget_met);
        assert_eq!(outcome.quality.value(), 0.6);
    }

    // =========================================================================
    // Fallback
    // =========================================================================

    #[test]
    fn fallback_when_nothing_fits() {
        let mut calls = Vec::new();
        let outcome = find_best_quality(
            |q: Quality| -> Result<((), usize), Infallible> {
                calls.push(q.value());
                Ok(((), 500_000))
            },
            QualityRange::default(),
            102_400,
            10,
        )
        .unwrap();

        assert!(!outcome.budget_met);
        assert_eq!(outcome.quality, Quality::MIN);
        assert_eq!(outcome.size, 500_000);
        // Ten probes plus the final re-encode at the lower bound.
        assert_eq!(calls.len(), 11);
        assert_eq!(*calls.last().unwrap(), 0.0);
        assert_eq!(outcome.encodes, 11);
    }

    #[test]
    fn zero_iterations_encodes_once_at_lower_bound() {
        let outcome =
            find_best_quality(linear_encoder(10.0), QualityRange::new(0.25, 1.0), 1_000, 0)
                .unwrap();
        assert!(!outcome.budget_met);
        assert_eq!(outcome.quality.value(), 0.25);
        assert_eq!(outcome.encodes, 1);
    }

    #[test]
    fn keeps_best_fit_on_non_monotone_encoder() {
        // Fits only at the very first probe (0.5); every later probe misses.
        let outcome = find_best_quality(
            |q: Quality| -> Result<(f64, usize), Infallible> {
                let size = if q.value() == 0.5 { 10 } else { 10_000 };
                Ok((q.value(), size))
            },
            QualityRange::default(),
            100,
            6,
        )
        .unwrap();
        assert!(outcome.budget_met);
        assert_eq!(outcome.quality.value(), 0.5);
        assert_eq!(outcome.size, 10);
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn encoder_error_propagates() {
        let mut calls = 0;
        let result = find_best_quality(
            |_q: Quality| -> Result<((), usize), &'static str> {
                calls += 1;
                if calls == 3 { Err("boom") } else { Ok(((), 1)) }
            },
            QualityRange::default(),
            100,
            10,
        );
        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(calls, 3);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    proptest! {
        /// Property: the loop never probes more than `max_iterations` times.
        #[test]
        fn prop_probe_count_bounded(
            scale in 1.0f64..1_000_000.0,
            budget in 0u64..500_000,
            iterations in 0u32..20,
        ) {
            let mut probes = 0u32;
            let outcome = find_best_quality(
                |q: Quality| -> Result<((), usize), Infallible> {
                    probes += 1;
                    Ok(((), (scale * q.value()).round() as usize))
                },
                QualityRange::default(),
                budget,
                iterations,
            ).unwrap();

            let expected = if outcome.budget_met { iterations } else { iterations + 1 };
            prop_assert_eq!(probes, expected);
            prop_assert!(probes <= iterations + 1);
        }

        /// Property: a fit reported as met is really under budget, and the
        /// quality lies within the requested range.
        #[test]
        fn prop_met_means_under_budget(
            scale in 1.0f64..1_000_000.0,
            budget in 0u64..500_000,
            lo in 0.0f64..0.5,
            hi in 0.5f64..=1.0,
        ) {
            let range = QualityRange::new(lo, hi);
            let outcome = find_best_quality(linear_encoder(scale), range, budget, 10).unwrap();
            if outcome.budget_met {
                prop_assert!(outcome.size as u64 <= budget);
            } else {
                prop_assert_eq!(outcome.quality, range.min);
            }
            prop_assert!(range.contains(outcome.quality));
        }

        /// Property: on a strictly increasing encoder the answer is within one
        /// final step of the true supremum of fitting qualities.
        #[test]
        fn prop_monotone_supremum(
            budget in 1u64..1_000_000,
            iterations in 1u32..16,
        ) {
            let scale = 1_000_000.0;
            let outcome = find_best_quality(
                |q: Quality| -> Result<((), usize), Infallible> {
                    Ok(((), (scale * q.value()).ceil() as usize))
                },
                QualityRange::default(),
                budget,
                iterations,
            ).unwrap();

            let supremum = (budget as f64 / scale).min(1.0);
            let step = 1.0 / 2f64.powi(iterations as i32);
            if outcome.budget_met {
                prop_assert!(outcome.quality.value() <= supremum + 1e-12);
                prop_assert!(supremum - outcome.quality.value() <= step + 1e-12);
            } else {
                // No probe fit: the supremum sits below the first midpoint's reach.
                prop_assert!(supremum < step + 1e-12);
            }
        }
    }
}
