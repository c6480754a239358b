//! Bracketing state for the bitrate search.

use serde::{Deserialize, Serialize};

use super::types::MIN_VIDEO_BITRATE_KBPS;

/// One completed trial encode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Video bitrate the trial ran at.
    pub bitrate_kbps: f64,
    /// Size of the file it produced.
    pub size_bytes: u64,
}

/// Decision produced by classifying one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The sample landed inside the tolerance window below the target.
    WithinTolerance,
    /// Run another trial at the given bitrate.
    Continue { next_bitrate_kbps: f64 },
    /// The next estimate fell below the bitrate floor; more trials
    /// cannot help.
    FloorReached,
}

/// The search bracket, threaded through the loop as a value.
///
/// `step` consumes the state and returns the updated one alongside the
/// decision, so each classification is a pure function of its inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchState {
    target_bytes: u64,
    tolerance_bytes: f64,
    min_bitrate_kbps: f64,
    max_bitrate_kbps: f64,
    best_under: Option<Sample>,
    best_over: Option<Sample>,
}

impl SearchState {
    /// Creates a fresh bracket over `[min_bitrate_kbps, max_bitrate_kbps]`.
    pub fn new(
        target_bytes: u64,
        tolerance_bytes: f64,
        min_bitrate_kbps: f64,
        max_bitrate_kbps: f64,
    ) -> Self {
        Self {
            target_bytes,
            tolerance_bytes,
            min_bitrate_kbps,
            max_bitrate_kbps,
            best_under: None,
            best_over: None,
        }
    }

    /// Largest under-target sample seen so far.
    pub fn best_under(&self) -> Option<Sample> {
        self.best_under
    }

    /// Smallest at-or-over-target sample seen so far.
    pub fn best_over(&self) -> Option<Sample> {
        self.best_over
    }

    /// Current `(min, max)` bitrate bounds.
    pub fn bounds(&self) -> (f64, f64) {
        (self.min_bitrate_kbps, self.max_bitrate_kbps)
    }

    /// Classifies a sample, narrows the bracket and picks the next move.
    pub fn step(mut self, sample: Sample) -> (Self, StepOutcome) {
        if sample.size_bytes < self.target_bytes {
            if self
                .best_under
                .is_none_or(|best| sample.size_bytes > best.size_bytes)
            {
                self.best_under = Some(sample);
            }
            let gap = (self.target_bytes - sample.size_bytes) as f64;
            if gap < self.tolerance_bytes {
                return (self, StepOutcome::WithinTolerance);
            }
            // Confirmed to stay under target, so the lower wall moves up.
            self.min_bitrate_kbps = sample.bitrate_kbps.trunc();
        } else {
            if self
                .best_over
                .is_none_or(|best| sample.size_bytes < best.size_bytes)
            {
                self.best_over = Some(sample);
            }
            self.max_bitrate_kbps = sample.bitrate_kbps;
        }

        let next = self.estimate_next(sample);
        if next < MIN_VIDEO_BITRATE_KBPS {
            return (self, StepOutcome::FloorReached);
        }
        (self, StepOutcome::Continue {
            next_bitrate_kbps: next,
        })
    }

    /// Estimates the next trial bitrate from the updated bracket.
    fn estimate_next(&self, current: Sample) -> f64 {
        let midpoint = (self.min_bitrate_kbps + self.max_bitrate_kbps) / 2.0;

        let mut next = match (self.best_under, self.best_over) {
            // Secant step: interpolate the bitrate that would land exactly
            // on the target between the two bracket samples.
            (Some(under), Some(over)) if over.size_bytes > under.size_bytes => {
                let span = (over.size_bytes - under.size_bytes) as f64;
                let offset = (self.target_bytes - under.size_bytes) as f64;
                under.bitrate_kbps + (over.bitrate_kbps - under.bitrate_kbps) * offset / span
            }
            (Some(_), Some(_)) => midpoint,
            // One-sided: scale assuming size is roughly linear in bitrate.
            _ if current.size_bytes > 0 => {
                current.bitrate_kbps * self.target_bytes as f64 / current.size_bytes as f64
            }
            _ => midpoint,
        };

        next = next.min(self.max_bitrate_kbps).max(self.min_bitrate_kbps);

        // Less than 1 kbps of movement means the search is stalling; jump
        // to the midpoint unless that is the value already computed.
        if (next - current.bitrate_kbps).abs() < 1.0 && midpoint != next {
            next = midpoint;
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn state(target_mb: u64, tolerance_percent: f64) -> SearchState {
        let target = target_mb * MB;
        SearchState::new(
            target,
            target as f64 * tolerance_percent / 100.0,
            100.0,
            2000.0,
        )
    }

    #[test]
    fn test_under_target_within_tolerance_succeeds() {
        let s = state(10, 2.0);
        let sample = Sample {
            bitrate_kbps: 1200.0,
            size_bytes: 10 * MB - 1024,
        };
        let (s, outcome) = s.step(sample);
        assert_eq!(outcome, StepOutcome::WithinTolerance);
        assert_eq!(s.best_under(), Some(sample));
    }

    #[test]
    fn test_under_target_outside_tolerance_raises_floor() {
        let s = state(10, 2.0);
        let (s, outcome) = s.step(Sample {
            bitrate_kbps: 800.7,
            size_bytes: 8 * MB,
        });
        assert!(matches!(outcome, StepOutcome::Continue { .. }));
        assert_eq!(s.bounds().0, 800.0);
    }

    #[test]
    fn test_over_target_lowers_ceiling() {
        let s = state(10, 2.0);
        let (s, outcome) = s.step(Sample {
            bitrate_kbps: 1500.0,
            size_bytes: 12 * MB,
        });
        assert!(matches!(outcome, StepOutcome::Continue { .. }));
        assert_eq!(s.bounds().1, 1500.0);
        assert!(s.best_under().is_none());
    }

    #[test]
    fn test_exact_target_size_counts_as_over() {
        let s = state(10, 2.0);
        let (s, _) = s.step(Sample {
            bitrate_kbps: 1200.0,
            size_bytes: 10 * MB,
        });
        assert_eq!(s.best_over().map(|b| b.size_bytes), Some(10 * MB));
        assert!(s.best_under().is_none());
    }

    #[test]
    fn test_keeps_closest_samples_on_both_sides() {
        let s = state(10, 0.1);
        let (s, _) = s.step(Sample {
            bitrate_kbps: 500.0,
            size_bytes: 6 * MB,
        });
        let (s, _) = s.step(Sample {
            bitrate_kbps: 700.0,
            size_bytes: 8 * MB,
        });
        let (s, _) = s.step(Sample {
            bitrate_kbps: 1500.0,
            size_bytes: 14 * MB,
        });
        let (s, _) = s.step(Sample {
            bitrate_kbps: 1200.0,
            size_bytes: 11 * MB,
        });
        // Closest from below and from above survive.
        assert_eq!(s.best_under().map(|b| b.size_bytes), Some(8 * MB));
        assert_eq!(s.best_over().map(|b| b.size_bytes), Some(11 * MB));
    }

    #[test]
    fn test_secant_interpolates_between_bracket_samples() {
        let s = state(10, 0.1);
        let (s, _) = s.step(Sample {
            bitrate_kbps: 500.0,
            size_bytes: 8 * MB,
        });
        let (_, outcome) = s.step(Sample {
            bitrate_kbps: 625.0,
            size_bytes: 12 * MB,
        });
        // Target sits halfway between the samples, so the estimate does too.
        match outcome {
            StepOutcome::Continue { next_bitrate_kbps } => {
                assert!((next_bitrate_kbps - 562.5).abs() < 1e-9);
            }
            other => panic!("expected Continue, got {:?}", other),
        }
    }

    #[test]
    fn test_one_sided_scales_proportionally() {
        let s = state(10, 0.1);
        let (_, outcome) = s.step(Sample {
            bitrate_kbps: 1000.0,
            size_bytes: 20 * MB,
        });
        // Twice the target size, so half the bitrate.
        match outcome {
            StepOutcome::Continue { next_bitrate_kbps } => {
                assert!((next_bitrate_kbps - 500.0).abs() < 1e-9);
            }
            other => panic!("expected Continue, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_size_falls_back_to_midpoint() {
        let s = state(10, 0.1);
        let (_, outcome) = s.step(Sample {
            bitrate_kbps: 1000.0,
            size_bytes: 0,
        });
        // Lower wall moved up to 1000, midpoint of [1000, 2000].
        match outcome {
            StepOutcome::Continue { next_bitrate_kbps } => {
                assert_eq!(next_bitrate_kbps, 1500.0);
            }
            other => panic!("expected Continue, got {:?}", other),
        }
    }

    #[test]
    fn test_estimate_clamps_into_bounds() {
        let s = state(10, 0.1);
        // A sample 20x the target suggests 50 kbps, below the lower wall.
        let (_, outcome) = s.step(Sample {
            bitrate_kbps: 1000.0,
            size_bytes: 200 * MB,
        });
        match outcome {
            StepOutcome::Continue { next_bitrate_kbps } => {
                assert_eq!(next_bitrate_kbps, 100.0);
            }
            other => panic!("expected Continue, got {:?}", other),
        }
    }

    #[test]
    fn test_stagnation_snaps_to_midpoint() {
        // An over sample barely above target: the proportional estimate
        // moves less than 1 kbps, so the search jumps to the midpoint.
        let s = SearchState::new(10 * MB, 1024.0, 100.0, 2000.0);
        let (_, outcome) = s.step(Sample {
            bitrate_kbps: 2000.0,
            size_bytes: 10 * MB + 2048,
        });
        match outcome {
            StepOutcome::Continue { next_bitrate_kbps } => {
                assert_eq!(next_bitrate_kbps, 1050.0);
            }
            other => panic!("expected Continue, got {:?}", other),
        }
    }

    #[test]
    fn test_stagnation_keeps_estimate_when_midpoint_matches() {
        // With the bracket collapsed to a point the midpoint equals the
        // stalled estimate; the rule must not fabricate a new value.
        let s = SearchState::new(10 * MB, 1024.0, 100.0, 100.0);
        let (_, outcome) = s.step(Sample {
            bitrate_kbps: 100.0,
            size_bytes: 100 * MB,
        });
        match outcome {
            StepOutcome::Continue { next_bitrate_kbps } => {
                assert_eq!(next_bitrate_kbps, 100.0);
            }
            other => panic!("expected Continue, got {:?}", other),
        }
    }

    #[test]
    fn test_floor_break_when_estimate_collapses() {
        // A crafted bracket below the global floor shows the floor break.
        let s = SearchState::new(10 * MB, 1024.0, 10.0, 40.0);
        let (_, outcome) = s.step(Sample {
            bitrate_kbps: 40.0,
            size_bytes: 100 * MB,
        });
        // Proportional estimate ~4 kbps clamps to 10, under the 100 floor.
        assert_eq!(outcome, StepOutcome::FloorReached);
    }

    #[test]
    fn test_bracket_narrows_monotonically() {
        let mut s = state(10, 0.1);
        let samples = [
            Sample { bitrate_kbps: 1232.0, size_bytes: 14 * MB },
            Sample { bitrate_kbps: 880.0, size_bytes: 9 * MB },
            Sample { bitrate_kbps: 1056.0, size_bytes: 11 * MB },
            Sample { bitrate_kbps: 968.0, size_bytes: 10 * MB - 200_000 },
        ];
        let mut last_bounds = s.bounds();
        for sample in samples {
            let (next, outcome) = s.step(sample);
            let bounds = next.bounds();
            assert!(bounds.0 >= last_bounds.0, "lower bound widened");
            assert!(bounds.1 <= last_bounds.1, "upper bound widened");
            if let (Some(under), Some(over)) = (next.best_under(), next.best_over()) {
                assert!(under.size_bytes < 10 * MB);
                assert!(over.size_bytes >= 10 * MB);
            }
            if let StepOutcome::Continue { next_bitrate_kbps } = outcome {
                assert!(next_bitrate_kbps >= bounds.0 && next_bitrate_kbps <= bounds.1);
            }
            last_bounds = bounds;
            s = next;
        }
    }
}
