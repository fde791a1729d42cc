//! SM-2 (SuperMemo 2) spaced repetition scheduler.
//!
//! Pure functions only: given a card's current scheduling state, a review
//! quality and the review time, compute the card's next state.
//! - Quality 0-2 is a lapse: repetitions reset to 0, interval becomes 1 day
//! - Quality 3-5 is a success: intervals go 1 day, 6 days, then grow by the ease factor
//! - The ease factor is adjusted after every review and never drops below 1.3

use super::{CardSchedulingState, MIN_EASE_FACTOR, Quality};
use chrono::{DateTime, Duration, Utc};

/// Interval used for growth when a stored interval is zero on a mature card.
const FALLBACK_PRIOR_INTERVAL: u32 = 6;

/// Calculates the state a card moves to after a review of the given quality at `now`.
///
/// Total over its inputs: quality is clamped into 0-5 and there is no failure path.
pub fn compute_next_state(
    state: &CardSchedulingState,
    quality: impl Into<Quality>,
    now: DateTime<Utc>,
) -> CardSchedulingState {
    let quality = quality.into();

    let (repetitions, interval_days) = if quality.is_lapse() {
        (0, 1)
    } else {
        let repetitions = state.repetitions.saturating_add(1);
        let interval = match repetitions {
            1 => 1,
            2 => 6,
            _ => {
                let prior = if state.interval_days > 0 {
                    state.interval_days
                } else {
                    FALLBACK_PRIOR_INTERVAL
                };
                grow_interval(prior, state.ease_factor)
            }
        };
        (repetitions, interval)
    };

    let ease_factor = round_ease(next_ease_factor(state.ease_factor, quality));

    tracing::debug!(
        quality = quality.value(),
        repetitions,
        interval_days,
        ease_factor,
        "computed next schedule"
    );

    CardSchedulingState {
        ease_factor,
        repetitions,
        interval_days,
        due_date: Some(
            now.checked_add_signed(Duration::days(interval_days as i64))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        ),
        last_reviewed: Some(now),
    }
}

/// Same as [`compute_next_state`] with the current wall-clock time.
pub fn compute_next_state_now(
    state: &CardSchedulingState,
    quality: impl Into<Quality>,
) -> CardSchedulingState {
    compute_next_state(state, quality, Utc::now())
}

/// Intervals each quality 0..=5 would produce for this state, worst grade first.
pub fn preview_intervals(state: &CardSchedulingState) -> [u32; 6] {
    let now = Utc::now();
    let mut intervals = [0; 6];
    for (slot, quality) in intervals.iter_mut().zip(Quality::all()) {
        *slot = compute_next_state(state, quality, now).interval_days;
    }
    intervals
}

// EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), floored at 1.3
fn next_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    let miss = 5.0 - quality.value() as f64;
    (ease_factor + 0.1 - miss * (0.08 + miss * 0.02)).max(MIN_EASE_FACTOR)
}

fn round_ease(ease_factor: f64) -> f64 {
    (ease_factor * 10_000.0).round() / 10_000.0
}

fn grow_interval(prior: u32, ease_factor: f64) -> u32 {
    let grown = (prior as f64 * ease_factor).round_ties_even();
    if grown >= u32::MAX as f64 {
        u32::MAX
    } else {
        grown as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 9, 30, 0).unwrap()
    }

    fn state(ease_factor: f64, repetitions: u32, interval_days: u32) -> CardSchedulingState {
        CardSchedulingState {
            ease_factor,
            repetitions,
            interval_days,
            ..Default::default()
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_first_review() {
        let next = compute_next_state(&CardSchedulingState::default(), 5, now());
        assert_eq!(next.repetitions, 1);
        assert_eq!(next.interval_days, 1);
        assert_close(next.ease_factor, 2.6);
        assert_eq!(next.last_reviewed, Some(now()));
        assert_eq!(next.due_date, Some(now() + Duration::days(1)));
    }

    #[test]
    fn test_review_sequence_with_lapse() {
        let first = compute_next_state(&CardSchedulingState::default(), 5, now());
        let second = compute_next_state(&first, 5, now());
        assert_eq!(second.repetitions, 2);
        assert_eq!(second.interval_days, 6);
        assert_close(second.ease_factor, 2.7);

        let lapse = compute_next_state(&second, 2, now());
        assert_eq!(lapse.repetitions, 0);
        assert_eq!(lapse.interval_days, 1);
        assert_close(lapse.ease_factor, 2.38);
    }

    #[test]
    fn test_perfect_streak_grows_by_prior_ease() {
        let mut current = CardSchedulingState::default();
        let mut intervals = Vec::new();
        let mut eases = Vec::new();
        for _ in 0..5 {
            current = compute_next_state(&current, 5, now());
            intervals.push(current.interval_days);
            eases.push(current.ease_factor);
        }
        // 6 * 2.7 = 16.2, 16 * 2.8 = 44.8, 45 * 2.9 = 130.5 -> 130
        assert_eq!(intervals, vec![1, 6, 16, 45, 130]);
        assert!(eases.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_lapse_resets_regardless_of_prior_state() {
        for quality in 0..3 {
            for (ef, reps, interval) in [(2.5, 0, 0), (1.3, 7, 300), (3.1, 2, 6)] {
                let next = compute_next_state(&state(ef, reps, interval), quality, now());
                assert_eq!(next.repetitions, 0);
                assert_eq!(next.interval_days, 1);
            }
        }
    }

    #[test]
    fn test_ease_factor_floor() {
        let mut ef = 1.3;
        while ef < 4.0 {
            for quality in Quality::all() {
                let next = compute_next_state(&state(ef, 3, 10), quality, now());
                assert!(next.ease_factor >= MIN_EASE_FACTOR);
            }
            ef += 0.05;
        }

        let next = compute_next_state(&state(1.3, 1, 1), 0, now());
        assert_close(next.ease_factor, 1.3);
    }

    #[test]
    fn test_ease_adjustment_per_quality() {
        let expected = [1.7, 1.96, 2.18, 2.36, 2.5, 2.6];
        for (quality, want) in Quality::all().zip(expected) {
            let next = compute_next_state(&CardSchedulingState::default(), quality, now());
            assert_close(next.ease_factor, want);
        }
    }

    #[test]
    fn test_quality_clamping_is_idempotent() {
        let base = state(2.2, 4, 20);
        assert_eq!(
            compute_next_state(&base, -5, now()),
            compute_next_state(&base, 0, now())
        );
        assert_eq!(
            compute_next_state(&base, 99, now()),
            compute_next_state(&base, 5, now())
        );
    }

    #[test]
    fn test_zero_interval_falls_back_to_six() {
        let next = compute_next_state(&state(2.5, 3, 0), 4, now());
        assert_eq!(next.repetitions, 4);
        assert_eq!(next.interval_days, 15);
    }

    #[test]
    fn test_interval_rounds_half_to_even() {
        let next = compute_next_state(&state(2.5, 2, 5), 5, now());
        assert_eq!(next.interval_days, 12);

        let next = compute_next_state(&state(1.5, 3, 3), 5, now());
        assert_eq!(next.interval_days, 4);
    }

    #[test]
    fn test_ease_factor_stored_with_four_decimals() {
        let next = compute_next_state(&state(2.123456, 3, 10), 4, now());
        assert_close(next.ease_factor, 2.1235);
    }

    #[test]
    fn test_preview_intervals() {
        assert_eq!(preview_intervals(&CardSchedulingState::default()), [1, 1, 1, 1, 1, 1]);
        assert_eq!(preview_intervals(&state(2.5, 1, 1)), [1, 1, 1, 6, 6, 6]);
        assert_eq!(preview_intervals(&state(2.0, 4, 10)), [1, 1, 1, 20, 20, 20]);
    }

    #[test]
    fn test_wall_clock_variant_stamps_review_time() {
        let before = Utc::now();
        let next = compute_next_state_now(&CardSchedulingState::default(), 3);
        let reviewed = next.last_reviewed.unwrap();
        assert!(reviewed >= before);
        assert_eq!(next.due_date, Some(reviewed + Duration::days(1)));
    }
}
