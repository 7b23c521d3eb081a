use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::db::reviews::ReviewState;

const DECAY: f64 = -0.5;
const FACTOR: f64 = 19.0 / 81.0;
const AGAIN: i32 = 1;
const GOOD: i32 = 3;
const DEFAULT_DESIRED_RETENTION: f64 = 0.9;
const DEFAULT_RELEARN_STEP_MINUTES: i64 = 10;

/// Result of scheduling one review.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduled {
    pub state: ReviewState,
    pub interval: Duration,
}

/// Interval curve consumed by the review store. Given the previous state, the
/// days since the last review and the outcome, returns the next state and how
/// long until the word is due again.
pub trait IntervalPolicy: Send + Sync {
    fn next(&self, state: &ReviewState, elapsed_days: f64, correct: bool) -> Scheduled;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsrsParams {
    pub w: [f64; 17],
}

impl Default for FsrsParams {
    fn default() -> Self {
        Self {
            w: [
                0.4, 0.6, 2.4, 5.8, // w0-w3: initial stability
                4.93, 0.94, 0.86, 0.01, 1.49, // w4-w8
                0.14, 0.94, 2.18, 0.05, 0.34, // w9-w13
                1.26, 0.29, 2.61, // w14-w16
            ],
        }
    }
}

/// Stability/difficulty model. Wrong answers come back after a short
/// relearning step instead of a full interval.
#[derive(Debug, Clone)]
pub struct FsrsPolicy {
    pub params: FsrsParams,
    pub desired_retention: f64,
    pub relearn_step: Duration,
}

impl Default for FsrsPolicy {
    fn default() -> Self {
        Self {
            params: FsrsParams::default(),
            desired_retention: DEFAULT_DESIRED_RETENTION,
            relearn_step: Duration::minutes(DEFAULT_RELEARN_STEP_MINUTES),
        }
    }
}

impl FsrsPolicy {
    pub fn with_retention(desired_retention: f64) -> Self {
        Self {
            desired_retention,
            ..Self::default()
        }
    }
}

impl IntervalPolicy for FsrsPolicy {
    fn next(&self, state: &ReviewState, elapsed_days: f64, correct: bool) -> Scheduled {
        let w = &self.params.w;
        let rating = if correct { GOOD } else { AGAIN };

        let next_state = if state.is_new() {
            ReviewState {
                stability: initial_stability(w, rating),
                difficulty: initial_difficulty(w, rating),
                reps: 1,
                lapses: if correct { 0 } else { 1 },
            }
        } else {
            let r = retrievability(state.stability, elapsed_days);
            let difficulty = next_difficulty(w, state.difficulty, rating);
            if correct {
                ReviewState {
                    stability: next_recall_stability(w, state.difficulty, state.stability, r),
                    difficulty,
                    reps: state.reps + 1,
                    lapses: state.lapses,
                }
            } else {
                ReviewState {
                    stability: next_forget_stability(w, state.difficulty, state.stability, r),
                    difficulty,
                    reps: state.reps + 1,
                    lapses: state.lapses + 1,
                }
            }
        };

        let interval = if correct {
            days(next_interval(next_state.stability, self.desired_retention))
        } else {
            self.relearn_step
        };

        Scheduled {
            state: next_state,
            interval,
        }
    }
}

pub fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    (1.0 + FACTOR * elapsed_days.max(0.0) / stability).powf(DECAY)
}

fn days(value: f64) -> Duration {
    Duration::seconds((value * 86_400.0).round() as i64)
}

fn initial_stability(w: &[f64; 17], rating: i32) -> f64 {
    w[(rating - 1) as usize].max(0.1)
}

fn initial_difficulty(w: &[f64; 17], rating: i32) -> f64 {
    let d = w[4] - (rating - 3) as f64 * w[5];
    d.clamp(1.0, 10.0) / 10.0
}

fn next_difficulty(w: &[f64; 17], d: f64, rating: i32) -> f64 {
    let delta = -(rating - 3) as f64;
    let d_new = d * 10.0 + w[6] * delta;
    let d_mean = w[7] * (w[4] - 3.0 * w[5]) + (1.0 - w[7]) * d_new;
    d_mean.clamp(1.0, 10.0) / 10.0
}

fn next_recall_stability(w: &[f64; 17], d: f64, s: f64, r: f64) -> f64 {
    let new_s = s
        * (1.0 + w[8].exp() * (11.0 - d * 10.0) * s.powf(-w[9]) * ((1.0 - r) * w[10]).exp_m1());
    new_s.max(0.1)
}

fn next_forget_stability(w: &[f64; 17], d: f64, s: f64, r: f64) -> f64 {
    let new_s = w[11]
        * (d * 10.0).powf(-w[12])
        * ((s + 1.0).powf(w[13]) - 1.0)
        * ((1.0 - r) * w[14]).exp();
    new_s.clamp(0.1, s.max(0.1))
}

fn next_interval(stability: f64, desired_retention: f64) -> f64 {
    let retention = desired_retention.clamp(0.0001, 0.9999);
    let interval = stability / FACTOR * (retention.powf(1.0 / DECAY) - 1.0);
    interval.clamp(1.0, 36500.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_word_correct_waits_at_least_a_day() {
        let policy = FsrsPolicy::default();
        let scheduled = policy.next(&ReviewState::default(), 0.0, true);
        assert!(scheduled.interval >= Duration::days(1));
        assert_eq!(scheduled.state.reps, 1);
        assert_eq!(scheduled.state.lapses, 0);
    }

    #[test]
    fn test_wrong_answer_relearns_soon() {
        let policy = FsrsPolicy::default();
        let scheduled = policy.next(&ReviewState::default(), 0.0, false);
        assert_eq!(scheduled.interval, Duration::minutes(DEFAULT_RELEARN_STEP_MINUTES));
        assert_eq!(scheduled.state.lapses, 1);
    }

    #[test]
    fn test_successive_correct_answers_grow_interval() {
        let policy = FsrsPolicy::default();
        let first = policy.next(&ReviewState::default(), 0.0, true);
        let elapsed = first.interval.num_seconds() as f64 / 86_400.0;
        let second = policy.next(&first.state, elapsed, true);
        assert!(second.interval > first.interval);
        assert!(second.state.stability > first.state.stability);
    }

    #[test]
    fn test_lapse_lowers_stability() {
        let policy = FsrsPolicy::default();
        let learned = ReviewState {
            stability: 20.0,
            difficulty: 0.4,
            reps: 5,
            lapses: 0,
        };
        let scheduled = policy.next(&learned, 20.0, false);
        assert!(scheduled.state.stability < learned.stability);
        assert_eq!(scheduled.state.lapses, 1);
    }

    #[test]
    fn test_retrievability_decay() {
        let r_0 = retrievability(10.0, 0.0);
        let r_5 = retrievability(10.0, 5.0);
        assert!((r_0 - 1.0).abs() < 0.001);
        assert!(r_5 < r_0);
        assert_eq!(retrievability(0.0, 3.0), 0.0);
    }
}
