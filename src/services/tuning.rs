use serde::{Deserialize, Serialize};

use crate::db::student::Student;

const DEFAULT_WINDOW: i64 = 10;
const DEFAULT_RAISE_ABOVE: f64 = 0.8;
const DEFAULT_LOWER_BELOW: f64 = 0.5;
const DEFAULT_STEP: i64 = 1;

/// Decides where the student's admission ceiling goes after an outcome.
///
/// Returning `Some(class)` closes the current accuracy window: the ceiling is
/// set to `class` (clamped to `0..=max_class`) and the window counters
/// restart. Lifetime totals are never touched. Returning `None` keeps
/// accumulating evidence. A policy must return `None` for a student with no
/// answers in the current window, so repeated tuning without new outcomes
/// never moves the ceiling.
pub trait TuningPolicy: Send + Sync {
    fn tune(&self, student: &Student, max_class: i64) -> Option<i64>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyWindow {
    pub window: i64,
    pub raise_above: f64,
    pub lower_below: f64,
    pub step: i64,
}

impl Default for AccuracyWindow {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            raise_above: DEFAULT_RAISE_ABOVE,
            lower_below: DEFAULT_LOWER_BELOW,
            step: DEFAULT_STEP,
        }
    }
}

impl AccuracyWindow {
    pub fn accuracy(student: &Student) -> Option<f64> {
        let answered = student.window_answered();
        if answered <= 0 {
            return None;
        }
        Some(student.window_correct as f64 / answered as f64)
    }
}

impl TuningPolicy for AccuracyWindow {
    fn tune(&self, student: &Student, max_class: i64) -> Option<i64> {
        if student.window_answered() < self.window.max(1) {
            return None;
        }
        let accuracy = Self::accuracy(student)?;
        let step = self.step.max(0);
        let current = student.frequency_class;

        let next = if accuracy > self.raise_above {
            current + step
        } else if accuracy < self.lower_below {
            current - step
        } else {
            current
        };
        Some(next.clamp(0, max_class.max(0)))
    }
}

/// Never moves the ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDifficulty;

impl TuningPolicy for FixedDifficulty {
    fn tune(&self, _student: &Student, _max_class: i64) -> Option<i64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(frequency_class: i64, correct: i64, incorrect: i64) -> Student {
        Student {
            frequency_class,
            correct: correct + 100,
            incorrect: incorrect + 100,
            window_correct: correct,
            window_incorrect: incorrect,
        }
    }

    #[test]
    fn test_holds_until_window_is_full() {
        let policy = AccuracyWindow::default();
        assert_eq!(policy.tune(&student(2, 9, 0), 10), None);
        assert_eq!(policy.tune(&student(2, 0, 0), 10), None);
    }

    #[test]
    fn test_raises_on_high_accuracy() {
        let policy = AccuracyWindow::default();
        assert_eq!(policy.tune(&student(2, 9, 1), 10), Some(3));
    }

    #[test]
    fn test_lowers_on_low_accuracy() {
        let policy = AccuracyWindow::default();
        assert_eq!(policy.tune(&student(2, 3, 7), 10), Some(1));
    }

    #[test]
    fn test_adjustment_is_bounded() {
        let policy = AccuracyWindow::default();
        assert_eq!(policy.tune(&student(0, 0, 10), 10), Some(0));
        assert_eq!(policy.tune(&student(10, 10, 0), 10), Some(10));
    }

    #[test]
    fn test_middling_accuracy_restarts_window_in_place() {
        let policy = AccuracyWindow::default();
        assert_eq!(policy.tune(&student(4, 6, 4), 10), Some(4));
    }

    #[test]
    fn test_lifetime_totals_are_not_window_evidence() {
        let policy = AccuracyWindow::default();
        let veteran = Student {
            frequency_class: 3,
            correct: 500,
            incorrect: 20,
            window_correct: 1,
            window_incorrect: 0,
        };
        assert_eq!(policy.tune(&veteran, 10), None);
    }

    #[test]
    fn test_fixed_difficulty_never_tunes() {
        assert_eq!(FixedDifficulty.tune(&student(3, 100, 0), 10), None);
    }
}
