use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::db::reviews::{self, Review};
use crate::db::student::{self, Student};
use crate::db::{corpus, ReviewDb, StoreError};
use crate::services::intervals::IntervalPolicy;
use crate::services::tuning::TuningPolicy;

/// One answered flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub word: String,
    pub correct: bool,
}

impl Outcome {
    pub fn new(word: impl Into<String>, correct: bool) -> Self {
        Self {
            word: word.into(),
            correct,
        }
    }
}

/// Write path for review outcomes. The only code that mutates the student row.
#[derive(Clone)]
pub struct DifficultyTuner {
    db: ReviewDb,
    intervals: Arc<dyn IntervalPolicy>,
    tuning: Arc<dyn TuningPolicy>,
}

impl DifficultyTuner {
    pub fn new(
        db: ReviewDb,
        intervals: Arc<dyn IntervalPolicy>,
        tuning: Arc<dyn TuningPolicy>,
    ) -> Self {
        Self {
            db,
            intervals,
            tuning,
        }
    }

    /// Records a single outcome in its own write transaction.
    pub async fn record_outcome(
        &self,
        word: &str,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<Review, StoreError> {
        let mut tx = self.db.begin_write().await?;
        let review = self.apply(tx.conn(), word, correct, at).await?;
        tx.commit().await?;
        Ok(review)
    }

    /// Records a batch of outcomes. Either all of them are stored or none are.
    pub async fn record_outcomes(
        &self,
        outcomes: &[Outcome],
        at: DateTime<Utc>,
    ) -> Result<Vec<Review>, StoreError> {
        if outcomes.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.db.begin_write().await?;
        let mut updated = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            updated.push(self.apply(tx.conn(), &outcome.word, outcome.correct, at).await?);
        }
        tx.commit().await?;

        tracing::info!(count = updated.len(), "outcomes recorded");
        Ok(updated)
    }

    pub async fn student(&self) -> Result<Student, StoreError> {
        let mut session = self.db.session().await?;
        student::load(&mut *session).await
    }

    async fn apply(
        &self,
        conn: &mut SqliteConnection,
        word: &str,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<Review, StoreError> {
        let current = student::load(conn).await?;
        let class = corpus::frequency_class(conn, word).await?.unwrap_or(0);
        let is_new = !reviews::is_known(conn, word).await?;

        // Only first sightings at or above the ceiling count as evidence.
        if is_new && class >= current.frequency_class {
            student::increment_stats(conn, correct).await?;
        }

        let review = reviews::update_review(conn, word, correct, at, self.intervals.as_ref()).await?;
        self.post_tune(conn).await?;
        Ok(review)
    }

    async fn post_tune(&self, conn: &mut SqliteConnection) -> Result<(), StoreError> {
        let current = student::load(conn).await?;
        let max_class = corpus::max_frequency_class(conn).await?;

        let Some(next) = self.tuning.tune(&current, max_class) else {
            return Ok(());
        };
        let next = next.clamp(0, max_class.max(0));
        student::reset_window(conn).await?;

        if next != current.frequency_class {
            student::set_frequency_class(conn, next).await?;
            tracing::info!(
                from = current.frequency_class,
                to = next,
                window_correct = current.window_correct,
                window_incorrect = current.window_incorrect,
                "difficulty adjusted"
            );
        }
        Ok(())
    }
}
