use chrono::{DateTime, Utc};

use crate::db::{corpus, reviews, student, ReviewDb, StoreError};
use crate::text::{accept_all, WordPredicate};

/// Picks the next words to show: due reviews first, then new words under the
/// student's current ceiling.
#[derive(Clone)]
pub struct WordSelector {
    db: ReviewDb,
}

impl WordSelector {
    pub fn new(db: ReviewDb) -> Self {
        Self { db }
    }

    /// Returns at most `n` words. Every returned word satisfies `predicate`.
    /// Reads run inside one transaction so reviews and the ceiling come from
    /// the same snapshot.
    pub async fn select_words(
        &self,
        n: usize,
        predicate: &WordPredicate,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut tx = self.db.pool().begin().await?;

        let mut words = reviews::schedule_due(&mut *tx, predicate, n, now).await?;
        let due = words.len();

        if due < n {
            let ceiling = student::preferred_difficulty(&mut *tx).await?;
            let fresh = corpus::new_words(&mut *tx, predicate, n - due, ceiling).await?;
            words.extend(fresh);
        }

        tx.commit().await?;

        tracing::debug!(requested = n, due, fresh = words.len() - due, "words selected");
        Ok(words)
    }

    /// Selection with no exclusions at an explicit time.
    pub async fn select_words_at(
        &self,
        n: usize,
        due: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        self.select_words(n, &accept_all, due).await
    }
}
