use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::db::student::Student;
use crate::db::{ReviewDb, StoreError};
use crate::services::difficulty::{DifficultyTuner, Outcome};
use crate::services::intervals::{FsrsPolicy, IntervalPolicy};
use crate::services::item_generator::{Item, ItemGenerator};
use crate::services::translator::{CorpusTranslator, Translator};
use crate::services::tuning::TuningPolicy;
use crate::services::word_selector::WordSelector;
use crate::text::WordPredicate;

/// Read and write flows over one review database.
#[derive(Clone)]
pub struct FlashcardService {
    selector: WordSelector,
    tuner: DifficultyTuner,
    generator: ItemGenerator,
}

impl FlashcardService {
    /// Default policies from configuration and the corpus translator.
    pub fn new(db: ReviewDb, config: &EngineConfig) -> Self {
        Self::with_policies(
            db,
            Arc::new(CorpusTranslator),
            Arc::new(FsrsPolicy::with_retention(config.desired_retention)),
            Arc::new(config.tuning.clone()),
            config.max_concurrency,
        )
    }

    pub fn with_policies(
        db: ReviewDb,
        translator: Arc<dyn Translator>,
        intervals: Arc<dyn IntervalPolicy>,
        tuning: Arc<dyn TuningPolicy>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            selector: WordSelector::new(db.clone()),
            tuner: DifficultyTuner::new(db.clone(), intervals, tuning),
            generator: ItemGenerator::new(db, translator, max_concurrency),
        }
    }

    pub fn selector(&self) -> &WordSelector {
        &self.selector
    }

    pub fn tuner(&self) -> &DifficultyTuner {
        &self.tuner
    }

    pub fn generator(&self) -> &ItemGenerator {
        &self.generator
    }

    /// Up to `n` items for words accepted by `predicate`. May return fewer.
    pub async fn get(
        &self,
        n: usize,
        predicate: &WordPredicate,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>, StoreError> {
        let words = self.selector.select_words(n, predicate, now).await?;
        let items = self.generator.generate_items(words).await;
        tracing::debug!(requested = n, generated = items.len(), "flashcards generated");
        Ok(items)
    }

    pub async fn record(&self, outcomes: &[Outcome], at: DateTime<Utc>) -> Result<(), StoreError> {
        self.tuner.record_outcomes(outcomes, at).await?;
        Ok(())
    }

    /// Current ceiling and counters.
    pub async fn difficulty(&self) -> Result<Student, StoreError> {
        self.tuner.student().await
    }
}
