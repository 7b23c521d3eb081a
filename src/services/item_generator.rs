use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::db::corpus::{self, Translation};
use crate::db::{student, ReviewDb, StoreError};
use crate::services::translator::{TranslateError, Translator};
use crate::text::casefold;

/// Sentence with the target word split out. `parts[1]` is the blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClozeSentence {
    pub id: i64,
    pub parts: [String; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tatoeba_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub sentence: ClozeSentence,
    pub translation: Translation,
}

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("no sentence for word {0:?}")]
    NoSentence(String),
    #[error("word {word:?} does not occur in sentence {sentence_id}")]
    ConsistencyViolation { word: String, sentence_id: i64 },
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Splits `tokens` around one occurrence of `word` into prefix, token and
/// suffix. When the word occurs more than once the occurrence is chosen
/// uniformly at random. Returns `None` if no token matches.
pub fn split_at_word<S, R>(tokens: &[S], word: &str, rng: &mut R) -> Option<[String; 3]>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let target = casefold(word);
    let indices: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| casefold(token.as_ref()) == target)
        .map(|(i, _)| i)
        .collect();

    if indices.is_empty() {
        return None;
    }

    let index = indices[rng.random_range(0..indices.len())];
    let join = |part: &[S]| part.iter().map(|t| t.as_ref()).collect::<String>();
    Some([
        join(&tokens[..index]),
        tokens[index].as_ref().to_string(),
        join(&tokens[index + 1..]),
    ])
}

fn cloze_parts(tokens: &[String], word: &str) -> Option<[String; 3]> {
    split_at_word(tokens, word, &mut rand::rng())
}

/// Builds cloze items for a batch of words, one task per word.
///
/// Tasks run concurrently up to the configured limit. Each task takes its own
/// pooled connection and returns it when it finishes. A word that cannot be
/// turned into an item is dropped from the result; the rest of the batch is
/// unaffected.
#[derive(Clone)]
pub struct ItemGenerator {
    db: ReviewDb,
    translator: Arc<dyn Translator>,
    permits: Arc<Semaphore>,
    violations: Arc<AtomicU64>,
}

impl ItemGenerator {
    pub fn new(db: ReviewDb, translator: Arc<dyn Translator>, max_concurrency: usize) -> Self {
        Self {
            db,
            translator,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            violations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Words whose chosen sentence did not contain them, since startup.
    pub fn consistency_violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    pub async fn generate_item(&self, word: &str) -> Result<Item, ItemError> {
        let mut session = self.db.session().await?;

        let difficulty = student::preferred_difficulty(&mut *session).await?;
        let sentence = corpus::pick_sentence(&mut *session, word, difficulty)
            .await?
            .ok_or_else(|| ItemError::NoSentence(word.to_string()))?;

        let parts = cloze_parts(&sentence.tokens, word).ok_or_else(|| {
            ItemError::ConsistencyViolation {
                word: word.to_string(),
                sentence_id: sentence.id,
            }
        })?;

        let translation = self.translator.translate(&mut *session, &sentence).await?;

        Ok(Item {
            sentence: ClozeSentence {
                id: sentence.id,
                parts,
                tatoeba_id: sentence.tatoeba_id,
            },
            translation,
        })
    }

    /// Generates items for `words`. Output order is unspecified.
    pub async fn generate_items(&self, words: Vec<String>) -> Vec<Item> {
        if words.is_empty() {
            return Vec::new();
        }

        let (sender, mut receiver) = mpsc::channel(words.len());
        let driver = self.generate_items_into(words, sender);

        let mut items = Vec::new();
        while let Some(item) = receiver.recv().await {
            items.push(item);
        }
        if let Err(err) = driver.await {
            tracing::error!(error = %err, "item driver failed");
        }
        items
    }

    /// Starts generation in the background and returns immediately. Each item
    /// is sent to `sender` as soon as its task finishes; the channel closes
    /// once every task is done. The returned handle completes at the same
    /// point, so drain the receiver before awaiting it.
    pub fn generate_items_into(
        &self,
        words: Vec<String>,
        sender: mpsc::Sender<Item>,
    ) -> JoinHandle<()> {
        let generator = self.clone();
        tokio::spawn(async move { generator.drive(words, sender).await })
    }

    async fn drive(&self, words: Vec<String>, sender: mpsc::Sender<Item>) {
        let mut tasks = JoinSet::new();

        for word in words {
            let generator = self.clone();
            let sender = sender.clone();
            tasks.spawn(async move {
                let Ok(_permit) = Arc::clone(&generator.permits).acquire_owned().await else {
                    return;
                };
                match generator.generate_item(&word).await {
                    Ok(item) => {
                        if sender.send(item).await.is_err() {
                            tracing::debug!(word = %word, "item receiver dropped");
                        }
                    }
                    Err(err) => generator.report(&word, &err),
                }
            });
        }
        drop(sender);

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "item task failed");
            }
        }
    }

    fn report(&self, word: &str, err: &ItemError) {
        match err {
            ItemError::ConsistencyViolation { sentence_id, .. } => {
                self.violations.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(word = %word, sentence_id, "word missing from its sentence, item dropped");
            }
            ItemError::NoSentence(_) | ItemError::Translate(TranslateError::NotFound(_)) => {
                tracing::debug!(word = %word, error = %err, "item dropped");
            }
            _ => {
                tracing::warn!(word = %word, error = %err, "item generation failed");
            }
        }
    }
}
