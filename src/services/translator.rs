use async_trait::async_trait;
use sqlx::SqliteConnection;
use thiserror::Error;

use crate::db::corpus::{self, Sentence, Translation};
use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("no translation for sentence {0}")]
    NotFound(i64),
    #[error("translator unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Source of sentence translations. Implementations receive the caller's
/// session so lookups never share a connection with another task.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        conn: &mut SqliteConnection,
        sentence: &Sentence,
    ) -> Result<Translation, TranslateError>;
}

/// Reads translations shipped with the course corpus.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorpusTranslator;

#[async_trait]
impl Translator for CorpusTranslator {
    async fn translate(
        &self,
        conn: &mut SqliteConnection,
        sentence: &Sentence,
    ) -> Result<Translation, TranslateError> {
        corpus::translation_for(conn, sentence.id)
            .await?
            .ok_or(TranslateError::NotFound(sentence.id))
    }
}
