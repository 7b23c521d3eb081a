use futures::TryStreamExt;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::StoreError;
use crate::text::{casefold, WordPredicate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tatoeba_id: Option<i64>,
    pub text: String,
    pub tokens: Vec<String>,
    pub frequency_class: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tatoeba_id: Option<i64>,
    pub text: String,
}

pub async fn frequency_class(
    conn: &mut SqliteConnection,
    word: &str,
) -> Result<Option<i64>, StoreError> {
    let class: Option<i64> =
        sqlx::query_scalar(r#"SELECT "frequency_class" FROM "word" WHERE "word" = ?"#)
            .bind(casefold(word))
            .fetch_optional(&mut *conn)
            .await?;
    Ok(class)
}

pub async fn max_frequency_class(conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let max: Option<i64> = sqlx::query_scalar(r#"SELECT MAX("frequency_class") FROM "word""#)
        .fetch_one(&mut *conn)
        .await?;
    Ok(max.unwrap_or(0))
}

/// Words never presented before, at or below `max_class`, accepted by the
/// predicate. Words closest to the ceiling come first.
pub async fn new_words(
    conn: &mut SqliteConnection,
    predicate: &WordPredicate,
    limit: usize,
    max_class: i64,
) -> Result<Vec<String>, StoreError> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut rows = sqlx::query_scalar::<_, String>(
        r#"
        SELECT w."word" FROM "word" w
        WHERE w."frequency_class" <= ?
          AND NOT EXISTS (SELECT 1 FROM "review" r WHERE r."word" = w."word")
        ORDER BY w."frequency_class" DESC, w."id" ASC
        "#,
    )
    .bind(max_class)
    .fetch(&mut *conn);

    let mut words = Vec::with_capacity(limit);
    while let Some(word) = rows.try_next().await? {
        if predicate(word.as_str()) {
            words.push(word);
            if words.len() >= limit {
                break;
            }
        }
    }
    Ok(words)
}

/// A sentence linked to `word`, preferring sentences whose frequency class is
/// closest to `difficulty`. Ties are broken randomly.
pub async fn pick_sentence(
    conn: &mut SqliteConnection,
    word: &str,
    difficulty: i64,
) -> Result<Option<Sentence>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT s."id", s."tatoeba_id", s."text", s."tokens", s."frequency_class"
        FROM "contains" c
        JOIN "sentence" s ON s."id" = c."sentence"
        WHERE c."word" = ?
        ORDER BY ABS(s."frequency_class" - ?) ASC, RANDOM()
        LIMIT 1
        "#,
    )
    .bind(casefold(word))
    .bind(difficulty)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|row| map_sentence_row(&row)).transpose()
}

pub async fn translation_for(
    conn: &mut SqliteConnection,
    sentence_id: i64,
) -> Result<Option<Translation>, StoreError> {
    let row = sqlx::query(
        r#"SELECT "tatoeba_id", "text" FROM "translation" WHERE "sentence" = ? ORDER BY RANDOM() LIMIT 1"#,
    )
    .bind(sentence_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(Translation {
            tatoeba_id: row.try_get("tatoeba_id")?,
            text: row.try_get("text")?,
        })),
        None => Ok(None),
    }
}

pub async fn insert_word(
    conn: &mut SqliteConnection,
    word: &str,
    frequency_class: i64,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"INSERT INTO "word" ("word", "frequency_class") VALUES (?, ?)
        ON CONFLICT ("word") DO UPDATE SET "frequency_class" = excluded."frequency_class""#,
    )
    .bind(casefold(word))
    .bind(frequency_class.max(0))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Stores a tokenized sentence and links it to every word-like token in it.
pub async fn insert_sentence(
    conn: &mut SqliteConnection,
    tatoeba_id: Option<i64>,
    tokens: &[&str],
    frequency_class: i64,
) -> Result<i64, StoreError> {
    let text = tokens.concat();
    let encoded = serde_json::to_string(tokens)?;

    let id: i64 = sqlx::query_scalar(
        r#"INSERT INTO "sentence" ("tatoeba_id", "text", "tokens", "frequency_class")
        VALUES (?, ?, ?, ?) RETURNING "id""#,
    )
    .bind(tatoeba_id)
    .bind(&text)
    .bind(&encoded)
    .bind(frequency_class)
    .fetch_one(&mut *conn)
    .await?;

    for token in tokens.iter().filter(|t| t.chars().any(char::is_alphanumeric)) {
        link_word(conn, id, token).await?;
    }
    Ok(id)
}

pub async fn link_word(
    conn: &mut SqliteConnection,
    sentence_id: i64,
    word: &str,
) -> Result<(), StoreError> {
    sqlx::query(r#"INSERT OR IGNORE INTO "contains" ("sentence", "word") VALUES (?, ?)"#)
        .bind(sentence_id)
        .bind(casefold(word))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_translation(
    conn: &mut SqliteConnection,
    sentence_id: i64,
    tatoeba_id: Option<i64>,
    text: &str,
) -> Result<(), StoreError> {
    sqlx::query(r#"INSERT INTO "translation" ("sentence", "tatoeba_id", "text") VALUES (?, ?, ?)"#)
        .bind(sentence_id)
        .bind(tatoeba_id)
        .bind(text)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn map_sentence_row(row: &SqliteRow) -> Result<Sentence, StoreError> {
    let encoded: String = row.try_get("tokens")?;
    Ok(Sentence {
        id: row.try_get("id")?,
        tatoeba_id: row.try_get("tatoeba_id")?,
        text: row.try_get("text")?,
        tokens: serde_json::from_str(&encoded)?,
        frequency_class: row.try_get("frequency_class")?,
    })
}
