use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::StoreError;
use crate::services::intervals::IntervalPolicy;
use crate::text::{casefold, WordPredicate};

/// Interval state carried between reviews of one word.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReviewState {
    pub stability: f64,
    pub difficulty: f64,
    pub reps: i64,
    pub lapses: i64,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            stability: 1.0,
            difficulty: 0.3,
            reps: 0,
            lapses: 0,
        }
    }
}

impl ReviewState {
    pub fn is_new(&self) -> bool {
        self.reps == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub word: String,
    pub first_seen: DateTime<Utc>,
    pub reviewed: DateTime<Utc>,
    pub due: DateTime<Utc>,
    pub state: ReviewState,
}

impl Review {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }
}

/// Words whose review is due at `now`, oldest due first, limited to those the
/// predicate accepts.
pub async fn schedule_due(
    conn: &mut SqliteConnection,
    predicate: &WordPredicate,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<String>, StoreError> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut rows = sqlx::query_scalar::<_, String>(
        r#"SELECT "word" FROM "review" WHERE "due" <= ? ORDER BY "due" ASC, "word" ASC"#,
    )
    .bind(now.timestamp())
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

pub async fn is_known(conn: &mut SqliteConnection, word: &str) -> Result<bool, StoreError> {
    let found: Option<i64> = sqlx::query_scalar(r#"SELECT 1 FROM "review" WHERE "word" = ?"#)
        .bind(casefold(word))
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

pub async fn get_review(
    conn: &mut SqliteConnection,
    word: &str,
) -> Result<Option<Review>, StoreError> {
    let row = sqlx::query(
        r#"SELECT "word", "first_seen", "reviewed", "due", "stability", "difficulty", "reps", "lapses"
        FROM "review" WHERE "word" = ?"#,
    )
    .bind(casefold(word))
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|row| map_review_row(&row)).transpose()
}

pub async fn count_due(conn: &mut SqliteConnection, now: DateTime<Utc>) -> Result<i64, StoreError> {
    let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "review" WHERE "due" <= ?"#)
        .bind(now.timestamp())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Records one review of `word` at `at` and reschedules it through `policy`.
/// Creates the row on first sight; `first_seen` never changes afterwards.
pub async fn update_review(
    conn: &mut SqliteConnection,
    word: &str,
    correct: bool,
    at: DateTime<Utc>,
    policy: &dyn IntervalPolicy,
) -> Result<Review, StoreError> {
    let word = casefold(word);
    let previous = get_review(conn, &word).await?;

    let (state, first_seen, elapsed_days) = match &previous {
        Some(review) => {
            let elapsed = (at - review.reviewed).num_seconds().max(0) as f64 / 86_400.0;
            (review.state, review.first_seen, elapsed)
        }
        None => (ReviewState::default(), at, 0.0),
    };

    let scheduled = policy.next(&state, elapsed_days, correct);
    let due = at + scheduled.interval;

    sqlx::query(
        r#"
        INSERT INTO "review" ("word", "first_seen", "reviewed", "due", "stability", "difficulty", "reps", "lapses")
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT ("word") DO UPDATE SET
            "reviewed" = excluded."reviewed",
            "due" = excluded."due",
            "stability" = excluded."stability",
            "difficulty" = excluded."difficulty",
            "reps" = excluded."reps",
            "lapses" = excluded."lapses"
        "#,
    )
    .bind(&word)
    .bind(first_seen.timestamp())
    .bind(at.timestamp())
    .bind(due.timestamp())
    .bind(scheduled.state.stability)
    .bind(scheduled.state.difficulty)
    .bind(scheduled.state.reps)
    .bind(scheduled.state.lapses)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(word = %word, correct, due = %due, "review updated");

    Ok(Review {
        word,
        first_seen,
        reviewed: at,
        due,
        state: scheduled.state,
    })
}

fn map_review_row(row: &SqliteRow) -> Result<Review, StoreError> {
    Ok(Review {
        word: row.try_get("word")?,
        first_seen: from_timestamp(row.try_get("first_seen")?),
        reviewed: from_timestamp(row.try_get("reviewed")?),
        due: from_timestamp(row.try_get("due")?),
        state: ReviewState {
            stability: row.try_get("stability")?,
            difficulty: row.try_get("difficulty")?,
            reps: row.try_get("reps")?,
            lapses: row.try_get("lapses")?,
        },
    })
}

fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
