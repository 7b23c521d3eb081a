use serde::Serialize;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::db::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub frequency_class: i64,
    /// Lifetime first-sighting totals.
    pub correct: i64,
    pub incorrect: i64,
    /// First sightings since the current accuracy window opened.
    pub window_correct: i64,
    pub window_incorrect: i64,
}

impl Student {
    pub fn answered(&self) -> i64 {
        self.correct + self.incorrect
    }

    pub fn window_answered(&self) -> i64 {
        self.window_correct + self.window_incorrect
    }
}

pub(crate) async fn ensure_student(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(r#"INSERT OR IGNORE INTO "student" ("id", "frequency_class", "correct", "incorrect") VALUES (1, 0, 0, 0)"#)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn load(conn: &mut SqliteConnection) -> Result<Student, StoreError> {
    let row = sqlx::query(
        r#"SELECT "frequency_class", "correct", "incorrect", "window_correct", "window_incorrect"
        FROM "student" WHERE "id" = 1"#,
    )
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(StoreError::MissingStudent)?;

    Ok(Student {
        frequency_class: row.try_get("frequency_class")?,
        correct: row.try_get("correct")?,
        incorrect: row.try_get("incorrect")?,
        window_correct: row.try_get("window_correct")?,
        window_incorrect: row.try_get("window_incorrect")?,
    })
}

/// Current admission ceiling for new words.
pub async fn preferred_difficulty(conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    Ok(load(conn).await?.frequency_class)
}

pub async fn increment_stats(conn: &mut SqliteConnection, correct: bool) -> Result<(), StoreError> {
    let sql = if correct {
        r#"UPDATE "student" SET "correct" = "correct" + 1, "window_correct" = "window_correct" + 1 WHERE "id" = 1"#
    } else {
        r#"UPDATE "student" SET "incorrect" = "incorrect" + 1, "window_incorrect" = "window_incorrect" + 1 WHERE "id" = 1"#
    };
    sqlx::query(sql).execute(&mut *conn).await?;
    Ok(())
}

/// Moves the ceiling. Counters are left alone.
pub async fn set_frequency_class(
    conn: &mut SqliteConnection,
    frequency_class: i64,
) -> Result<(), StoreError> {
    sqlx::query(r#"UPDATE "student" SET "frequency_class" = ? WHERE "id" = 1"#)
        .bind(frequency_class.max(0))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Starts a fresh accuracy window. Lifetime totals are kept.
pub async fn reset_window(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(r#"UPDATE "student" SET "window_correct" = 0, "window_incorrect" = 0 WHERE "id" = 1"#)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
