#![allow(dead_code)]

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use cloze_engine::db::{corpus, student, ReviewDb};

pub struct TestDb {
    pub db: ReviewDb,
    _dir: TempDir,
}

pub async fn open_test_db() -> TestDb {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("review.db");
    let db = ReviewDb::open_path(&path, 8, Duration::from_secs(30))
        .await
        .expect("failed to open review db");
    TestDb { db, _dir: dir }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub async fn seed_words(db: &ReviewDb, words: &[(&str, i64)]) {
    let mut conn = db.session().await.expect("session");
    for (word, class) in words {
        corpus::insert_word(&mut *conn, word, *class)
            .await
            .expect("insert word");
    }
}

/// Stores a sentence and, when given, its translation. Returns the sentence id.
pub async fn seed_sentence(
    db: &ReviewDb,
    tokens: &[&str],
    frequency_class: i64,
    translation: Option<&str>,
) -> i64 {
    let mut conn = db.session().await.expect("session");
    let id = corpus::insert_sentence(&mut *conn, Some(1000 + frequency_class), tokens, frequency_class)
        .await
        .expect("insert sentence");
    if let Some(text) = translation {
        corpus::insert_translation(&mut *conn, id, None, text)
            .await
            .expect("insert translation");
    }
    id
}

pub async fn set_ceiling(db: &ReviewDb, frequency_class: i64) {
    let mut conn = db.session().await.expect("session");
    student::set_frequency_class(&mut *conn, frequency_class)
        .await
        .expect("set ceiling");
}

pub async fn load_student(db: &ReviewDb) -> student::Student {
    let mut conn = db.session().await.expect("session");
    student::load(&mut *conn).await.expect("load student")
}
