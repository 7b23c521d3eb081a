mod common;

use std::sync::Arc;

use chrono::Duration;

use cloze_engine::db::reviews;
use cloze_engine::services::intervals::FsrsPolicy;
use cloze_engine::services::tuning::FixedDifficulty;
use cloze_engine::services::{DifficultyTuner, WordSelector};
use cloze_engine::text::{accept_all, exclude_words};

use common::{open_test_db, seed_words, set_ceiling, t0};

fn tuner(db: &cloze_engine::ReviewDb) -> DifficultyTuner {
    DifficultyTuner::new(db.clone(), Arc::new(FsrsPolicy::default()), Arc::new(FixedDifficulty))
}

#[tokio::test]
async fn test_zero_request_returns_nothing() {
    let test = open_test_db().await;
    seed_words(&test.db, &[("uno", 0), ("dos", 0)]).await;

    let selector = WordSelector::new(test.db.clone());
    let words = selector.select_words(0, &accept_all, t0()).await.unwrap();
    assert!(words.is_empty());
}

#[tokio::test]
async fn test_never_returns_more_than_requested() {
    let test = open_test_db().await;
    seed_words(&test.db, &[("uno", 0), ("dos", 0), ("tres", 0), ("cuatro", 0)]).await;

    let selector = WordSelector::new(test.db.clone());
    for n in 0..6 {
        let words = selector.select_words(n, &accept_all, t0()).await.unwrap();
        assert!(words.len() <= n, "n = {n}, got {words:?}");
        assert_eq!(words.len(), n.min(4));
    }
}

#[tokio::test]
async fn test_due_reviews_precede_new_words() {
    let test = open_test_db().await;
    seed_words(&test.db, &[("uno", 0), ("dos", 0), ("tres", 0), ("cuatro", 0), ("cinco", 0)]).await;

    // Wrong answers come back after the relearning step.
    let tuner = tuner(&test.db);
    tuner.record_outcome("dos", false, t0()).await.unwrap();
    tuner.record_outcome("uno", false, t0() + Duration::seconds(5)).await.unwrap();

    let selector = WordSelector::new(test.db.clone());
    let later = t0() + Duration::hours(1);

    let mut conn = test.db.session().await.unwrap();
    assert_eq!(reviews::count_due(&mut *conn, t0()).await.unwrap(), 0);
    assert_eq!(reviews::count_due(&mut *conn, later).await.unwrap(), 2);
    drop(conn);

    let words = selector.select_words(4, &accept_all, later).await.unwrap();
    assert_eq!(words.len(), 4);
    assert_eq!(&words[..2], &["dos".to_string(), "uno".to_string()]);
    assert!(words[2..].iter().all(|w| w != "uno" && w != "dos"));

    let only_due = selector.select_words(1, &accept_all, later).await.unwrap();
    assert_eq!(only_due, vec!["dos".to_string()]);
}

#[tokio::test]
async fn test_reviews_not_yet_due_are_neither_due_nor_new() {
    let test = open_test_db().await;
    seed_words(&test.db, &[("uno", 0), ("dos", 0)]).await;

    tuner(&test.db).record_outcome("uno", true, t0()).await.unwrap();

    let selector = WordSelector::new(test.db.clone());
    let words = selector.select_words(5, &accept_all, t0() + Duration::minutes(30)).await.unwrap();
    assert_eq!(words, vec!["dos".to_string()]);
}

#[tokio::test]
async fn test_exclusion_is_case_insensitive() {
    let test = open_test_db().await;
    seed_words(&test.db, &[("casa", 0), ("perro", 0), ("gato", 0)]).await;
    tuner(&test.db).record_outcome("Perro", false, t0()).await.unwrap();

    let selector = WordSelector::new(test.db.clone());
    let predicate = exclude_words(["Casa", "PERRO"]);
    let words = selector
        .select_words(10, &predicate, t0() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(words, vec!["gato".to_string()]);
}

#[tokio::test]
async fn test_new_words_respect_ceiling() {
    let test = open_test_db().await;
    seed_words(&test.db, &[("a", 0), ("b", 1), ("c", 2), ("d", 3), ("e", 4)]).await;

    let selector = WordSelector::new(test.db.clone());
    let words = selector.select_words_at(10, t0()).await.unwrap();
    assert_eq!(words, vec!["a".to_string()]);

    set_ceiling(&test.db, 2).await;
    let words = selector.select_words_at(10, t0()).await.unwrap();
    assert_eq!(words.len(), 3);
    assert!(words.iter().all(|w| ["a", "b", "c"].contains(&w.as_str())));
}

#[tokio::test]
async fn test_new_words_exclude_reviewed_words() {
    let test = open_test_db().await;
    seed_words(&test.db, &[("uno", 0), ("dos", 0)]).await;
    tuner(&test.db).record_outcome("uno", true, t0()).await.unwrap();

    let mut conn = test.db.session().await.unwrap();
    assert!(reviews::is_known(&mut *conn, "UNO").await.unwrap());
    assert!(!reviews::is_known(&mut *conn, "dos").await.unwrap());
    drop(conn);

    let words = WordSelector::new(test.db.clone())
        .select_words_at(10, t0())
        .await
        .unwrap();
    assert_eq!(words, vec!["dos".to_string()]);
}

#[tokio::test]
async fn test_store_failure_is_reported() {
    let test = open_test_db().await;
    seed_words(&test.db, &[("uno", 0)]).await;
    test.db.close().await;

    let result = WordSelector::new(test.db.clone())
        .select_words(3, &accept_all, t0())
        .await;
    assert!(result.is_err());
}
