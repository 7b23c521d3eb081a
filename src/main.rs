use std::time::Instant;

use chrono::Utc;

use cloze_engine::config::EngineConfig;
use cloze_engine::db::ReviewDb;
use cloze_engine::logging;
use cloze_engine::services::FlashcardService;
use cloze_engine::text::accept_all;

const DEFAULT_COUNT: usize = 10;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = EngineConfig::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let count = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<usize>().ok())
        .unwrap_or(DEFAULT_COUNT);

    let db = match ReviewDb::open(&config).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %err, path = %config.database_path.display(), "could not open review database");
            std::process::exit(1);
        }
    };

    let service = FlashcardService::new(db.clone(), &config);
    let start = Instant::now();

    let items = match service.get(count, &accept_all, Utc::now()).await {
        Ok(items) => items,
        Err(err) => {
            tracing::error!(error = %err, "could not generate flashcards");
            db.close().await;
            std::process::exit(1);
        }
    };

    for item in &items {
        match serde_json::to_string(item) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!(error = %err, "could not encode item"),
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    let throughput = if elapsed > 0.0 { items.len() as f64 / elapsed } else { 0.0 };
    tracing::info!(
        requested = count,
        generated = items.len(),
        throughput,
        violations = service.generator().consistency_violations(),
        "done"
    );

    db.close().await;
}
