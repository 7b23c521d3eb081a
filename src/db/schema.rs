use sqlx::SqlitePool;

pub const SCHEMA_VERSION: &str = "1";

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "_db_metadata" (
    "key" TEXT PRIMARY KEY,
    "value" TEXT NOT NULL
);

-- single-row student profile
CREATE TABLE IF NOT EXISTS "student" (
    "id" INTEGER PRIMARY KEY CHECK ("id" = 1),
    "frequency_class" INTEGER NOT NULL DEFAULT 0 CHECK ("frequency_class" >= 0),
    "correct" INTEGER NOT NULL DEFAULT 0,
    "incorrect" INTEGER NOT NULL DEFAULT 0,
    "window_correct" INTEGER NOT NULL DEFAULT 0,
    "window_incorrect" INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS "review" (
    "word" TEXT PRIMARY KEY,
    "first_seen" INTEGER NOT NULL,
    "reviewed" INTEGER NOT NULL,
    "due" INTEGER NOT NULL,
    "stability" REAL NOT NULL,
    "difficulty" REAL NOT NULL,
    "reps" INTEGER NOT NULL DEFAULT 0,
    "lapses" INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS "review_due" ON "review" ("due");

CREATE TABLE IF NOT EXISTS "word" (
    "id" INTEGER PRIMARY KEY,
    "word" TEXT NOT NULL UNIQUE,
    "frequency_class" INTEGER NOT NULL CHECK ("frequency_class" >= 0)
);

CREATE INDEX IF NOT EXISTS "word_frequency_class" ON "word" ("frequency_class");

CREATE TABLE IF NOT EXISTS "sentence" (
    "id" INTEGER PRIMARY KEY,
    "tatoeba_id" INTEGER,
    "text" TEXT NOT NULL,
    "tokens" TEXT NOT NULL,
    "frequency_class" INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS "contains" (
    "sentence" INTEGER NOT NULL REFERENCES "sentence" ("id"),
    "word" TEXT NOT NULL,
    PRIMARY KEY ("sentence", "word")
);

CREATE INDEX IF NOT EXISTS "contains_word" ON "contains" ("word");

CREATE TABLE IF NOT EXISTS "translation" (
    "id" INTEGER PRIMARY KEY,
    "sentence" INTEGER NOT NULL REFERENCES "sentence" ("id"),
    "tatoeba_id" INTEGER,
    "text" TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS "translation_sentence" ON "translation" ("sentence");
"#;

pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            ';' if !in_single_quote && !in_double_quote => {
                let stmt = strip_comment_lines(&current);
                if !stmt.is_empty() {
                    statements.push(stmt);
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    let tail = strip_comment_lines(&current);
    if !tail.is_empty() {
        statements.push(tail);
    }

    statements
}

fn strip_comment_lines(stmt: &str) -> String {
    stmt.lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Creates the schema on first open. Re-running is a no-op.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let version: Option<String> =
        sqlx::query_scalar(r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#)
            .fetch_optional(pool)
            .await
            .unwrap_or(None);

    if version.as_deref() == Some(SCHEMA_VERSION) {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for stmt in split_sql_statements(SCHEMA_SQL) {
        sqlx::query(&stmt).execute(&mut *tx).await?;
    }
    sqlx::query(
        r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#,
    )
    .bind(SCHEMA_VERSION)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(version = SCHEMA_VERSION, "schema migrated");
    Ok(())
}
