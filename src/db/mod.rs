//! SQLite storage setup: connection pool and schema migrations.
//!
//! Queries against the schema live in `crate::store::sqlite`.

pub mod pool;

use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),
}

/// An embedded schema migration.
struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// Applied in order; names are recorded in `_migrations` once applied.
const MIGRATIONS: &[Migration] = &[Migration {
    name: "0001_initial_schema",
    sql: include_str!("migrations/0001_initial_schema.sql"),
}];

/// Open the database at `db_path` and bring its schema up to date.
///
/// Missing parent directories are created.
pub async fn initialize(db_path: &Path) -> Result<pool::DbPool, DbError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DbError::Migration(format!(
                "cannot create database directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let pool = pool::create_pool(db_path).await?;
    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &pool::DbPool) -> Result<(), DbError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: HashSet<String> = sqlx::query_scalar("SELECT name FROM _migrations")
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(m.name)) {
        // Schema changes and their bookkeeping row commit together
        let mut tx = pool.begin().await?;

        for statement in split_statements(migration.sql) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| DbError::Migration(format!("{}: {}", migration.name, e)))?;
        }

        sqlx::query("INSERT INTO _migrations (name, applied_at) VALUES (?, ?)")
            .bind(migration.name)
            .bind(Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        log::info!("[db] Applied migration {}", migration.name);
    }

    Ok(())
}

/// Split a migration script into individual statements.
///
/// Drops `--` comments and ignores semicolons inside string literals.
fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            '-' if !in_string && chars.peek() == Some(&'-') => {
                // Skip to end of line
                for c in chars.by_ref() {
                    if c == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            ';' if !in_string => {
                let statement = current.trim();
                if !statement.is_empty() {
                    statements.push(statement.to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }

    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_initialize_creates_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/data/review.db");

        let pool = initialize(&db_path).await.unwrap();
        assert!(db_path.exists());

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["pr_reviewers", "pull_requests", "teams", "users"]);
    }

    #[tokio::test]
    async fn test_reinitialize_skips_applied_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("review.db");

        initialize(&db_path).await.unwrap();
        let pool = initialize(&db_path).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_schema_rejects_unknown_status() {
        let dir = tempdir().unwrap();
        let pool = initialize(&dir.path().join("review.db")).await.unwrap();

        sqlx::query("INSERT INTO teams (team_name) VALUES ('core')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (user_id, username, team_name, is_active) VALUES ('u1', 'amy', 'core', 1)")
            .execute(&pool)
            .await
            .unwrap();

        let result = sqlx::query(
            "INSERT INTO pull_requests (pull_request_id, pull_request_name, author_id, status, created_at) VALUES ('p1', 'x', 'u1', 'CLOSED', 0)",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_split_statements() {
        let sql = "-- header; not a statement\nCREATE TABLE a (x TEXT DEFAULT 'a;b');\nCREATE INDEX i ON a(x); -- trailing\nSELECT 1";
        let statements = split_statements(sql);

        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("'a;b'"));
        assert_eq!(statements[1], "CREATE INDEX i ON a(x)");
        assert_eq!(statements[2], "SELECT 1");
    }
}
