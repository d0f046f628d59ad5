//! Ordered schema upgrades for the bookmark store.
//!
//! Every step runs in its own transaction: table creation, default settings
//! and the version bump commit together or not at all. Statements are also
//! written to be re-runnable (`IF NOT EXISTS`, guarded inserts) so a store
//! left half-upgraded by an older release resumes cleanly from the stored
//! version.

use crate::errors::AppError;
use sqlx::{Pool, Sqlite};

/// Schema version this program reads and writes.
pub const SCHEMA_VERSION: i64 = 5;

pub const DEFAULT_PROGRAM: &str = "/usr/bin/mplayer";

/// Status line printed by the player with `-msgmodule`, audio clock first.
pub const DEFAULT_STATUS_PATTERN: &str =
    r"^STATUSLINE: A:\s*([\d+\.]+)\s+V:\s*([\d+\.]+)\s+A-V:";

pub const DEFAULT_DURATION_PATTERN: &str = r"ID_LENGTH=([\d\.]+)";

/// One step of the upgrade chain, taking the store from `version - 1` to
/// `version`.
#[derive(Debug)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub statements: &'static [&'static str],
    pub settings: &'static [(&'static str, &'static str)],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 2,
        description: "settings table",
        statements: &["CREATE TABLE IF NOT EXISTS settings (name TEXT, value TEXT)"],
        settings: &[
            ("rewind_seconds", "5"),
            ("end_of_buffer_reset", "60"),
            ("program", DEFAULT_PROGRAM),
        ],
    },
    Migration {
        version: 3,
        description: "configurable expiration",
        statements: &[],
        settings: &[("expire_days", "30")],
    },
    Migration {
        version: 4,
        description: "presentation settings",
        statements: &[],
        settings: &[
            ("directory_roots", ""),
            ("splash_error_pause", "5000"),
            ("splash_play_pause", "1000"),
            ("splash_font_name", "Verdana"),
            ("splash_font_size", "24"),
        ],
    },
    Migration {
        version: 5,
        description: "configurable player output patterns",
        statements: &[],
        settings: &[
            ("status_pattern", DEFAULT_STATUS_PATTERN),
            ("duration_pattern", DEFAULT_DURATION_PATTERN),
        ],
    },
];

pub async fn has_schema_table(pool: &Pool<Sqlite>) -> Result<bool, AppError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema'")
            .fetch_optional(pool)
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

    Ok(row.is_some())
}

/// Lays down the version 1 layout: the version marker and an empty
/// `bookmark` table.
pub async fn create_initial_structure(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("CREATE TABLE IF NOT EXISTS schema (version INTEGER)")
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO schema (version) SELECT 1 WHERE NOT EXISTS (SELECT 1 FROM schema)")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bookmark (path TEXT, position REAL, duration REAL, timestamp TEXT)",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn read_version(pool: &Pool<Sqlite>) -> Result<i64, AppError> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema")
        .fetch_one(pool)
        .await?;

    version.ok_or_else(|| AppError::Database("Schema version marker is empty".to_string()))
}

/// Applies every step above `from` up to and including `target`, returning
/// the version reached.
pub async fn upgrade(pool: &Pool<Sqlite>, from: i64, target: i64) -> Result<i64, AppError> {
    let mut version = from;

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > from && m.version <= target)
    {
        log::info!(
            "Upgrading schema to version {} ({})",
            migration.version,
            migration.description
        );

        apply(pool, migration)
            .await
            .map_err(|e| AppError::Migration {
                version: migration.version,
                message: e.to_string(),
            })?;

        version = migration.version;
    }

    Ok(version)
}

async fn apply(pool: &Pool<Sqlite>, migration: &Migration) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for statement in migration.statements {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    for (name, value) in migration.settings {
        sqlx::query(
            "INSERT INTO settings (name, value) SELECT ?, ? WHERE NOT EXISTS (SELECT 1 FROM settings WHERE name = ?)",
        )
        .bind(*name)
        .bind(*value)
        .bind(*name)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE schema SET version = ?")
        .bind(migration.version)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    async fn fresh_pool() -> (tempfile::TempDir, Pool<Sqlite>) {
        let dir = tempfile::tempdir().unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(dir.path().join("history.sqlite3"))
                    .create_if_missing(true),
            )
            .await
            .unwrap();
        create_initial_structure(&pool).await.unwrap();
        (dir, pool)
    }

    async fn setting_names(pool: &Pool<Sqlite>) -> Vec<String> {
        sqlx::query_scalar("SELECT name FROM settings ORDER BY name")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    fn names_introduced_above(version: i64) -> Vec<String> {
        let mut names: Vec<String> = MIGRATIONS
            .iter()
            .filter(|m| m.version > version)
            .flat_map(|m| m.settings.iter().map(|(name, _)| name.to_string()))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_chain_is_contiguous_and_ends_at_schema_version() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, index as i64 + 2);
        }
        assert_eq!(MIGRATIONS.last().unwrap().version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_initial_structure_is_version_one() {
        let (_dir, pool) = fresh_pool().await;

        assert_eq!(read_version(&pool).await.unwrap(), 1);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookmark")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(has_schema_table(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_upgrade_from_every_version_reaches_latest() {
        for start in 1..SCHEMA_VERSION {
            let (_dir, pool) = fresh_pool().await;
            assert_eq!(upgrade(&pool, 1, start).await.unwrap(), start);
            assert_eq!(read_version(&pool).await.unwrap(), start);

            let reached = upgrade(&pool, start, SCHEMA_VERSION).await.unwrap();
            assert_eq!(reached, SCHEMA_VERSION);
            assert_eq!(read_version(&pool).await.unwrap(), SCHEMA_VERSION);

            let names = setting_names(&pool).await;
            for name in names_introduced_above(start) {
                assert!(names.contains(&name), "missing {name} when starting at {start}");
            }
            assert_eq!(names, names_introduced_above(1));
        }
    }

    #[tokio::test]
    async fn test_upgrade_at_latest_is_noop() {
        let (_dir, pool) = fresh_pool().await;
        upgrade(&pool, 1, SCHEMA_VERSION).await.unwrap();
        let before = setting_names(&pool).await;

        let reached = upgrade(&pool, SCHEMA_VERSION, SCHEMA_VERSION).await.unwrap();

        assert_eq!(reached, SCHEMA_VERSION);
        assert_eq!(setting_names(&pool).await, before);
    }

    #[tokio::test]
    async fn test_interrupted_step_is_retried_without_duplicates() {
        let (_dir, pool) = fresh_pool().await;

        // Version 2 DDL and one default landed, the version bump did not.
        sqlx::query("CREATE TABLE settings (name TEXT, value TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO settings VALUES ('rewind_seconds', '5')")
            .execute(&pool)
            .await
            .unwrap();

        upgrade(&pool, 1, SCHEMA_VERSION).await.unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE name = 'rewind_seconds'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert_eq!(read_version(&pool).await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_failed_step_keeps_previous_version() {
        let (_dir, pool) = fresh_pool().await;
        upgrade(&pool, 1, 2).await.unwrap();

        // A settings table without a `value` column makes the next insert fail.
        sqlx::query("DROP TABLE settings").execute(&pool).await.unwrap();
        sqlx::query("CREATE TABLE settings (name TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        let err = upgrade(&pool, 2, SCHEMA_VERSION).await.err().unwrap();
        assert!(matches!(err, AppError::Migration { version: 3, .. }));
        assert_eq!(read_version(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_defaults_keep_their_values() {
        let (_dir, pool) = fresh_pool().await;
        upgrade(&pool, 1, SCHEMA_VERSION).await.unwrap();

        let rows: Vec<(String, String)> = sqlx::query_as("SELECT name, value FROM settings")
            .fetch_all(&pool)
            .await
            .unwrap();
        let lookup = |name: &str| {
            rows.iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(lookup("rewind_seconds"), "5");
        assert_eq!(lookup("end_of_buffer_reset"), "60");
        assert_eq!(lookup("program"), DEFAULT_PROGRAM);
        assert_eq!(lookup("expire_days"), "30");
        assert_eq!(lookup("splash_font_name"), "Verdana");
        assert_eq!(lookup("directory_roots"), "");
        assert_eq!(lookup("status_pattern"), DEFAULT_STATUS_PATTERN);
    }
}
