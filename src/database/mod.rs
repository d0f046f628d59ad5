pub mod migrations;

use crate::bookmarks::BookmarkManager;
use crate::errors::AppError;
use crate::settings::SettingsManager;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::fs;
use std::path::{Path, PathBuf};

pub use migrations::SCHEMA_VERSION;

pub const DATABASE_FILE: &str = "history.sqlite3";

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("playmark")
}

/// Location used by earlier mfgames-mplayer releases.
pub fn get_legacy_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".config")
            .join("mfgames")
            .join("mfgames-mplayer")
            .join(DATABASE_FILE)
    })
}

pub fn get_database_path() -> PathBuf {
    resolve_database_path(
        get_config_dir().join(DATABASE_FILE),
        get_legacy_database_path(),
    )
}

/// Prefers `primary`; an existing legacy store is reused only while
/// `primary` has not been created yet.
pub fn resolve_database_path(primary: PathBuf, legacy: Option<PathBuf>) -> PathBuf {
    if primary.exists() {
        return primary;
    }

    match legacy {
        Some(legacy) if legacy.is_file() => {
            log::info!("Using legacy database at: {:?}", legacy);
            legacy
        }
        _ => primary,
    }
}

/// Owns the single connection to the bookmark store.
///
/// The pool is capped at one connection, so every statement issued through
/// the managers handed out by [`DatabaseManager::settings`] and
/// [`DatabaseManager::bookmarks`] is serialised on the same handle.
pub struct DatabaseManager {
    pool: Pool<Sqlite>,
    path: PathBuf,
}

impl DatabaseManager {
    /// Opens (or creates) the store at `db_path` and brings its schema up to
    /// [`SCHEMA_VERSION`].
    pub async fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(dir) = db_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                log::info!("Creating configuration directory: {:?}", dir);
                fs::create_dir_all(dir).map_err(|e| {
                    AppError::StoreUnavailable(format!("{}: {}", dir.display(), e))
                })?;
            }
        }

        let is_new = !db_path.exists();

        log::info!("Connecting to database at: {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true),
            )
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("{}: {}", db_path.display(), e)))?;

        if is_new || !migrations::has_schema_table(&pool).await? {
            log::info!("Creating initial database structure");
            migrations::create_initial_structure(&pool).await?;
        }

        let version = migrations::read_version(&pool).await?;
        log::info!("Current database schema version: {}", version);

        if version > SCHEMA_VERSION {
            log::error!(
                "Current file schema exceeds the program's schema of {}",
                SCHEMA_VERSION
            );
            pool.close().await;
            return Err(AppError::SchemaTooNew {
                found: version,
                expected: SCHEMA_VERSION,
            });
        }

        if version < SCHEMA_VERSION {
            migrations::upgrade(&pool, version, SCHEMA_VERSION).await?;
        }

        Ok(Self {
            pool,
            path: db_path.to_path_buf(),
        })
    }

    /// Opens the store at the default per-user location.
    pub async fn open_default() -> Result<Self, AppError> {
        Self::open(&get_database_path()).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> SettingsManager {
        SettingsManager::new(self.pool.clone())
    }

    pub fn bookmarks(&self) -> BookmarkManager {
        BookmarkManager::new(self.pool.clone())
    }

    pub async fn schema_version(&self) -> Result<i64, AppError> {
        migrations::read_version(&self.pool).await
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
