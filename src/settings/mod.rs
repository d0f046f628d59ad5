pub mod models;

use crate::database::migrations::{DEFAULT_DURATION_PATTERN, DEFAULT_STATUS_PATTERN};
use crate::errors::AppError;
use crate::player::parser::StatusParser;
use models::Setting;
use sqlx::{Pool, Sqlite};

pub const PROGRAM: &str = "program";
pub const REWIND_SECONDS: &str = "rewind_seconds";
pub const END_OF_BUFFER_RESET: &str = "end_of_buffer_reset";
pub const EXPIRE_DAYS: &str = "expire_days";
pub const STATUS_PATTERN: &str = "status_pattern";
pub const DURATION_PATTERN: &str = "duration_pattern";

/// Typed access to the `settings` table. Rows are only ever created by
/// migrations; this manager reads and updates them.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    pool: Pool<Sqlite>,
}

impl SettingsManager {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn get_setting(&self, name: &str) -> Result<String, AppError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT COALESCE(CAST(value AS TEXT), '') FROM settings WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        value.ok_or_else(|| AppError::SettingNotFound(name.to_string()))
    }

    pub async fn get_setting_f64(&self, name: &str) -> Result<f64, AppError> {
        let value = self.get_setting(name).await?;
        parse_seconds_setting(name, &value)
    }

    /// Updates an existing setting. Unknown names are rejected rather than
    /// inserted, and numeric or pattern settings must hold a usable value.
    pub async fn set_setting(&self, name: &str, value: &str) -> Result<(), AppError> {
        validate_setting(name, value)?;

        let result = sqlx::query("UPDATE settings SET value = ? WHERE name = ?")
            .bind(value)
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::SettingNotFound(name.to_string()));
        }

        log::info!("Updated setting {} = '{}'", name, value);
        Ok(())
    }

    pub async fn list_settings(&self) -> Result<Vec<Setting>, AppError> {
        let settings = sqlx::query_as::<_, Setting>(
            "SELECT name, COALESCE(CAST(value AS TEXT), '') AS value FROM settings ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(settings)
    }
}

fn parse_seconds_setting(name: &str, value: &str) -> Result<f64, AppError> {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number >= 0.0 => Ok(number),
        _ => Err(AppError::InvalidSetting {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

fn validate_setting(name: &str, value: &str) -> Result<(), AppError> {
    match name {
        REWIND_SECONDS | END_OF_BUFFER_RESET | EXPIRE_DAYS => {
            parse_seconds_setting(name, value).map(|_| ())
        }
        STATUS_PATTERN => StatusParser::new(value, DEFAULT_DURATION_PATTERN).map(|_| ()),
        DURATION_PATTERN => StatusParser::new(DEFAULT_STATUS_PATTERN, value).map(|_| ()),
        _ => Ok(()),
    }
}
