//! Decides whether a stored bookmark is still worth resuming from.

use crate::bookmarks::models::Bookmark;
use crate::errors::AppError;
use crate::settings::{SettingsManager, END_OF_BUFFER_RESET, EXPIRE_DAYS};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Positions below this are treated as "never really started".
pub const AT_START_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "days")]
pub enum ExpirationReason {
    AtStart,
    AtEnd,
    /// Whole days since the bookmark was last written.
    Aged(i64),
}

impl fmt::Display for ExpirationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpirationReason::AtStart => write!(f, "At Start"),
            ExpirationReason::AtEnd => write!(f, "At End"),
            ExpirationReason::Aged(days) => write!(f, "{} days", days),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Valid,
    Expired(ExpirationReason),
}

impl Freshness {
    pub fn is_valid(&self) -> bool {
        matches!(self, Freshness::Valid)
    }

    pub fn reason(&self) -> Option<ExpirationReason> {
        match self {
            Freshness::Valid => None,
            Freshness::Expired(reason) => Some(*reason),
        }
    }
}

/// Thresholds for [`ExpirationPolicy::classify`], snapshotted from settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpirationPolicy {
    pub end_of_buffer_reset: f64,
    pub expire_days: f64,
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self {
            end_of_buffer_reset: 60.0,
            expire_days: 30.0,
        }
    }
}

impl ExpirationPolicy {
    pub async fn load(settings: &SettingsManager) -> Result<Self, AppError> {
        Ok(Self {
            end_of_buffer_reset: settings.get_setting_f64(END_OF_BUFFER_RESET).await?,
            expire_days: settings.get_setting_f64(EXPIRE_DAYS).await?,
        })
    }

    /// First matching rule wins: at start, then at end, then aged.
    pub fn classify(&self, bookmark: &Bookmark, now: DateTime<Utc>) -> Freshness {
        if bookmark.position < AT_START_THRESHOLD {
            return Freshness::Expired(ExpirationReason::AtStart);
        }

        if bookmark.duration > 0.0
            && bookmark.position + self.end_of_buffer_reset >= bookmark.duration
        {
            return Freshness::Expired(ExpirationReason::AtEnd);
        }

        // num_days truncates partial days
        let days = (now - bookmark.timestamp).num_days();
        if days as f64 > self.expire_days {
            return Freshness::Expired(ExpirationReason::Aged(days));
        }

        Freshness::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn bookmark(position: f64, duration: f64, age: TimeDelta) -> Bookmark {
        Bookmark {
            path: "/media/episode.mkv".to_string(),
            position,
            duration,
            timestamp: now() - age,
        }
    }

    #[test]
    fn test_at_start_wins_regardless_of_other_fields() {
        let policy = ExpirationPolicy::default();

        for (position, duration, age_days) in [
            (0.0, 0.0, 0),
            (0.05, 10.0, 400),
            (0.099, 5000.0, 1),
        ] {
            let b = bookmark(position, duration, TimeDelta::days(age_days));
            assert_eq!(
                policy.classify(&b, now()),
                Freshness::Expired(ExpirationReason::AtStart)
            );
        }
    }

    #[test]
    fn test_at_end_inside_trailing_buffer() {
        let policy = ExpirationPolicy::default();

        let near_end = bookmark(65.0, 120.0, TimeDelta::hours(1));
        assert_eq!(
            policy.classify(&near_end, now()),
            Freshness::Expired(ExpirationReason::AtEnd)
        );

        let exactly_at_buffer = bookmark(60.0, 120.0, TimeDelta::hours(1));
        assert_eq!(
            policy.classify(&exactly_at_buffer, now()),
            Freshness::Expired(ExpirationReason::AtEnd)
        );

        let before_buffer = bookmark(50.0, 120.0, TimeDelta::hours(1));
        assert_eq!(policy.classify(&before_buffer, now()), Freshness::Valid);
    }

    #[test]
    fn test_unknown_duration_is_never_at_end() {
        let policy = ExpirationPolicy::default();
        let b = bookmark(5000.0, 0.0, TimeDelta::hours(1));

        assert!(policy.classify(&b, now()).is_valid());
    }

    #[test]
    fn test_aged_by_whole_days() {
        let policy = ExpirationPolicy::default();

        let old = bookmark(100.0, 3600.0, TimeDelta::days(31));
        assert_eq!(
            policy.classify(&old, now()),
            Freshness::Expired(ExpirationReason::Aged(31))
        );

        let limit = bookmark(100.0, 3600.0, TimeDelta::days(30));
        assert_eq!(policy.classify(&limit, now()), Freshness::Valid);

        let almost = bookmark(
            100.0,
            3600.0,
            TimeDelta::days(31) - TimeDelta::seconds(1),
        );
        assert_eq!(policy.classify(&almost, now()), Freshness::Valid);
    }

    #[test]
    fn test_custom_thresholds() {
        let policy = ExpirationPolicy {
            end_of_buffer_reset: 10.0,
            expire_days: 2.0,
        };

        assert!(policy
            .classify(&bookmark(65.0, 120.0, TimeDelta::days(1)), now())
            .is_valid());
        assert_eq!(
            policy
                .classify(&bookmark(65.0, 120.0, TimeDelta::days(3)), now())
                .reason(),
            Some(ExpirationReason::Aged(3))
        );
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(ExpirationReason::AtStart.to_string(), "At Start");
        assert_eq!(ExpirationReason::AtEnd.to_string(), "At End");
        assert_eq!(ExpirationReason::Aged(45).to_string(), "45 days");
    }

    #[tokio::test]
    async fn test_load_reads_settings() {
        let (_dir, db) = crate::database::test_support::open_temp().await;
        db.settings().set_setting(EXPIRE_DAYS, "7").await.unwrap();

        let policy = ExpirationPolicy::load(&db.settings()).await.unwrap();
        assert_eq!(policy.expire_days, 7.0);
        assert_eq!(policy.end_of_buffer_reset, 60.0);
    }
}
