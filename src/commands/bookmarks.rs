use crate::bookmarks::models::{display_timestamp, Bookmark};
use crate::database::DatabaseManager;
use crate::errors::AppError;
use crate::expiration::{ExpirationPolicy, ExpirationReason};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A bookmark together with its expiration state at listing time.
#[derive(Debug, Clone, Serialize)]
pub struct BookmarkEntry {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub expired: Option<ExpirationReason>,
}

pub async fn list(db: &DatabaseManager, now: DateTime<Utc>) -> Result<Vec<BookmarkEntry>, AppError> {
    let policy = ExpirationPolicy::load(&db.settings()).await?;
    let bookmarks = db.bookmarks().list_bookmarks().await?;

    Ok(bookmarks
        .into_iter()
        .map(|bookmark| BookmarkEntry {
            expired: policy.classify(&bookmark, now).reason(),
            bookmark,
        })
        .collect())
}

pub fn render_list(entries: &[BookmarkEntry]) -> String {
    let mut out = String::new();
    out.push_str("Position Duration Last Access         State      Filename\n");
    out.push_str("======== ======== =================== ========== ========\n");

    for entry in entries {
        let state = entry
            .expired
            .map(|reason| reason.to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "{:>8.1} {:>8.1} {} {:<10} {}\n",
            entry.bookmark.position,
            entry.bookmark.duration,
            display_timestamp(&entry.bookmark.timestamp),
            state,
            entry.bookmark.path
        ));
    }

    if entries.len() == 1 {
        out.push_str("Found 1 entry.\n");
    } else {
        out.push_str(&format!("Found {} entries.\n", entries.len()));
    }
    out
}

/// Deletes every bookmark and returns the removed paths.
pub async fn clear(db: &DatabaseManager) -> Result<Vec<String>, AppError> {
    let bookmarks = db.bookmarks();
    let mut removed = Vec::new();

    for bookmark in bookmarks.list_bookmarks().await? {
        bookmarks.delete_bookmark(&bookmark.path).await?;
        removed.push(bookmark.path);
    }

    log::info!("Cleared {} bookmarks", removed.len());
    Ok(removed)
}

/// Deletes the bookmarks that are no longer valid resume points and returns
/// their paths.
pub async fn expire(db: &DatabaseManager, now: DateTime<Utc>) -> Result<Vec<String>, AppError> {
    let bookmarks = db.bookmarks();
    let mut removed = Vec::new();

    for entry in list(db, now).await? {
        if let Some(reason) = entry.expired {
            log::debug!("Expiring {}: {}", entry.bookmark.path, reason);
            bookmarks.delete_bookmark(&entry.bookmark.path).await?;
            removed.push(entry.bookmark.path);
        }
    }

    log::info!("Expired {} bookmarks", removed.len());
    Ok(removed)
}
