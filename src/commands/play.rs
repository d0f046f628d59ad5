use crate::bookmarks::models::display_timestamp;
use crate::database::DatabaseManager;
use crate::errors::AppError;
use crate::expiration::{ExpirationPolicy, Freshness};
use crate::player::{absolute_path, MediaLauncher, SessionOutcome};
use chrono::Utc;
use std::path::Path;

/// Plays `file`, resuming from its bookmark when that is still valid, and
/// stores the new position afterwards.
///
/// The bookmark is saved even when the player exits abnormally; nothing is
/// saved when it cannot be launched.
pub async fn play(
    db: &DatabaseManager,
    launcher: &dyn MediaLauncher,
    file: &Path,
) -> Result<SessionOutcome, AppError> {
    let path = absolute_path(file)?;
    let key = path
        .to_str()
        .ok_or_else(|| AppError::InvalidPath(path.to_string_lossy().into_owned()))?
        .to_owned();
    let bookmarks = db.bookmarks();
    let policy = ExpirationPolicy::load(&db.settings()).await?;

    let mut start_offset = 0.0;

    if let Some(bookmark) = bookmarks.lookup_bookmark(&key).await? {
        log::info!(
            "Loaded position: {}s of {}s from {}",
            bookmark.position,
            bookmark.duration,
            display_timestamp(&bookmark.timestamp)
        );

        match policy.classify(&bookmark, Utc::now()) {
            Freshness::Valid => start_offset = bookmark.position,
            Freshness::Expired(reason) => log::info!("Resetting to beginning: {}", reason),
        }
    }

    let outcome = launcher.play(&path, start_offset).await?;

    bookmarks
        .upsert_bookmark(&key, outcome.position, outcome.duration, Utc::now())
        .await?;

    if let Some(failure) = &outcome.failure {
        log::warn!("Bookmark saved after player failure: {}", failure);
    }

    Ok(outcome)
}
