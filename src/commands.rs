//! One function per CLI verb. Each takes the store (and, for `play`, the
//! launcher) explicitly and returns data; printing is left to the caller.

pub mod bookmarks;
pub mod config;
pub mod play;

pub use bookmarks::{clear, expire, list, render_list, BookmarkEntry};
pub use config::{config, render_settings};
pub use play::play;
