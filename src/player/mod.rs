//! Runs the external player for one file and tracks how far playback got.

pub mod parser;

use crate::errors::AppError;
use crate::settings::{SettingsManager, DURATION_PATTERN, PROGRAM, REWIND_SECONDS, STATUS_PATTERN};
use async_trait::async_trait;
use parser::{PositionTracker, StatusParser};
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Flags that make the player identify the media and print every status
/// update on its own line.
pub const IDENTIFY_FLAGS: &[&str] = &["-identify", "-msgmodule", "-msglevel", "all=8"];

pub const SEEK_FLAG: &str = "-ss";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Streaming,
    Finished,
    Failed,
}

/// What a session observed. `failure` is set (and `state` is `Failed`) when
/// the player exited abnormally; the positions are still usable.
#[derive(Debug)]
pub struct SessionOutcome {
    pub state: SessionState,
    pub observed_position: f64,
    pub position: f64,
    pub duration: f64,
    pub failure: Option<AppError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub program: String,
    pub rewind_seconds: f64,
    pub status_pattern: String,
    pub duration_pattern: String,
}

impl PlayerConfig {
    pub async fn load(settings: &SettingsManager) -> Result<Self, AppError> {
        Ok(Self {
            program: settings.get_setting(PROGRAM).await?,
            rewind_seconds: settings.get_setting_f64(REWIND_SECONDS).await?,
            status_pattern: settings.get_setting(STATUS_PATTERN).await?,
            duration_pattern: settings.get_setting(DURATION_PATTERN).await?,
        })
    }

    /// Arguments after the program name. The path is passed through
    /// byte for byte.
    pub fn build_args(&self, path: &Path, start_offset: f64) -> Vec<OsString> {
        let mut args: Vec<OsString> = IDENTIFY_FLAGS.iter().map(OsString::from).collect();

        if start_offset > 0.0 {
            args.push(SEEK_FLAG.into());
            args.push(start_offset.to_string().into());
        }

        args.push(path.as_os_str().to_os_string());
        args
    }
}

/// Seam between the `play` command and the process that actually plays the
/// file.
#[async_trait]
pub trait MediaLauncher: Send + Sync {
    async fn play(&self, path: &Path, start_offset: f64) -> Result<SessionOutcome, AppError>;
}

pub struct PlayerSession {
    config: PlayerConfig,
    parser: StatusParser,
}

impl PlayerSession {
    pub fn new(config: PlayerConfig) -> Result<Self, AppError> {
        let parser = StatusParser::new(&config.status_pattern, &config.duration_pattern)?;
        Ok(Self { config, parser })
    }

    pub async fn load(settings: &SettingsManager) -> Result<Self, AppError> {
        Self::new(PlayerConfig::load(settings).await?)
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Plays `path`, blocking until the player exits. Only a launch failure
    /// is returned as `Err`; an abnormal exit is reported in the outcome.
    pub async fn run(&self, path: &Path, start_offset: f64) -> Result<SessionOutcome, AppError> {
        let mut state = SessionState::Idle;
        transition(&mut state, SessionState::Starting);

        let path = absolute_path(path)?;
        let args = self.config.build_args(&path, start_offset);

        log::info!("Playing {}", path.display());
        log::debug!("Player command: {} {:?}", self.config.program, args);

        // stdout and stderr share one pipe so lines arrive in the order the
        // player wrote them.
        let (reader, writer) = io::pipe()?;
        let writer_err = writer.try_clone()?;

        let mut command = Command::new(&self.config.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err);
        let spawned = command.spawn();
        // The command still owns our copies of the write end; the reader only
        // sees end-of-stream once they are closed.
        drop(command);

        let mut child = spawned.map_err(|e| {
            transition(&mut state, SessionState::Failed);
            AppError::PlayerLaunchFailed {
                program: self.config.program.clone(),
                message: e.to_string(),
            }
        })?;

        transition(&mut state, SessionState::Streaming);

        let parser = self.parser.clone();
        let mut tracker = PositionTracker::starting_at(start_offset);
        let tracker = tokio::task::spawn_blocking(move || {
            consume(&parser, BufReader::new(reader), &mut tracker).map(|_| tracker)
        })
        .await
        .map_err(|e| AppError::Internal(format!("player output reader failed: {}", e)))??;

        let status = child.wait().await?;
        let failure = if status.success() {
            transition(&mut state, SessionState::Finished);
            None
        } else {
            transition(&mut state, SessionState::Failed);
            let err = AppError::PlayerAbnormalExit {
                code: status.code(),
            };
            log::warn!("{}", err);
            Some(err)
        };

        let position = tracker.final_position(self.config.rewind_seconds);
        log::info!("Saved position: {} of {}", position, tracker.duration());

        Ok(SessionOutcome {
            state,
            observed_position: tracker.position(),
            position,
            duration: tracker.duration(),
            failure,
        })
    }
}

#[async_trait]
impl MediaLauncher for PlayerSession {
    async fn play(&self, path: &Path, start_offset: f64) -> Result<SessionOutcome, AppError> {
        self.run(path, start_offset).await
    }
}

/// Feeds the merged player output to `tracker` one line at a time until
/// end-of-stream.
pub fn consume<R: BufRead>(
    parser: &StatusParser,
    mut reader: R,
    tracker: &mut PositionTracker,
) -> io::Result<()> {
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }

        let text = String::from_utf8_lossy(&line);
        tracker.observe(parser, text.trim_end_matches(['\n', '\r']));
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    log::debug!("Player session {:?} -> {:?}", state, next);
    *state = next;
}

/// Makes `path` absolute against the working directory without resolving
/// symlinks.
pub fn absolute_path(path: &Path) -> Result<PathBuf, AppError> {
    Ok(std::path::absolute(path)?)
}
