//! Turns player output lines into typed events and folds them into the
//! live position/duration.

use crate::errors::AppError;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineEvent {
    DurationObserved(f64),
    /// The smaller of the audio and video clocks.
    PositionObserved(f64),
    Ignored,
}

/// Matches the duration marker and status line shapes configured in the
/// store.
#[derive(Debug, Clone)]
pub struct StatusParser {
    status: Regex,
    duration: Regex,
}

impl StatusParser {
    /// `status_pattern` needs two capture groups (audio, video clock) and
    /// `duration_pattern` one.
    pub fn new(status_pattern: &str, duration_pattern: &str) -> Result<Self, AppError> {
        let status = Regex::new(status_pattern)?;
        let duration = Regex::new(duration_pattern)?;

        if status.captures_len() < 3 {
            return Err(AppError::InvalidPattern(format!(
                "status pattern needs two capture groups: {}",
                status_pattern
            )));
        }
        if duration.captures_len() < 2 {
            return Err(AppError::InvalidPattern(format!(
                "duration pattern needs a capture group: {}",
                duration_pattern
            )));
        }

        Ok(Self { status, duration })
    }

    /// Classifies one line. The duration marker and the status line are
    /// matched independently, so a line carrying both yields both events.
    /// A match whose numbers do not parse comes back as
    /// `MalformedStatusLine` without hiding the other match.
    pub fn parse_line(&self, line: &str) -> Vec<Result<LineEvent, AppError>> {
        let mut events = Vec::new();

        if let Some(caps) = self.duration.captures(line) {
            events.push(
                parse_seconds(caps.get(1).map(|m| m.as_str()), line)
                    .map(LineEvent::DurationObserved),
            );
        }

        if let Some(caps) = self.status.captures(line) {
            let audio = parse_seconds(caps.get(1).map(|m| m.as_str()), line);
            let video = parse_seconds(caps.get(2).map(|m| m.as_str()), line);
            events.push(
                audio
                    .and_then(|a| video.map(|v| a.min(v)))
                    .map(LineEvent::PositionObserved),
            );
        }

        if events.is_empty() {
            events.push(Ok(LineEvent::Ignored));
        }
        events
    }

    /// Events for every line in a captured chunk of output. Carriage
    /// returns count as line breaks since status lines are often redrawn
    /// in place.
    pub fn events<'a>(
        &'a self,
        output: &'a str,
    ) -> impl Iterator<Item = Result<LineEvent, AppError>> + 'a {
        output
            .split(['\n', '\r'])
            .filter(|line| !line.is_empty())
            .flat_map(move |line| self.parse_line(line))
    }
}

fn parse_seconds(field: Option<&str>, line: &str) -> Result<f64, AppError> {
    field
        .and_then(|text| text.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .ok_or_else(|| AppError::MalformedStatusLine(line.to_string()))
}

/// Running position/duration for one playback session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionTracker {
    position: f64,
    duration: f64,
}

impl PositionTracker {
    /// Starts from the seek offset so a player that never reports a status
    /// line keeps the resume point.
    pub fn starting_at(offset: f64) -> Self {
        Self {
            position: offset.max(0.0),
            duration: 0.0,
        }
    }

    pub fn apply(&mut self, event: LineEvent) {
        match event {
            LineEvent::DurationObserved(value) => {
                self.duration = self.duration.max(value);
            }
            LineEvent::PositionObserved(value) => {
                self.position = value;
                self.duration = self.duration.max(value);
            }
            LineEvent::Ignored => {}
        }
    }

    /// Feeds one raw output line, skipping anything malformed.
    pub fn observe(&mut self, parser: &StatusParser, line: &str) {
        for segment in line.split('\r').filter(|s| !s.is_empty()) {
            for event in parser.parse_line(segment) {
                match event {
                    Ok(event) => {
                        if let LineEvent::DurationObserved(value) = event {
                            log::info!("Found duration: {}", value);
                        }
                        self.apply(event);
                    }
                    Err(e) => log::debug!("Skipping player output: {}", e),
                }
            }
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Position to persist: shifted back by `rewind_seconds`, never negative.
    pub fn final_position(&self, rewind_seconds: f64) -> f64 {
        (self.position - rewind_seconds).max(0.0)
    }
}
