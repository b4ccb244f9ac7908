//! Recent-events JSON input for `predict` and `explain`.
//!
//! Accepts either a bare array of events or an object with a `recent_events` array, so a
//! request body can be passed through unchanged.

use std::path::Path;

use serde::Deserialize;

use crate::domain::RecentEvent;
use crate::error::{AppError, EXIT_INPUT};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecentEventsFile {
    List(Vec<RecentEvent>),
    Wrapped { recent_events: Vec<RecentEvent> },
}

pub fn read_recent_events(path: &Path) -> Result<Vec<RecentEvent>, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to read recent events '{}': {e}", path.display()),
        )
    })?;
    parse_recent_events(&text)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("{}: {}", path.display(), e.message())))
}

pub fn parse_recent_events(text: &str) -> Result<Vec<RecentEvent>, AppError> {
    let file: RecentEventsFile = serde_json::from_str(text).map_err(|e| {
        AppError::new(EXIT_INPUT, format!("invalid recent events JSON: {e}"))
    })?;
    Ok(match file {
        RecentEventsFile::List(events) => events,
        RecentEventsFile::Wrapped { recent_events } => recent_events,
    })
}
