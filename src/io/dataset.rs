//! Cleaned historical catalogue ingest.
//!
//! Expected columns (case-insensitive, a UTF-8 BOM on the first header is ignored):
//!
//! | column      | required | aliases |
//! |-------------|----------|---------|
//! | `time`      | yes      |         |
//! | `latitude`  | yes      |         |
//! | `longitude` | yes      |         |
//! | `depth_km`  | no       | `depth` |
//! | `magnitude` | yes      | `mag`   |
//! | `place`     | no       |         |
//!
//! Rows missing a time or magnitude are dropped and reported as row errors, the same as
//! rows that fail to parse. The file is not required to be sorted.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use serde::Deserialize;

use crate::domain::SeismicEvent;
use crate::error::{AppError, EXIT_INPUT};

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub events: Vec<SeismicEvent>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl LoadedDataset {
    pub fn rows_used(&self) -> usize {
        self.events.len()
    }
}

pub fn load_dataset(path: &Path) -> Result<LoadedDataset, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to open dataset '{}': {e}", path.display()),
        )
    })?;
    read_dataset(file)
}

pub fn read_dataset<R: Read>(input: R) -> Result<LoadedDataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read dataset headers: {e}")))?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut events = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| columns.parse_row(&record));
        match parsed {
            Ok(event) => events.push(event),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        log::debug!("dataset: {} of {rows_read} rows skipped", row_errors.len());
    }

    Ok(LoadedDataset {
        events,
        row_errors,
        rows_read,
    })
}

struct Columns {
    time: usize,
    latitude: usize,
    longitude: usize,
    depth: Option<usize>,
    magnitude: usize,
    place: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, AppError> {
        let map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (normalize_header_name(name), idx))
            .collect();

        let find = |names: &[&str]| names.iter().find_map(|n| map.get(*n).copied());
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| {
                AppError::new(
                    EXIT_INPUT,
                    format!("Dataset is missing required column: `{}`", names[0]),
                )
            })
        };

        Ok(Self {
            time: require(&["time"])?,
            latitude: require(&["latitude"])?,
            longitude: require(&["longitude"])?,
            depth: find(&["depth_km", "depth"]),
            magnitude: require(&["magnitude", "mag"])?,
            place: find(&["place"]),
        })
    }

    fn parse_row(&self, record: &StringRecord) -> Result<SeismicEvent, String> {
        let time = parse_time(field(record, Some(self.time)).ok_or("Missing `time` value.")?)?;
        let magnitude = parse_number(field(record, Some(self.magnitude)), "magnitude")?
            .ok_or("Missing `magnitude` value.")?;
        let latitude = parse_number(field(record, Some(self.latitude)), "latitude")?
            .ok_or("Missing `latitude` value.")?;
        let longitude = parse_number(field(record, Some(self.longitude)), "longitude")?
            .ok_or("Missing `longitude` value.")?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("Coordinates ({latitude}, {longitude}) out of range."));
        }
        let depth_km = parse_number(field(record, self.depth), "depth_km")?;
        let place = field(record, self.place).map(str::to_string);

        Ok(SeismicEvent {
            time,
            latitude,
            longitude,
            depth_km,
            magnitude,
            place,
        })
    }
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn field(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    record.get(idx?).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number(value: Option<&str>, name: &str) -> Result<Option<f64>, String> {
    let Some(s) = value else { return Ok(None) };
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(format!("Invalid `{name}` value '{s}'.")),
    }
}

/// Timestamps are UTC. Offsets are honoured; naive timestamps are taken as UTC.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(t.with_timezone(&Utc));
    }
    const NAIVE: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];
    for fmt in NAIVE {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(t.and_utc());
        }
    }
    Err(format!(
        "Invalid time '{s}'. Expected RFC 3339 or 'YYYY-MM-DD HH:MM:SS[+HH:MM]'."
    ))
}

/// serde adapter for timestamp fields, accepting everything [`parse_time`] does.
pub fn deserialize_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(raw.trim()).map_err(serde::de::Error::custom)
}
