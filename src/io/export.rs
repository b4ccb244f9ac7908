//! Export derived batch features to CSV.
//!
//! One row per event, in time order: the source event columns followed by the eight
//! context features in schema order. The layout is what model training reads back.

use std::path::Path;

use crate::error::{AppError, EXIT_INPUT};
use crate::features::batch::FeatureRow;
use crate::features::schema::PointFeature;

const EVENT_COLUMNS: [&str; 6] = ["time", "latitude", "longitude", "depth_km", "magnitude", "place"];

pub fn feature_csv_header() -> Vec<&'static str> {
    EVENT_COLUMNS
        .into_iter()
        .chain(
            PointFeature::ALL
                .into_iter()
                .filter(|f| f.is_context())
                .map(PointFeature::name),
        )
        .collect()
}

pub fn write_features_csv(path: &Path, rows: &[FeatureRow]) -> Result<(), AppError> {
    let writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to create features CSV '{}': {e}", path.display()),
        )
    })?;
    write_features(writer, rows)
}

fn write_features<W: std::io::Write>(mut writer: csv::Writer<W>, rows: &[FeatureRow]) -> Result<(), AppError> {
    let write_err = |e: csv::Error| AppError::new(EXIT_INPUT, format!("Failed to write features CSV: {e}"));

    writer.write_record(feature_csv_header()).map_err(write_err)?;
    for row in rows {
        let event = &row.event;
        let mut record = vec![
            event.time.to_rfc3339(),
            event.latitude.to_string(),
            event.longitude.to_string(),
            event.depth_km.map(|d| d.to_string()).unwrap_or_default(),
            event.magnitude.to_string(),
            event.place.clone().unwrap_or_default(),
        ];
        record.extend(
            PointFeature::ALL
                .into_iter()
                .filter(|f| f.is_context())
                .map(|f| row.features.get(f).to_string()),
        );
        writer.write_record(&record).map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to flush features CSV: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeismicEvent;
    use crate::features::batch::build_features;
    use chrono::{TimeZone, Utc};

    #[test]
    fn header_has_event_then_context_columns() {
        let header = feature_csv_header();
        assert_eq!(header.len(), 14);
        assert_eq!(header[5], "place");
        assert_eq!(header[6], "prev_magnitude");
        assert_eq!(header[13], "seismic_zone");
    }

    #[test]
    fn writes_one_row_per_event() {
        let events = vec![
            SeismicEvent {
                time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                latitude: 28.6,
                longitude: 77.2,
                depth_km: None,
                magnitude: 4.5,
                place: Some("Delhi, India".to_string()),
            },
            SeismicEvent {
                time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                latitude: 28.7,
                longitude: 77.1,
                depth_km: Some(12.0),
                magnitude: 3.5,
                place: None,
            },
        ];
        let rows = build_features(&events);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        write_features_csv(&path, &rows).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][4], "3.5");
        assert_eq!(&records[1][3], "");
        assert_eq!(&records[1][5], "Delhi, India");
        // prev_magnitude of the later event is the earlier one's
        assert_eq!(&records[1][6], "3.5");
    }
}
