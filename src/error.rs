//! Errors for the fallible edges of the crate: reading tracks from files.
//!
//! The statistics themselves never fail; degenerate input yields zeros.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("failed to read track: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error("invalid JSON track: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse GPX file: {0}")]
    GpxParse(String),
    #[error("invalid timestamp in track: {0}")]
    InvalidTime(String),
    #[error("invalid value for `{field}`: {value:?}")]
    InvalidMetric { field: &'static str, value: String },
    #[error("unsupported track format: {0}")]
    UnsupportedFormat(String),
    #[error("track contains no fixes")]
    EmptyTrack,
}

pub type Result<T> = std::result::Result<T, TrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackError::InvalidMetric {
            field: "distance",
            value: "TODO".to_string(),
        };
        assert!(err.to_string().contains("distance"));
        assert!(err.to_string().contains("TODO"));

        let err = TrackError::UnsupportedFormat("fit".to_string());
        assert_eq!(err.to_string(), "unsupported track format: fit");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.gpx");
        let err: TrackError = io.into();
        assert!(matches!(err, TrackError::Io(_)));
    }
}
