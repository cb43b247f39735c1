//! Reading fixes from recorded tracks.
//!
//! Two formats are supported:
//! - GPX tracks (`gpx` feature), as exported by most bike computers
//! - JSON track fixtures (`serde` feature): a list of points plus the
//!   distance, moving time, average speed and elevation a reference tool
//!   reported for the same ride. Fixtures are used to check the statistics
//!   against known-good numbers.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::debug;

use crate::error::{Result, TrackError};
use crate::Fix;

#[cfg(feature = "serde")]
use crate::{
    geo_utils::{elevation_gain_loss, moving_time_and_average_speed, path_distance},
    TrackerConfig,
};

// ============================================================================
// GPX
// ============================================================================

/// Read every timed track point of a GPX document as a fix.
///
/// Points without a timestamp are skipped. Points without an elevation get
/// a NaN altitude, which the altitude statistics ignore.
#[cfg(feature = "gpx")]
pub fn fixes_from_gpx<R: Read>(reader: R) -> Result<Vec<Fix>> {
    use chrono::DateTime;

    let gpx = gpx::read(reader).map_err(|e| TrackError::GpxParse(e.to_string()))?;
    let mut fixes = Vec::new();
    let mut untimed = 0usize;

    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                let Some(time) = point.time else {
                    untimed += 1;
                    continue;
                };
                let iso = time
                    .format()
                    .map_err(|e| TrackError::InvalidTime(e.to_string()))?;
                let timestamp = DateTime::parse_from_rfc3339(&iso)
                    .map_err(|e| TrackError::InvalidTime(format!("{iso}: {e}")))?
                    .timestamp();

                let position = point.point();
                let fix = Fix::new(
                    position.y(),
                    position.x(),
                    point.elevation.unwrap_or(f64::NAN),
                    timestamp,
                )
                .with_id(fixes.len() as i64);
                fixes.push(fix);
            }
        }
    }

    if untimed > 0 {
        debug!("[Import] Skipped {} GPX points without a timestamp", untimed);
    }

    Ok(fixes)
}

// ============================================================================
// JSON fixtures
// ============================================================================

/// One point of a JSON track fixture.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackPoint {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    pub timestamp: i64,
}

/// A recorded ride with the reference numbers it should produce.
///
/// Reference values are strings so fixtures can leave a value unset
/// (e.g. `"TODO"`) until it has been measured.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackFixture {
    /// Meters
    pub distance: String,
    /// Seconds
    pub moving_time: String,
    /// km/h
    pub average_speed: String,
    pub elevation_gain: String,
    pub elevation_loss: String,
    pub points: Vec<TrackPoint>,
}

/// Parsed reference values of a [`TrackFixture`].
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedMetrics {
    pub distance: f64,
    pub moving_time: f64,
    pub average_speed: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
}

#[cfg(feature = "serde")]
impl TrackFixture {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a fixture from fixes, filling the reference values with this
    /// crate's own statistics.
    pub fn from_fixes(fixes: &[Fix], config: &TrackerConfig) -> Self {
        let moving = moving_time_and_average_speed(fixes, config.moving_speed_threshold);
        let (gain, loss) = elevation_gain_loss(fixes);

        Self {
            distance: format!("{:.1}", path_distance(fixes)),
            moving_time: moving.moving_seconds.to_string(),
            average_speed: format!("{:.2}", moving.average_speed_kmh),
            elevation_gain: gain.to_string(),
            elevation_loss: loss.to_string(),
            points: fixes
                .iter()
                .map(|f| TrackPoint {
                    longitude: f.longitude,
                    latitude: f.latitude,
                    altitude: f.altitude.is_finite().then_some(f.altitude),
                    timestamp: f.timestamp,
                })
                .collect(),
        }
    }

    pub fn to_fixes(&self) -> Vec<Fix> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Fix::new(p.latitude, p.longitude, p.altitude.unwrap_or(f64::NAN), p.timestamp)
                    .with_id(i as i64)
            })
            .collect()
    }

    /// Parse the reference values.
    pub fn expected(&self) -> Result<ExpectedMetrics> {
        Ok(ExpectedMetrics {
            distance: parse_metric("distance", &self.distance)?,
            moving_time: parse_metric("movingTime", &self.moving_time)?,
            average_speed: parse_metric("averageSpeed", &self.average_speed)?,
            elevation_gain: parse_metric("elevationGain", &self.elevation_gain)?,
            elevation_loss: parse_metric("elevationLoss", &self.elevation_loss)?,
        })
    }
}

#[cfg(feature = "serde")]
fn parse_metric(field: &'static str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| TrackError::InvalidMetric {
            field,
            value: value.to_string(),
        })
}

// ============================================================================
// Files
// ============================================================================

/// Load fixes from a `.gpx` or `.json` file, chosen by extension.
pub fn load_fixes(path: &Path) -> Result<Vec<Fix>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let reader = BufReader::new(File::open(path)?);

    let fixes = match extension.as_str() {
        #[cfg(feature = "gpx")]
        "gpx" => fixes_from_gpx(reader)?,
        #[cfg(feature = "serde")]
        "json" => TrackFixture::from_reader(reader)?.to_fixes(),
        other => return Err(TrackError::UnsupportedFormat(other.to_string())),
    };

    if fixes.is_empty() {
        return Err(TrackError::EmptyTrack);
    }

    debug!("[Import] Loaded {} fixes from {}", fixes.len(), path.display());
    Ok(fixes)
}
