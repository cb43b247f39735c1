//! # Ride Tracker
//!
//! Day aggregation, ride statistics and route simplification for a single
//! ongoing GPS-tracked trip.
//!
//! This library provides:
//! - Per-calendar-day ride statistics (distance, elevation, moving time, speeds, stops)
//! - A memoized day cache that only recomputes days whose fixes changed
//! - Trip-level totals and progress against a planned route length
//! - Ramer-Douglas-Peucker polyline simplification for map rendering
//!
//! ## Features
//!
//! - **`serde`** - Serialize/Deserialize on public records, JSON track fixtures (default)
//! - **`parallel`** - Compute stale day buckets in parallel with rayon
//! - **`gpx`** - Import fixes from GPX tracks
//! - **`cli`** - The `ride-stats` command line tool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{FixedOffset, NaiveDate};
//! use ride_tracker::{CalendarZone, DayAggregator, Fix, TrackerConfig};
//!
//! let config = TrackerConfig {
//!     zone: CalendarZone::Fixed(FixedOffset::east_opt(0).unwrap()),
//!     ..TrackerConfig::default()
//! };
//! let aggregator = DayAggregator::new(config);
//!
//! // 2024-06-01 08:00:00 UTC, then ten minutes of riding north
//! let fixes = vec![
//!     Fix::new(55.6761, 12.5683, 10.0, 1_717_228_800),
//!     Fix::new(55.6861, 12.5683, 14.0, 1_717_229_100),
//!     Fix::new(55.6961, 12.5683, 12.0, 1_717_229_400),
//! ];
//!
//! let today = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
//! let report = aggregator.aggregate_at(&fixes, today);
//!
//! assert_eq!(report.days.len(), 1);
//! assert_eq!(report.days[0].date_key(), "2024-06-01");
//! assert!(report.summary.distance > 2000.0);
//! ```

pub mod days;
pub mod error;
pub mod geo_utils;
#[cfg(any(feature = "serde", feature = "gpx"))]
pub mod import;
pub mod polyline;
pub mod simplify;
pub mod summary;

pub use days::{
    compute_day, date_of, fixes_for_day, group_by_day, CalendarZone, Day, DayAggregator,
    DayCache, DayReport,
};
pub use error::{Result, TrackError};
pub use geo_utils::{AltitudeStats, Movement, MovingStats, StopStats};
pub use polyline::Polyline;
pub use simplify::{simplify, simplify_indices};
pub use summary::RideSummary;

// ============================================================================
// Core Types
// ============================================================================

/// Message code the device reports when a tracking session starts.
///
/// Fixes carrying this code report an unreliable altitude.
pub const MESSAGE_CODE_TRACKING_STARTED: i32 = 10;

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use ride_tracker::GpsPoint;
/// let point = GpsPoint::new(55.6761, 12.5683); // Copenhagen
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box for a track.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self { min_lat, max_lat, min_lng, max_lng })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// One GPS/status sample reported by the tracking device.
///
/// Fixes are created by the ingestion side and are read-only here. Every
/// operation in this crate expects slices of fixes sorted ascending by
/// `timestamp`; nothing in the crate sorts them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fix {
    /// Sequence id assigned by storage
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters; the device sometimes reports negative or implausible values
    pub altitude: f64,
    /// Unix timestamp in seconds
    pub timestamp: i64,
    /// Device message code, see [`MESSAGE_CODE_TRACKING_STARTED`]
    pub message_code: i32,
    /// Device-reported speed, carried through unchanged
    pub speed: f64,
    /// Device-reported course, carried through unchanged
    pub course: f64,
    /// Device-reported GPS fix quality, carried through unchanged
    pub gps_fix: i32,
}

impl Fix {
    /// Create a fix from a position, altitude and unix timestamp.
    ///
    /// Remaining fields start at zero.
    pub fn new(latitude: f64, longitude: f64, altitude: f64, timestamp: i64) -> Self {
        Self {
            id: 0,
            latitude,
            longitude,
            altitude,
            timestamp,
            message_code: 0,
            speed: 0.0,
            course: 0.0,
            gps_fix: 0,
        }
    }

    /// Set the storage id.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Set the device message code.
    pub fn with_message_code(mut self, message_code: i32) -> Self {
        self.message_code = message_code;
        self
    }

    /// The fix's position.
    #[inline]
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    /// Whether this fix opens a tracking session.
    pub fn is_tracking_start(&self) -> bool {
        self.message_code == MESSAGE_CODE_TRACKING_STARTED
    }
}

/// Configuration for day aggregation and simplification.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Speed above which a pair of fixes counts as moving, in m/s.
    /// Default: 1.0 (3.6 km/h, filters GPS drift while parked)
    pub moving_speed_threshold: f64,

    /// Speed below which a pair of fixes counts as stopped, in km/h.
    /// Default: 1.0
    pub stop_speed_floor_kmh: f64,

    /// Tolerance for Douglas-Peucker simplification (in degrees).
    /// Default: 0.0002 (~22 meters)
    pub simplification_tolerance: f64,

    /// Planned route length in kilometers.
    /// Default: 3891.0
    pub target_distance_km: f64,

    /// Planned trip duration in days.
    /// Default: 30
    pub target_days: u32,

    /// Calendar used to assign fixes to days.
    /// Default: the server's local time zone
    pub zone: CalendarZone,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            moving_speed_threshold: 1.0,
            stop_speed_floor_kmh: 1.0,
            simplification_tolerance: 0.0002,
            target_distance_km: 3891.0,
            target_days: 30,
            zone: CalendarZone::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(55.6761, 12.5683).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_bounds_from_points() {
        let points = vec![
            GpsPoint::new(51.50, -0.13),
            GpsPoint::new(51.51, -0.12),
            GpsPoint::new(51.505, -0.125),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);

        let center = bounds.center();
        assert!((center.latitude - 51.505).abs() < 1e-9);
        assert!((center.longitude + 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_empty() {
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_fix_builders() {
        let fix = Fix::new(55.0, 12.0, -5.0, 100)
            .with_id(7)
            .with_message_code(MESSAGE_CODE_TRACKING_STARTED);
        assert_eq!(fix.id, 7);
        assert!(fix.is_tracking_start());
        assert_eq!(fix.position(), GpsPoint::new(55.0, 12.0));
    }

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.moving_speed_threshold, 1.0);
        assert_eq!(config.simplification_tolerance, 0.0002);
        assert_eq!(config.target_distance_km, 3891.0);
        assert_eq!(config.target_days, 30);
        assert_eq!(config.zone, CalendarZone::Local);
    }
}
