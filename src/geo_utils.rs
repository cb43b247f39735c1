//! # Geographic Utilities
//!
//! Core numeric primitives for turning a stream of GPS fixes into ride
//! statistics.
//!
//! All functions are pure, walk the input with `windows(2)` and never
//! allocate. They are the hot path for every day bucket that misses the
//! cache.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points (m) |
//! | [`distance_km`] | Great-circle distance between two fixes (km) |
//! | [`path_distance`] | Total length of a fix sequence (m) |
//! | [`speed`] | Instantaneous speed between two fixes (m/s) |
//! | [`moving_time_and_average_speed`] | Moving time, average and max speed |
//! | [`altitude_stats`] | Average/max/min altitude over valid fixes |
//! | [`elevation_gain_loss`] | Accumulated climbing and descending |
//! | [`max_speed`] | Fastest pair in a sequence (km/h) |
//! | [`detect_stops`] | Number and duration of stops |
//! | [`current_movement`] | Speed and moving flag from the last two fixes |
//!
//! ## Units
//!
//! Distances are meters and durations are seconds. Speeds are m/s except
//! where a function name or field says `kmh`.
//!
//! ## Example
//!
//! ```rust
//! use ride_tracker::{Fix, geo_utils};
//!
//! let track = vec![
//!     Fix::new(55.6761, 12.5683, 10.0, 0),
//!     Fix::new(55.6861, 12.5683, 30.0, 300),
//!     Fix::new(55.6961, 12.5683, 20.0, 600),
//! ];
//!
//! let length = geo_utils::path_distance(&track);
//! assert!((length - 2224.0).abs() < 5.0);
//!
//! let (gain, loss) = geo_utils::elevation_gain_loss(&track);
//! assert_eq!((gain, loss), (20, 10));
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances use the haversine formula on a sphere with the mean Earth
//! radius (6,371.0088 km), accurate to within 0.3% for GPS tracks.
//!
//! ### Altitude Anomalies
//!
//! The device reports a meaningless altitude when a tracking session starts
//! and occasionally reports negative altitudes. [`is_altitude_valid`] is the
//! single predicate used to drop those fixes from altitude statistics.

use geo::{Distance, Haversine, Point};

use crate::summary::one_decimal;
use crate::{Fix, GpsPoint};

/// Conversion factor from m/s to km/h.
pub const MPS_TO_KMH: f64 = 3.6;

// =============================================================================
// Result Types
// =============================================================================

/// Moving time and speeds of a fix sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovingStats {
    /// Seconds spent in pairs faster than the moving threshold
    pub moving_seconds: i64,
    /// Moving distance over moving time, in km/h
    pub average_speed_kmh: f64,
    /// Fastest pair of the whole sequence, in km/h
    pub max_speed_kmh: f64,
}

/// Altitude extremes over the valid fixes of a sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AltitudeStats {
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

/// Stops found in a fix sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopStats {
    pub count: u32,
    pub total_seconds: i64,
}

/// Current movement derived from the newest fixes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Movement {
    /// Speed between the last two fixes in km/h, one decimal
    pub speed_kmh: f64,
    /// True if the last two fixes have different coordinates
    pub is_moving: bool,
    /// Timestamp of the newest fix
    pub last_ping: Option<i64>,
}

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns the distance in meters. Identical points return exactly 0.0.
///
/// # Example
///
/// ```rust
/// use ride_tracker::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Great-circle distance between two fixes in meters.
#[inline]
pub fn fix_distance(a: &Fix, b: &Fix) -> f64 {
    haversine_distance(&a.position(), &b.position())
}

/// Great-circle distance between two fixes in kilometers.
#[inline]
pub fn distance_km(a: &Fix, b: &Fix) -> f64 {
    fix_distance(a, b) / 1000.0
}

/// Calculate the total length of a fix sequence in meters.
///
/// Sums the haversine distance between consecutive fixes. Empty or
/// single-fix sequences return 0.0.
pub fn path_distance(fixes: &[Fix]) -> f64 {
    if fixes.len() < 2 {
        return 0.0;
    }

    fixes.windows(2).map(|w| fix_distance(&w[0], &w[1])).sum()
}

// =============================================================================
// Speed Functions
// =============================================================================

#[inline]
fn elapsed_seconds(a: &Fix, b: &Fix) -> i64 {
    // Out-of-range timestamps read as no elapsed time
    b.timestamp.checked_sub(a.timestamp).unwrap_or(0)
}

#[inline]
fn pair_speed(distance: f64, elapsed: i64) -> f64 {
    if elapsed <= 0 {
        return 0.0;
    }
    distance / elapsed as f64
}

/// Instantaneous speed between two fixes in m/s.
///
/// Returns 0.0 when both fixes share a timestamp. A zero speed therefore
/// does not mean the device stood still; check the distance as well.
#[inline]
pub fn speed(a: &Fix, b: &Fix) -> f64 {
    pair_speed(fix_distance(a, b), elapsed_seconds(a, b))
}

/// Moving time, average moving speed and max speed of a fix sequence.
///
/// A pair of consecutive fixes counts as moving when its speed is strictly
/// above `speed_threshold` (m/s). Only moving pairs contribute distance and
/// time to the average; the max speed is taken over all pairs.
///
/// Returns all zeros when no pair was moving.
///
/// # Example
///
/// ```rust
/// use ride_tracker::{Fix, geo_utils};
///
/// let track = vec![
///     Fix::new(55.6761, 12.5683, 0.0, 0),
///     Fix::new(55.6761, 12.5683, 0.0, 600),   // parked for ten minutes
///     Fix::new(55.6861, 12.5683, 0.0, 900),   // ~1112 m in five minutes
/// ];
///
/// let stats = geo_utils::moving_time_and_average_speed(&track, 1.0);
/// assert_eq!(stats.moving_seconds, 300);
/// assert!((stats.average_speed_kmh - 13.3).abs() < 0.1);
/// ```
pub fn moving_time_and_average_speed(fixes: &[Fix], speed_threshold: f64) -> MovingStats {
    let mut moving_meters = 0.0;
    let mut moving_seconds = 0i64;
    let mut max_mps = 0.0f64;

    for w in fixes.windows(2) {
        let distance = fix_distance(&w[0], &w[1]);
        let elapsed = elapsed_seconds(&w[0], &w[1]);
        let v = pair_speed(distance, elapsed);

        max_mps = max_mps.max(v);
        if v > speed_threshold {
            moving_meters += distance;
            moving_seconds = moving_seconds.saturating_add(elapsed);
        }
    }

    if moving_seconds == 0 {
        return MovingStats::default();
    }

    MovingStats {
        moving_seconds,
        average_speed_kmh: moving_meters / moving_seconds as f64 * MPS_TO_KMH,
        max_speed_kmh: max_mps * MPS_TO_KMH,
    }
}

/// Fastest pair of consecutive fixes in km/h, regardless of any moving threshold.
pub fn max_speed(fixes: &[Fix]) -> f64 {
    fixes
        .windows(2)
        .map(|w| speed(&w[0], &w[1]))
        .fold(0.0, f64::max)
        * MPS_TO_KMH
}

// =============================================================================
// Altitude Functions
// =============================================================================

/// Whether a fix's altitude can be trusted.
///
/// Negative altitudes and the altitude reported with the tracking-start
/// message are sensor artifacts.
#[inline]
pub fn is_altitude_valid(fix: &Fix) -> bool {
    fix.altitude >= 0.0 && !fix.is_tracking_start()
}

/// Average, max and min altitude over the valid fixes.
///
/// Returns all zeros if no fix has a valid altitude.
pub fn altitude_stats(fixes: &[Fix]) -> AltitudeStats {
    let mut count = 0usize;
    let mut total = 0.0;
    let mut max = f64::MIN;
    let mut min = f64::MAX;

    for fix in fixes.iter().filter(|f| is_altitude_valid(f)) {
        count += 1;
        total += fix.altitude;
        max = max.max(fix.altitude);
        min = min.min(fix.altitude);
    }

    if count == 0 {
        return AltitudeStats::default();
    }

    AltitudeStats {
        average: total / count as f64,
        max,
        min,
    }
}

/// Accumulated elevation gain and loss in whole meters.
///
/// Each valid fix is compared with the previous valid fix, so an invalid
/// fix is skipped rather than breaking the chain. Every delta is truncated
/// to whole meters before it is accumulated. Loss is returned as a
/// non-negative magnitude.
pub fn elevation_gain_loss(fixes: &[Fix]) -> (i64, i64) {
    let mut gain = 0i64;
    let mut loss = 0i64;
    let mut previous: Option<f64> = None;

    for fix in fixes.iter().filter(|f| is_altitude_valid(f)) {
        if let Some(prev) = previous {
            let delta = (fix.altitude - prev) as i64;
            if delta > 0 {
                gain += delta;
            } else {
                loss -= delta;
            }
        }
        previous = Some(fix.altitude);
    }

    (gain, loss)
}

// =============================================================================
// Stops and Movement
// =============================================================================

/// Count stops and their total duration.
///
/// A pair of consecutive fixes slower than `speed_floor_kmh` is stopped; a
/// contiguous run of stopped pairs is one stop. Pairs sharing a timestamp
/// and a position join a stop without adding time. Pairs sharing a
/// timestamp but not a position are skipped and neither start nor end a
/// stop.
///
/// # Example
///
/// ```rust
/// use ride_tracker::{Fix, geo_utils};
///
/// let track = vec![
///     Fix::new(40.7128, -74.0060, 0.0, 1_609_459_200),
///     Fix::new(40.7128, -74.0060, 0.0, 1_609_459_260),
///     Fix::new(40.7138, -74.0065, 0.0, 1_609_459_320),
///     Fix::new(40.7138, -74.0065, 0.0, 1_609_459_380),
/// ];
///
/// let stops = geo_utils::detect_stops(&track, 1.0);
/// assert_eq!(stops.count, 2);
/// assert_eq!(stops.total_seconds, 120);
/// ```
pub fn detect_stops(fixes: &[Fix], speed_floor_kmh: f64) -> StopStats {
    let mut stats = StopStats::default();
    let mut in_stop = false;

    for w in fixes.windows(2) {
        let elapsed = elapsed_seconds(&w[0], &w[1]);
        let distance = fix_distance(&w[0], &w[1]);

        // No elapsed time but a change of position says nothing about stopping
        if elapsed <= 0 && distance > 0.0 {
            continue;
        }

        let kmh = pair_speed(distance, elapsed) * MPS_TO_KMH;
        if kmh < speed_floor_kmh {
            if !in_stop {
                stats.count += 1;
                in_stop = true;
            }
            stats.total_seconds = stats.total_seconds.saturating_add(elapsed.max(0));
        } else {
            in_stop = false;
        }
    }

    stats
}

/// Speed and moving flag between the two newest fixes.
///
/// With fewer than two fixes the device is reported as not moving.
pub fn current_movement(fixes: &[Fix]) -> Movement {
    let last_ping = fixes.last().map(|f| f.timestamp);

    match fixes {
        [.., previous, last] => Movement {
            speed_kmh: one_decimal(speed(previous, last) * MPS_TO_KMH),
            is_moving: previous.latitude != last.latitude
                || previous.longitude != last.longitude,
            last_ping,
        },
        _ => Movement {
            last_ping,
            ..Movement::default()
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
