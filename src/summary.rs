//! Trip-level totals folded from day records.
//!
//! A [`RideSummary`] is always derived from the [`Day`] list, never from raw
//! fixes, so the totals always agree with the per-day numbers shown next to
//! them.

use crate::days::Day;
use crate::TrackerConfig;

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Trip totals across all days.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RideSummary {
    /// Total distance in meters
    pub distance: f64,
    /// Percentage of the planned route covered, one decimal
    pub progress: f64,
    pub elevation_gain: i64,
    pub elevation_loss: i64,
    /// Seconds spent moving
    pub moving_time: i64,
    /// Elapsed whole days minus moving time, in seconds
    pub resting_time: i64,
    /// Highest altitude of any day
    pub max_altitude: f64,
    /// Lowest altitude of any day
    pub min_altitude: f64,
    pub elapsed_days: u32,
    pub remaining_days: u32,
}

impl RideSummary {
    /// Fold day records into trip totals.
    ///
    /// Every day in the list counts as an elapsed day.
    pub fn from_days(days: &[Day], config: &TrackerConfig) -> Self {
        let mut summary = Self::default();
        for day in days {
            summary.distance += day.distance;
            summary.elevation_gain += day.elevation_gain;
            summary.elevation_loss += day.elevation_loss;
            summary.moving_time += day.moving_time;
        }

        summary.max_altitude = days.iter().map(|d| d.max_altitude).reduce(f64::max).unwrap_or(0.0);
        summary.min_altitude = days.iter().map(|d| d.min_altitude).reduce(f64::min).unwrap_or(0.0);

        summary.elapsed_days = days.len() as u32;
        summary.remaining_days = remaining_days(summary.elapsed_days, config.target_days);
        summary.resting_time = resting_time(summary.elapsed_days, summary.moving_time);
        summary.progress = progress(summary.distance, config.target_distance_km);
        summary
    }
}

/// Percentage of `target_km` covered by `distance_meters`, one decimal.
///
/// ```rust
/// use ride_tracker::summary::progress;
///
/// assert_eq!(progress(1_945_500.0, 3891.0), 50.0);
/// ```
pub fn progress(distance_meters: f64, target_km: f64) -> f64 {
    if target_km <= 0.0 {
        return 0.0;
    }
    one_decimal(distance_meters / 1000.0 / target_km * 100.0)
}

/// Seconds not spent moving over `elapsed_days` whole days.
///
/// Goes negative if moving time exceeds the elapsed days; that only
/// happens when the moving-time accounting disagrees with the day count.
pub fn resting_time(elapsed_days: u32, moving_seconds: i64) -> i64 {
    i64::from(elapsed_days) * SECONDS_PER_DAY - moving_seconds
}

/// Days left of the planned trip, never below zero.
pub fn remaining_days(elapsed_days: u32, target_days: u32) -> u32 {
    target_days.saturating_sub(elapsed_days)
}

// ============================================================================
// Formatting
// ============================================================================

/// Round to one decimal place, the way `{:.1}` prints it.
///
/// Rounding works on the exact binary value and breaks exact ties to even,
/// so `0.25` becomes `0.2` and `0.35` (stored just below) becomes `0.3`.
pub fn one_decimal(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

/// Meters to kilometers.
pub fn in_km(meters: f64) -> f64 {
    meters / 1000.0
}

/// Format seconds as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_duration(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();
    format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
