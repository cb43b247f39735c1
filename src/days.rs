//! Day aggregation with a memoized cache of finished days.
//!
//! Fixes are grouped into calendar-day buckets, each bucket is turned into a
//! [`Day`] record, and the records are folded into a [`RideSummary`].
//!
//! Days before today never change once the device has moved on, so their
//! records are cached by date. A cached record is only reused while the
//! bucket still holds the number of fixes it was computed from; a late or
//! backfilled fix invalidates it. Today's record is always recomputed and
//! never cached.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Utc};
use log::{debug, info, warn};

use crate::geo_utils::{
    altitude_stats, current_movement, detect_stops, elevation_gain_loss,
    moving_time_and_average_speed, path_distance, Movement,
};
use crate::polyline::Polyline;
use crate::summary::RideSummary;
use crate::{Fix, TrackerConfig};

// ============================================================================
// Calendar
// ============================================================================

/// Time zone whose calendar decides which day a fix belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CalendarZone {
    /// The server's local time zone
    #[default]
    Local,
    /// A fixed UTC offset
    Fixed(FixedOffset),
}

impl CalendarZone {
    /// UTC calendar.
    pub fn utc() -> Self {
        CalendarZone::Fixed(Utc.fix())
    }

    fn date_of_utc(&self, utc: DateTime<Utc>) -> NaiveDate {
        match self {
            CalendarZone::Local => utc.with_timezone(&Local).date_naive(),
            CalendarZone::Fixed(offset) => utc.with_timezone(offset).date_naive(),
        }
    }

    /// Today's date in this calendar.
    pub fn today(&self) -> NaiveDate {
        self.date_of_utc(Utc::now())
    }
}

/// Calendar date of a unix timestamp, or `None` if the timestamp is out of range.
pub fn date_of(timestamp: i64, zone: CalendarZone) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|utc| zone.date_of_utc(utc))
}

/// Group fixes into calendar-day buckets, preserving order within each day.
///
/// Fixes with an out-of-range timestamp are skipped.
pub fn group_by_day(fixes: &[Fix], zone: CalendarZone) -> BTreeMap<NaiveDate, Vec<Fix>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<Fix>> = BTreeMap::new();

    for fix in fixes {
        match date_of(fix.timestamp, zone) {
            Some(date) => buckets.entry(date).or_default().push(*fix),
            None => warn!(
                "[DayAggregator] Skipping fix {} with out-of-range timestamp {}",
                fix.id, fix.timestamp
            ),
        }
    }

    buckets
}

/// The fixes of a single calendar day.
pub fn fixes_for_day(fixes: &[Fix], date: NaiveDate, zone: CalendarZone) -> Vec<Fix> {
    fixes
        .iter()
        .filter(|f| date_of(f.timestamp, zone) == Some(date))
        .copied()
        .collect()
}

// ============================================================================
// Day
// ============================================================================

/// Ride statistics for one calendar day.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Day {
    /// Calendar date, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
    /// Number of fixes the record was computed from
    pub fix_count: usize,
    /// Average moving speed in km/h
    pub average_speed: f64,
    /// Fastest pair of fixes in km/h
    pub max_speed: f64,
    /// Distance in meters
    pub distance: f64,
    pub elevation_gain: i64,
    pub elevation_loss: i64,
    pub average_altitude: f64,
    pub max_altitude: f64,
    pub min_altitude: f64,
    /// Seconds spent moving
    pub moving_time: i64,
    pub number_of_stops: u32,
    /// Seconds spent in stops
    pub stop_time: i64,
}

impl Day {
    /// A day without any ride data.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            fix_count: 0,
            average_speed: 0.0,
            max_speed: 0.0,
            distance: 0.0,
            elevation_gain: 0,
            elevation_loss: 0,
            average_altitude: 0.0,
            max_altitude: 0.0,
            min_altitude: 0.0,
            moving_time: 0,
            number_of_stops: 0,
            stop_time: 0,
        }
    }

    /// ISO date key, `YYYY-MM-DD`.
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Compute the statistics of one day bucket.
///
/// The result depends only on `fixes` and `config`, so equal inputs always
/// produce equal records.
pub fn compute_day(date: NaiveDate, fixes: &[Fix], config: &TrackerConfig) -> Day {
    let moving = moving_time_and_average_speed(fixes, config.moving_speed_threshold);
    let (elevation_gain, elevation_loss) = elevation_gain_loss(fixes);
    let altitude = altitude_stats(fixes);
    let stops = detect_stops(fixes, config.stop_speed_floor_kmh);

    Day {
        date,
        fix_count: fixes.len(),
        average_speed: moving.average_speed_kmh,
        max_speed: moving.max_speed_kmh,
        distance: path_distance(fixes),
        elevation_gain,
        elevation_loss,
        average_altitude: altitude.average,
        max_altitude: altitude.max,
        min_altitude: altitude.min,
        moving_time: moving.moving_seconds,
        number_of_stops: stops.count,
        stop_time: stops.total_seconds,
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Finished days keyed by date.
///
/// All access goes through a mutex. [`DayCache::lock`] hands out a guard so
/// that a whole lookup-or-compute pass runs without other passes
/// interleaving.
#[derive(Debug, Default)]
pub struct DayCache {
    entries: Mutex<HashMap<NaiveDate, Day>>,
}

/// Exclusive access to the cache entries.
pub struct CacheGuard<'a> {
    entries: MutexGuard<'a, HashMap<NaiveDate, Day>>,
}

impl DayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the cache for a sequence of operations.
    ///
    /// A poisoned lock is recovered: entries are plain data and are
    /// validated by fix count on every lookup anyway.
    pub fn lock(&self) -> CacheGuard<'_> {
        CacheGuard {
            entries: self.entries.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Cached record for `date`, if any.
    pub fn get(&self, date: &NaiveDate) -> Option<Day> {
        self.lock().get(date).cloned()
    }

    /// Drop the cached record for `date`. Returns true if one was cached.
    pub fn invalidate(&self, date: &NaiveDate) -> bool {
        self.lock().invalidate(date).is_some()
    }

    /// Drop every cached record.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.lock().entries.contains_key(date)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

impl CacheGuard<'_> {
    pub fn get(&self, date: &NaiveDate) -> Option<&Day> {
        self.entries.get(date)
    }

    /// Cache a record under its own date, replacing any previous one.
    pub fn store(&mut self, day: Day) {
        self.entries.insert(day.date, day);
    }

    pub fn invalidate(&mut self, date: &NaiveDate) -> Option<Day> {
        self.entries.remove(date)
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DayReport {
    /// Day records, ascending by date
    pub days: Vec<Day>,
    /// Totals folded from `days`
    pub summary: RideSummary,
    /// Movement between the two newest fixes
    pub movement: Movement,
}

/// Turns a trip's fix history into day records, caching finished days.
///
/// Share one aggregator between request handlers (e.g. behind an `Arc`);
/// the cache is internally synchronized.
#[derive(Debug, Default)]
pub struct DayAggregator {
    config: TrackerConfig,
    cache: DayCache,
}

impl DayAggregator {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            cache: DayCache::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn cache(&self) -> &DayCache {
        &self.cache
    }

    /// Drop the cached record for `date` so the next pass recomputes it.
    pub fn invalidate(&self, date: &NaiveDate) -> bool {
        self.cache.invalidate(date)
    }

    /// Aggregate using today's date in the configured calendar.
    pub fn aggregate(&self, fixes: &[Fix]) -> DayReport {
        self.aggregate_at(fixes, self.config.zone.today())
    }

    /// Aggregate a trip's fixes, treating `today` as the day still in progress.
    ///
    /// `fixes` must be sorted ascending by timestamp.
    pub fn aggregate_at(&self, fixes: &[Fix], today: NaiveDate) -> DayReport {
        let buckets = group_by_day(fixes, self.config.zone);
        let mut days = Vec::with_capacity(buckets.len());
        let mut pending: Vec<(NaiveDate, &[Fix])> = Vec::new();
        let mut hits = 0usize;

        let mut cache = self.cache.lock();

        for (date, bucket) in &buckets {
            if *date == today {
                pending.push((*date, bucket.as_slice()));
                continue;
            }

            match cache.get(date).cloned() {
                Some(day) if day.fix_count == bucket.len() => {
                    debug!("[DayAggregator] Cache hit for {}", date);
                    days.push(day);
                    hits += 1;
                }
                Some(day) => {
                    debug!(
                        "[DayAggregator] Busting cache for {}: {} fixes cached, {} now",
                        date,
                        day.fix_count,
                        bucket.len()
                    );
                    cache.invalidate(date);
                    pending.push((*date, bucket.as_slice()));
                }
                None => pending.push((*date, bucket.as_slice())),
            }
        }

        for day in compute_days(&pending, &self.config) {
            if day.date != today {
                cache.store(day.clone());
            }
            days.push(day);
        }

        drop(cache);

        days.sort_by_key(|d| d.date);
        let summary = RideSummary::from_days(&days, &self.config);

        info!(
            "[DayAggregator] {} fixes -> {} days ({} cached, {} computed)",
            fixes.len(),
            days.len(),
            hits,
            pending.len()
        );

        DayReport {
            days,
            summary,
            movement: current_movement(fixes),
        }
    }

    /// Simplified polyline of the whole trip.
    pub fn trip_polyline(&self, fixes: &[Fix]) -> Option<Polyline> {
        Polyline::from_fixes(fixes, self.config.simplification_tolerance)
    }

    /// Simplified polyline of one calendar day.
    pub fn day_polyline(&self, fixes: &[Fix], date: NaiveDate) -> Option<Polyline> {
        let day = fixes_for_day(fixes, date, self.config.zone);
        Polyline::from_fixes(&day, self.config.simplification_tolerance)
    }
}

#[cfg(feature = "parallel")]
fn compute_days(pending: &[(NaiveDate, &[Fix])], config: &TrackerConfig) -> Vec<Day> {
    use rayon::prelude::*;

    pending
        .par_iter()
        .map(|(date, fixes)| compute_day(*date, fixes, config))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn compute_days(pending: &[(NaiveDate, &[Fix])], config: &TrackerConfig) -> Vec<Day> {
    pending
        .iter()
        .map(|(date, fixes)| compute_day(*date, fixes, config))
        .collect()
}
