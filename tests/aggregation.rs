//! End-to-end day aggregation scenarios.

use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use ride_tracker::{
    compute_day, simplify, CalendarZone, DayAggregator, Fix, TrackerConfig,
    MESSAGE_CODE_TRACKING_STARTED,
};

const YESTERDAY_NOON: i64 = 1_717_243_200; // 2024-06-01 12:00:00 UTC
const TODAY_NOON: i64 = YESTERDAY_NOON + 86_400;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 6, 2)
}

fn aggregator() -> DayAggregator {
    DayAggregator::new(TrackerConfig {
        zone: CalendarZone::utc(),
        ..TrackerConfig::default()
    })
}

fn three_fix_trip() -> Vec<Fix> {
    vec![
        Fix::new(46.00, 8.00, 400.0, YESTERDAY_NOON).with_id(1),
        Fix::new(46.05, 8.00, 520.0, YESTERDAY_NOON + 1800).with_id(2),
        Fix::new(46.30, 8.10, 610.0, TODAY_NOON).with_id(3),
    ]
}

#[test]
fn yesterday_cached_today_fresh() {
    let aggregator = aggregator();
    let mut fixes = three_fix_trip();

    let first = aggregator.aggregate_at(&fixes, today());
    assert_eq!(first.days.len(), 2);
    assert_eq!(first.days[0].date, date(2024, 6, 1));
    assert_eq!(first.days[1].date, date(2024, 6, 2));

    // Only the closed day is cached
    assert!(aggregator.cache().contains(&date(2024, 6, 1)));
    assert!(!aggregator.cache().contains(&date(2024, 6, 2)));
    assert_eq!(aggregator.cache().get(&date(2024, 6, 1)), Some(first.days[0].clone()));

    // Unchanged counts: yesterday comes back verbatim
    let second = aggregator.aggregate_at(&fixes, today());
    assert_eq!(second.days[0], first.days[0]);
    assert_eq!(second.days[1], first.days[1]);

    // A new fix today changes today's record and leaves yesterday alone
    fixes.push(Fix::new(46.35, 8.12, 640.0, TODAY_NOON + 900).with_id(4));
    let third = aggregator.aggregate_at(&fixes, today());
    assert_eq!(third.days[0], first.days[0]);
    assert_ne!(third.days[1], first.days[1]);
    assert_eq!(third.days[1].fix_count, 2);
    assert!(third.days[1].distance > 0.0);
    assert!(!aggregator.cache().contains(&date(2024, 6, 2)));
}

#[test]
fn backfilled_fix_busts_cached_day() {
    let aggregator = aggregator();
    let mut fixes = three_fix_trip();
    let first = aggregator.aggregate_at(&fixes, today());

    // Backfill a fix in the middle of yesterday
    fixes.insert(1, Fix::new(46.02, 8.03, 450.0, YESTERDAY_NOON + 900).with_id(5));
    let second = aggregator.aggregate_at(&fixes, today());

    assert_eq!(second.days[0].fix_count, 3);
    assert_ne!(second.days[0], first.days[0]);
    assert_eq!(
        second.days[0],
        compute_day(date(2024, 6, 1), &fixes[..3], aggregator.config())
    );
}

#[test]
fn cached_day_matches_fresh_computation() {
    let aggregator = aggregator();
    let fixes = three_fix_trip();
    aggregator.aggregate_at(&fixes, today());

    let cached = aggregator.cache().get(&date(2024, 6, 1)).unwrap();
    let fresh = compute_day(date(2024, 6, 1), &fixes[..2], aggregator.config());
    assert_eq!(cached, fresh);
}

#[test]
fn summary_folds_days() {
    let aggregator = aggregator();
    let report = aggregator.aggregate_at(&three_fix_trip(), today());
    let summary = &report.summary;

    let distance: f64 = report.days.iter().map(|d| d.distance).sum();
    let moving: i64 = report.days.iter().map(|d| d.moving_time).sum();
    assert_eq!(summary.distance, distance);
    assert_eq!(summary.moving_time, moving);
    assert_eq!(summary.elapsed_days, 2);
    assert_eq!(summary.remaining_days, 28);
    assert_eq!(summary.resting_time, 2 * 86_400 - moving);
    assert_eq!(summary.elevation_gain, 120);
    assert_eq!(summary.max_altitude, 610.0);
    assert_eq!(summary.min_altitude, 400.0);
}

#[test]
fn tracking_start_altitude_is_ignored() {
    let aggregator = aggregator();
    let fixes = vec![
        Fix::new(46.00, 8.00, 9000.0, YESTERDAY_NOON).with_message_code(MESSAGE_CODE_TRACKING_STARTED),
        Fix::new(46.01, 8.00, 400.0, YESTERDAY_NOON + 600),
        Fix::new(46.02, 8.00, 430.0, YESTERDAY_NOON + 1200),
    ];
    let report = aggregator.aggregate_at(&fixes, today());
    let day = &report.days[0];

    assert_eq!(day.max_altitude, 430.0);
    assert_eq!(day.min_altitude, 400.0);
    assert_eq!(day.elevation_gain, 30);
    assert_eq!(day.elevation_loss, 0);
}

#[test]
fn concurrent_passes_agree() {
    let aggregator = Arc::new(aggregator());
    let fixes = Arc::new(three_fix_trip());
    let expected = aggregator.aggregate_at(&fixes, today());
    aggregator.cache().clear();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let aggregator = Arc::clone(&aggregator);
            let fixes = Arc::clone(&fixes);
            thread::spawn(move || aggregator.aggregate_at(&fixes, today()))
        })
        .collect();

    for handle in handles {
        let report = handle.join().unwrap();
        assert_eq!(report.days, expected.days);
    }
    assert_eq!(aggregator.cache().len(), 1);
}

#[test]
fn day_polyline_keeps_endpoints() {
    let aggregator = aggregator();
    let fixes = three_fix_trip();

    let polyline = aggregator.day_polyline(&fixes, date(2024, 6, 1)).unwrap();
    assert_eq!(polyline.points.first(), Some(&fixes[0].position()));
    assert_eq!(polyline.points.last(), Some(&fixes[1].position()));

    let simplified = simplify(&fixes, 0.0002);
    assert_eq!(simplified.first(), fixes.first());
    assert_eq!(simplified.last(), fixes.last());
}

#[cfg(feature = "serde")]
#[test]
fn report_serializes_with_iso_dates() {
    let report = aggregator().aggregate_at(&three_fix_trip(), today());
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["days"][0]["date"], "2024-06-01");
    assert_eq!(json["days"][1]["date"], "2024-06-02");
    assert_eq!(json["summary"]["elapsed_days"], 2);
}
