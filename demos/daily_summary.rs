//! Aggregate a synthetic three-day ride and show the day cache at work.
//!
//! Run with: cargo run --example daily_summary

use chrono::NaiveDate;
use ride_tracker::{
    summary::{format_duration, in_km},
    CalendarZone, DayAggregator, Fix, TrackerConfig, MESSAGE_CODE_TRACKING_STARTED,
};

/// One riding day: a tracking-start fix, then a fix every ten minutes
/// heading north-east with a few hills.
fn riding_day(start: i64, origin: (f64, f64), fixes: usize) -> Vec<Fix> {
    let mut day = vec![Fix::new(origin.0, origin.1, 4200.0, start)
        .with_message_code(MESSAGE_CODE_TRACKING_STARTED)];
    day.extend((1..fixes).map(|i| {
        let t = i as f64;
        Fix::new(
            origin.0 + t * 0.02,
            origin.1 + t * 0.015,
            250.0 + (t / 3.0).sin() * 120.0,
            start + i as i64 * 600,
        )
    }));
    day
}

fn main() {
    let config = TrackerConfig {
        zone: CalendarZone::utc(),
        ..TrackerConfig::default()
    };
    let aggregator = DayAggregator::new(config);

    // 2024-06-01 07:00 UTC
    let start = 1_717_225_200;
    let mut fixes = riding_day(start, (46.2, 6.1), 60);
    fixes.extend(riding_day(start + 86_400, (47.4, 7.0), 55));
    fixes.extend(riding_day(start + 2 * 86_400, (48.5, 7.8), 20));

    let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

    println!("Ride summary\n");
    let report = aggregator.aggregate_at(&fixes, today);
    for day in &report.days {
        println!(
            "  {}  {:>6.1} km  {}  avg {:>4.1} km/h  +{} m / -{} m",
            day.date_key(),
            in_km(day.distance),
            format_duration(day.moving_time),
            day.average_speed,
            day.elevation_gain,
            day.elevation_loss
        );
    }

    let summary = &report.summary;
    println!(
        "\n  Total {:.1} km, {}% of the route, {} days left",
        in_km(summary.distance),
        summary.progress,
        summary.remaining_days
    );
    println!("  Cached days: {}", aggregator.cache().len());

    // A second pass reuses the two finished days
    let again = aggregator.aggregate_at(&fixes, today);
    assert_eq!(report.days, again.days);

    if let Some(polyline) = aggregator.trip_polyline(&fixes) {
        println!(
            "\n  Map polyline: {} of {} fixes kept, centered at {:.4}, {:.4}",
            polyline.points.len(),
            polyline.source_points,
            polyline.center.latitude,
            polyline.center.longitude
        );
    }
}
