//! ride-stats - Summarize recorded rides the way the tracking page does
//!
//! Usage:
//!   ride-stats summary <files>... [--utc-offset <hours>] [--json]
//!   ride-stats simplify <file> [--tolerance <degrees>] [--output <file>]
//!   ride-stats convert <input.gpx> <output.json>
//!   ride-stats check <fixture.json>...
//!
//! Tracks are read from GPX files or JSON track fixtures.

use clap::{Args, Parser, Subcommand};
use chrono::FixedOffset;
use ride_tracker::{
    import::{load_fixes, TrackFixture},
    geo_utils::{elevation_gain_loss, moving_time_and_average_speed, path_distance},
    summary::{format_duration, in_km, one_decimal},
    CalendarZone, DayAggregator, Fix, Polyline, Result, TrackError, TrackerConfig,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ride-stats")]
#[command(about = "Day-by-day ride statistics from recorded tracks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    tuning: Tuning,
}

#[derive(Args)]
struct Tuning {
    /// Calendar offset from UTC in hours (default: server local time)
    #[arg(long, global = true, allow_negative_numbers = true)]
    utc_offset: Option<i32>,

    /// Planned route length in kilometers
    #[arg(long, global = true, default_value = "3891")]
    target_km: f64,

    /// Planned trip length in days
    #[arg(long, global = true, default_value = "30")]
    target_days: u32,

    /// Douglas-Peucker tolerance in degrees
    #[arg(long, global = true, default_value = "0.0002")]
    tolerance: f64,

    /// Speed above which the rider counts as moving, in m/s
    #[arg(long, global = true, default_value = "1.0")]
    moving_threshold: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Print day-by-day statistics and trip totals
    Summary {
        /// GPX or JSON track files, merged into one trip
        files: Vec<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the simplified map polyline as JSON
    Simplify {
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a GPX track into a JSON track fixture
    Convert { input: PathBuf, output: PathBuf },

    /// Check JSON fixtures against their reference values (5% tolerance)
    Check { fixtures: Vec<PathBuf> },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();
    let config = match build_config(&cli.tuning) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Summary { files, json } => run_summary(&files, json, config),
        Commands::Simplify { file, output } => run_simplify(&file, output.as_deref(), &config),
        Commands::Convert { input, output } => run_convert(&input, &output, &config),
        Commands::Check { fixtures } => run_check(&fixtures, &config),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_config(tuning: &Tuning) -> std::result::Result<TrackerConfig, String> {
    let zone = match tuning.utc_offset {
        Some(hours) => CalendarZone::Fixed(
            FixedOffset::east_opt(hours * 3600)
                .ok_or_else(|| format!("UTC offset out of range: {}h", hours))?,
        ),
        None => CalendarZone::Local,
    };

    Ok(TrackerConfig {
        moving_speed_threshold: tuning.moving_threshold,
        simplification_tolerance: tuning.tolerance,
        target_distance_km: tuning.target_km,
        target_days: tuning.target_days,
        zone,
        ..TrackerConfig::default()
    })
}

/// Load and merge tracks, sorted by time as the aggregator expects.
///
/// Progress goes to the log (stderr) so stdout carries only the report.
fn load_trip(files: &[PathBuf]) -> Result<Vec<Fix>> {
    let mut fixes = Vec::new();
    for path in files {
        let mut track = load_fixes(path)?;
        log::info!("[OK] {} - {} fixes", path.display(), track.len());
        fixes.append(&mut track);
    }
    fixes.sort_by_key(|f| f.timestamp);
    Ok(fixes)
}

fn run_summary(files: &[PathBuf], json: bool, config: TrackerConfig) -> Result<bool> {
    if files.is_empty() {
        return Err(TrackError::EmptyTrack);
    }
    let fixes = load_trip(files)?;
    let aggregator = DayAggregator::new(config);
    let report = aggregator.aggregate(&fixes);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(true);
    }

    println!("\n{}", "=".repeat(96));
    println!(
        "{:<12} {:>6} {:>9} {:>9} {:>8} {:>7} {:>7} {:>8} {:>8} {:>6}",
        "Day", "Fixes", "Distance", "Moving", "Avg", "Max", "Gain", "Loss", "MaxAlt", "Stops"
    );
    println!("{}", "-".repeat(96));
    for day in &report.days {
        println!(
            "{:<12} {:>6} {:>7.1}km {:>9} {:>5.1}kmh {:>7.1} {:>6}m {:>7}m {:>7.0}m {:>6}",
            day.date_key(),
            day.fix_count,
            in_km(day.distance),
            format_duration(day.moving_time),
            day.average_speed,
            day.max_speed,
            day.elevation_gain,
            day.elevation_loss,
            day.max_altitude,
            day.number_of_stops,
        );
    }
    println!("{}", "=".repeat(96));

    let summary = &report.summary;
    println!(
        "Distance: {:.1} km ({}% of {} km)",
        in_km(summary.distance),
        summary.progress,
        aggregator.config().target_distance_km
    );
    println!(
        "Elevation: +{} m / -{} m",
        summary.elevation_gain, summary.elevation_loss
    );
    println!(
        "Moving: {}  Resting: {}",
        format_duration(summary.moving_time),
        format_duration(summary.resting_time)
    );
    println!(
        "Days: {} elapsed, {} remaining",
        summary.elapsed_days, summary.remaining_days
    );
    println!(
        "Current speed: {} km/h ({})",
        report.movement.speed_kmh,
        if report.movement.is_moving { "moving" } else { "stopped" }
    );

    Ok(true)
}

fn run_simplify(file: &Path, output: Option<&Path>, config: &TrackerConfig) -> Result<bool> {
    let fixes = load_fixes(file)?;
    let polyline = Polyline::from_fixes(&fixes, config.simplification_tolerance)
        .ok_or(TrackError::EmptyTrack)?;

    log::info!(
        "Simplified {} fixes to {} points ({:.1} km)",
        polyline.source_points,
        polyline.points.len(),
        in_km(polyline.distance)
    );

    let json = serde_json::to_string_pretty(&polyline)?;
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(true)
}

fn run_convert(input: &Path, output: &Path, config: &TrackerConfig) -> Result<bool> {
    let fixes = load_fixes(input)?;
    let fixture = TrackFixture::from_fixes(&fixes, config);
    fs::write(output, fixture.to_json_pretty()?)?;
    println!(
        "Converted {} fixes from {} to {}",
        fixes.len(),
        input.display(),
        output.display()
    );
    Ok(true)
}

fn within(actual: f64, expected: f64, ratio: f64) -> bool {
    (actual - expected).abs() <= ratio * expected.abs()
}

fn run_check(fixtures: &[PathBuf], config: &TrackerConfig) -> Result<bool> {
    const RATIO: f64 = 0.05;
    let mut all_ok = true;

    for path in fixtures {
        let fixture = TrackFixture::from_reader(fs::File::open(path)?)?;
        let expected = fixture.expected()?;
        let fixes = fixture.to_fixes();

        let moving = moving_time_and_average_speed(&fixes, config.moving_speed_threshold);
        let (gain, loss) = elevation_gain_loss(&fixes);
        let checks = [
            ("distance", path_distance(&fixes), expected.distance),
            ("movingTime", moving.moving_seconds as f64, expected.moving_time),
            ("averageSpeed", moving.average_speed_kmh, expected.average_speed),
            ("elevationGain", gain as f64, expected.elevation_gain),
            ("elevationLoss", loss as f64, expected.elevation_loss),
        ];

        println!("\n{}", path.display());
        for (name, actual, reference) in checks {
            let ok = within(actual, reference, RATIO);
            all_ok &= ok;
            println!(
                "  [{}] {:<14} {:>12} (expected {})",
                if ok { "OK" } else { "FAIL" },
                name,
                one_decimal(actual),
                reference
            );
        }
    }

    Ok(all_ok)
}
