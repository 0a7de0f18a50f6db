//! trip-inference CLI - Run the pipeline over CSV exports
//!
//! Usage:
//!   trip-inference-cli trips <fixes.csv> [--subway <entrances.csv>] [--known <locations.csv>]
//!   trip-inference-cli days <fixes.csv> --timezone <tz> [--output <file>]
//!
//! Results are written as JSON to stdout or to `--output`. A summary of trip
//! codes is printed to stderr.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use trip_inference::{
    detect_trips,
    input::{read_fixes, read_known_locations, read_subway_entrances},
    summarize_complete_days, summarize_trips, CompleteDaysConfig, ReferenceData, SubwayNetwork,
    Trip, TripConfig, TripError,
};

#[derive(Parser)]
#[command(name = "trip-inference-cli")]
#[command(about = "Detect trips and complete days from survey GPS exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Args)]
struct InputArgs {
    /// CSV of GPS fixes (latitude,longitude,h_accuracy,speed,timestamp_UTC)
    fixes: PathBuf,

    /// CSV of subway entrances (label,latitude,longitude)
    #[arg(long)]
    subway: Option<PathBuf>,

    /// CSV of the participant's known locations (label,latitude,longitude)
    #[arg(long)]
    known: Option<PathBuf>,

    /// JSON file overriding thresholds (keys "trips" and "days")
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file for JSON results (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and code trips
    Trips {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Detect trips, then summarize each local calendar day
    Days {
        #[command(flatten)]
        input: InputArgs,

        /// IANA timezone for local dates (e.g., "America/Montreal")
        #[arg(short, long)]
        timezone: String,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    trips: TripConfig,
    days: CompleteDaysConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let result = match &cli.command {
        Commands::Trips { input } => run_trips(input),
        Commands::Days { input, timezone } => run_days(input, timezone),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_trips(input: &InputArgs) -> Result<(), TripError> {
    let config = load_config(input.config.as_deref())?;
    let trips = load_and_detect(input, &config.trips)?;
    write_json(&trips, input.output.as_deref())
}

fn run_days(input: &InputArgs, timezone: &str) -> Result<(), TripError> {
    let config = load_config(input.config.as_deref())?;
    let trips = load_and_detect(input, &config.trips)?;
    let days = summarize_complete_days(&trips, timezone, &config.days)?;

    let complete = days.iter().filter(|d| d.is_complete).count();
    eprintln!(
        "{} days from {} ({} complete)",
        days.len(),
        timezone,
        complete
    );
    write_json(&days, input.output.as_deref())
}

fn load_and_detect(input: &InputArgs, config: &TripConfig) -> Result<Vec<Trip>, TripError> {
    let fixes = read_fixes(open(&input.fixes)?)?;
    eprintln!("Loaded {} fixes from {}", fixes.len(), input.fixes.display());

    let subway = match &input.subway {
        Some(path) => Some(SubwayNetwork::new(read_subway_entrances(open(path)?)?)),
        None => None,
    };
    let known_locations = match &input.known {
        Some(path) => read_known_locations(open(path)?)?,
        None => Vec::new(),
    };
    let reference = ReferenceData {
        subway,
        known_locations,
    };

    let trips = detect_trips(&fixes, &reference, config)?;
    print_summary(&trips);
    Ok(trips)
}

fn print_summary(trips: &[Trip]) {
    let stats = summarize_trips(trips);
    eprintln!("\n{}", "=".repeat(60));
    eprintln!(
        "{} trips, {} missing, {:.2} km observed",
        stats.trip_count,
        stats.missing_count,
        stats.complete_distance / 1000.0
    );
    eprintln!("{}", "=".repeat(60));
    for (code, count) in &stats.count_by_code {
        eprintln!("  {:>4}  {}", code, count);
    }
}

fn load_config(path: Option<&Path>) -> Result<FileConfig, TripError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let config: FileConfig =
        serde_json::from_reader(open(path)?).map_err(|e| TripError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
    config.trips.validate()?;
    Ok(config)
}

fn open(path: &Path) -> Result<BufReader<File>, TripError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| TripError::Input {
            message: format!("{}: {}", path.display(), e),
        })
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), TripError> {
    let to_error = |e: serde_json::Error| TripError::Input {
        message: format!("Failed to write JSON: {}", e),
    };
    match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| TripError::Input {
                message: format!("{}: {}", path.display(), e),
            })?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value).map_err(to_error)?;
            writer.flush().map_err(|e| TripError::Input {
                message: e.to_string(),
            })?;
            eprintln!("Wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, value).map_err(to_error)?;
            writeln!(handle).map_err(|e| TripError::Input {
                message: e.to_string(),
            })?;
        }
    }
    Ok(())
}
