//! Thin command-line front end for the wave compare engine: loads two tree
//! files, runs a comparison anchored on one known-correct person pair, and
//! prints the resulting JSON report.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use wavecompare::{
    AutoRejectConfirmation, CompareRequest, CompareService, DefaultFuzzyMatcher, EngineConfig, FileConfirmedMappingsStore, JsonTreeLoader, NoPhotosComparator, PersonId,
};

#[derive(Parser, Debug)]
#[command(name = "wavecompare", version, about = "Compare two genealogical trees and propose a person mapping")]
struct Cli {
    /// Path to the source tree JSON file.
    source: PathBuf,

    /// Path to the destination tree JSON file.
    destination: PathBuf,

    /// Person id in the source tree known to correspond to --anchor-dest.
    #[arg(long)]
    anchor_source: Uuid,

    /// Person id in the destination tree known to correspond to --anchor-source.
    #[arg(long)]
    anchor_dest: Uuid,

    /// Path to a TOML settings file overriding the default engine options.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a JSON file recording previously confirmed/rejected adjudications.
    #[arg(long)]
    confirmed_mappings: Option<PathBuf>,

    /// Minimum score for a match to be surfaced in the high-confidence report.
    #[arg(long, default_value_t = 80)]
    report_confidence_threshold: u8,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(log_level))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("wavecompare: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let engine_config = match &cli.config {
        Some(path) => EngineConfig::load_from(path).map_err(|error| error.to_string())?.unwrap_or_default(),
        None => EngineConfig::load_from_default_path().map_err(|error| error.to_string())?.unwrap_or_default(),
    };
    let mut options = engine_config.to_compare_options();
    if let Some(path) = &cli.confirmed_mappings {
        options.confirmed_mappings_path = Some(path.clone());
    }

    let loader = JsonTreeLoader;
    let fuzzy = DefaultFuzzyMatcher::default();
    let photo = NoPhotosComparator;
    let store = options.confirmed_mappings_path.clone().map(FileConfirmedMappingsStore::new);
    let service = CompareService {
        loader: &loader,
        fuzzy: &fuzzy,
        photo: &photo,
        store: store.as_ref().map(|s| s as &dyn wavecompare::ConfirmedMappingsStore),
    };

    let request = CompareRequest {
        source_path: &cli.source,
        dest_path: &cli.destination,
        anchor_source: PersonId(cli.anchor_source),
        anchor_dest: PersonId(cli.anchor_dest),
        options,
        report_confidence_threshold: cli.report_confidence_threshold,
        download_photos: false,
    };

    let mut confirmation = AutoRejectConfirmation;
    let run = service.run(request, &mut confirmation).map_err(|error| error.to_string())?;

    let output = serde_json::json!({
        "result": run.result,
        "report": run.report,
    });
    println!("{}", serde_json::to_string_pretty(&output).map_err(|error| error.to_string())?);
    if cli.verbose > 0 {
        eprintln!("{}", run.detailed_log);
    }

    Ok(())
}
