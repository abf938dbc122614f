use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use strike_trainer::fixtures::{ExpectationDiff, FixtureCatalog, FixtureFile, FixtureProcessor};
use strike_trainer::testing::poses::{synthesize, SyntheticPattern};
use strike_trainer::{telemetry, AppConfig, SessionManager, StrikeOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "strike_cli",
    about = "Deterministic pose fixture harness for Strike Trainer"
)]
struct Cli {
    /// Override directory containing fixture assets (defaults to ./fixtures)
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    /// Pipeline configuration JSON (defaults to assets/strike_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a fixture classification and optionally compare against expectations
    Classify {
        #[arg(long)]
        fixture: String,
        #[arg(long)]
        expect: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Stream strike outcomes for a fixture to stdout, one JSON object per line
    Stream {
        #[arg(long)]
        fixture: String,
    },
    /// Replay a fixture as one training session and print its statistics
    Session {
        #[arg(long)]
        fixture: String,
        #[arg(long, default_value = "cli")]
        user: String,
    },
    /// Write a recorded-frames fixture synthesized from strike patterns
    Synth {
        /// Comma-separated patterns, e.g. `jab,cross,left_roundhouse`
        #[arg(long, value_delimiter = ',', value_parser = parse_pattern)]
        patterns: Vec<SyntheticPattern>,
        #[arg(long, default_value_t = 0)]
        start_ms: u64,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List available fixtures on disk
    DumpFixtures,
}

fn main() -> ExitCode {
    strike_trainer::init_logging("warn");
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let catalog = cli
        .fixtures_dir
        .map(FixtureCatalog::new)
        .unwrap_or_else(FixtureCatalog::default);
    let config = match cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Classify {
            fixture,
            expect,
            output,
        } => run_classify(&catalog, config, &fixture, expect, output),
        Commands::Stream { fixture } => run_stream(&catalog, config, &fixture),
        Commands::Session { fixture, user } => run_session(&catalog, config, &fixture, &user),
        Commands::Synth {
            patterns,
            start_ms,
            output,
        } => run_synth(&patterns, start_ms, output),
        Commands::DumpFixtures => run_dump(&catalog),
    }
}

fn parse_pattern(value: &str) -> std::result::Result<SyntheticPattern, String> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string()))
        .map_err(|_| format!("unknown pattern '{value}'"))
}

fn run_classify(
    catalog: &FixtureCatalog,
    config: AppConfig,
    fixture: &str,
    override_expect: Option<PathBuf>,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let processor = FixtureProcessor::new(config);
    let data = catalog.load(fixture, override_expect)?;
    let actual = processor
        .run(&data)
        .with_context(|| format!("processing fixture {}", fixture))?;

    emit_report(&data.metadata.name, data.frames.len(), &actual, output_path)?;

    if let Some(expectations) = data.expectations {
        match expectations.verify(&actual) {
            Ok(()) => Ok(ExitCode::from(0)),
            Err(diff) => {
                emit_diff(&diff)?;
                Ok(ExitCode::from(2))
            }
        }
    } else {
        Ok(ExitCode::from(0))
    }
}

fn run_stream(catalog: &FixtureCatalog, config: AppConfig, fixture: &str) -> Result<ExitCode> {
    let processor = FixtureProcessor::new(config);
    let data = catalog.load(fixture, None)?;

    let mut write_error = None;
    processor
        .run_with(&data, |outcome| {
            if write_error.is_some() {
                return;
            }
            match serde_json::to_string(outcome) {
                Ok(line) => println!("{line}"),
                Err(err) => write_error = Some(err),
            }
        })
        .with_context(|| format!("processing fixture {}", fixture))?;

    if let Some(err) = write_error {
        return Err(err.into());
    }
    Ok(ExitCode::from(0))
}

fn run_session(
    catalog: &FixtureCatalog,
    config: AppConfig,
    fixture: &str,
    user: &str,
) -> Result<ExitCode> {
    let data = catalog.load(fixture, None)?;
    let started_at = data.frames.first().map_or(0, |frame| frame.timestamp_ms);
    let ended_at = data.frames.last().map_or(started_at, |frame| frame.timestamp_ms);

    let manager = SessionManager::new(config);
    let session_id = manager.start_session_at(user, started_at)?;
    for frame in &data.frames {
        manager.process_frame(&session_id, frame)?;
    }
    manager.end_session_at(&session_id, ended_at)?;

    let report = SessionReportPayload {
        fixture: &data.metadata.name,
        session: manager.snapshot(&session_id)?,
        telemetry: telemetry::hub().snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_synth(
    patterns: &[SyntheticPattern],
    start_ms: u64,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let file = FixtureFile {
        description: Some(format!(
            "Synthesized from {}",
            serde_json::to_string(patterns)?
        )),
        start_ms,
        patterns: Vec::new(),
        frames: synthesize(patterns, start_ms),
    };
    let json = serde_json::to_string_pretty(&file)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }
    Ok(ExitCode::from(0))
}

fn run_dump(catalog: &FixtureCatalog) -> Result<ExitCode> {
    let fixtures = catalog.discover()?;
    if fixtures.is_empty() {
        println!("No fixtures found under {}", catalog.root().display());
        return Ok(ExitCode::from(0));
    }

    for metadata in fixtures {
        if let Some(expect) = metadata.expect_path {
            println!("{} -> {}", metadata.name, expect.display());
        } else {
            println!("{}", metadata.name);
        }
    }
    Ok(ExitCode::from(0))
}

fn emit_report(
    fixture: &str,
    frame_count: usize,
    events: &[StrikeOutcome],
    output_path: Option<PathBuf>,
) -> Result<()> {
    let report = FixtureReportPayload {
        fixture,
        frame_count,
        event_count: events.len(),
        events,
    };
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

fn emit_diff(diff: &ExpectationDiff) -> Result<()> {
    let json = serde_json::to_string_pretty(&diff.to_json())?;
    eprintln!("{json}");
    Ok(())
}

#[derive(Serialize)]
struct FixtureReportPayload<'a> {
    fixture: &'a str,
    frame_count: usize,
    event_count: usize,
    #[serde(skip_serializing_if = "slice_empty")]
    events: &'a [StrikeOutcome],
}

fn slice_empty(events: &&[StrikeOutcome]) -> bool {
    events.is_empty()
}

#[derive(Serialize)]
struct SessionReportPayload<'a> {
    fixture: &'a str,
    session: strike_trainer::Session,
    telemetry: telemetry::TelemetrySnapshot,
}
