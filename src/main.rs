use anyhow::{Context, Result};
use clap::Parser;
use selector::artifacts::{self, ArtifactDepths};
use selector::cli::{Cli, Command, DiscoverArgs, ExportArgs, SolveArgs};
use selector::discovery::{self, LookupMask};
use selector::error::SelectorError;
use selector::histogram;
use selector::pipeline;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; logs go to stderr so stdout stays JSON
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Pretty JSON to a file, or to stdout when no path is given
fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match output {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_discover(args: &DiscoverArgs) -> Result<()> {
    let mask = LookupMask::new(&args.lookup_mask)?;
    let manifest = discovery::discover(&args.reference_dir, &args.sample_dir, &mask)?;
    write_json(&manifest, args.output.as_deref())
}

fn run_solve(args: &SolveArgs) -> Result<()> {
    let config = args.resolve_config()?;
    let records = histogram::load_records(&args.input)?;
    let result = pipeline::decompose(&records, &config)?;

    tracing::info!(
        "Identifier universe reduced by {:.1}%; {} candidate sample(s), {} node(s) explored",
        result.compression.reduction_percent(),
        result.candidate_samples,
        result.nodes_explored
    );

    write_json(&result.record, args.output.as_deref())
}

fn run_export(args: &ExportArgs) -> Result<()> {
    let record = artifacts::load_record(&args.input)?;
    let depths = ArtifactDepths {
        reference: args.reference_artifact_depth,
        sample: args.sample_artifact_depth,
    };
    artifacts::export_artifacts(&record, &args.work_dir, depths)?;
    Ok(())
}

/// Input errors exit with 2, everything else with 1
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SelectorError>() {
        Some(e) if e.is_input_error() => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match &cli.command {
        Command::Discover(args) => run_discover(args),
        Command::Solve(args) => run_solve(args),
        Command::Export(args) => run_export(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
