// Handler for: Synth

use std::fs;
use std::path::PathBuf;

use miette::IntoDiagnostic;
use pipesynth_engine::{CegisController, CegisOptions, Constraint, ConstraintSet};
use pipesynth_oracle::backends::ProcessSearchOracle;
use tracing::info;

use super::helpers::{
    artifact_store, encoder, equivalence_oracle, load_config, parse_command, parse_output_format,
    parse_refinement, parse_search_strategy,
};
use crate::cli::OracleArgs;
use crate::OutputFormat;

pub(crate) struct SynthArgs {
    pub(crate) config: PathBuf,
    pub(crate) oracles: OracleArgs,
    pub(crate) search: Option<String>,
    pub(crate) strategy: Option<String>,
    pub(crate) workers: Option<usize>,
    pub(crate) max_iterations: Option<usize>,
    pub(crate) timeout: u64,
    pub(crate) refinement: String,
    pub(crate) constraints: Vec<String>,
    pub(crate) output: Option<PathBuf>,
}

pub(crate) fn run_synth_command(args: SynthArgs) -> miette::Result<()> {
    let format = parse_output_format(&args.oracles.format)?;
    let config = load_config(&args.config)?;
    let options = CegisOptions {
        strategy: args
            .strategy
            .as_deref()
            .map(parse_search_strategy)
            .transpose()?,
        max_workers: args.workers,
        verify_input_bits: args.oracles.input_bits,
        max_iterations: args.max_iterations,
        timeout_secs: args.timeout,
        refinement: parse_refinement(&args.refinement)?,
    };

    let encoder = encoder(&args.oracles)?;
    let search = match &args.search {
        Some(raw) => ProcessSearchOracle::new(parse_command("--search", raw)?),
        None => ProcessSearchOracle::sketch(config.parallel_solver),
    }
    .with_timeout_secs(args.oracles.oracle_timeout);
    let equivalence = equivalence_oracle(&args.oracles)?;
    let artifacts = artifact_store(&args.oracles, &config);
    let base = ConstraintSet::new().extended(args.constraints.into_iter().map(Constraint::base));

    info!(
        config = %args.config.display(),
        run = artifacts.run_id(),
        search = %search.command(),
        "Starting synthesis..."
    );
    let report = CegisController::new(&config, &encoder, &search, &equivalence, artifacts)
        .with_options(options)
        .run(base)
        .into_diagnostic()?;

    if let (Some(path), Some(assignment)) = (&args.output, report.outcome.assignment()) {
        fs::write(path, assignment.to_holes_file()).into_diagnostic()?;
        info!(path = %path.display(), "Assignment written");
    }

    match format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?)
        }
    }

    if !report.outcome.is_success() {
        std::process::exit(2);
    }
    Ok(())
}
