// Handler for: Verify
//
// Runs a single VERIFY round on an assignment read from a holes file, e.g.
// one written by `synth --output`.

use std::fs;
use std::path::PathBuf;

use miette::IntoDiagnostic;
use pipesynth_engine::encoder::Encoder;
use pipesynth_engine::CegisController;
use pipesynth_engine::CegisOptions;
use pipesynth_oracle::backends::ProcessSearchOracle;
use pipesynth_oracle::parse_hole_assignment;
use serde_json::json;

use super::helpers::{
    artifact_store, encoder, equivalence_oracle, load_config, parse_output_format,
};
use crate::cli::OracleArgs;
use crate::OutputFormat;

pub(crate) fn run_verify_command(
    config: PathBuf,
    holes: PathBuf,
    oracles: OracleArgs,
) -> miette::Result<()> {
    let format = parse_output_format(&oracles.format)?;
    let config = load_config(&config)?;
    let encoder = encoder(&oracles)?;
    let equivalence = equivalence_oracle(&oracles)?;
    // Never invoked; a controller needs one.
    let search = ProcessSearchOracle::sketch(config.parallel_solver);

    let declared = encoder.holes(&config).into_diagnostic()?;
    let text = fs::read_to_string(&holes)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("cannot read {}", holes.display())))?;
    let assignment = parse_hole_assignment(&declared, &text).into_diagnostic()?;

    let controller = CegisController::new(
        &config,
        &encoder,
        &search,
        &equivalence,
        artifact_store(&oracles, &config),
    )
    .with_options(CegisOptions {
        verify_input_bits: oracles.input_bits,
        ..CegisOptions::default()
    });
    let counterexample = controller.verify(&assignment, 0).into_diagnostic()?;

    match format {
        OutputFormat::Text => match &counterexample {
            None => println!("VERIFIED for {}-bit inputs", oracles.input_bits),
            Some(cex) => println!("COUNTEREXAMPLE {cex}"),
        },
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "verified": counterexample.is_none(),
                "input_bits": oracles.input_bits,
                "counterexample": counterexample,
            }))
            .into_diagnostic()?
        ),
    }

    if counterexample.is_some() {
        std::process::exit(2);
    }
    Ok(())
}
