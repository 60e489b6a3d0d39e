// Flag parsing and oracle construction shared by the subcommands.

use std::fs;
use std::path::Path;

use miette::IntoDiagnostic;
use pipesynth_engine::artifacts::ArtifactStore;
use pipesynth_engine::encoder::ProcessEncoder;
use pipesynth_engine::{Configuration, RefinementStrategy, SearchStrategy};
use pipesynth_oracle::backends::ProcessEquivalenceOracle;
use pipesynth_oracle::process::OracleCommand;

use crate::cli::OracleArgs;
use crate::OutputFormat;

pub(crate) fn parse_output_format(raw: &str) -> miette::Result<OutputFormat> {
    match raw {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(miette::miette!(
            "Unknown output format: {other}. Use 'text' or 'json'."
        )),
    }
}

pub(crate) fn parse_search_strategy(raw: &str) -> miette::Result<SearchStrategy> {
    match raw {
        "placement" => Ok(SearchStrategy::Placement),
        "single-shot" => Ok(SearchStrategy::SingleShot),
        other => Err(miette::miette!(
            "Unknown search strategy: {other}. Use 'placement' or 'single-shot'."
        )),
    }
}

pub(crate) fn parse_refinement(raw: &str) -> miette::Result<RefinementStrategy> {
    match raw {
        "counterexample" => Ok(RefinementStrategy::Counterexample),
        "hole-elimination" => Ok(RefinementStrategy::HoleElimination),
        other => Err(miette::miette!(
            "Unknown refinement strategy: {other}. Use 'counterexample' or 'hole-elimination'."
        )),
    }
}

pub(crate) fn parse_command(flag: &str, raw: &str) -> miette::Result<OracleCommand> {
    OracleCommand::parse(raw).ok_or_else(|| miette::miette!("{flag} must name a program"))
}

/// Read, parse and validate a configuration file.
pub(crate) fn load_config(path: &Path) -> miette::Result<Configuration> {
    let text = fs::read_to_string(path)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("cannot read {}", path.display())))?;
    let config = Configuration::from_json_str(&text).into_diagnostic()?;
    config.validate().into_diagnostic()?;
    Ok(config)
}

pub(crate) fn encoder(args: &OracleArgs) -> miette::Result<ProcessEncoder> {
    Ok(ProcessEncoder::new(parse_command("--encoder", &args.encoder)?))
}

pub(crate) fn equivalence_oracle(args: &OracleArgs) -> miette::Result<ProcessEquivalenceOracle> {
    Ok(
        ProcessEquivalenceOracle::new(parse_command("--equivalence", &args.equivalence)?)
            .with_timeout_secs(args.oracle_timeout),
    )
}

pub(crate) fn artifact_store(args: &OracleArgs, config: &Configuration) -> ArtifactStore {
    match &args.run_id {
        Some(run_id) => ArtifactStore::new(&args.artifact_dir, run_id.clone()),
        None => ArtifactStore::for_config(&args.artifact_dir, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_flag_values_parse() {
        assert_eq!(parse_output_format("json").unwrap(), OutputFormat::Json);
        assert_eq!(
            parse_search_strategy("single-shot").unwrap(),
            SearchStrategy::SingleShot
        );
        assert_eq!(
            parse_refinement("hole-elimination").unwrap(),
            RefinementStrategy::HoleElimination
        );
    }

    #[test]
    fn unknown_flag_values_are_errors() {
        assert!(parse_output_format("yaml").is_err());
        assert!(parse_search_strategy("serial").is_err());
        assert!(parse_refinement("none").is_err());
        assert!(parse_command("--encoder", "   ").is_err());
    }

    #[test]
    fn command_lines_split_on_whitespace() {
        let command = parse_command("--search", "sketch -V 3").unwrap();
        assert_eq!(command.program(), "sketch");
        assert_eq!(command.fixed_args(), ["-V", "3"]);
    }
}
