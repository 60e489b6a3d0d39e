// Handler for: Placements

use std::path::PathBuf;

use miette::IntoDiagnostic;
use pipesynth_engine::placement::placements;
use serde::Serialize;

use super::helpers::{load_config, parse_output_format};
use crate::OutputFormat;

#[derive(Debug, Serialize)]
struct PlacementEntry {
    index: usize,
    stages: Vec<usize>,
    constraints: Vec<String>,
}

pub(crate) fn run_placements_command(config: PathBuf, format: &str) -> miette::Result<()> {
    let format = parse_output_format(format)?;
    let config = load_config(&config)?;

    match format {
        OutputFormat::Text => {
            for placement in placements(&config) {
                println!("{placement}");
                for constraint in placement.constraints(&config) {
                    println!("    {constraint}");
                }
            }
        }
        OutputFormat::Json => {
            let entries: Vec<PlacementEntry> = placements(&config)
                .map(|p| PlacementEntry {
                    constraints: p
                        .constraints(&config)
                        .into_iter()
                        .map(|c| c.predicate)
                        .collect(),
                    index: p.index,
                    stages: p.stages,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries).into_diagnostic()?);
        }
    }
    Ok(())
}
