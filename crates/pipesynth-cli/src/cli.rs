//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Synthesize packet-processing pipeline configurations by counterexample-guided search.\n\n\
    Typical session:\n  \
    1. pipesynth placements sample.json\n  \
    2. pipesynth synth sample.json --encoder 'gen-sketch' --equivalence 'check-equiv'\n  \
    3. pipesynth verify sample.json artifacts/sample.holes --encoder 'gen-sketch' --equivalence 'check-equiv'\n\n\
    Every oracle invocation leaves a problem/output file pair in the artifact directory.";

#[derive(Parser)]
#[command(name = "pipesynth")]
#[command(about = "CEGIS compiler for packet-processing pipelines")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Oracle and artifact settings shared by `synth` and `verify`.
#[derive(Args, Clone, Debug)]
pub(crate) struct OracleArgs {
    /// Encoder command line; receives a JSON request on stdin
    #[arg(long)]
    pub(crate) encoder: String,

    /// Equivalence oracle command line; `--input-bits N <problem>` is appended
    #[arg(long)]
    pub(crate) equivalence: String,

    /// Bit width of the inputs explored during verification
    #[arg(long, default_value_t = 10)]
    pub(crate) input_bits: u32,

    /// Per-invocation oracle timeout in seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    pub(crate) oracle_timeout: u64,

    /// Directory for problem/output artifacts
    #[arg(long, default_value = "artifacts")]
    pub(crate) artifact_dir: PathBuf,

    /// Run identifier used to name artifacts (default: derived from the config)
    #[arg(long)]
    pub(crate) run_id: Option<String>,

    /// Output format: text | json
    #[arg(long, default_value = "text")]
    pub(crate) format: String,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the full search / verify / refine loop
    Synth {
        /// Path to the configuration JSON
        config: PathBuf,

        #[command(flatten)]
        oracles: OracleArgs,

        /// Search oracle command line (default: sketch with the standard flags)
        #[arg(long)]
        search: Option<String>,

        /// Search strategy: placement | single-shot (default: from the config)
        #[arg(long)]
        strategy: Option<String>,

        /// Maximum number of placement candidates searched concurrently
        #[arg(long)]
        workers: Option<usize>,

        /// Maximum number of CEGIS iterations (default: unbounded)
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Overall wall-clock budget in seconds (0 disables)
        #[arg(long, default_value_t = 0)]
        timeout: u64,

        /// Refinement strategy: counterexample | hole-elimination
        #[arg(long, default_value = "counterexample")]
        refinement: String,

        /// Extra predicate to assume from the first iteration (repeatable)
        #[arg(long = "constraint")]
        constraints: Vec<String>,

        /// Write the verified assignment to this holes file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check one assignment against the reference program
    Verify {
        /// Path to the configuration JSON
        config: PathBuf,

        /// Holes file with one `int <hole> = <value>;` per line
        holes: PathBuf,

        #[command(flatten)]
        oracles: OracleArgs,
    },

    /// List placement candidates and their indicator constraints
    Placements {
        /// Path to the configuration JSON
        config: PathBuf,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },
}
