//! Per-invocation problem/output artifacts.
//!
//! Names are a pure function of the run identifier, the CEGIS iteration and
//! the placement index, so a failed run can be replayed from its files.

use std::fs;
use std::path::{Path, PathBuf};

use pipesynth_oracle::{InvocationLabel, OracleError};
use sha2::{Digest, Sha256};

use crate::config::Configuration;

/// Which kind of problem an artifact pair holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Codegen,
    Verify,
}

/// Problem file plus raw oracle output file for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPair {
    pub problem: PathBuf,
    pub output: PathBuf,
}

impl ArtifactPair {
    pub fn write_problem(&self, text: &str) -> Result<(), OracleError> {
        write_file(&self.problem, text)
    }

    pub fn write_output(&self, text: &str) -> Result<(), OracleError> {
        write_file(&self.output, text)
    }
}

fn write_file(path: &Path, text: &str) -> Result<(), OracleError> {
    fs::write(path, text).map_err(|source| OracleError::Artifact {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    run_id: String,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            run_id: run_id.into(),
        }
    }

    /// Store whose run id is derived from the configuration contents.
    pub fn for_config(dir: impl Into<PathBuf>, config: &Configuration) -> Self {
        Self::new(dir, default_run_id(config))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn ensure_dir(&self) -> Result<(), OracleError> {
        fs::create_dir_all(&self.dir).map_err(|source| OracleError::Artifact {
            path: self.dir.clone(),
            source,
        })
    }

    pub fn pair(&self, kind: ArtifactKind, label: InvocationLabel) -> ArtifactPair {
        let mut stem = format!("{}_iter{}", self.run_id, label.iteration);
        if let Some(placement) = label.placement {
            stem.push_str(&format!("_placement{placement}"));
        }
        stem.push_str(match kind {
            ArtifactKind::Codegen => "_codegen",
            ArtifactKind::Verify => "_verify",
        });
        ArtifactPair {
            problem: self.dir.join(format!("{stem}.sk")),
            output: self.dir.join(format!("{stem}_output.txt")),
        }
    }
}

/// `<name>-<first 12 hex digits of sha256(config json)>`.
pub fn default_run_id(config: &Configuration) -> String {
    let canonical = serde_json::to_vec(config).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("{}-{hex}", config.name)
}
