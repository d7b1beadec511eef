use std::io;

use thiserror::Error;

use crate::stages::StageName;

/// Failure taxonomy for a pipeline run. Every variant aborts the run
/// immediately; there is no partial-success state and no retry at any
/// layer. Intermediate artifacts from a failed run are left on disk for
/// post-mortem inspection.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run description itself is malformed (bad numeric value,
    /// unusable tool-root path, missing required field).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The environment does not match the preflight contract (missing
    /// executable, missing or non-empty scratch directory).
    #[error("environment error: {0}")]
    Environment(String),

    /// The external tool could not be spawned at all.
    #[error("failed to launch {stage} stage: {source}")]
    Launch {
        stage: StageName,
        #[source]
        source: io::Error,
    },

    /// The external tool ran and exited non-zero.
    #[error("{stage} stage failed with exit code {code}")]
    StageExecution {
        stage: StageName,
        code: i32,
        output: String,
    },
}

impl PipelineError {
    /// Name of the stage this error occurred in, when it is tied to one.
    pub fn stage(&self) -> Option<StageName> {
        match self {
            PipelineError::Launch { stage, .. } | PipelineError::StageExecution { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }
}
