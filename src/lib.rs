pub mod command;
pub mod config;
pub mod error;
pub mod naming;
pub mod observability;
pub mod pipeline;
pub mod runner;
pub mod stages;
pub mod validation;
pub mod workspace;

pub use config::{Job, OutputFormat, PipelineConfig};
pub use error::PipelineError;
pub use pipeline::{PipelineCoordinator, PipelineReport, PipelineState};
pub use runner::{RunOutput, SystemRunner, ToolRunner};
