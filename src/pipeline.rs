use std::time::Instant;

use tracing::{error, info};

use crate::command::StageCommand;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::naming::ArtifactNaming;
use crate::observability::MetricsCollector;
use crate::runner::ToolRunner;
use crate::stages::{Stage, StageContext, StageName, default_stages};
use crate::workspace::{self, Toolset};

/// Pipeline lifecycle. `Succeeded` and `Failed` are terminal; there is no
/// recovery transition out of `Failed` — a failed run leaves its temp
/// artifacts in place and a later run's preflight (which requires an
/// empty scratch directory) or the operator cleans them up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Validating,
    Tiling,
    Sorting,
    Merging,
    CleaningUp,
    Succeeded,
    Failed,
}

impl PipelineState {
    fn for_stage(stage: StageName) -> Self {
        match stage {
            StageName::Tile => PipelineState::Tiling,
            StageName::Sort => PipelineState::Sorting,
            StageName::Merge => PipelineState::Merging,
            StageName::Cleanup => PipelineState::CleaningUp,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct PipelineReport {
    pub stages_run: Vec<StageName>,
}

/// Sequences the four stages strictly in order, short-circuiting on the
/// first failure. Single-threaded by design: no stage begins before the
/// prior stage's external process has terminated and been classified, and
/// internal parallelism is delegated to the sort tool via `-cores`. The
/// only blocking point is waiting for child-process exit; a hung external
/// tool hangs the run, an accepted limitation of the tool boundary.
pub struct PipelineCoordinator {
    config: PipelineConfig,
    runner: Box<dyn ToolRunner>,
    metrics: MetricsCollector,
    state: PipelineState,
    capture_output: bool,
}

impl PipelineCoordinator {
    pub fn new(config: PipelineConfig, runner: Box<dyn ToolRunner>) -> Self {
        Self {
            config,
            runner,
            metrics: MetricsCollector::new(),
            state: PipelineState::Validating,
            capture_output: true,
        }
    }

    /// Stream tool output straight to the console instead of capturing
    /// it. Useful with verbose tools that report live progress.
    pub fn with_passthrough_output(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Record into an existing collector, e.g. the process-wide one, so
    /// callers can read metrics through their own handle after the run.
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    /// Run preflight and all four stages. On the first error the run
    /// moves to `Failed` and later stages never execute.
    pub fn run(&mut self) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let result = self.run_to_completion();
        self.metrics.record_total_duration(started.elapsed());
        match &result {
            Ok(_) => info!("Success. Spatially coherent sort pipeline done."),
            Err(err) => {
                self.state = PipelineState::Failed;
                match err.stage() {
                    Some(stage) => error!(stage = %stage, "Pipeline failed: {err}"),
                    None => error!("Pipeline aborted before any stage ran: {err}"),
                }
            }
        }
        result
    }

    /// Preflight plus rendered command lines, without spawning anything.
    /// The cleanup command is built against the current (empty) scratch
    /// directory, so it shows the pattern rather than concrete files.
    pub fn plan(&mut self) -> Result<Vec<StageCommand>, PipelineError> {
        self.state = PipelineState::Validating;
        let result = self.build_plan();
        if result.is_err() {
            self.state = PipelineState::Failed;
        }
        result
    }

    fn build_plan(&mut self) -> Result<Vec<StageCommand>, PipelineError> {
        let tools = self.preflight()?;
        let naming = ArtifactNaming::new(self.config.temp_dir.as_deref());
        let mut commands = Vec::new();
        for stage in default_stages() {
            let ctx = StageContext {
                config: &self.config,
                naming: &naming,
                tools: &tools,
            };
            commands.push(stage.command(&ctx)?);
        }
        Ok(commands)
    }

    fn run_to_completion(&mut self) -> Result<PipelineReport, PipelineError> {
        self.state = PipelineState::Validating;
        let tools = self.preflight()?;
        let naming = ArtifactNaming::new(self.config.temp_dir.as_deref());

        let mut stages_run = Vec::new();
        for stage in default_stages() {
            self.state = PipelineState::for_stage(stage.name());
            self.execute_stage(stage.as_ref(), &naming, &tools)?;
            stages_run.push(stage.name());
        }

        self.state = PipelineState::Succeeded;
        Ok(PipelineReport { stages_run })
    }

    fn preflight(&self) -> Result<Toolset, PipelineError> {
        // Runs before anything destructive: the cleanup stage relies on
        // the scratch directory containing only artifacts this run made.
        workspace::preflight(&self.config)
    }

    fn execute_stage(
        &self,
        stage: &dyn Stage,
        naming: &ArtifactNaming,
        tools: &Toolset,
    ) -> Result<(), PipelineError> {
        let ctx = StageContext {
            config: &self.config,
            naming,
            tools,
        };
        let command = stage.command(&ctx)?;
        info!(stage = %stage.name(), command = %command, "Running stage");

        let _timer = self.metrics.start_stage(stage.name().as_str());
        let run = self
            .runner
            .run(&command, self.capture_output)
            .map_err(|source| PipelineError::Launch {
                stage: stage.name(),
                source,
            })?;

        let trimmed = run.output.trim_end();
        if !trimmed.is_empty() {
            info!(stage = %stage.name(), "{trimmed}");
        }

        if !run.succeeded() {
            self.metrics.record_stage_failure();
            return Err(PipelineError::StageExecution {
                stage: stage.name(),
                code: run.exit_code,
                output: run.output,
            });
        }

        info!(stage = %stage.name(), "Stage done");
        Ok(())
    }
}
