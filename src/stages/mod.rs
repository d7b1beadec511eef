use std::fmt;

use crate::command::StageCommand;
use crate::config::{DEFAULT_CORES, DEFAULT_TILE_SIZE, PipelineConfig, normalize_decimal};
use crate::error::PipelineError;
use crate::naming::ArtifactNaming;
use crate::workspace::Toolset;

/// The four orchestration steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageName {
    Tile,
    Sort,
    Merge,
    Cleanup,
}

impl StageName {
    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Tile => "tile",
            StageName::Sort => "sort",
            StageName::Merge => "merge",
            StageName::Cleanup => "cleanup",
        }
    }

    pub fn all() -> [StageName; 4] {
        [
            StageName::Tile,
            StageName::Sort,
            StageName::Merge,
            StageName::Cleanup,
        ]
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a stage needs to build its command line. The naming value
/// is shared by all stages of one run, which is what enforces the
/// output-pattern/input-glob agreement between consecutive stages.
pub struct StageContext<'a> {
    pub config: &'a PipelineConfig,
    pub naming: &'a ArtifactNaming,
    pub tools: &'a Toolset,
}

/// A single orchestration step: knows its name and how to turn typed
/// parameters into a command line. Execution, logging and result
/// classification live in the coordinator; a stage performs no I/O of its
/// own except the cleanup stage's glob expansion.
pub trait Stage {
    fn name(&self) -> StageName;
    fn command(&self, ctx: &StageContext<'_>) -> Result<StageCommand, PipelineError>;
}

/// The pipeline's fixed stage sequence.
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(TileStage),
        Box::new(SortStage),
        Box::new(MergeStage),
        Box::new(CleanupStage),
    ]
}

/// Decomposes the huge input file into tiles that fit in memory. The
/// tiler fans the single `-o` name out into numbered tiles on its own.
pub struct TileStage;

impl Stage for TileStage {
    fn name(&self) -> StageName {
        StageName::Tile
    }

    fn command(&self, ctx: &StageContext<'_>) -> Result<StageCommand, PipelineError> {
        let config = ctx.config;
        let mut cmd = StageCommand::new(ctx.tools.lastile.path());
        if config.verbose {
            cmd = cmd.arg("-v");
        }
        cmd = cmd.arg("-i").arg_path(&config.input);
        // Skip-on-default is an optimization, not a correctness rule: the
        // tool applies the same value when the flag is absent.
        if config.tile_size != DEFAULT_TILE_SIZE {
            cmd = cmd.arg("-tile_size").arg(normalize_decimal(&config.tile_size));
        }
        if let Some(dir) = &config.temp_dir {
            cmd = cmd.arg("-odir").arg_path(dir);
        }
        Ok(cmd.arg("-o").arg(ctx.naming.tile_output_name()).arg("-olaz"))
    }
}

/// Sorts every tile into a spatially coherent z-order, optionally across
/// multiple cores. Consumes the tile stage's fan-out via its glob.
pub struct SortStage;

impl Stage for SortStage {
    fn name(&self) -> StageName {
        StageName::Sort
    }

    fn command(&self, ctx: &StageContext<'_>) -> Result<StageCommand, PipelineError> {
        let config = ctx.config;
        let mut cmd = StageCommand::new(ctx.tools.lassort.path());
        if config.verbose {
            cmd = cmd.arg("-v");
        }
        cmd = cmd
            .arg("-i")
            .arg(ctx.naming.tile_glob())
            .arg("-bucket_size")
            .arg(normalize_decimal(&config.bucket_size))
            // The tiling structure is irrelevant once points are z-ordered.
            .arg("-destroy_tiling")
            .arg("-odix")
            .arg(ctx.naming.sorted_suffix())
            .arg("-olaz");
        if config.cores != DEFAULT_CORES {
            cmd = cmd.arg("-cores").arg(config.cores.to_string());
        }
        Ok(cmd)
    }
}

/// Merges the sorted tiles back into one output file.
pub struct MergeStage;

impl Stage for MergeStage {
    fn name(&self) -> StageName {
        StageName::Merge
    }

    fn command(&self, ctx: &StageContext<'_>) -> Result<StageCommand, PipelineError> {
        let config = ctx.config;
        let mut cmd = StageCommand::new(ctx.tools.lasmerge.path());
        if config.verbose {
            cmd = cmd.arg("-v");
        }
        cmd = cmd.arg("-i").arg(ctx.naming.sorted_glob());
        if let Some(output) = &config.output {
            cmd = cmd.arg("-o").arg_path(output);
        }
        if let Some(format) = config.format {
            cmd = cmd.args(format.merge_args().iter().copied());
        }
        Ok(cmd)
    }
}

/// Removes every intermediate tile, sorted or not, by expanding the tile
/// glob itself and issuing a structured delete command over the matches.
/// Nothing here goes through a shell.
pub struct CleanupStage;

impl Stage for CleanupStage {
    fn name(&self) -> StageName {
        StageName::Cleanup
    }

    fn command(&self, ctx: &StageContext<'_>) -> Result<StageCommand, PipelineError> {
        let pattern = ctx.naming.tile_glob();
        let matches = glob::glob(&pattern)
            .map_err(|err| {
                PipelineError::Configuration(format!("bad cleanup pattern '{pattern}': {err}"))
            })?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                PipelineError::Environment(format!(
                    "cannot enumerate temp artifacts for '{pattern}': {err}"
                ))
            })?;

        let mut cmd = delete_command();
        if matches.is_empty() {
            // `-f` keeps this a successful no-op when the tools produced
            // nothing, e.g. in a dry run rehearsal.
            cmd = cmd.arg(pattern);
        } else {
            for path in &matches {
                cmd = cmd.arg_path(path);
            }
        }
        Ok(cmd)
    }
}

#[cfg(not(windows))]
fn delete_command() -> StageCommand {
    StageCommand::new("rm").arg("-f")
}

#[cfg(windows)]
fn delete_command() -> StageCommand {
    StageCommand::new("cmd").arg("/C").arg("del").arg("/Q")
}
