use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;

/// Tile size the external tiler uses when no `-tile_size` flag is passed.
/// Config values equal to this are omitted from the command line.
pub const DEFAULT_TILE_SIZE: &str = "1000";

/// Core count below which no `-cores` flag is passed to the sort tool.
pub const DEFAULT_CORES: u32 = 1;

/// Immutable description of one pipeline run. Created once from a job
/// file or CLI flags, validated, then owned by the coordinator for the
/// run's duration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// The huge point-cloud file to re-order.
    pub input: PathBuf,
    /// Install root of the external tools; executables live under
    /// `<root>/bin`.
    pub lastools_dir: PathBuf,
    /// Scratch directory for intermediate tiles. Must exist and be empty
    /// at preflight. When omitted, artifacts land in the working
    /// directory.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Tile edge length, kept as the operator-supplied decimal string so
    /// the default-omission comparison works on the raw value.
    #[serde(default = "default_tile_size")]
    pub tile_size: String,
    /// Partitioning granularity of the spatial sort.
    pub bucket_size: String,
    /// Degree of parallelism delegated to the sort tool.
    #[serde(default = "default_cores")]
    pub cores: u32,
    /// Merged output file. When omitted the merge tool picks its default.
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Pass `-v` to every tool.
    #[serde(default)]
    pub verbose: bool,
}

fn default_tile_size() -> String {
    DEFAULT_TILE_SIZE.to_string()
}

fn default_cores() -> u32 {
    DEFAULT_CORES
}

/// A versioned YAML job file wrapping one [`PipelineConfig`].
#[derive(Debug, Deserialize)]
pub struct Job {
    pub version: u32,
    pub pipeline: PipelineConfig,
}

impl Job {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file: {}", path.display()))?;
        let job: Job = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse job YAML: {}", path.display()))?;
        Ok(job)
    }
}

/// Normalize an operator-supplied decimal: locales that write `1,5` are
/// accepted and rewritten to `1.5` before the value reaches a command
/// line.
pub fn normalize_decimal(value: &str) -> String {
    value.replace(',', ".")
}

/// Output format of the merged file, mapped onto a fixed flag combination
/// of the merge tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Las,
    Laz,
    Bin,
    Xyzc,
    Xyzci,
    Txyzc,
    Txyzci,
}

impl OutputFormat {
    /// Merge-stage flags for this format. Text formats carry an explicit
    /// per-point parse order.
    pub fn merge_args(self) -> &'static [&'static str] {
        match self {
            OutputFormat::Las => &["-olas"],
            OutputFormat::Laz => &["-olaz"],
            OutputFormat::Bin => &["-obin"],
            OutputFormat::Xyzc => &["-otxt", "-oparse", "xyzc"],
            OutputFormat::Xyzci => &["-otxt", "-oparse", "xyzci"],
            OutputFormat::Txyzc => &["-otxt", "-oparse", "txyzc"],
            OutputFormat::Txyzci => &["-otxt", "-oparse", "txyzci"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_yaml_round_trips_through_serde() {
        let yaml = r#"
version: 1
pipeline:
  input: /data/huge.laz
  lastools_dir: /opt/lastools
  temp_dir: /scratch/run1
  tile_size: "500"
  bucket_size: "200000"
  cores: 4
  output: /data/huge_sorted.laz
  format: laz
  verbose: true
"#;
        let job: Job = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(job.version, 1);
        assert_eq!(job.pipeline.tile_size, "500");
        assert_eq!(job.pipeline.cores, 4);
        assert_eq!(job.pipeline.format, Some(OutputFormat::Laz));
    }

    #[test]
    fn omitted_fields_take_documented_defaults() {
        let yaml = r#"
version: 1
pipeline:
  input: huge.laz
  lastools_dir: /opt/lastools
  bucket_size: "5000000"
"#;
        let job: Job = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(job.pipeline.tile_size, DEFAULT_TILE_SIZE);
        assert_eq!(job.pipeline.cores, DEFAULT_CORES);
        assert!(job.pipeline.temp_dir.is_none());
        assert!(job.pipeline.output.is_none());
        assert!(job.pipeline.format.is_none());
        assert!(!job.pipeline.verbose);
    }

    #[test]
    fn normalize_decimal_rewrites_comma_separators() {
        assert_eq!(normalize_decimal("2,5"), "2.5");
        assert_eq!(normalize_decimal("1000"), "1000");
    }

    #[test]
    fn text_formats_carry_a_parse_order() {
        assert_eq!(
            OutputFormat::Txyzci.merge_args(),
            ["-otxt", "-oparse", "txyzci"]
        );
        assert_eq!(OutputFormat::Bin.merge_args(), ["-obin"]);
    }
}
