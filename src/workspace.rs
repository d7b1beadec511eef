use std::env::consts::EXE_SUFFIX;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Resolved absolute path to one external executable, checked to exist on
/// disk during preflight and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ToolLocation(PathBuf);

impl ToolLocation {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// The three external collaborators the pipeline sequences.
#[derive(Debug, Clone)]
pub struct Toolset {
    pub lastile: ToolLocation,
    pub lassort: ToolLocation,
    pub lasmerge: ToolLocation,
}

/// Verify the environment before any destructive step runs. Checks, in
/// order: tool root free of spaces and parentheses, tool root absolute,
/// `<root>/bin` present, each executable present, scratch directory
/// present, scratch directory empty. Fails fast on the first violated
/// condition and names it; conditions are never aggregated here because
/// the cleanup stage depends on the scratch directory containing only
/// artifacts this run creates.
pub fn preflight(config: &PipelineConfig) -> Result<Toolset, PipelineError> {
    let root = &config.lastools_dir;
    let rendered = root.to_string_lossy();

    if rendered.contains(' ') {
        return Err(PipelineError::Environment(format!(
            "tool installation root '{rendered}' contains spaces; \
             reinstall under a path like /opt/lastools"
        )));
    }
    if rendered.contains('(') || rendered.contains(')') {
        return Err(PipelineError::Environment(format!(
            "tool installation root '{rendered}' contains parentheses; \
             reinstall under a path like /opt/lastools"
        )));
    }
    if !root.is_absolute() {
        return Err(PipelineError::Environment(format!(
            "tool installation root '{rendered}' must be an absolute path"
        )));
    }

    let bin = root.join("bin");
    if !bin.is_dir() {
        return Err(PipelineError::Environment(format!(
            "cannot find tool directory at {}",
            bin.display()
        )));
    }

    let toolset = Toolset {
        lastile: resolve_tool(&bin, "lastile")?,
        lassort: resolve_tool(&bin, "lassort")?,
        lasmerge: resolve_tool(&bin, "lasmerge")?,
    };

    if let Some(dir) = &config.temp_dir {
        check_scratch_dir(dir)?;
    }

    Ok(toolset)
}

fn resolve_tool(bin: &Path, name: &str) -> Result<ToolLocation, PipelineError> {
    let path = bin.join(format!("{name}{EXE_SUFFIX}"));
    if !path.is_file() {
        return Err(PipelineError::Environment(format!(
            "cannot find {name}{EXE_SUFFIX} at {}",
            path.display()
        )));
    }
    info!(tool = name, path = %path.display(), "Found tool");
    Ok(ToolLocation::new(path))
}

fn check_scratch_dir(dir: &Path) -> Result<(), PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::Environment(format!(
            "cannot find temp directory {}",
            dir.display()
        )));
    }
    let mut entries = fs::read_dir(dir).map_err(|err| {
        PipelineError::Environment(format!(
            "cannot read temp directory {}: {err}",
            dir.display()
        ))
    })?;
    if entries.next().is_some() {
        return Err(PipelineError::Environment(format!(
            "temp directory '{}' is not empty; it may hold artifacts of \
             another run",
            dir.display()
        )));
    }
    info!(dir = %dir.display(), "Temp directory is present and empty");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn fake_install(tools: &[&str]) -> TempDir {
        let root = TempDir::new().unwrap();
        let bin = root.path().join("bin");
        fs::create_dir(&bin).unwrap();
        for tool in tools {
            File::create(bin.join(format!("{tool}{EXE_SUFFIX}"))).unwrap();
        }
        root
    }

    fn config_with(root: &Path, temp_dir: Option<PathBuf>) -> PipelineConfig {
        PipelineConfig {
            input: PathBuf::from("/data/huge.laz"),
            lastools_dir: root.to_path_buf(),
            temp_dir,
            tile_size: "1000".into(),
            bucket_size: "5000000".into(),
            cores: 1,
            output: None,
            format: None,
            verbose: false,
        }
    }

    #[test]
    fn resolves_all_three_tools() {
        let root = fake_install(&["lastile", "lassort", "lasmerge"]);
        let scratch = TempDir::new().unwrap();
        let config = config_with(root.path(), Some(scratch.path().to_path_buf()));
        let toolset = preflight(&config).unwrap();
        assert!(toolset.lastile.path().ends_with(format!("lastile{EXE_SUFFIX}")));
        assert!(toolset.lasmerge.path().is_absolute());
    }

    #[test]
    fn names_the_first_missing_tool() {
        let root = fake_install(&["lastile", "lasmerge"]);
        let config = config_with(root.path(), None);
        let err = preflight(&config).unwrap_err();
        assert!(err.to_string().contains("lassort"));
    }

    #[test]
    fn rejects_missing_bin_directory() {
        let root = TempDir::new().unwrap();
        let config = config_with(root.path(), None);
        let err = preflight(&config).unwrap_err();
        assert!(err.to_string().contains("tool directory"));
    }

    #[test]
    fn rejects_nonempty_scratch_directory() {
        let root = fake_install(&["lastile", "lassort", "lasmerge"]);
        let scratch = TempDir::new().unwrap();
        File::create(scratch.path().join("stray.laz")).unwrap();
        let config = config_with(root.path(), Some(scratch.path().to_path_buf()));
        let err = preflight(&config).unwrap_err();
        assert!(err.to_string().contains("not empty"));
    }

    #[test]
    fn rejects_missing_scratch_directory() {
        let root = fake_install(&["lastile", "lassort", "lasmerge"]);
        let config = config_with(root.path(), Some(root.path().join("no-such-dir")));
        let err = preflight(&config).unwrap_err();
        assert!(err.to_string().contains("temp directory"));
    }

    #[test]
    fn path_character_checks_run_before_any_disk_access() {
        let config = config_with(Path::new("/opt/las tools"), None);
        let err = preflight(&config).unwrap_err();
        assert!(err.to_string().contains("spaces"));
    }
}
