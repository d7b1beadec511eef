use serde::Serialize;

use crate::config::{Job, PipelineConfig, normalize_decimal};

/// Aggregated outcome of shape-checking a run description. Unlike the
/// preflight environment checks, which fail fast before destructive work,
/// validation reports every problem at once so an operator can fix a job
/// file in one pass.
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_job(job: &Job) -> ValidationReport {
    let mut report = validate_config(&job.pipeline);
    if job.version != 1 {
        report
            .errors
            .insert(0, format!("Unsupported job version: {}", job.version));
    }
    report
}

pub fn validate_config(config: &PipelineConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.input.as_os_str().is_empty() {
        report.errors.push("Input file path cannot be empty".into());
    }

    let root = config.lastools_dir.to_string_lossy();
    if root.is_empty() {
        report
            .errors
            .push("Tool installation root cannot be empty".into());
    } else {
        if !config.lastools_dir.is_absolute() {
            report.errors.push(format!(
                "Tool installation root '{root}' must be an absolute path"
            ));
        }
        // Spaces and parentheses are known to break the external tools'
        // own command handling, independent of how we quote arguments.
        if root.contains(' ') {
            report
                .errors
                .push(format!("Tool installation root '{root}' contains spaces"));
        }
        if root.contains('(') || root.contains(')') {
            report.errors.push(format!(
                "Tool installation root '{root}' contains parentheses"
            ));
        }
    }

    check_positive_decimal(&mut report, "tile_size", &config.tile_size);
    check_positive_decimal(&mut report, "bucket_size", &config.bucket_size);

    if config.cores == 0 {
        report.errors.push("cores must be at least 1".into());
    }

    if let Some(dir) = &config.temp_dir
        && dir.as_os_str().is_empty()
    {
        report.errors.push("temp_dir cannot be an empty path".into());
    }

    if config.temp_dir.is_none() {
        report.warnings.push(
            "No temp_dir given; intermediate tiles will be created in the working directory"
                .into(),
        );
    }

    if config.output.is_none() {
        report
            .warnings
            .push("No output path given; the merge tool will pick a default output name".into());
    }

    report
}

fn check_positive_decimal(report: &mut ValidationReport, field: &str, value: &str) {
    match normalize_decimal(value).parse::<f64>() {
        Ok(parsed) if parsed > 0.0 => {}
        Ok(_) => report
            .errors
            .push(format!("{field} must be positive, got '{value}'")),
        Err(_) => report
            .errors
            .push(format!("{field} must be a number, got '{value}'")),
    }
}
