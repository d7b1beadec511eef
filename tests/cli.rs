use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

struct JobFixture {
    root: TempDir,
    job_path: PathBuf,
    scratch: PathBuf,
}

fn write_job(tile_size: &str) -> JobFixture {
    let root = TempDir::new().unwrap();
    let bin = root.path().join("lastools").join("bin");
    fs::create_dir_all(&bin).unwrap();
    for tool in ["lastile", "lassort", "lasmerge"] {
        File::create(bin.join(format!("{tool}{}", std::env::consts::EXE_SUFFIX))).unwrap();
    }
    let scratch = root.path().join("scratch");
    fs::create_dir(&scratch).unwrap();
    let input = root.path().join("huge.laz");
    File::create(&input).unwrap();

    let job_path = root.path().join("job.yaml");
    let mut job = File::create(&job_path).unwrap();
    write!(
        job,
        r#"version: 1
pipeline:
  input: {input}
  lastools_dir: {lastools}
  temp_dir: {scratch}
  tile_size: "{tile_size}"
  bucket_size: "200000"
  cores: 2
  output: {output}
  format: laz
"#,
        input = input.display(),
        lastools = root.path().join("lastools").display(),
        scratch = scratch.display(),
        output = root.path().join("huge_sorted.laz").display(),
    )
    .unwrap();

    JobFixture {
        root,
        job_path,
        scratch,
    }
}

fn huge_sort() -> Command {
    Command::cargo_bin("huge-sort").expect("binary present")
}

#[test]
fn validate_accepts_a_well_formed_job() {
    let fixture = write_job("500");
    huge_sort()
        .args(["validate", fixture.job_path.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn validate_rejects_a_nonpositive_tile_size() {
    let fixture = write_job("0");
    huge_sort()
        .args(["validate", fixture.job_path.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn dry_run_passes_preflight_against_a_fake_install() {
    let fixture = write_job("500");
    huge_sort()
        .args(["run", fixture.job_path.to_str().unwrap(), "--dry-run"])
        .assert()
        .success();
}

#[test]
fn dry_run_fails_on_a_nonempty_scratch_directory() {
    let fixture = write_job("500");
    File::create(fixture.scratch.join("stray.laz")).unwrap();
    huge_sort()
        .args(["run", fixture.job_path.to_str().unwrap(), "--dry-run"])
        .assert()
        .failure();
}

#[test]
fn sort_subcommand_dry_run_builds_a_config_from_flags() {
    let fixture = write_job("500");
    let lastools = fixture.root.path().join("lastools");
    let input = fixture.root.path().join("huge.laz");
    huge_sort()
        .args([
            "sort",
            input.to_str().unwrap(),
            "--lastools",
            lastools.to_str().unwrap(),
            "--bucket-size",
            "200000",
            "--temp-dir",
            fixture.scratch.to_str().unwrap(),
            "--dry-run",
        ])
        .assert()
        .success();
}

#[test]
fn sort_subcommand_rejects_a_relative_tool_root() {
    huge_sort()
        .args([
            "sort",
            "huge.laz",
            "--lastools",
            "lastools",
            "--bucket-size",
            "200000",
            "--dry-run",
        ])
        .assert()
        .failure();
}

#[test]
fn list_stages_prints_the_pipeline_order() {
    let assert = huge_sort().arg("list-stages").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let positions: Vec<usize> = ["tile", "sort", "merge", "cleanup"]
        .iter()
        .map(|stage| stdout.find(&format!("- {stage}")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn missing_job_file_is_reported_with_context() {
    let assert = huge_sort()
        .args(["validate", "/no/such/job.yaml"])
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("job.yaml"));
}
