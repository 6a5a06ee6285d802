//! End-to-end runs of the `lpbatch` binary against a small dataset.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

/// Three assets; scenario 2 holds a single asset capped at 0.25 and so
/// cannot be fully invested.
fn workspace() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    fs::create_dir(&data).unwrap();
    write(
        &data,
        "point_2x0.txt",
        "component_name\tvalue\nx1\t0.6\nx2\t0.25\nx3\t0.8\nobjective\t1.0\n",
    );
    write(&data, "matrix_cp_return.txt", "x1\tx2\tx3\n0.01\t0.02\t0.03\n");
    write(&data, "matrix_cp_mean.txt", "x1\tx2\tx3\n1.0\t2.0\t3.0\n1.0\t1.0\t1.0\n");
    write(&data, "vars.txt", "0\t2\n0\t1\t2\n1\n");
    write(
        root.path(),
        "lpbatch.toml",
        &format!(
            "data_dir = \"{}\"\noutput_dir = \"{}\"\nasset_count = 3\nmin_return = 0.015\nworker_count = 2\nlog_level = \"warn\"\n",
            data.display(),
            root.path().join("out").display()
        ),
    );
    root
}

fn lpbatch(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lpbatch"))
        .arg("--config")
        .arg(root.join("lpbatch.toml"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("LPBATCH_DATA_DIR")
        .env_remove("LPBATCH_OUTPUT_DIR")
        .env_remove("LPBATCH_WORKERS")
        .env_remove("LPBATCH_BATCH_SIZE")
        .env_remove("LPBATCH_TIMEOUT_SECS")
        .env_remove("LPBATCH_LOG_LEVEL")
        .output()
        .unwrap()
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_check_passes() {
    let root = workspace();
    let out = lpbatch(root.path(), &["check"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("All checks passed"));
    assert!(stdout.contains("Scenarios"));
}

#[test]
fn test_check_reports_missing_file() {
    let root = workspace();
    fs::remove_file(root.path().join("data/vars.txt")).unwrap();
    let out = lpbatch(root.path(), &["check"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("vars.txt not found"));
}

#[test]
fn test_solve_then_probe() {
    let root = workspace();
    let out = lpbatch(root.path(), &["solve", "--batch-size", "2"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Batch Summary"));

    let status = lines(&root.path().join("out/result_status.txt"));
    assert_eq!(status.len(), 4);
    assert!(status[0].starts_with("prob_num\tstatus\t"));
    let mut rows: Vec<(String, String)> = status[1..]
        .iter()
        .map(|l| {
            let mut cells = l.split('\t');
            (cells.next().unwrap().to_string(), cells.next().unwrap().to_string())
        })
        .collect();
    rows.sort();
    assert_eq!(rows[0], ("0".to_string(), "optimal".to_string()));
    assert_eq!(rows[1], ("1".to_string(), "optimal".to_string()));
    assert_eq!(rows[2], ("2".to_string(), "infeasible".to_string()));

    let weights = lines(&root.path().join("out/result_weights.txt"));
    assert_eq!(weights.len(), 3);
    assert!(weights.contains(&"2".to_string()));

    let out = lpbatch(root.path(), &["probe"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let probe = lines(&root.path().join("out/result_infeasible_test.txt"));
    assert_eq!(probe, vec!["prob_num\tmax_return\tcause", "2\t-1\tstructurally_infeasible"]);
}

#[test]
fn test_solve_with_limit_and_columns() {
    let root = workspace();
    let config = root.path().join("lpbatch.toml");
    let mut toml = fs::read_to_string(&config).unwrap();
    toml.push_str("status_columns = [\"prob_num\", \"status\"]\n");
    fs::write(&config, toml).unwrap();

    let out = lpbatch(root.path(), &["solve", "--limit", "1", "--workers", "1"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let status = lines(&root.path().join("out/result_status.txt"));
    assert_eq!(status, vec!["prob_num\tstatus", "0\toptimal"]);
}

#[test]
fn test_invalid_config_rejected() {
    let root = workspace();
    let out = lpbatch(root.path(), &["solve", "--batch-size", "0"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("batch_size must be greater than 0"));
}

#[test]
fn test_probe_without_status_log() {
    let root = workspace();
    let out = lpbatch(root.path(), &["probe", "--status-log", "missing.txt"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("File not found: missing.txt"));
}
