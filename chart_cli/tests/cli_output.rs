use std::{env, fs, path::PathBuf, process::Command};

const PEC_CHART: &str = "\
0
bp 0 120
n1 0 1 0 1 0
n2 0 2 3 512 1 0
# 1.5
cp 0 0 1024 700
";

fn norm_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "")
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("chart_cli_{tag}_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn parse_writes_canonical_json_next_to_input() {
    let exe = env!("CARGO_BIN_EXE_chartc");
    let dir = scratch_dir("parse_default_output");
    let input = dir.join("song.pec");
    fs::write(&input, PEC_CHART).unwrap();
    let expected_out = dir.join("song.canonical.json");
    let _ = fs::remove_file(&expected_out);

    let out = Command::new(exe)
        .args(["parse", input.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("2 notes -> "));

    let json = fs::read_to_string(&expected_out).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["info"]["format"], "pec");
    assert_eq!(v["judge_lines"][0]["notes"].as_array().unwrap().len(), 2);
}

#[test]
fn parse_error_output_format_is_stable() {
    let exe = env!("CARGO_BIN_EXE_chartc");
    let dir = scratch_dir("parse_error_format");
    let input = dir.join("broken.pec");
    fs::write(&input, "0\nbp 0 120\nzz 1 2\n").unwrap();

    let out = Command::new(exe)
        .args(["parse", input.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert_eq!(out.status.code(), Some(1));

    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("Error: parse failed: "));
    assert!(stderr.contains("Caused by:"));
    assert!(stderr.contains("E1101: unknown command: zz (line 3)"));
}

#[test]
fn parse_missing_input_is_e2001() {
    let exe = env!("CARGO_BIN_EXE_chartc");
    let missing = env::temp_dir().join(format!("chart_cli_missing_{}.json", std::process::id()));
    let _ = fs::remove_file(&missing);

    let out = Command::new(exe)
        .args(["parse", missing.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    // the OS error text varies, so only the prefix and line are fixed
    assert!(stderr.contains("E2001: failed to read chart file:"));
    assert!(stderr.contains("(line 0)"));
}

#[test]
fn forced_format_overrides_extension() {
    let exe = env!("CARGO_BIN_EXE_chartc");
    let dir = scratch_dir("forced_format");
    let input = dir.join("chart.txt");
    let output = dir.join("out.json");
    fs::write(&input, PEC_CHART).unwrap();

    let out = Command::new(exe)
        .args([
            "parse",
            input.to_str().unwrap(),
            "--format",
            "rpe",
            "-o",
            output.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists());
    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("Caused by:"));
}

#[test]
fn rate_prints_play_result() {
    let exe = env!("CARGO_BIN_EXE_chartc");

    let out = Command::new(exe)
        .args([
            "rate",
            "--perfect",
            "100",
            "--max-combo",
            "100",
            "--difficulty",
            "12",
        ])
        .output()
        .unwrap();

    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["score"], 1_000_000);
    assert_eq!(v["is_full_combo"], true);
    let rks = v["rks"].as_f64().unwrap();
    assert!((rks - 12.032).abs() < 1e-9);
}

#[test]
fn rate_with_lenient_windows_earns_nothing() {
    let exe = env!("CARGO_BIN_EXE_chartc");

    let out = Command::new(exe)
        .args([
            "rate",
            "--perfect",
            "90",
            "--miss",
            "10",
            "--max-combo",
            "50",
            "--difficulty",
            "15",
            "--perfect-window",
            "150",
            "--good-window",
            "200",
        ])
        .output()
        .unwrap();

    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["rks"].as_f64().unwrap(), 0.0);
    assert_eq!(v["is_full_combo"], false);
}

#[test]
fn summary_reads_records_and_config() {
    let exe = env!("CARGO_BIN_EXE_chartc");
    let dir = scratch_dir("summary");
    let records = dir.join("records.json");
    let config = dir.join("engine.json");

    let record = |id: i64, chart_id: i64, rks: f64, score: u32| {
        serde_json::json!({
            "id": id,
            "player_id": 5,
            "chart_id": chart_id,
            "score": score,
            "accuracy": 0.99,
            "is_full_combo": true,
            "std_deviation_ms": 0.0,
            "rks": rks,
            "date_created": format!("2024-01-0{id}T00:00:00Z"),
        })
    };
    let list = serde_json::json!([
        record(1, 10, 12.0, 990_000),
        record(2, 10, 11.0, 995_000),
        record(3, 11, 14.0, 1_000_000),
    ]);
    fs::write(&records, list.to_string()).unwrap();
    fs::write(&config, r#"{ "best_n": 2, "phi_n": 1 }"#).unwrap();

    let out = Command::new(exe)
        .args([
            "summary",
            records.to_str().unwrap(),
            "--player",
            "5",
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["player_id"], 5);
    assert_eq!(v["best_n"].as_array().unwrap().len(), 2);
    assert_eq!(v["phi"].as_array().unwrap().len(), 1);
    let overall = v["overall_rks"].as_f64().unwrap();
    assert!((overall - (14.0 + 12.0 + 14.0) / 3.0).abs() < 1e-9);
}

#[test]
fn summary_rejects_invalid_config() {
    let exe = env!("CARGO_BIN_EXE_chartc");
    let dir = scratch_dir("summary_bad_config");
    let records = dir.join("records.json");
    let config = dir.join("engine.json");
    fs::write(&records, "[]").unwrap();
    fs::write(&config, r#"{ "page_size": 0 }"#).unwrap();

    let out = Command::new(exe)
        .args([
            "summary",
            records.to_str().unwrap(),
            "--player",
            "1",
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("Error: failed to load config:"));
    assert!(stderr.contains("page_size must be at least 1"));
}

#[test]
fn help_lists_subcommands() {
    let exe = env!("CARGO_BIN_EXE_chartc");

    let output = Command::new(exe).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&output.stdout));
    for name in ["parse", "rate", "summary"] {
        assert!(stdout.contains(name));
    }
}
