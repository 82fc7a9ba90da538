use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
    stats_path: PathBuf,
    weights_path: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
            stats_path: root.join("population_stats.json"),
            weights_path: root.join("weights/default.json"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_spiralscore"))
            .args(args)
            .arg("--stats")
            .arg(&self.stats_path)
            .arg("--weights")
            .arg(&self.weights_path)
            .output()
            .expect("Failed to execute binary")
    }

    fn synth(&self, name: &str, extra: &[&str]) -> PathBuf {
        let out = self.path(name);
        let mut args = vec!["synth", out.to_str().unwrap()];
        args.extend_from_slice(extra);
        let output = self.run(&args);
        assert!(output.status.success(), "synth failed: {:?}", output);
        out
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn as_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn test_cli_score_json() {
    let ctx = TestContext::new();
    let trace = ctx.synth("clean.json", &[]);

    let output = ctx.run(&["score", as_str(&trace), "--json"]);
    assert!(output.status.success(), "{:?}", output);

    let result: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(result["classification"], "Normal");
    assert!(result["features"]["radial_deviation"].as_f64().unwrap() < 1e-6);
    assert!(result["top_contributors"].as_array().unwrap().len() <= 5);
}

#[test]
fn test_cli_score_table_report() {
    let ctx = TestContext::new();
    let trace = ctx.synth("tremor.json", &["--tremor-amplitude", "4", "--noise", "1.5"]);

    let output = ctx.run(&["score", as_str(&trace)]);
    assert!(output.status.success(), "{:?}", output);

    let text = stdout(&output);
    let class_re = Regex::new(r"\|\s*Classification\s*\|\s*(Normal|Mild|Moderate|Severe)\s*\|").unwrap();
    let caps = class_re.captures(&text).expect("classification row missing");
    assert_ne!(&caps[1], "Normal");

    let severity_re = Regex::new(r"\|\s*Severity\s*\|\s*(\d+\.\d{4})\s*\|").unwrap();
    let severity: f64 = severity_re.captures(&text).unwrap()[1].parse().unwrap();
    assert!((0.0..=3.0).contains(&severity));
    assert!(text.contains("tremor_amplitude"));
}

#[test]
fn test_cli_batch_isolates_failures() {
    let ctx = TestContext::new();
    let good = ctx.synth("good.json", &[]);
    let bad = ctx.path("bad.json");
    std::fs::write(&bad, r#"{ "points": [ { "x": 1, "y": 1, "t": 0 } ] }"#).unwrap();
    let runaway = ctx.path("runaway.json");
    std::fs::write(
        &runaway,
        r#"{ "points": [
                { "x": 5, "y": 0, "t": 0 },
                { "x": 0, "y": 20, "t": 1000 },
                { "x": -36, "y": 0, "t": 4611686018427387903 } ],
             "reference": { "center_x": 0, "center_y": 0, "a": 5, "b": 10 } }"#,
    )
    .unwrap();
    let csv_path = ctx.path("out.csv");

    let output = ctx.run(&[
        "batch",
        as_str(&good),
        as_str(&bad),
        as_str(&runaway),
        "--csv",
        as_str(&csv_path),
    ]);
    assert!(output.status.success(), "{:?}", output);

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "trace");
    assert!(headers.iter().any(|h| h == "radial_deviation"));

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][3], "Normal");
    assert!(!rows[1][4].is_empty(), "failed trace should carry its error");
    assert!(rows[2][4].contains("tremor_amplitude"), "row: {:?}", rows[2]);
}

#[test]
fn test_cli_config_file_is_validated() {
    let ctx = TestContext::new();
    let trace = ctx.synth("trace.json", &[]);
    let config = ctx.path("config.json");
    std::fs::write(&config, r#"{ "pipeline": { "derivative_window": 1 } }"#).unwrap();

    let output = ctx.run(&["score", as_str(&trace), "--config", as_str(&config)]);
    assert!(!output.status.success());
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("derivative_window"), "stderr: {}", err);
}

#[test]
fn test_cli_demo_jitter_reports_warning() {
    let ctx = TestContext::new();
    let trace = ctx.synth("demo.json", &[]);

    let output = ctx.run(&["score", as_str(&trace), "--json", "--demo-jitter", "--demo-seed", "3"]);
    assert!(output.status.success(), "{:?}", output);

    let result: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let kinds: Vec<&str> = result["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|w| w["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"demo_jitter"));
}
