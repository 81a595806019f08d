// Black-box tests for the gridmatch binary.
// Run with: cargo test -p gridmatch-cli --test recon_cli

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn gridmatch() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gridmatch"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("GRIDMATCH_LOG");
    cmd
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

fn code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const CLEAN_CONFIG: &str = r#"
name = "Clean pair"

[sources.left]
file = "left.csv"
[sources.left.columns]
identity = "id"
name = "name"
latitude = "lat"
longitude = "lon"

[sources.right]
file = "right.csv"
[sources.right.columns]
identity = "id"
name = "name"
latitude = "lat"
longitude = "lon"

[pair]
left = "left"
right = "right"
"#;

fn write_clean_pair(dir: &Path) -> PathBuf {
    std::fs::write(dir.join("left.csv"), "id,name,lat,lon\na1,North Yard,50.0,8.0\n").unwrap();
    std::fs::write(dir.join("right.csv"), "id,name,lat,lon\nb1,Station N,50.1,8.1\n").unwrap();
    let config = dir.join("clean.recon.toml");
    std::fs::write(&config, CLEAN_CONFIG).unwrap();
    config
}

// -------------------------------------------------------------------------
// recon run
// -------------------------------------------------------------------------

#[test]
fn run_fixture_reports_discrepancies() {
    let output = gridmatch()
        .args(["recon", "run"])
        .arg(fixture("grid.recon.toml"))
        .arg("--json")
        .output()
        .unwrap();

    assert_eq!(code(&output), 3, "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["meta"]["left"], "osm");
    assert_eq!(json["summary"]["forward"]["matched"], 1);
    assert_eq!(json["summary"]["reverse"]["missing_in_target"], 2);
    assert_eq!(json["report"]["forward"]["coordinate_mismatches"][0]["target_identity"], "Q3");
    assert!(stderr(&output).contains("osm -> wikidata"));
}

#[test]
fn run_clean_pair_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_clean_pair(dir.path());

    let output = gridmatch().args(["recon", "run"]).arg(&config).output().unwrap();
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty());
}

#[test]
fn run_writes_output_file_and_lists() {
    let dir = tempfile::tempdir().unwrap();
    let result_path = dir.path().join("result.json");
    let lists = dir.path().join("lists");

    let output = gridmatch()
        .args(["recon", "run"])
        .arg(fixture("grid.recon.toml"))
        .arg("--output")
        .arg(&result_path)
        .arg("--out-dir")
        .arg(&lists)
        .output()
        .unwrap();

    assert_eq!(code(&output), 3);
    let body = std::fs::read_to_string(&result_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["meta"]["report_sha256"].as_str().unwrap().len(), 64);
    assert!(lists.join("osm_missing_in_wikidata.csv").exists());
    assert!(lists.join("wikidata_missing_in_osm.geojson").exists());
}

#[test]
fn fingerprint_stable_across_processes() {
    let run = || {
        let output = gridmatch()
            .args(["recon", "run"])
            .arg(fixture("grid.recon.toml"))
            .arg("--json")
            .output()
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        (json["meta"]["report_sha256"].clone(), json["report"].clone())
    };
    assert_eq!(run(), run());
}

#[test]
fn run_missing_source_file_is_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_clean_pair(dir.path());
    std::fs::remove_file(dir.path().join("right.csv")).unwrap();

    let output = gridmatch().args(["recon", "run"]).arg(&config).output().unwrap();
    assert_eq!(code(&output), 5);
    assert!(stderr(&output).contains("right.csv"));
}

#[test]
fn run_missing_column_is_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_clean_pair(dir.path());
    std::fs::write(dir.path().join("right.csv"), "id,label,lat,lon\nb1,X,1,1\n").unwrap();

    let output = gridmatch().args(["recon", "run"]).arg(&config).output().unwrap();
    assert_eq!(code(&output), 5);
    let err = stderr(&output);
    assert!(err.contains("missing column 'name'"));
    assert!(err.contains("hint:"));
}

// -------------------------------------------------------------------------
// recon validate
// -------------------------------------------------------------------------

#[test]
fn validate_fixture() {
    let output = gridmatch()
        .args(["recon", "validate"])
        .arg(fixture("grid.recon.toml"))
        .output()
        .unwrap();
    assert_eq!(code(&output), 0);
    assert!(stderr(&output).contains("valid: recon 'Fixture grid' pairing osm with wikidata"));
}

#[test]
fn log_flag_enables_info_output() {
    let quiet = gridmatch()
        .args(["recon", "validate"])
        .arg(fixture("grid.recon.toml"))
        .output()
        .unwrap();
    assert!(!stderr(&quiet).contains("loaded config"));

    let verbose = gridmatch()
        .args(["--log", "info", "recon", "validate"])
        .arg(fixture("grid.recon.toml"))
        .output()
        .unwrap();
    assert_eq!(code(&verbose), 0);
    assert!(stderr(&verbose).contains("loaded config 'Fixture grid'"));
}

#[test]
fn validate_rejects_inverted_thresholds() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.recon.toml");
    std::fs::write(
        &config,
        format!("{CLEAN_CONFIG}\n[thresholds]\nmax_distance_km = 0.5\nmismatch_threshold_km = 0.7\n"),
    )
    .unwrap();

    let output = gridmatch().args(["recon", "validate"]).arg(&config).output().unwrap();
    assert_eq!(code(&output), 4);
    assert!(stderr(&output).contains("invalid thresholds"));
}

#[test]
fn validate_rejects_unknown_pair_source() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.recon.toml");
    std::fs::write(&config, CLEAN_CONFIG.replace("right = \"right\"", "right = \"nope\"")).unwrap();

    let output = gridmatch().args(["recon", "validate"]).arg(&config).output().unwrap();
    assert_eq!(code(&output), 4);
}

#[test]
fn missing_subcommand_is_usage_error() {
    let output = gridmatch().arg("recon").output().unwrap();
    assert_eq!(code(&output), 2);
}

// -------------------------------------------------------------------------
// lookup + normalize
// -------------------------------------------------------------------------

#[test]
fn lookup_json_and_overpass() {
    let dir = tempfile::tempdir().unwrap();
    let query_path = dir.path().join("query.overpassql");

    let output = gridmatch()
        .arg("lookup")
        .arg(fixture("grid.recon.toml"))
        .args(["--source", "osm", "--names"])
        .arg(fixture("substations.txt"))
        .arg("--json")
        .arg("--overpass")
        .arg(&query_path)
        .output()
        .unwrap();

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["matched"][0]["identity"], "1");
    assert_eq!(json["matched"][1]["identity"], "4");
    assert_eq!(json["unmatched"][0], "Unknown Station");

    let query = std::fs::read_to_string(&query_path).unwrap();
    assert!(query.contains("way(1);\n  way(4);"));
}

#[test]
fn lookup_csv_column() {
    let dir = tempfile::tempdir().unwrap();
    let names = dir.path().join("jao.csv");
    std::fs::write(&names, "eic,substation\n1,Alpha\n2,\n3,Nowhere\n").unwrap();

    let output = gridmatch()
        .arg("lookup")
        .arg(fixture("grid.recon.toml"))
        .args(["--source", "osm", "--column", "substation", "--names"])
        .arg(&names)
        .output()
        .unwrap();

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("Alpha\t2\tAlpha Plant\t11,21"));
    assert_eq!(lines.next(), Some("Nowhere\t\t\t"));
}

#[test]
fn lookup_unknown_source() {
    let output = gridmatch()
        .arg("lookup")
        .arg(fixture("grid.recon.toml"))
        .args(["--source", "nominatim", "--names"])
        .arg(fixture("substations.txt"))
        .output()
        .unwrap();
    assert_eq!(code(&output), 2);
    assert!(stderr(&output).contains("configured sources: osm, wikidata"));
}

#[test]
fn normalize_prints_keys() {
    let output = gridmatch()
        .args(["normalize", "Plant-X (Unit #2)", "  Koyna   Dam "])
        .output()
        .unwrap();
    assert_eq!(code(&output), 0);
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "plantx unit 2\nkoyna dam\n");
}
