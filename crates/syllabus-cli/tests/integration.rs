#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DESCRIPTION: &str = "This course covers cloud infrastructure, container orchestration, \
    and continuous delivery. Students build deployment pipelines, monitor distributed systems, \
    and design resilient cloud architecture with infrastructure automation.";

fn syllabus(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("syllabus").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("SYLLABUS_CONFIG")
        .env_remove("SYLLABUS_KNOWLEDGE");
    cmd
}

fn generate(dir: &TempDir, duration: &str, seed: &str) -> Command {
    let mut cmd = syllabus(dir);
    cmd.args([
        "generate",
        "--title",
        "Cloud Engineering",
        "--description",
        DESCRIPTION,
        "--scope",
        "DevOps",
        "--duration",
        duration,
        "--seed",
        seed,
    ]);
    cmd
}

fn generate_json(dir: &TempDir, duration: &str, seed: &str) -> serde_json::Value {
    let output = generate(dir, duration, seed).arg("--json").output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// syllabus generate
// ---------------------------------------------------------------------------

#[test]
fn generate_json_holds_hours_and_weights() {
    let dir = TempDir::new().unwrap();
    let s = generate_json(&dir, "24", "7");

    let modules = s["modules"].as_array().unwrap();
    assert!(!modules.is_empty());
    let hours: u64 = modules.iter().map(|m| m["hours"].as_u64().unwrap()).sum();
    assert_eq!(hours, 24);

    let weights: u64 = s["blueprint"]["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["weightPercent"].as_u64().unwrap())
        .sum();
    assert_eq!(weights, 100);

    assert_eq!(s["metadata"]["courseTitle"], "Cloud Engineering");
    assert_eq!(s["metadata"]["duration"], 24);
    assert!(!s["alignment"]["rows"].as_array().unwrap().is_empty());
}

#[test]
fn generate_is_repeatable_with_seed() {
    let dir = TempDir::new().unwrap();
    let a = generate_json(&dir, "30", "99");
    let b = generate_json(&dir, "30", "99");
    assert_eq!(a["modules"], b["modules"]);
    assert_eq!(a["questions"], b["questions"]);
    assert_eq!(a["blueprint"], b["blueprint"]);
}

#[test]
fn generate_accepts_textual_duration() {
    let dir = TempDir::new().unwrap();
    let s = generate_json(&dir, "4 weeks", "1");
    assert_eq!(s["metadata"]["duration"], 12);
}

#[test]
fn generate_rejects_zero_duration() {
    let dir = TempDir::new().unwrap();
    generate(&dir, "0", "1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid duration"));
}

#[test]
fn generate_names_missing_field() {
    let dir = TempDir::new().unwrap();
    syllabus(&dir)
        .args(["generate", "--title", "Empty", "--scope", "CS", "--duration", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("description"));
}

#[test]
fn generate_reads_request_file() {
    let dir = TempDir::new().unwrap();
    let request = format!(
        "title: Cloud Engineering\ndescription: \"{DESCRIPTION}\"\nscope: DevOps\nduration: 16\n"
    );
    std::fs::write(dir.path().join("request.yaml"), request).unwrap();

    let output = syllabus(&dir)
        .args(["generate", "--input", "request.yaml", "--seed", "3", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let s: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(s["metadata"]["duration"], 16);
}

#[test]
fn generate_writes_yaml_output() {
    let dir = TempDir::new().unwrap();
    generate(&dir, "20", "5")
        .args(["--output", "syllabus.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Syllabus written to"));

    let content = std::fs::read_to_string(dir.path().join("syllabus.yaml")).unwrap();
    assert!(content.contains("courseTitle: Cloud Engineering"));
    assert!(content.contains("alignment:"));
}

#[test]
fn generate_prints_report() {
    let dir = TempDir::new().unwrap();
    generate(&dir, "20", "5")
        .assert()
        .success()
        .stdout(predicate::str::contains("Assessment Blueprint"))
        .stdout(predicate::str::contains("Alignment"))
        .stdout(predicate::str::contains("Quality score"));
}

#[test]
fn generate_refuses_invalid_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bad.yaml"), "modules:\n  min_modules: 9\n  max_modules: 2\n").unwrap();
    generate(&dir, "20", "5")
        .args(["--config", "bad.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config has errors"));
}

// ---------------------------------------------------------------------------
// syllabus knowledge
// ---------------------------------------------------------------------------

#[test]
fn builtin_knowledge_is_valid() {
    let dir = TempDir::new().unwrap();
    syllabus(&dir)
        .args(["knowledge", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Knowledge base is valid."));
}

#[test]
fn knowledge_show_lists_levels() {
    let dir = TempDir::new().unwrap();
    syllabus(&dir)
        .args(["knowledge", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Remember"))
        .stdout(predicate::str::contains("Final Exam"));
}

#[test]
fn exported_knowledge_round_trips() {
    let dir = TempDir::new().unwrap();
    syllabus(&dir)
        .args(["knowledge", "export", "--output", "kb.yaml"])
        .assert()
        .success();
    assert!(dir.path().join("kb.yaml").exists());

    syllabus(&dir)
        .args(["--knowledge", "kb.yaml", "knowledge", "validate"])
        .assert()
        .success();
}

#[test]
fn broken_knowledge_fails_validation() {
    let dir = TempDir::new().unwrap();
    syllabus(&dir)
        .args(["knowledge", "export", "--output", "kb.yaml"])
        .assert()
        .success();
    let path = dir.path().join("kb.yaml");
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replacen("{concept}", "{mystery}", 1)).unwrap();

    syllabus(&dir)
        .args(["--knowledge", "kb.yaml", "knowledge", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mystery"));
}

// ---------------------------------------------------------------------------
// syllabus config
// ---------------------------------------------------------------------------

#[test]
fn config_show_reports_defaults() {
    let dir = TempDir::new().unwrap();
    let output = syllabus(&dir).args(["config", "show", "--json"]).output().unwrap();
    assert!(output.status.success());
    let cfg: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(cfg["balance"]["level_ceiling_pct"], 40);
    assert_eq!(cfg["modules"]["min_modules"], 4);
}

#[test]
fn config_validate_flags_errors() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bad.yaml"), "balance:\n  level_ceiling_pct: 0\n").unwrap();
    syllabus(&dir)
        .args(["--config", "bad.yaml", "config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"));
}

#[test]
fn config_validate_accepts_defaults() {
    let dir = TempDir::new().unwrap();
    syllabus(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid."));
}
