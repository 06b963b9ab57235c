use serde_json::Value;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "canonry-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_canonry<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_canonry");
    Command::new(bin)
        .args(args)
        .output()
        .expect("canonry command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn write_record(corpus_root: &Path, relative: &str, contents: &str) {
    let path = corpus_root.join(relative);
    fs::create_dir_all(path.parent().expect("record path should have a parent"))
        .expect("record dir should exist");
    fs::write(path, contents).expect("record should be written");
}

fn write_unit_schema_config(path: &Path) {
    let config = "\
[[schemas.Unit.references]]
path = \"maxHealthStatId\"
targets = [\"Stat\"]
";
    fs::write(path, config).expect("config should be written");
}

/// Stat plus two units, one holding a wrong-case reference to it.
fn seed_drifted_corpus(corpus_root: &Path) {
    write_record(
        corpus_root,
        "stat/max-health.json",
        r#"{"kind":"Stat","id":"core.maxHealth"}"#,
    );
    write_record(
        corpus_root,
        "unit/soldier.json",
        r#"{"kind":"Unit","id":"unit.soldier","fields":{"maxHealthStatId":"core.maxHealth"}}"#,
    );
    write_record(
        corpus_root,
        "unit/bad.json",
        r#"{"kind":"Unit","id":"unit.bad","fields":{"maxHealthStatId":"core.maxhealth"}}"#,
    );
}

fn corpus_and_config_args(tmp: &TempDirGuard) -> (OsString, OsString) {
    (
        tmp.path().join("corpus").into_os_string(),
        tmp.path().join("canonry.toml").into_os_string(),
    )
}

#[test]
fn validate_json_smoke_on_clean_corpus() {
    let tmp = TempDirGuard::new("validate-clean");
    let corpus_root = tmp.path().join("corpus");
    write_record(
        &corpus_root,
        "stat/max-health.json",
        r#"{"kind":"Stat","id":"core.maxHealth"}"#,
    );
    write_record(
        &corpus_root,
        "unit/soldier.json",
        r#"{"kind":"Unit","id":"unit.soldier","fields":{"maxHealthStatId":"core.maxHealth"}}"#,
    );
    write_unit_schema_config(&tmp.path().join("canonry.toml"));
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);

    let output = run_canonry([
        OsString::from("validate"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
        OsString::from("--json"),
    ]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["action"], "validate");
    assert_eq!(payload["recordCount"], 2);
    assert_eq!(payload["report"]["issues"], serde_json::json!([]));
}

#[test]
fn validate_flags_wrong_case_reference_and_exits_nonzero() {
    let tmp = TempDirGuard::new("validate-drift");
    seed_drifted_corpus(&tmp.path().join("corpus"));
    write_unit_schema_config(&tmp.path().join("canonry.toml"));
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);

    let output = run_canonry([
        OsString::from("validate"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
        OsString::from("--json"),
    ]);
    assert_failure(&output);

    let payload = parse_json_stdout(&output);
    let issues = payload["report"]["issues"]
        .as_array()
        .expect("issues should be an array");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["code"], "reference.target.missing");
    assert_eq!(issues[0]["path"], "unit/bad.json");
    assert_eq!(issues[0]["suggestedFix"], "core.maxHealth");
}

#[test]
fn repair_apply_fixes_reference_and_persists() {
    let tmp = TempDirGuard::new("repair-apply");
    let corpus_root = tmp.path().join("corpus");
    seed_drifted_corpus(&corpus_root);
    write_unit_schema_config(&tmp.path().join("canonry.toml"));
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);

    let output = run_canonry([
        OsString::from("repair"),
        OsString::from("--corpus"),
        corpus_arg.clone(),
        OsString::from("--config"),
        config_arg.clone(),
        OsString::from("--mode"),
        OsString::from("apply"),
        OsString::from("--json"),
    ]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["action"], "repair");
    assert_eq!(payload["mode"], "apply");
    assert_eq!(
        payload["applied"]["appliedPaths"],
        serde_json::json!(["unit/bad.json"])
    );
    assert_eq!(payload["errorsRemain"], false);

    let rewritten = fs::read_to_string(corpus_root.join("unit/bad.json"))
        .expect("rewritten record should be readable");
    assert!(rewritten.contains("core.maxHealth"));

    let revalidate = run_canonry([
        OsString::from("validate"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
        OsString::from("--json"),
    ]);
    assert_success(&revalidate);
}

#[test]
fn repair_preview_prints_migration_script() {
    let tmp = TempDirGuard::new("repair-preview");
    seed_drifted_corpus(&tmp.path().join("corpus"));
    write_unit_schema_config(&tmp.path().join("canonry.toml"));
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);

    let output = run_canonry([
        OsString::from("repair"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
        OsString::from("--mode"),
        OsString::from("preview"),
    ]);
    // The corpus still holds an error, so the gate fails even though the
    // script renders.
    assert_failure(&output);
    let script = stdout_text(&output);
    assert!(
        script.starts_with("SET unit/bad.json :: maxHealthStatId = core.maxHealth"),
        "unexpected preview script:\n{script}"
    );
}

#[test]
fn repair_validate_mode_does_not_touch_disk() {
    let tmp = TempDirGuard::new("repair-validate");
    let corpus_root = tmp.path().join("corpus");
    seed_drifted_corpus(&corpus_root);
    write_unit_schema_config(&tmp.path().join("canonry.toml"));
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);
    let before = fs::read(corpus_root.join("unit/bad.json")).expect("record should be readable");

    let output = run_canonry([
        OsString::from("repair"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
        OsString::from("--json"),
    ]);
    assert_failure(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["mode"], "validate");
    assert_eq!(payload["applied"], Value::Null);
    let after = fs::read(corpus_root.join("unit/bad.json")).expect("record should be readable");
    assert_eq!(after, before);
}

#[test]
fn rename_plan_then_apply_rewrites_references() {
    let tmp = TempDirGuard::new("rename");
    let corpus_root = tmp.path().join("corpus");
    write_record(
        &corpus_root,
        "stat/old-health.json",
        r#"{"kind":"Stat","id":"core.oldHealth"}"#,
    );
    write_record(
        &corpus_root,
        "unit/soldier.json",
        r#"{"kind":"Unit","id":"unit.soldier","fields":{"maxHealthStatId":"core.oldHealth"}}"#,
    );
    write_unit_schema_config(&tmp.path().join("canonry.toml"));
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);

    let plan_output = run_canonry([
        OsString::from("rename"),
        OsString::from("core.oldHealth"),
        OsString::from("core.maxHealth"),
        OsString::from("--corpus"),
        corpus_arg.clone(),
        OsString::from("--config"),
        config_arg.clone(),
        OsString::from("--json"),
    ]);
    assert_success(&plan_output);
    let plan_payload = parse_json_stdout(&plan_output);
    assert_eq!(plan_payload["action"], "rename.plan");
    let operations = plan_payload["plan"]["operations"]
        .as_array()
        .expect("operations should be an array");
    assert_eq!(operations.len(), 3);

    // Planning alone leaves the corpus untouched.
    let still_old = fs::read_to_string(corpus_root.join("stat/old-health.json"))
        .expect("record should be readable");
    assert!(still_old.contains("core.oldHealth"));

    let apply_output = run_canonry([
        OsString::from("rename"),
        OsString::from("core.oldHealth"),
        OsString::from("core.maxHealth"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
        OsString::from("--apply"),
        OsString::from("--json"),
    ]);
    assert_success(&apply_output);
    let apply_payload = parse_json_stdout(&apply_output);
    assert_eq!(apply_payload["action"], "rename.apply");

    let renamed = fs::read_to_string(corpus_root.join("stat/old-health.json"))
        .expect("renamed record should be readable");
    assert!(renamed.contains(r#""id": "core.maxHealth""#));
    let referrer = fs::read_to_string(corpus_root.join("unit/soldier.json"))
        .expect("referrer should be readable");
    assert!(referrer.contains("core.maxHealth"));
}

#[test]
fn rename_unknown_id_fails() {
    let tmp = TempDirGuard::new("rename-unknown");
    let corpus_root = tmp.path().join("corpus");
    write_record(
        &corpus_root,
        "stat/max-health.json",
        r#"{"kind":"Stat","id":"core.maxHealth"}"#,
    );
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);

    let output = run_canonry([
        OsString::from("rename"),
        OsString::from("core.missing"),
        OsString::from("core.other"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
    ]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("no definition has id"));
}

#[test]
fn normalize_apply_rewrites_clean_ids() {
    let tmp = TempDirGuard::new("normalize");
    let corpus_root = tmp.path().join("corpus");
    write_record(
        &corpus_root,
        "unit/archer.json",
        r#"{"kind":"Unit","id":"Heavy Archer"}"#,
    );

    let output = run_canonry([
        OsString::from("normalize"),
        OsString::from("--corpus"),
        corpus_root.as_os_str().to_os_string(),
        OsString::from("--apply"),
        OsString::from("--json"),
    ]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["action"], "normalize");
    assert_eq!(payload["normalizable"], 1);
    assert_eq!(
        payload["applied"]["appliedPaths"],
        serde_json::json!(["unit/archer.json"])
    );

    let rewritten = fs::read_to_string(corpus_root.join("unit/archer.json"))
        .expect("normalized record should be readable");
    assert!(rewritten.contains(r#""id": "heavy.archer""#));
}

#[test]
fn graph_orphans_json_smoke() {
    let tmp = TempDirGuard::new("graph-orphans");
    seed_drifted_corpus(&tmp.path().join("corpus"));
    write_unit_schema_config(&tmp.path().join("canonry.toml"));
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);

    let output = run_canonry([
        OsString::from("graph"),
        OsString::from("orphans"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
        OsString::from("--json"),
    ]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["action"], "graph.orphans");
    assert_eq!(payload["orphanCount"], 2);
    assert_eq!(
        payload["report"]["issues"][0]["code"],
        "graph.definition.orphaned"
    );
}

#[test]
fn graph_can_delete_gates_on_inbound_references() {
    let tmp = TempDirGuard::new("graph-can-delete");
    let corpus_root = tmp.path().join("corpus");
    write_record(
        &corpus_root,
        "stat/max-health.json",
        r#"{"kind":"Stat","id":"core.maxHealth"}"#,
    );
    write_record(
        &corpus_root,
        "unit/soldier.json",
        r#"{"kind":"Unit","id":"unit.soldier","fields":{"maxHealthStatId":"core.maxHealth"}}"#,
    );
    write_unit_schema_config(&tmp.path().join("canonry.toml"));
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);

    let blocked = run_canonry([
        OsString::from("graph"),
        OsString::from("can-delete"),
        OsString::from("core.maxHealth"),
        OsString::from("--corpus"),
        corpus_arg.clone(),
        OsString::from("--config"),
        config_arg.clone(),
    ]);
    assert_failure(&blocked);
    assert!(stdout_text(&blocked).contains("Deletable: no"));

    let free = run_canonry([
        OsString::from("graph"),
        OsString::from("can-delete"),
        OsString::from("unit.soldier"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
    ]);
    assert_success(&free);
    assert!(stdout_text(&free).contains("Deletable: yes"));
}

#[test]
fn graph_missing_reports_dangling_references() {
    let tmp = TempDirGuard::new("graph-missing");
    seed_drifted_corpus(&tmp.path().join("corpus"));
    write_unit_schema_config(&tmp.path().join("canonry.toml"));
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);

    let output = run_canonry([
        OsString::from("graph"),
        OsString::from("missing"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
        OsString::from("--json"),
    ]);
    assert_failure(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["action"], "graph.missing");
    assert_eq!(payload["missingCount"], 1);
    assert_eq!(
        payload["report"]["issues"][0]["code"],
        "graph.reference.dangling"
    );
}

#[test]
fn init_scaffolds_and_validate_accepts_empty_corpus() {
    let tmp = TempDirGuard::new("init");

    let first = run_canonry([
        OsString::from("init"),
        tmp.path().as_os_str().to_os_string(),
        OsString::from("--json"),
    ]);
    assert_success(&first);
    let first_payload = parse_json_stdout(&first);
    assert_eq!(first_payload["action"], "init");
    assert_eq!(first_payload["createdCorpusDir"], true);
    assert_eq!(first_payload["createdConfig"], true);

    let second = run_canonry([
        OsString::from("init"),
        tmp.path().as_os_str().to_os_string(),
        OsString::from("--json"),
    ]);
    assert_success(&second);
    let second_payload = parse_json_stdout(&second);
    assert_eq!(second_payload["createdCorpusDir"], false);
    assert_eq!(second_payload["createdConfig"], false);

    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);
    let validate = run_canonry([
        OsString::from("validate"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
        OsString::from("--json"),
    ]);
    assert_success(&validate);
    assert_eq!(parse_json_stdout(&validate)["recordCount"], 0);
}

#[test]
fn repair_apply_refuses_while_lock_is_held() {
    let tmp = TempDirGuard::new("repair-locked");
    let corpus_root = tmp.path().join("corpus");
    seed_drifted_corpus(&corpus_root);
    write_unit_schema_config(&tmp.path().join("canonry.toml"));
    fs::write(corpus_root.join(".canonry.lock"), "pid=0\n").expect("lock should be written");
    let (corpus_arg, config_arg) = corpus_and_config_args(&tmp);

    let output = run_canonry([
        OsString::from("repair"),
        OsString::from("--corpus"),
        corpus_arg,
        OsString::from("--config"),
        config_arg,
        OsString::from("--mode"),
        OsString::from("apply"),
    ]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("corpus lock busy"));

    // The pre-existing lock file must still be there; the refused run must
    // not remove it.
    assert!(corpus_root.join(".canonry.lock").exists());
}
