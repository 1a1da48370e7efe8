use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn pdk() -> Command {
    Command::cargo_bin("pdk").unwrap()
}

#[test]
fn config_hash_ignores_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.yaml");
    let b = dir.path().join("b.yaml");
    fs::write(&a, "run: {initial_cash: 5, history_days: 2}\n").unwrap();
    fs::write(&b, "run: {history_days: 2, initial_cash: 5}\n").unwrap();

    let out_a = pdk().arg("config-hash").arg(&a).output().unwrap();
    let out_b = pdk().arg("config-hash").arg(&b).output().unwrap();
    assert!(out_a.status.success());
    let first_line = |o: &std::process::Output| {
        String::from_utf8_lossy(&o.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    };
    assert!(first_line(&out_a).starts_with("config_hash="));
    assert_eq!(first_line(&out_a), first_line(&out_b));
}

#[test]
fn pasted_key_in_config_is_refused_without_echoing_it() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bad.yaml");
    fs::write(
        &p,
        "strategies: [{signature: g, provider: openai, model: m, api_key_env: sk-proj-abcdef123456}]\n",
    )
    .unwrap();

    pdk()
        .arg("config-hash")
        .arg(&p)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("abcdef123456").not());
}

#[test]
fn audit_verify_reports_tampering() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    {
        use pdk_audit::AuditSink;
        let sink = pdk_audit::JsonlAuditSink::open(&path, true).unwrap();
        sink.record_run_started("cfg", &["a".to_string()]).unwrap();
        sink.record_run_started("cfg", &["b".to_string()]).unwrap();
    }

    pdk()
        .args(["audit", "verify", "--path"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("audit_valid=true lines=2"));

    let tampered = fs::read_to_string(&path).unwrap().replace("\"b\"", "\"z\"");
    fs::write(&path, tampered).unwrap();
    pdk()
        .args(["audit", "verify", "--path"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("audit_valid=false line=2"));
}
