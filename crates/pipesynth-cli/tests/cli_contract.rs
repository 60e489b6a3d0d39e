//! End-to-end tests of the `pipesynth` binary against fake oracle scripts.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const CONFIG: &str = r#"{
    "name": "sample",
    "program": "programs/sample.sk",
    "stateful_alu": "alus/raw.alu",
    "stateless_alu": "alus/stateless.alu",
    "num_pipeline_stages": 2,
    "num_alus_per_stage": 2,
    "num_fields_in_prog": 1,
    "num_state_groups": 1
}"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        fixture.file("config.json", CONFIG);
        fixture.script(
            "encoder.sh",
            r#"input=$(cat)
case "$input" in
  *'"request":"holes"'*) echo '[{"name":"h","bit_width":2}]' ;;
  *) echo "$input" ;;
esac"#,
        );
        fixture.script("sat.sh", "echo 'h__0 = 1;'\nexit 0");
        fixture.script("unsat.sh", "echo UNSATISFIABLE\nexit 1");
        fixture.script("equiv.sh", "echo 'no counterexample'");
        fixture.script("cex.sh", "echo 'pkt_0 = 3'\necho 'state_0 = 0'");
        fixture
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn file(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.file(name, &format!("#!/bin/sh\n{body}\n"));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn arg(&self, name: &str) -> String {
        self.path(name).to_str().unwrap().to_string()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_pipesynth"))
            .args(args)
            .current_dir(self.dir.path())
            .env("RUST_LOG", "warn")
            .output()
            .expect("failed to execute pipesynth")
    }

    fn synth(&self, search: &str, equivalence: &str, extra: &[&str]) -> Output {
        let (config, encoder, search, equivalence) = (
            self.arg("config.json"),
            self.arg("encoder.sh"),
            self.arg(search),
            self.arg(equivalence),
        );
        let mut args = vec![
            "synth",
            config.as_str(),
            "--encoder",
            encoder.as_str(),
            "--search",
            search.as_str(),
            "--equivalence",
            equivalence.as_str(),
            "--run-id",
            "e2e",
        ];
        args.extend_from_slice(extra);
        self.run(&args)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn artifact(dir: &Path, name: &str) -> PathBuf {
    dir.join("artifacts").join(name)
}

#[test]
fn placements_lists_every_candidate() {
    let fx = Fixture::new();
    let output = fx.run(&["placements", &fx.arg("config.json")]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("#0 [group 0 -> stage 0]"));
    assert!(text.contains("#1 [group 0 -> stage 1]"));
    assert!(text.contains("sample_salu_config_1_0 == 1"));

    let output = fx.run(&["placements", &fx.arg("config.json"), "--format", "json"]);
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[1]["stages"][0], 1);
}

#[test]
fn synth_verifies_and_writes_artifacts() {
    let fx = Fixture::new();
    let holes_out = fx.arg("result.holes");
    let output = fx.synth("sat.sh", "equiv.sh", &["--output", holes_out.as_str()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let text = stdout(&output);
    assert!(text.starts_with("VERIFIED after 1 iteration(s)"));
    assert!(text.contains("h = 1"));
    assert_eq!(fs::read_to_string(&holes_out).unwrap(), "int h = 1;\n");

    let dir = fx.dir.path();
    assert!(artifact(dir, "e2e_iter0_verify.sk").exists());
    assert!(artifact(dir, "e2e_iter0_verify_output.txt").exists());
    let problem = fs::read_to_string(artifact(dir, "e2e_iter0_placement0_codegen.sk")).unwrap();
    assert!(problem.contains(r#""request":"codegen""#));
    assert!(problem.contains("sample_salu_config_0_0 == 1"));
}

#[test]
fn synth_reports_failure_with_exit_code_two() {
    let fx = Fixture::new();
    let output = fx.synth("unsat.sh", "equiv.sh", &["--format", "json"]);
    assert_eq!(output.status.code(), Some(2));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"]["result"], "failure");
    assert_eq!(json["rounds"][0]["verdict"]["verdict"], "unsat");
}

#[test]
fn synth_honours_iteration_budget() {
    let fx = Fixture::new();
    let output = fx.synth(
        "sat.sh",
        "cex.sh",
        &["--max-iterations", "2", "--strategy", "single-shot"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("budget") && stderr.contains("exhausted"),
        "stderr: {stderr}"
    );
}

#[test]
fn verify_reports_counterexample() {
    let fx = Fixture::new();
    let holes = fx.file("candidate.holes", "int h = 2;\n");
    let output = fx.run(&[
        "verify",
        &fx.arg("config.json"),
        holes.to_str().unwrap(),
        "--encoder",
        &fx.arg("encoder.sh"),
        "--equivalence",
        &fx.arg("cex.sh"),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("COUNTEREXAMPLE pkt_0=3, state_0=0"));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let fx = Fixture::new();
    fx.file(
        "config.json",
        &CONFIG.replace(r#""num_fields_in_prog": 1"#, r#""num_fields_in_prog": 3"#),
    );
    let marker = fx.path("ran");
    fx.script("sat.sh", &format!("touch {}\nexit 0", marker.display()));
    let output = fx.synth("sat.sh", "equiv.sh", &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ALUs") && stderr.contains("(3)"), "stderr: {stderr}");
    assert!(!marker.exists());
}
