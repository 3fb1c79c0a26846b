use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: hub
clusters:
- name: hub-cluster
  cluster:
    server: https://api.hub.example.com:6443
contexts:
- name: hub
  context:
    cluster: hub-cluster
    user: admin
- name: tokenless
  context:
    cluster: hub-cluster
    user: nobody
users:
- name: admin
  user:
    token: sha256~secret
- name: nobody
  user:
    username: nobody
"#;

struct Fixture {
    home: TempDir,
    kubeconfig: PathBuf,
}

fn fixture() -> Fixture {
    let home = tempfile::tempdir().unwrap();
    let kubeconfig = home.path().join("config");
    fs::write(&kubeconfig, KUBECONFIG).unwrap();
    Fixture { home, kubeconfig }
}

fn kubectl_mc(fx: &Fixture) -> Command {
    let mut cmd = Command::cargo_bin("kubectl-mc").unwrap();
    cmd.env("HOME", fx.home.path())
        .env_remove("KUBECONFIG")
        .arg("--kubeconfig")
        .arg(&fx.kubeconfig);
    cmd
}

#[test]
fn help_lists_the_get_command() {
    Command::cargo_bin("kubectl-mc")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("--kubeconfig"));
}

#[test]
fn no_subcommand_prints_help() {
    let fx = fixture();
    kubectl_mc(&fx)
        .assert()
        .success()
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("--request-timeout"));
}

#[test]
fn get_help_lists_its_flags() {
    Command::cargo_bin("kubectl-mc")
        .unwrap()
        .args(["get", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--sort-by"))
        .stdout(predicate::str::contains("--show-labels"));
}

#[test]
fn named_clusters_are_a_usage_error() {
    let fx = fixture();
    kubectl_mc(&fx)
        .args(["get", "east"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "error: currently, only getting all the clusters is supported",
        ))
        .stderr(predicate::str::contains("See 'kubectl-mc get -h' for help and examples"));
}

#[test]
fn unknown_context_is_reported() {
    let fx = fixture();
    kubectl_mc(&fx)
        .args(["--context", "nowhere", "get"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("context not found: for nowhere"))
        .stderr(predicate::str::contains("See 'kubectl-mc").not());
}

#[test]
fn a_token_is_required() {
    let fx = fixture();
    kubectl_mc(&fx)
        .args(["get", "--context", "tokenless"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No Token found: for nobody"));
}

#[test]
fn show_labels_needs_a_human_printer() {
    let fx = fixture();
    kubectl_mc(&fx)
        .args(["get", "-o", "json", "--show-labels"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "--show-labels option cannot be used with json printer",
        ));
}

#[test]
fn unknown_output_formats_are_refused() {
    let fx = fixture();
    kubectl_mc(&fx)
        .args(["get", "-o", "go-template"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "unable to match a printer suitable for the output format \"go-template\"",
        ));
}

#[test]
fn malformed_custom_columns_are_refused() {
    let fx = fixture();
    kubectl_mc(&fx)
        .args(["get", "-o", "custom-columns=NAME"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected custom-columns spec: NAME"));
}

#[test]
fn missing_kubeconfig_file_is_reported() {
    let fx = fixture();
    Command::cargo_bin("kubectl-mc")
        .unwrap()
        .env("HOME", fx.home.path())
        .env_remove("KUBECONFIG")
        .args(["get", "--kubeconfig"])
        .arg(fx.home.path().join("absent"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to load the hub connection from the kubeconfig"));
}

#[test]
fn bad_request_timeout_is_rejected_by_the_parser() {
    let fx = fixture();
    kubectl_mc(&fx)
        .args(["get", "--request-timeout", "soon"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid timeout value"));
}
