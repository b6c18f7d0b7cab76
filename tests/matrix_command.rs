//! End-to-end runs of the `matrix` command over data files on disk.

use dpe::cli::matrix::{MatrixRequest, build_matrix, expand_configs};
use dpe::Config;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::path::Path;

const CATALOG: &str = r#"
extensions:
  redis:
    versions: ["6.0.2", "6.0.1", "5.3.7"]
    php_dependencies:
      "6.0.2": { min: "8.1.0" }
      "6.0.1": { min: "8.1.0" }
  opcache:
    versions: []
bundled:
  "8.0-bookworm": []
  "8.3-bookworm": [opcache]
  "8.3-alpine3.20": []
  "8.0-alpine3.20": []
images: []
"#;

const SUPPORTED: &str = "# extension php-versions\nredis 8.0 8.3\nopcache 8.0 8.3\n";
const SPECIAL: &str = "";
const FAIL_LIST: &str = "ext\text_version\tphp\tos\tplatform\nredis\t5.3.7\t\talpine-3.20\tlinux/arm64\n";

fn write_data(dir: &Path) {
    std::fs::write(dir.join("catalog.yaml"), CATALOG).unwrap();
    std::fs::write(dir.join("supported-extensions"), SUPPORTED).unwrap();
    std::fs::write(dir.join("special-requirements"), SPECIAL).unwrap();
    std::fs::write(dir.join("fail-list.tsv"), FAIL_LIST).unwrap();
}

fn config() -> Config {
    Config {
        image_domain: "ghcr.io".to_string(),
        image_namespace: "mlocati".to_string(),
        ..Config::default()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn run(dir: &Path, ext: &str, fail_list: bool) -> Value {
    let fail_list_path = dir.join("fail-list.tsv");
    let output = build_matrix(
        &config(),
        &MatrixRequest {
            ext,
            php_versions: &strings(&["8.0", "8.3"]),
            os_refs: &strings(&["bookworm", "alpine3.20"]),
            platforms: &strings(&["linux/amd64", "linux/arm64"]),
            catalog: &dir.join("catalog.yaml"),
            ipe_dir: dir,
            fail_list: fail_list.then_some(fail_list_path.as_path()),
        },
    )
    .unwrap();
    serde_json::from_str(&output).unwrap()
}

#[test]
fn test_matrix_document() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path());

    let output = run(dir.path(), "redis", false);
    let matrix = &output["matrix"];
    assert_eq!(matrix["ext_version"], json!(["6.0.2", "5.3.7"]));
    assert_eq!(matrix["php"], json!(["8.0", "8.3"]));
    assert_eq!(matrix["os"], json!(["bookworm", "alpine3.20"]));
    assert_eq!(matrix["platform"], json!(["linux/amd64,linux/arm64"]));
    // 6.0.2 needs PHP 8.1+, so it only builds on 8.3
    assert_eq!(output["count"], json!(6));
}

#[test]
fn test_fail_list_splits_platforms() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path());

    let output = run(dir.path(), "redis", true);
    let platforms = output["matrix"]["platform"].as_array().unwrap();
    assert!(platforms.contains(&json!("linux/amd64")));
    assert!(platforms.contains(&json!("linux/amd64,linux/arm64")));
    assert_eq!(output["count"], json!(6));
}

#[test]
fn test_bundled_extension() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path());

    let output = run(dir.path(), "opcache", false);
    assert_eq!(output["matrix"]["ext_version"], json!(["bundled"]));
    assert_eq!(output["matrix"]["php"], json!(["8.3"]));
    assert_eq!(output["matrix"]["os"], json!(["bookworm"]));
    assert_eq!(output["count"], json!(1));
}

#[test]
fn test_matrix_output_expands_to_its_configs() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path());

    let output = run(dir.path(), "redis", true);
    let path = dir.path().join("matrix.json");
    std::fs::write(&path, serde_json::to_string(&output["matrix"]).unwrap()).unwrap();

    let configs: Value = serde_json::from_str(&expand_configs(&path).unwrap()).unwrap();
    assert_eq!(configs.as_array().unwrap().len(), 6);
}

#[test]
fn test_missing_data_files() {
    let dir = tempfile::tempdir().unwrap();
    let err = build_matrix(
        &config(),
        &MatrixRequest {
            ext: "redis",
            php_versions: &strings(&["8.3"]),
            os_refs: &strings(&["bookworm"]),
            platforms: &strings(&["linux/amd64"]),
            catalog: &dir.path().join("catalog.yaml"),
            ipe_dir: dir.path(),
            fail_list: None,
        },
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("catalog.yaml"));
}
