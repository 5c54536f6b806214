use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use relgraph_cli::{ExportConfig, FailurePolicy, run_export};
use relgraph_core::MemoryModel;
use relgraph_error::{ErrorKind, ErrorStatus};

const MODEL: &str = r#"{
    "entities": [
        { "name": "app::Host",
          "attributes": [
            { "name": "name", "type": "string" },
            { "name": "services", "relation": "app::Service", "inverse": "host" }
          ] },
        { "name": "app::Service",
          "attributes": [
            { "name": "name", "type": "string" },
            { "name": "host", "relation": "app::Host", "inverse": "services" }
          ] }
    ],
    "instances": [
        { "id": "web1", "type": "app::Host", "attributes": { "name": "web1" } },
        { "id": "svcA", "type": "app::Service",
          "attributes": { "name": "svcA", "host": { "ref": "web1" } } },
        { "id": "classes", "type": "graph::Graph",
          "attributes": { "name": "classes", "config": "@app::**\n" } },
        { "id": "broken", "type": "graph::Graph",
          "attributes": { "name": "broken", "config": "app::Host[label]\n" } },
        { "id": "deploy", "type": "graph::Graph",
          "attributes": { "name": "deploy", "config": "app::Host\napp::Service\napp::Service.host\n" } }
    ]
}"#;

fn config(dir: &TempDir, extra: &str) -> ExportConfig {
    let text = format!(
        "[graph]\noutput-dir = {:?}\n{extra}",
        dir.path().display().to_string()
    );
    ExportConfig::from_toml_str(&text).unwrap()
}

fn file_names(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn abort_stops_at_first_failure() {
    let model = MemoryModel::from_json_str(MODEL).unwrap();
    let dir = TempDir::new().unwrap();
    let err = run_export(&model, &config(&dir, ""), FailurePolicy::Abort).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseFailed);
    assert_eq!(err.diagram(), Some("broken"));
    // diagrams before the failing one are already written
    assert_eq!(file_names(&dir), vec!["classes.dot"]);
}

#[test]
fn keep_going_writes_every_valid_diagram() {
    let model = MemoryModel::from_json_str(MODEL).unwrap();
    let dir = TempDir::new().unwrap();
    let config = config(&dir, "formats = [\"dot\", \"plantuml\"]\n");
    let summary = run_export(&model, &config, FailurePolicy::KeepGoing).unwrap();

    assert_eq!(summary.exported, vec!["classes", "deploy"]);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].name, "broken");
    assert_eq!(
        file_names(&dir),
        vec!["classes.dot", "classes.puml", "deploy.dot", "deploy.puml"]
    );

    let deploy = fs::read_to_string(dir.path().join("deploy.dot")).unwrap();
    assert_eq!(
        deploy,
        r#"graph {
  "n0" [label="web1"];
  "n1" [label="svcA"];
  "n1" -- "n0";
}
"#
    );

    let classes = fs::read_to_string(dir.path().join("classes.puml")).unwrap();
    assert!(classes.contains("app__Host \"host\" -- \"services\" app__Service\n"));
}

#[test]
fn rasterizer_failure_is_reported() {
    let model = MemoryModel::from_json_str(MODEL).unwrap();
    let dir = TempDir::new().unwrap();
    let config = config(
        &dir,
        "types = \"png\"\nlayout-program = \"/nonexistent/relgraph-dot\"\n",
    );
    let summary = run_export(&model, &config, FailurePolicy::KeepGoing).unwrap();
    assert!(summary.exported.is_empty());
    assert_eq!(summary.skipped.len(), 3);
    let raster = summary
        .skipped
        .iter()
        .find(|s| s.name == "classes")
        .unwrap();
    assert_eq!(raster.error.kind(), ErrorKind::ExternalToolFailed);
    // retried once before giving up
    assert_eq!(raster.error.status(), ErrorStatus::Persistent);
}

#[test]
fn output_dir_is_created() {
    let model = MemoryModel::from_json_str(
        r#"{ "instances": [
            { "id": "g", "type": "graph::Graph", "attributes": { "name": "empty", "config": "" } }
        ] }"#,
    )
    .unwrap();
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");
    let config = ExportConfig {
        output_dir: Some(nested.clone()),
        ..ExportConfig::default()
    };
    let summary = run_export(&model, &config, FailurePolicy::Abort).unwrap();
    assert_eq!(summary.written, vec![nested.join("empty.dot")]);
    assert_eq!(fs::read_to_string(nested.join("empty.dot")).unwrap(), "graph {\n}\n");
}

#[test]
fn keep_going_skips_unreadable_diagram_object() {
    let model = MemoryModel::from_json_str(
        r#"{ "instances": [
            { "id": "good", "type": "graph::Graph", "attributes": { "name": "good", "config": "" } },
            { "id": "bad", "type": "graph::Graph", "attributes": {} }
        ] }"#,
    )
    .unwrap();
    let dir = TempDir::new().unwrap();
    let summary = run_export(&model, &config(&dir, ""), FailurePolicy::KeepGoing).unwrap();

    assert_eq!(summary.exported, vec!["good"]);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].name, "bad");
    assert_eq!(summary.skipped[0].error.kind(), ErrorKind::TypeMismatch);
    assert_eq!(summary.skipped[0].error.diagram(), Some("bad"));
    assert_eq!(file_names(&dir), vec!["good.dot"]);
}

#[test]
fn raster_type_cannot_escape_output_dir() {
    let model = MemoryModel::from_json_str(MODEL).unwrap();
    let root = TempDir::new().unwrap();
    let out = root.path().join("out");
    let text = format!(
        "[graph]\noutput-dir = {:?}\ntypes = \"../x\"\n",
        out.display().to_string()
    );
    let config = ExportConfig::from_toml_str(&text).unwrap();

    let err = run_export(&model, &config, FailurePolicy::KeepGoing).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    assert!(!out.exists());
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}
