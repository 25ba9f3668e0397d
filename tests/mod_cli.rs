use serde_json::Value;
use std::process::Command;

fn nexusdoc(args: &[&str]) -> (bool, Value, String) {
    let out = Command::new(env!("CARGO_BIN_EXE_nexusdoc"))
        .args(args)
        .env_remove("NEXUSDOC_LOG_DIR")
        .env_remove("NEXUSDOC_CONFIG")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    let json = serde_json::from_str(stdout.trim()).unwrap_or(Value::Null);
    (out.status.success(), json, String::from_utf8_lossy(&out.stderr).into_owned())
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let docs: Vec<Value> = (0..7).map(|i| serde_json::json!({"id": format!("u{i}"), "age": 20 + i})).collect();
    std::fs::write(dir.path().join("data.json"), serde_json::json!({ "users": docs }).to_string()).unwrap();
    std::fs::write(dir.path().join("nexusdoc.toml"), "default_per_page = 3\n").unwrap();
    dir
}

#[test]
fn explain_prints_compiled_query() {
    let (ok, json, _) = nexusdoc(&[
        "explain",
        "--collection",
        "users",
        "--conditions",
        r#"[["age", ">=", 21], {"orderBy": "age:desc", "limit": 2}]"#,
    ]);
    assert!(ok);
    assert_eq!(json["filters"][0], serde_json::json!(["age", ">=", 21]));
    assert_eq!(json["orderBy"][0], "age:desc");
    assert_eq!(json["limit"], 2);
}

#[test]
fn explain_shows_cursors() {
    let (ok, json, _) = nexusdoc(&[
        "explain",
        "--collection",
        "users",
        "--conditions",
        r#"[{"orderBy": ["age", "name"], "startAfter": [30, "ann"], "endAt": 40}]"#,
    ]);
    assert!(ok);
    assert_eq!(json["startAfter"], serde_json::json!([30, "ann"]));
    assert_eq!(json["endAt"], 40);
    assert!(json["startAt"].is_null());
    assert!(json["endBefore"].is_null());
}

#[test]
fn count_and_page_over_data_file() {
    let dir = fixture();
    let data = dir.path().join("data.json");
    let cfg = dir.path().join("nexusdoc.toml");
    let data = data.to_str().unwrap();
    let cfg = cfg.to_str().unwrap();

    let (ok, json, _) = nexusdoc(&["--data", data, "count", "--collection", "users", "--conditions", r#"[["age", ">", 22]]"#]);
    assert!(ok);
    assert_eq!(json["count"], 4);

    let (ok, json, _) = nexusdoc(&[
        "--config", cfg, "--data", data, "page", "--collection", "users",
        "--conditions", r#"[{"orderBy": "age"}]"#, "--page", "2",
    ]);
    assert!(ok);
    assert_eq!(json["perPage"], 3);
    assert_eq!(json["totalPage"], 3);
    assert_eq!(json["docs"][0]["_id"], "u3");
}

#[test]
fn malformed_conditions_exit_nonzero() {
    let (ok, _, stderr) = nexusdoc(&["list", "--collection", "users", "--conditions", "[42]"]);
    assert!(!ok);
    assert!(stderr.contains("Invalid clause"));
}
