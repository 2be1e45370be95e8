use super::{normalize_ws_url, read_settings_file, DEFAULT_WS_URL};

use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

#[test]
fn empty_url_falls_back_to_default() {
    assert_eq!(normalize_ws_url("   "), DEFAULT_WS_URL);
}

#[test]
fn keeps_websocket_schemes() {
    assert_eq!(normalize_ws_url("wss://maps.example.org/ws"), "wss://maps.example.org/ws");
    assert_eq!(normalize_ws_url(" ws://127.0.0.1:8082/ws "), "ws://127.0.0.1:8082/ws");
}

#[test]
fn rewrites_http_schemes() {
    assert_eq!(normalize_ws_url("http://localhost:8082/ws"), "ws://localhost:8082/ws");
    assert_eq!(normalize_ws_url("https://maps.example.org/ws"), "wss://maps.example.org/ws");
}

#[test]
fn bare_host_gets_ws_scheme() {
    assert_eq!(normalize_ws_url("localhost:9000/ws"), "ws://localhost:9000/ws");
}

#[test]
fn leaves_foreign_schemes_for_connect_to_reject() {
    assert_eq!(normalize_ws_url("ftp://example.org"), "ftp://example.org");
}

#[test]
fn reads_ws_url_from_settings_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("map_assistant_settings_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("map_assistant.toml");
    fs::write(&path, "ws_url = \"ws://10.0.0.5:8082/ws\"\n").expect("write");

    let parsed = read_settings_file(&path).expect("read").expect("present");
    assert_eq!(
        parsed.get("ws_url").map(String::as_str),
        Some("ws://10.0.0.5:8082/ws")
    );

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn missing_settings_file_is_not_an_error() {
    let path = env::temp_dir().join("map_assistant_settings_test_missing/none.toml");
    assert!(read_settings_file(&path).expect("read").is_none());
}

#[test]
fn malformed_settings_file_reports_path() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("map_assistant_settings_bad_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("map_assistant.toml");
    fs::write(&path, "ws_url = [").expect("write");

    let err = read_settings_file(&path).expect_err("must fail");
    assert!(format!("{err:#}").contains("failed to parse settings file"));

    fs::remove_dir_all(temp_root).expect("cleanup");
}
