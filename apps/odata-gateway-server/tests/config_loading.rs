#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;

use odata_gateway_server::{AppConfig, LogFormat};
use tempfile::NamedTempFile;

fn yaml_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn defaults_without_file() {
    let cfg = AppConfig::load(None).unwrap();
    assert_eq!(cfg.server.bind_addr, "0.0.0.0:8000");
    assert_eq!(cfg.logging.format, LogFormat::Text);
    assert_eq!(cfg.gateway.backend.timeout_secs, 10);
    assert_eq!(cfg.gateway.max_batch_body_bytes, 8 * 1024 * 1024);
    assert_eq!(cfg.gateway.metadata.properties.len(), 29);
}

#[test]
fn yaml_layer_overrides_defaults() {
    let file = yaml_file(
        r#"
server:
  bind_addr: "127.0.0.1:8080"
logging:
  level: "debug,odata_gateway=trace"
  format: json
gateway:
  backend:
    base_url: "https://db.example.com/rest/v1/"
    api_key: "sb-secret"
    timeout_secs: 3
  cors:
    allowed_origins: ["https://sac.example.com"]
    allow_credentials: true
  basic_auth:
    username: sac
    password: pw
"#,
    );

    let cfg = AppConfig::load(Some(file.path())).unwrap();

    assert_eq!(cfg.server.bind_addr, "127.0.0.1:8080");
    assert_eq!(cfg.logging.format, LogFormat::Json);
    assert_eq!(cfg.gateway.backend.base_url, "https://db.example.com/rest/v1/");
    assert_eq!(cfg.gateway.backend.api_key.expose(), "sb-secret");
    assert_eq!(cfg.gateway.backend.timeout_secs, 3);
    assert!(cfg.gateway.cors.allow_credentials);
    assert_eq!(cfg.gateway.cors.allowed_methods, vec!["*"]);
    assert_eq!(cfg.gateway.basic_auth.as_ref().unwrap().password.expose(), "pw");
    cfg.validate().unwrap();
}

#[test]
fn unknown_keys_are_rejected() {
    let file = yaml_file("gateway:\n  backend:\n    apikey: x\n");
    assert!(AppConfig::load(Some(file.path())).is_err());
}

#[test]
fn missing_api_key_fails_validation() {
    let file = yaml_file("server:\n  bind_addr: \"127.0.0.1:0\"\n");
    let cfg = AppConfig::load(Some(file.path())).unwrap();
    assert!(cfg.validate().is_err());
}

#[test]
fn printed_config_redacts_secrets() {
    let file = yaml_file("gateway:\n  backend:\n    api_key: top-secret\n");
    let cfg = AppConfig::load(Some(file.path())).unwrap();
    let printed = cfg.to_json_pretty().unwrap();
    assert!(printed.contains("[REDACTED]"));
    assert!(!printed.contains("top-secret"));
}
