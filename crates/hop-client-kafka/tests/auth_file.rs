//! Loading Hopskotch credentials from `auth.toml` files.

#![allow(clippy::unwrap_used)]

use hop_client_kafka::{load_auth, AuthChoice, Error};

const AUTH_TOML: &str = r#"
[[auth]]
username = "prod-user"
password = "prod-pass"
hostname = "kafka.scimma.org"

[[auth]]
username = "dev-user"
password = "dev-pass"
protocol = "SASL_SSL"
mechanism = "SCRAM_SHA_256"
hostname = "dev.hop.scimma.org"
"#;

fn write_auth(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("auth.toml");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn load_auth_reads_all_entries() {
    let (_dir, path) = write_auth(AUTH_TOML);
    let creds = load_auth(&path).unwrap();

    assert_eq!(creds.len(), 2);
    assert_eq!(creds[0].protocol, "SASL_SSL");
    assert_eq!(creds[0].mechanism, "SCRAM_SHA_512");
    assert_eq!(creds[1].mechanism, "SCRAM_SHA_256");
}

#[test]
fn file_choice_selects_by_host() {
    let (_dir, path) = write_auth(AUTH_TOML);
    let auth = AuthChoice::File(path)
        .resolve("dev.hop.scimma.org")
        .unwrap()
        .unwrap();
    assert_eq!(auth.username, "dev-user");
}

#[test]
fn empty_file_has_no_credentials() {
    let (_dir, path) = write_auth("");
    assert!(load_auth(&path).unwrap().is_empty());
    let err = AuthChoice::File(path).resolve("kafka.scimma.org").unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = load_auth(&path).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn invalid_toml_is_reported() {
    let (_dir, path) = write_auth("[[auth]]\nusername = ");
    let err = load_auth(&path).unwrap_err();
    assert!(matches!(err, Error::Toml { .. }));
}
