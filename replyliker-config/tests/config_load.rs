use replyliker_config::{ConfigError, ReplyLikerConfigLoader};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
tweet_id: 1912345678901234567
credentials:
  auth_token: "${REPLYLIKER_TEST_AUTH}"
  csrf_token: "csrf-from-file"
  user_agent: "Mozilla/5.0 (X11; Linux x86_64)"
  frontend_bearer: "Bearer AAAAAAAAAAAAAAAAAAAAA"
api:
  timeout_secs: 10
pacing:
  min_delay_ms: 100
  max_delay_ms: 200
debug_dump: "replies.json"
"#;
    let p = write_yaml(&tmp, "replyliker.yaml", file_yaml);

    let settings = temp_env::with_var("REPLYLIKER_TEST_AUTH", Some("auth-from-env"), || {
        ReplyLikerConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load settings")
    });

    assert_eq!(settings.tweet_id, "1912345678901234567");
    assert_eq!(settings.credentials.auth_token, "auth-from-env");
    assert_eq!(settings.credentials.csrf_token, "csrf-from-file");
    assert_eq!(settings.api.timeout_secs, 10);
    assert_eq!(settings.api.detail_query_id, "b9Yw90FMr_zUb8DvA8r2ug");
    assert_eq!(settings.pacing.min_delay_ms, 100);
    assert_eq!(
        settings.debug_dump.as_deref(),
        Some(std::path::Path::new("replies.json"))
    );
}

#[test]
#[serial]
fn optional_file_may_be_absent() {
    let tmp = TempDir::new().unwrap();
    let vars = [
        ("TWEET_ID", Some("5")),
        ("AUTH_TOKEN", Some("a")),
        ("CSRF_TOKEN", Some("c")),
        ("USER_AGENT", Some("u")),
        ("FRONTEND_BEARER", Some("b")),
    ];
    let settings = temp_env::with_vars(vars, || {
        ReplyLikerConfigLoader::new()
            .with_optional_file(tmp.path().join("does-not-exist.yaml"))
            .load()
            .expect("env alone is enough")
    });
    assert_eq!(settings.tweet_id, "5");
}

#[test]
#[serial]
fn required_file_must_exist() {
    let tmp = TempDir::new().unwrap();
    let err = ReplyLikerConfigLoader::new()
        .with_file(tmp.path().join("missing.yaml"))
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Source(_)));
}

#[test]
#[serial]
fn cli_tweet_id_beats_file_and_environment() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "replyliker.yaml",
        r#"
tweet_id: "1"
credentials:
  auth_token: "a"
  csrf_token: "c"
  user_agent: "u"
  frontend_bearer: "b"
"#,
    );
    let settings = temp_env::with_var("REPLYLIKER__TWEET_ID", Some("2"), || {
        ReplyLikerConfigLoader::new()
            .with_file(&p)
            .with_tweet_id("3")
            .and_then(ReplyLikerConfigLoader::load)
            .expect("load settings")
    });
    assert_eq!(settings.tweet_id, "3");
}
