//! Loader for replyliker settings with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. the built-in defaults, which point every credential at its conventional
//!    environment variable (`${TWEET_ID}`, `${AUTH_TOKEN}`, ...);
//! 2. YAML files / snippets attached with [`ReplyLikerConfigLoader::with_file`],
//!    [`ReplyLikerConfigLoader::with_optional_file`] or
//!    [`ReplyLikerConfigLoader::with_yaml_str`];
//! 3. `REPLYLIKER__`-prefixed environment variables (`__` separates nesting,
//!    e.g. `REPLYLIKER__PACING__MIN_DELAY_MS=500`).
//!
//! `${VAR}` placeholders are then expanded recursively and the result is
//! validated once into [`Settings`]. Every missing credential is reported in a
//! single [`ConfigError::Missing`].
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_BASE_URL: &str = "https://x.com";
pub const DEFAULT_DETAIL_QUERY_ID: &str = "b9Yw90FMr_zUb8DvA8r2ug";
pub const DEFAULT_FAVORITE_QUERY_ID: &str = "lI07N6Otwv1PhnEgXILM7A";

const DEFAULTS_YAML: &str = r#"
tweet_id: "${TWEET_ID}"
credentials:
  auth_token: "${AUTH_TOKEN}"
  csrf_token: "${CSRF_TOKEN}"
  user_agent: "${USER_AGENT}"
  frontend_bearer: "${FRONTEND_BEARER}"
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration source error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings exactly as merged from all sources, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct RawSettings {
    #[serde(default, deserialize_with = "opt_string")]
    pub tweet_id: Option<String>,
    #[serde(default)]
    pub credentials: RawCredentials,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub pacing: PacingSettings,
    #[serde(default)]
    pub debug_dump: Option<PathBuf>,
}

#[derive(Default, Deserialize)]
pub struct RawCredentials {
    #[serde(default, deserialize_with = "opt_string")]
    pub auth_token: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub csrf_token: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub frontend_bearer: Option<String>,
}

impl fmt::Debug for RawCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("RawCredentials")
            .field("auth_token", &mark(&self.auth_token))
            .field("csrf_token", &mark(&self.csrf_token))
            .field("user_agent", &self.user_agent)
            .field("frontend_bearer", &mark(&self.frontend_bearer))
            .finish()
    }
}

/// Where and how the remote web API is reached.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_detail_query_id")]
    pub detail_query_id: String,
    #[serde(default = "default_favorite_query_id")]
    pub favorite_query_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            detail_query_id: default_detail_query_id(),
            favorite_query_id: default_favorite_query_id(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Inclusive window for the randomized pause between remote calls.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct PacingSettings {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_detail_query_id() -> String {
    DEFAULT_DETAIL_QUERY_ID.into()
}
fn default_favorite_query_id() -> String {
    DEFAULT_FAVORITE_QUERY_ID.into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_min_delay_ms() -> u64 {
    1700
}
fn default_max_delay_ms() -> u64 {
    2500
}

/// Session credentials copied from a logged-in browser.
#[derive(Clone)]
pub struct Credentials {
    pub auth_token: String,
    pub csrf_token: String,
    pub user_agent: String,
    /// Value of the web client's `authorization` header, with or without `Bearer `.
    pub frontend_bearer: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_token", &"<redacted>")
            .field("csrf_token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("frontend_bearer", &"<redacted>")
            .finish()
    }
}

/// Validated settings handed to the collector and dispatcher wiring.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Focal post whose replies are collected.
    pub tweet_id: String,
    pub credentials: Credentials,
    pub api: ApiSettings,
    pub pacing: PacingSettings,
    /// Append every raw page body here as one JSON line, when set.
    pub debug_dump: Option<PathBuf>,
}

impl RawSettings {
    /// Check every required value at once.
    ///
    /// ```
    /// use replyliker_config::{ConfigError, RawSettings};
    ///
    /// let err = RawSettings::default().validate().unwrap_err();
    /// match err {
    ///     ConfigError::Missing(names) => assert_eq!(
    ///         names,
    ///         ["TWEET_ID", "AUTH_TOKEN", "CSRF_TOKEN", "USER_AGENT", "FRONTEND_BEARER"]
    ///     ),
    ///     other => panic!("unexpected: {other}"),
    /// }
    /// ```
    pub fn validate(self) -> Result<Settings, ConfigError> {
        let mut missing = Vec::new();
        let tweet_id = required(self.tweet_id, "TWEET_ID", &mut missing);
        let auth_token = required(self.credentials.auth_token, "AUTH_TOKEN", &mut missing);
        let csrf_token = required(self.credentials.csrf_token, "CSRF_TOKEN", &mut missing);
        let user_agent = required(self.credentials.user_agent, "USER_AGENT", &mut missing);
        let frontend_bearer = required(
            self.credentials.frontend_bearer,
            "FRONTEND_BEARER",
            &mut missing,
        );
        if !frontend_bearer.is_empty() && bearer_token(&frontend_bearer).is_empty() {
            missing.push("FRONTEND_BEARER".to_string());
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        url::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::Invalid(format!("api.base_url `{}`: {e}", self.api.base_url))
        })?;
        if self.api.detail_query_id.trim().is_empty()
            || self.api.favorite_query_id.trim().is_empty()
        {
            return Err(ConfigError::Invalid("api query ids must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be positive".into()));
        }
        if self.pacing.min_delay_ms > self.pacing.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "pacing.min_delay_ms ({}) exceeds pacing.max_delay_ms ({})",
                self.pacing.min_delay_ms, self.pacing.max_delay_ms
            )));
        }

        Ok(Settings {
            tweet_id,
            credentials: Credentials {
                auth_token,
                csrf_token,
                user_agent,
                frontend_bearer,
            },
            api: self.api,
            pacing: self.pacing,
            debug_dump: self.debug_dump,
        })
    }
}

/// Take a required value, recording `name` when it is absent, blank, or still
/// an unexpanded `${VAR}` placeholder (in which case `VAR` is recorded).
fn required(value: Option<String>, name: &str, missing: &mut Vec<String>) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        missing.push(name.to_string());
        return value;
    }
    if let Some(var) = unresolved_placeholder(&value) {
        missing.push(var);
    }
    value
}

/// The token part of an `authorization` value, with an optional standalone
/// `Bearer` scheme removed.
fn bearer_token(value: &str) -> &str {
    match value.get(..6) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case("bearer")
                && value[6..].chars().next().is_none_or(char::is_whitespace) =>
        {
            value[6..].trim()
        }
        _ => value,
    }
}

fn unresolved_placeholder(s: &str) -> Option<String> {
    let start = s.find("${")?;
    let rest = &s[start + 2..];
    let end = rest.find('}')?;
    Some(rest[..end].to_string())
}

/// Accept strings and bare numbers (YAML `tweet_id: 123`, parsed env values).
fn opt_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (defaults + YAML + env overrides).
pub struct ReplyLikerConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ReplyLikerConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyLikerConfigLoader {
    /// Start from the built-in defaults.
    ///
    /// ```
    /// use replyliker_config::ReplyLikerConfigLoader;
    ///
    /// let settings = ReplyLikerConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// tweet_id: "1900000000000000000"
    /// credentials:
    ///   auth_token: "a"
    ///   csrf_token: "c"
    ///   user_agent: "Mozilla/5.0"
    ///   frontend_bearer: "Bearer b"
    /// "#,
    ///     )
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(settings.tweet_id, "1900000000000000000");
    /// assert_eq!(settings.api.base_url, "https://x.com");
    /// assert_eq!(settings.pacing.min_delay_ms, 1700);
    /// assert_eq!(settings.pacing.max_delay_ms, 2500);
    /// ```
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULTS_YAML, FileFormat::Yaml));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when absent, so a bare environment is enough.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI overrides).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Pin the focal post above every other source, environment included.
    pub fn with_tweet_id(mut self, tweet_id: &str) -> Result<Self, ConfigError> {
        self.builder = self.builder.set_override("tweet_id", tweet_id)?;
        Ok(self)
    }

    /// Merge all sources and expand `${VAR}` placeholders, without validating.
    pub fn load_raw(self) -> Result<RawSettings, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("REPLYLIKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Merge, expand and validate into [`Settings`].
    pub fn load(self) -> Result<Settings, ConfigError> {
        self.load_raw()?.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    const CREDENTIAL_VARS: [&str; 5] = [
        "TWEET_ID",
        "AUTH_TOKEN",
        "CSRF_TOKEN",
        "USER_AGENT",
        "FRONTEND_BEARER",
    ];

    fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
        CREDENTIAL_VARS.iter().map(|k| (*k, None)).collect()
    }

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Winston")), ("STATE", Some("NC"))], || {
            let mut v = json!(["hello-$CITY", { "loc": "${CITY}-${STATE}" }, 42, null]);
            expand_env_in_value(&mut v);
            assert_eq!(v, json!(["hello-Winston", { "loc": "Winston-NC" }, 42, null]));
        });
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unresolved_placeholder_names_the_variable() {
        assert_eq!(unresolved_placeholder("${AUTH_TOKEN}").as_deref(), Some("AUTH_TOKEN"));
        assert_eq!(unresolved_placeholder("plain"), None);
        assert_eq!(unresolved_placeholder("${broken"), None);
    }

    #[test]
    #[serial]
    fn missing_environment_is_reported_once_for_all_names() {
        let mut vars = cleared();
        vars[2] = ("CSRF_TOKEN", Some("csrf"));
        temp_env::with_vars(vars, || {
            let err = ReplyLikerConfigLoader::new().load().unwrap_err();
            match err {
                ConfigError::Missing(names) => assert_eq!(
                    names,
                    ["TWEET_ID", "AUTH_TOKEN", "USER_AGENT", "FRONTEND_BEARER"]
                ),
                other => panic!("unexpected error: {other}"),
            }
        });
    }

    #[test]
    #[serial]
    fn conventional_environment_is_enough() {
        let vars: Vec<(&str, Option<&str>)> = vec![
            ("TWEET_ID", Some("42")),
            ("AUTH_TOKEN", Some("auth")),
            ("CSRF_TOKEN", Some("csrf")),
            ("USER_AGENT", Some("ua")),
            ("FRONTEND_BEARER", Some("Bearer xyz")),
        ];
        temp_env::with_vars(vars, || {
            let s = ReplyLikerConfigLoader::new().load().unwrap();
            assert_eq!(s.tweet_id, "42");
            assert_eq!(s.credentials.csrf_token, "csrf");
            assert_eq!(s.credentials.frontend_bearer, "Bearer xyz");
            assert_eq!(s.api, ApiSettings::default());
            assert!(s.debug_dump.is_none());
        });
    }

    #[test]
    #[serial]
    fn prefixed_environment_overrides_yaml() {
        let mut vars = cleared();
        vars.push(("REPLYLIKER__TWEET_ID", Some("777")));
        vars.push(("REPLYLIKER__PACING__MAX_DELAY_MS", Some("9000")));
        temp_env::with_vars(vars, || {
            let raw = ReplyLikerConfigLoader::new()
                .with_yaml_str("tweet_id: \"1\"\npacing:\n  max_delay_ms: 3000\n")
                .load_raw()
                .unwrap();
            assert_eq!(raw.tweet_id.as_deref(), Some("777"));
            assert_eq!(raw.pacing.max_delay_ms, 9000);
            assert_eq!(raw.pacing.min_delay_ms, 1700);
        });
    }

    fn complete() -> RawSettings {
        RawSettings {
            tweet_id: Some("1".into()),
            credentials: RawCredentials {
                auth_token: Some("a".into()),
                csrf_token: Some("c".into()),
                user_agent: Some("u".into()),
                frontend_bearer: Some("b".into()),
            },
            ..RawSettings::default()
        }
    }

    #[test]
    fn scheme_without_token_is_a_missing_bearer() {
        for blank in ["Bearer", "bearer   "] {
            let mut raw = complete();
            raw.credentials.frontend_bearer = Some(blank.into());
            match raw.validate().unwrap_err() {
                ConfigError::Missing(names) => assert_eq!(names, ["FRONTEND_BEARER"]),
                other => panic!("unexpected error: {other}"),
            }
        }
        let mut raw = complete();
        raw.credentials.frontend_bearer = Some("Bearer AAAA".into());
        assert_eq!(raw.validate().unwrap().credentials.frontend_bearer, "Bearer AAAA");
        assert_eq!(bearer_token("BearerToken"), "BearerToken");
    }

    #[test]
    fn inverted_pacing_window_is_invalid() {
        let mut raw = complete();
        raw.pacing = PacingSettings {
            min_delay_ms: 10,
            max_delay_ms: 5,
        };
        assert!(matches!(raw.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_base_url_is_invalid() {
        let mut raw = complete();
        raw.api.base_url = "not a url".into();
        assert!(matches!(raw.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut raw = complete();
        raw.credentials.user_agent = Some("   ".into());
        match raw.validate() {
            Err(ConfigError::Missing(names)) => assert_eq!(names, ["USER_AGENT"]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let s = complete().validate().unwrap();
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("auth_token: \"a\""));
        assert!(dbg.contains("<redacted>"));
    }
}
