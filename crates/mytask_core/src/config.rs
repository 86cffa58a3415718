//! Application configuration.
//!
//! # Responsibility
//! - Deserialize settings from an optional TOML file.
//! - Overlay `MYTASK_*` environment variables on top of file values.
//!
//! # Invariants
//! - Every table is optional; missing values fall back to defaults.
//! - Missing SMS credentials never fail loading; they only disable delivery.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_BACKEND_URL: &str = "MYTASK_BACKEND_URL";
pub const ENV_BACKEND_ANON_KEY: &str = "MYTASK_BACKEND_ANON_KEY";
pub const ENV_SMS_ACCOUNT_SID: &str = "MYTASK_SMS_ACCOUNT_SID";
pub const ENV_SMS_AUTH_TOKEN: &str = "MYTASK_SMS_AUTH_TOKEN";
pub const ENV_SMS_FROM_NUMBER: &str = "MYTASK_SMS_FROM_NUMBER";
pub const ENV_SMS_VERIFIED_NUMBER: &str = "MYTASK_SMS_VERIFIED_NUMBER";
pub const ENV_SMS_MODE: &str = "MYTASK_SMS_MODE";

const DEFAULT_SQLITE_PATH: &str = "mytask.sqlite3";
const DEFAULT_SMS_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config file: {err}"),
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub sms: SmsConfig,
    pub session: SessionConfig,
    pub cache: CacheConfig,
    pub reminders: ReminderConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parses TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads an optional TOML file and applies process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlays environment-style values. Blank values are ignored.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Some(key) = get(ENV_BACKEND_ANON_KEY) {
            self.backend.anon_key = Some(key);
        }
        if let Some(sid) = get(ENV_SMS_ACCOUNT_SID) {
            self.sms.account_sid = Some(sid);
        }
        if let Some(token) = get(ENV_SMS_AUTH_TOKEN) {
            self.sms.auth_token = Some(token);
        }
        if let Some(from) = get(ENV_SMS_FROM_NUMBER) {
            self.sms.from_number = Some(from);
        }
        if let Some(number) = get(ENV_SMS_VERIFIED_NUMBER) {
            self.sms.verified_number = Some(number);
        }
        if let Some(mode) = get(ENV_SMS_MODE) {
            self.sms.mode = DeliveryMode::parse(&mode).ok_or(ConfigError::InvalidValue {
                key: ENV_SMS_MODE,
                value: mode,
            })?;
        }
        Ok(())
    }
}

/// Where the backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendLocation {
    /// Hosted backend-as-a-service reached over HTTP(S).
    Remote { url: String },
    /// Local SQLite database file.
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// `http(s)://` URL of the hosted backend, or a `sqlite:` / plain path.
    pub url: String,
    pub anon_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SQLITE_PATH.to_string(),
            anon_key: None,
        }
    }
}

impl BackendConfig {
    pub fn location(&self) -> BackendLocation {
        let url = self.url.trim();
        if url.starts_with("http://") || url.starts_with("https://") {
            return BackendLocation::Remote {
                url: url.trim_end_matches('/').to_string(),
            };
        }
        let path = url.strip_prefix("sqlite:").unwrap_or(url);
        BackendLocation::Sqlite {
            path: PathBuf::from(path),
        }
    }
}

/// Which phone number receives SMS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Provider account can only reach the verified number.
    #[default]
    Sandbox,
    /// Messages go to each user's stored number.
    Production,
}

impl DeliveryMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "test" => Some(Self::Sandbox),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub verified_number: Option<String>,
    pub mode: DeliveryMode,
    pub api_base: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            verified_number: None,
            mode: DeliveryMode::Sandbox,
            api_base: DEFAULT_SMS_API_BASE.to_string(),
        }
    }
}

impl SmsConfig {
    /// True when account id, auth token and sending number are all set.
    pub fn is_complete(&self) -> bool {
        [&self.account_sid, &self.auth_token, &self.from_number]
            .iter()
            .all(|value| matches!(value, Some(v) if !v.trim().is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub bootstrap_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout_ms: 3_000,
        }
    }
}

impl SessionConfig {
    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub freshness_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { freshness_secs: 30 }
    }
}

impl CacheConfig {
    pub fn freshness(&self) -> chrono::Duration {
        secs_to_chrono(self.freshness_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub initial_delay_ms: u64,
    pub throttle_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60 * 60,
            initial_delay_ms: 2_000,
            throttle_secs: 60 * 60,
        }
    }
}

impl ReminderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn throttle(&self) -> chrono::Duration {
        secs_to_chrono(self.throttle_secs)
    }
}

fn secs_to_chrono(secs: u64) -> chrono::Duration {
    const MAX_SECS: i64 = i64::MAX / 1_000;
    chrono::Duration::seconds(i64::try_from(secs).unwrap_or(MAX_SECS).min(MAX_SECS))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::{
        AppConfig, BackendLocation, DeliveryMode, ENV_SMS_ACCOUNT_SID, ENV_SMS_AUTH_TOKEN,
        ENV_SMS_FROM_NUMBER, ENV_SMS_MODE,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.session.bootstrap_timeout(), Duration::from_secs(3));
        assert_eq!(config.cache.freshness(), chrono::Duration::seconds(30));
        assert_eq!(config.reminders.interval(), Duration::from_secs(3600));
        assert_eq!(config.sms.mode, DeliveryMode::Sandbox);
        assert!(!config.sms.is_complete());
    }

    #[test]
    fn toml_tables_are_optional_and_partial() {
        let config = AppConfig::from_toml_str(
            r#"
            [backend]
            url = "https://demo.supabase.co/"
            anon_key = "anon"

            [cache]
            freshness_secs = 5
            "#,
        )
        .expect("config should parse");

        assert_eq!(
            config.backend.location(),
            BackendLocation::Remote {
                url: "https://demo.supabase.co".to_string()
            }
        );
        assert_eq!(config.cache.freshness_secs, 5);
        assert_eq!(config.session.bootstrap_timeout_ms, 3_000);
    }

    #[test]
    fn sqlite_location_accepts_prefix_and_plain_paths() {
        let mut config = AppConfig::default();
        config.backend.url = "sqlite:/tmp/tasks.db".to_string();
        assert_eq!(
            config.backend.location(),
            BackendLocation::Sqlite {
                path: PathBuf::from("/tmp/tasks.db")
            }
        );
    }

    #[test]
    fn env_overrides_complete_sms_settings() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_SMS_ACCOUNT_SID, "AC123"),
            (ENV_SMS_AUTH_TOKEN, "token"),
            (ENV_SMS_FROM_NUMBER, "+15005550006"),
            (ENV_SMS_MODE, "production"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|key| env.get(key).map(|value| value.to_string()))
            .expect("env should apply");

        assert!(config.sms.is_complete());
        assert_eq!(config.sms.mode, DeliveryMode::Production);
    }

    #[test]
    fn env_rejects_unknown_delivery_mode() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|key| (key == ENV_SMS_MODE).then(|| "staging".to_string()))
            .expect_err("unknown mode must fail");
        assert!(err.to_string().contains("staging"));
    }
}
