pub mod severity;

use std::path::Path;
use std::time::Duration;

use figment::providers::{Format, Yaml};
use figment::{providers::Env, Figment};
use serde::{Deserialize, Deserializer};
use serde_aux::field_attributes::deserialize_bool_from_anything;
use serde_json::{Map, Value};

pub use severity::Severity;
use severity::{deserialize_level, deserialize_log_level};

use crate::logs::constants::DEFAULT_FLUSH_INTERVAL_MS;

pub const CONFIG_FILE_NAME: &str = "sumoship.yaml";

#[derive(Debug, PartialEq, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// HTTP source endpoint. Required.
    pub url: String,
    /// Minimum severity accepted by the transport.
    #[serde(deserialize_with = "deserialize_level")]
    pub level: Severity,
    #[serde(deserialize_with = "deserialize_bool_from_anything")]
    pub silent: bool,
    /// Flush interval in milliseconds, `0` means the default.
    pub interval: u64,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub label: Option<String>,
    /// Static metadata merged under the metadata of every call.
    pub meta: Map<String, Value>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub custom_source_category: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub custom_source_host: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub custom_source_name: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub https_proxy: Option<String>,
    /// Verbosity of the shipper's own diagnostics.
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: Severity,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            url: String::default(),
            level: Severity::Info,
            silent: false,
            interval: DEFAULT_FLUSH_INTERVAL_MS,
            label: None,
            meta: Map::new(),
            // Sumo source overrides
            custom_source_category: None,
            custom_source_host: None,
            custom_source_name: None,
            https_proxy: None,
            log_level: Severity::Warn,
        }
    }
}

impl Config {
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        if self.interval == 0 {
            Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS)
        } else {
            Duration::from_millis(self.interval)
        }
    }

    /// Checks the fields without which nothing can be shipped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
#[allow(clippy::module_name_repetitions)]
pub enum ConfigError {
    #[error(
        "Need SumoLogic URL. See https://help.sumologic.com/Send-Data/Sources/02Sources-for-Hosted-Collectors/HTTP-Source"
    )]
    MissingUrl,
    #[error("invalid value for header {0}")]
    InvalidHeader(String),
    #[error("invalid https proxy {proxy}: {reason}")]
    InvalidProxy { proxy: String, reason: String },
    #[error("failed to build http client: {0}")]
    HttpClient(String),
    #[error("the shipper must be constructed within a Tokio runtime")]
    NoRuntime,
    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[allow(clippy::module_name_repetitions)]
pub fn get_config(config_directory: &Path) -> Result<Config, ConfigError> {
    let path = config_directory.join(CONFIG_FILE_NAME);

    let figment = Figment::new()
        .merge(Yaml::file(&path))
        .merge(Env::prefixed("SUMO_"))
        .merge(Env::raw().only(&["HTTPS_PROXY"]));

    let config: Config = figment
        .extract()
        .map_err(|err| ConfigError::Parse(err.to_string()))?;

    config.validate()?;
    Ok(config)
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => {
            if s.trim().is_empty() {
                Ok(None)
            } else {
                Ok(Some(s))
            }
        }
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Null => Ok(None),
        _ => Err(serde::de::Error::custom("expected a string or an integer")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_reject_missing_url() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            let config = get_config(Path::new("")).expect_err("should reject missing url");
            assert_eq!(config, ConfigError::MissingUrl);
            Ok(())
        });
    }

    #[test]
    fn test_reject_blank_url() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("SUMO_URL", "   ");
            let config = get_config(Path::new("")).expect_err("should reject blank url");
            assert_eq!(config, ConfigError::MissingUrl);
            Ok(())
        });
    }

    #[test]
    fn test_parse_default() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("SUMO_URL", "http://sumologic.com/logs");
            let config = get_config(Path::new("")).expect("should parse config");
            assert_eq!(
                config,
                Config {
                    url: "http://sumologic.com/logs".to_string(),
                    ..Config::default()
                }
            );
            assert_eq!(config.flush_interval(), Duration::from_millis(1000));
            Ok(())
        });
    }

    #[test]
    fn test_parse_config_file() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                CONFIG_FILE_NAME,
                r"
url: http://sumologic.com/logs
level: error
silent: true
interval: 4000
label: test
meta:
  myMetaKey1: val
  myMetaKey2: 123
custom_source_category: category
custom_source_host: host
custom_source_name: name
",
            )?;
            let config = get_config(Path::new("")).expect("should parse config");
            assert_eq!(config.url, "http://sumologic.com/logs");
            assert_eq!(config.level, Severity::Error);
            assert!(config.silent);
            assert_eq!(config.flush_interval(), Duration::from_millis(4000));
            assert_eq!(config.label.as_deref(), Some("test"));
            assert_eq!(
                Value::Object(config.meta),
                json!({"myMetaKey1": "val", "myMetaKey2": 123})
            );
            assert_eq!(config.custom_source_category.as_deref(), Some("category"));
            assert_eq!(config.custom_source_host.as_deref(), Some("host"));
            assert_eq!(config.custom_source_name.as_deref(), Some("name"));
            Ok(())
        });
    }

    #[test]
    fn test_parse_env() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("SUMO_URL", "http://sumologic.com/logs");
            jail.set_env("SUMO_SILENT", "true");
            jail.set_env("SUMO_LABEL", "");
            jail.set_env("SUMO_LOG_LEVEL", "debug");
            let config = get_config(Path::new("")).expect("should parse config");
            assert!(config.silent);
            assert_eq!(config.label, None);
            assert_eq!(config.log_level, Severity::Debug);
            Ok(())
        });
    }

    #[test]
    fn test_precedence() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                CONFIG_FILE_NAME,
                r"
url: http://yaml.example/logs
interval: 2000
",
            )?;
            jail.set_env("SUMO_URL", "http://env.example/logs");
            let config = get_config(Path::new("")).expect("should parse config");
            assert_eq!(config.url, "http://env.example/logs");
            assert_eq!(config.interval, 2000);
            Ok(())
        });
    }

    #[test]
    fn test_zero_interval_means_default() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("SUMO_URL", "http://sumologic.com/logs");
            jail.set_env("SUMO_INTERVAL", "0");
            let config = get_config(Path::new("")).expect("should parse config");
            assert_eq!(config.flush_interval(), Duration::from_millis(1000));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_level_falls_back() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("SUMO_URL", "http://sumologic.com/logs");
            jail.set_env("SUMO_LEVEL", "loud");
            let config = get_config(Path::new("")).expect("should parse config");
            assert_eq!(config.level, Severity::Info);
            Ok(())
        });
    }

    #[test]
    fn test_https_proxy_from_raw_env() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("SUMO_URL", "http://sumologic.com/logs");
            jail.set_env("HTTPS_PROXY", "http://proxy.local:3128");
            let config = get_config(Path::new("")).expect("should parse config");
            assert_eq!(config.https_proxy.as_deref(), Some("http://proxy.local:3128"));
            Ok(())
        });
    }
}
