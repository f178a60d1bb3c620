use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tutor_core::model::Language;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_FEEDBACK_DWELL: Duration = Duration::from_millis(1800);
pub const DEFAULT_DB_URL: &str = "sqlite://tutor.sqlite3";
pub const DEFAULT_CACHE_PATH: &str = ".tutor-session.json";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Runtime settings for the tutor.
///
/// Without an `api_url` every collaborator is disabled and progress lives in
/// the local database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TutorConfig {
    pub api_url: Option<Url>,
    pub language: Language,
    pub feedback_dwell: Duration,
    pub db_url: String,
    pub cache_path: PathBuf,
    pub http_timeout: Duration,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            language: Language::default(),
            feedback_dwell: DEFAULT_FEEDBACK_DWELL,
            db_url: DEFAULT_DB_URL.into(),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl TutorConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set to an unusable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let api_url = get("TUTOR_API_URL")
            .map(|raw| parse_api_url("TUTOR_API_URL", &raw))
            .transpose()?;
        let language = get("TUTOR_LANGUAGE")
            .map(|raw| raw.parse::<Language>())
            .transpose()?
            .unwrap_or(defaults.language);
        let feedback_dwell = get("TUTOR_FEEDBACK_DWELL_MS")
            .map(|raw| parse_u64("TUTOR_FEEDBACK_DWELL_MS", &raw).map(Duration::from_millis))
            .transpose()?
            .unwrap_or(defaults.feedback_dwell);
        let http_timeout = get("TUTOR_HTTP_TIMEOUT_SECS")
            .map(|raw| parse_u64("TUTOR_HTTP_TIMEOUT_SECS", &raw).map(Duration::from_secs))
            .transpose()?
            .unwrap_or(defaults.http_timeout);

        Ok(Self {
            api_url,
            language,
            feedback_dwell,
            db_url: get("TUTOR_DB_URL").unwrap_or(defaults.db_url),
            cache_path: get("TUTOR_CACHE_PATH").map_or(defaults.cache_path, PathBuf::from),
            http_timeout,
        })
    }

    /// Override the backend URL, as given on the command line.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `raw` is not an http(s) URL.
    pub fn set_api_url(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.api_url = Some(parse_api_url("--api", raw)?);
        Ok(())
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.api_url.is_none()
    }
}

fn parse_api_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        var,
        raw: raw.to_owned(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme {
            var,
            raw: raw.to_owned(),
        });
    }
    Ok(url)
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        raw: raw.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_offline_defaults() {
        let config = TutorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TutorConfig::default());
        assert!(config.is_offline());
        assert_eq!(config.feedback_dwell, Duration::from_millis(1800));
    }

    #[test]
    fn reads_every_variable() {
        let config = TutorConfig::from_lookup(lookup(&[
            ("TUTOR_API_URL", "http://localhost:3001"),
            ("TUTOR_LANGUAGE", "hi"),
            ("TUTOR_FEEDBACK_DWELL_MS", "250"),
            ("TUTOR_DB_URL", "sqlite::memory:"),
            ("TUTOR_CACHE_PATH", "/tmp/tutor.json"),
            ("TUTOR_HTTP_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(
            config.api_url.as_ref().map(Url::as_str),
            Some("http://localhost:3001/")
        );
        assert_eq!(config.language, Language::Hi);
        assert_eq!(config.feedback_dwell, Duration::from_millis(250));
        assert_eq!(config.db_url, "sqlite::memory:");
        assert_eq!(config.cache_path, PathBuf::from("/tmp/tutor.json"));
        assert_eq!(config.http_timeout, Duration::from_secs(3));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = TutorConfig::from_lookup(lookup(&[("TUTOR_API_URL", "  ")])).unwrap();
        assert!(config.is_offline());
    }

    #[test]
    fn rejects_bad_values() {
        let err = TutorConfig::from_lookup(lookup(&[("TUTOR_API_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));

        let err = TutorConfig::from_lookup(lookup(&[("TUTOR_API_URL", "ftp://host")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));

        let err = TutorConfig::from_lookup(lookup(&[("TUTOR_LANGUAGE", "xx")])).unwrap_err();
        assert!(matches!(err, ConfigError::Language(_)));

        let err =
            TutorConfig::from_lookup(lookup(&[("TUTOR_FEEDBACK_DWELL_MS", "-5")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                var: "TUTOR_FEEDBACK_DWELL_MS",
                ..
            }
        ));
    }
}
