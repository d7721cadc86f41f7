use crate::preferences::SystemHints;
use anyhow::{Context, Result};
use keyring::Entry;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_API_KEY_REF: &str = "env:GEMINI_API_KEY";
const DEFAULT_SUBMIT_DELAY_MS: u64 = 1500;

const KEYRING_SERVICE: &str = "pawhaven_api_key";
const KEYRING_USER: &str = "assistant";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub gemini_api_url: String,
    pub gemini_model: String,
    // 'keyring' or 'env:MY_API_KEY'
    pub api_key_ref: Option<String>,
    // Simulated latency for form submissions
    pub submit_delay: Duration,
    pub hints: SystemHints,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            gemini_api_url: DEFAULT_API_URL.to_string(),
            gemini_model: DEFAULT_MODEL.to_string(),
            api_key_ref: Some(DEFAULT_API_KEY_REF.to_string()),
            submit_delay: Duration::from_millis(DEFAULT_SUBMIT_DELAY_MS),
            hints: SystemHints::default(),
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("pawhaven")
        .join("pawhaven.sqlite")
}

impl AppConfig {
    /// Builds the configuration from `PAWHAVEN_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup("PAWHAVEN_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("PAWHAVEN_GEMINI_API_URL") {
            config.gemini_api_url = url;
        }
        if let Some(model) = lookup("PAWHAVEN_GEMINI_MODEL") {
            config.gemini_model = model;
        }
        if let Some(key_ref) = lookup("PAWHAVEN_API_KEY_REF") {
            config.api_key_ref = if key_ref.is_empty() { None } else { Some(key_ref) };
        }
        if let Some(ms) = lookup("PAWHAVEN_SUBMIT_DELAY_MS") {
            let ms: u64 = ms
                .parse()
                .with_context(|| format!("Invalid PAWHAVEN_SUBMIT_DELAY_MS value '{}'", ms))?;
            config.submit_delay = Duration::from_millis(ms);
        }
        if let Some(scheme) = lookup("PAWHAVEN_COLOR_SCHEME") {
            config.hints.prefers_dark = scheme.eq_ignore_ascii_case("dark");
        }
        if let Some(locale) = lookup("LANG") {
            config.hints.locale = locale;
        }
        log::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }
}

// --- API Key Retrieval ---

/// Retrieves the assistant API key. `api_key_ref` selects between an
/// environment variable and the OS keyring.
pub fn get_api_key(api_key_ref: Option<&str>) -> Result<String> {
    match api_key_ref {
        Some(ref_str) if ref_str.starts_with("env:") => {
            let env_var_name = ref_str.trim_start_matches("env:");
            log::debug!("Retrieving API key from environment variable: {}", env_var_name);
            std::env::var(env_var_name).context(format!(
                "Failed to get API key from environment variable '{}'",
                env_var_name
            ))
        }
        Some("keyring") => {
            let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER).context("Failed to create keyring entry")?;
            log::debug!("Retrieving API key from keyring for service: {}", KEYRING_SERVICE);
            entry
                .get_password()
                .context("Failed to get API key from keyring. Please set it in settings.")
        }
        Some(other) => Err(anyhow::anyhow!("Unsupported api_key_ref format: {}", other)),
        None => Err(anyhow::anyhow!("API key reference not set")),
    }
}

/// Stores the assistant API key in the OS keyring.
pub fn set_api_key_in_keyring(api_key: &str) -> Result<()> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .context("Failed to create keyring entry for setting password")?;
    log::info!("Setting API key in keyring for service: {}", KEYRING_SERVICE);
    entry
        .set_password(api_key)
        .context("Failed to set API key in keyring")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.gemini_api_url, DEFAULT_API_URL);
        assert_eq!(config.api_key_ref.as_deref(), Some(DEFAULT_API_KEY_REF));
        assert!(config.database_path.ends_with("pawhaven/pawhaven.sqlite"));
    }

    #[test]
    fn environment_overrides_are_read() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PAWHAVEN_DB_PATH", "/tmp/x.sqlite"),
            ("PAWHAVEN_GEMINI_MODEL", "gemini-test"),
            ("PAWHAVEN_SUBMIT_DELAY_MS", "0"),
            ("PAWHAVEN_COLOR_SCHEME", "Dark"),
            ("LANG", "bn_BD.UTF-8"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.gemini_model, "gemini-test");
        assert_eq!(config.submit_delay, Duration::ZERO);
        assert!(config.hints.prefers_dark);
        assert_eq!(config.hints.language(), crate::models::Language::Bn);
    }

    #[test]
    fn bad_delay_is_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("PAWHAVEN_SUBMIT_DELAY_MS", "soon")])).is_err());
    }

    #[test]
    fn unsupported_key_ref_is_an_error() {
        assert!(get_api_key(Some("vault")).is_err());
        assert!(get_api_key(None).is_err());
        assert!(get_api_key(Some("env:PAWHAVEN_TEST_UNSET_KEY_VAR")).is_err());
    }
}
