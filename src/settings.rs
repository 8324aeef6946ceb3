use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE: &str = "pricegap";
const ENV_PREFIX: &str = "PRICEGAP";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("own store column '{name}' not found. Columns: {candidates:?}")]
    MissingOwnStore {
        name: String,
        candidates: Vec<String>,
    },
    #[error("required column '{0}' not found in input tab")]
    MissingColumn(String),
    #[error("store column '{0}' appears more than once in input tab")]
    DuplicateColumn(String),
    #[error("environment variable {0} must be set")]
    MissingEnv(String),
    #[error("invalid setting: {0}")]
    Invalid(String),
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}

/// Run-wide settings. Every component takes what it needs from here
/// instead of reading globals or the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sheet_id: String,
    pub input_tab: String,
    pub output_tab: String,
    pub meta_columns: Vec<String>,
    pub status_column: String,
    pub track_status: String,
    pub own_store: String,
    pub credentials_env: String,
    pub scrape: ScrapeSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub delay_ms: u64,
    pub max_redirects: usize,
    pub user_agent: String,
    pub accept_language: String,
    pub referer: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            sheet_id: String::new(),
            input_tab: "Master".into(),
            output_tab: "Result".into(),
            meta_columns: vec!["category".into(), "brand".into(), "sku_code".into()],
            status_column: "status".into(),
            track_status: "track".into(),
            own_store: "Daily_Bike".into(),
            credentials_env: "GOOGLE_APPLICATION_CREDENTIALS".into(),
            scrape: ScrapeSettings::default(),
        }
    }
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        ScrapeSettings {
            max_attempts: 3,
            timeout_secs: 20,
            delay_ms: 1000,
            max_redirects: 5,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/125.0 Safari/537.36"
                .into(),
            accept_language: "id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7".into(),
            referer: Some("https://www.tokopedia.com/".into()),
        }
    }
}

impl ScrapeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Settings {
    /// Defaults, then `pricegap.toml` if present, then `PRICEGAP_*` env vars
    /// (`__` separates nested keys, e.g. `PRICEGAP_SCRAPE__MAX_ATTEMPTS`).
    pub fn load() -> Result<Settings, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("meta_columns"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sheet_id.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "sheet_id is empty (set {}_SHEET_ID or sheet_id in {}.toml)",
                ENV_PREFIX, CONFIG_FILE
            )));
        }
        if self.own_store.trim().is_empty() {
            return Err(ConfigError::Invalid("own_store is empty".into()));
        }
        if self.scrape.max_attempts == 0 {
            return Err(ConfigError::Invalid("scrape.max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Path of the service-account key file, taken from the env var named
    /// by `credentials_env`.
    pub fn credentials_path(&self) -> Result<String, ConfigError> {
        match std::env::var(&self.credentials_env) {
            Ok(path) if !path.trim().is_empty() => Ok(path),
            _ => Err(ConfigError::MissingEnv(self.credentials_env.clone())),
        }
    }
}
