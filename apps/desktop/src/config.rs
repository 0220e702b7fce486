use std::{fs, path::Path};

use serde::Deserialize;
use tracing::{info, warn};

pub const SETTINGS_FILE: &str = "faceid.toml";
pub const DEFAULT_SERVICE_URL: &str = "https://backend4-vwa3.onrender.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub service_url: String,
    /// Zero disables the client-side timeout.
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    service_url: Option<String>,
    request_timeout_seconds: Option<u64>,
}

impl Settings {
    pub fn apply_overrides(&mut self, service_url: Option<String>, timeout_seconds: Option<u64>) {
        if let Some(v) = service_url {
            self.service_url = v;
        }
        if let Some(v) = timeout_seconds {
            self.request_timeout_seconds = v;
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                info!("loaded settings from {}", path.display());
                settings.apply_overrides(file_cfg.service_url, file_cfg.request_timeout_seconds);
            }
            Err(err) => warn!("ignoring malformed {}: {err}", path.display()),
        }
    }

    if let Some(v) = env("FACEID_SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = env("APP__SERVICE_URL") {
        settings.service_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECONDS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_seconds = parsed,
            Err(err) => warn!("invalid APP__REQUEST_TIMEOUT_SECONDS value '{v}': {err}"),
        }
    }

    settings
}
