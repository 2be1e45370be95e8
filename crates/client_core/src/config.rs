use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;

pub const DEFAULT_WS_URL: &str = "ws://localhost:8082/ws";
pub const SETTINGS_FILE: &str = "map_assistant.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub ws_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.into(),
        }
    }
}

/// Defaults, then `map_assistant.toml` in the working directory, then the
/// environment. Unreadable or malformed files are logged and skipped.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    match read_settings_file(Path::new(SETTINGS_FILE)) {
        Ok(Some(file_cfg)) => {
            if let Some(v) = file_cfg.get("ws_url") {
                settings.ws_url = v.clone();
            }
        }
        Ok(None) => {}
        Err(err) => tracing::warn!(file = SETTINGS_FILE, "ignoring settings file: {err:#}"),
    }

    if let Ok(v) = std::env::var("MAP_ASSISTANT_WS_URL") {
        settings.ws_url = v;
    }
    if let Ok(v) = std::env::var("APP__WS_URL") {
        settings.ws_url = v;
    }

    settings.ws_url = normalize_ws_url(&settings.ws_url);
    settings
}

pub(crate) fn read_settings_file(path: &Path) -> anyhow::Result<Option<HashMap<String, String>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let parsed = toml::from_str::<HashMap<String, String>>(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    Ok(Some(parsed))
}

pub fn normalize_ws_url(raw: &str) -> String {
    let raw = raw.trim();

    if raw.is_empty() {
        return Settings::default().ws_url;
    }

    if raw.starts_with("ws://") || raw.starts_with("wss://") {
        return raw.to_string();
    }

    if let Some(rest) = raw.strip_prefix("https://") {
        return format!("wss://{rest}");
    }

    if let Some(rest) = raw.strip_prefix("http://") {
        return format!("ws://{rest}");
    }

    if raw.contains("://") {
        return raw.to_string();
    }

    format!("ws://{raw}")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
