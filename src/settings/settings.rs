use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: Api,
    pub poll: Poll,
    pub session: SessionSettings,
    pub log: Log,
    pub stub: Stub,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Poll {
    pub interval_ms: u64,
    pub degraded_after: u32, // 0 disables
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub cache_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stub {
    pub address: String,
    pub polls_until_complete: u32,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_settings_parse() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/settings/dev.toml");
        let settings = parse_settings(Some(path)).unwrap();
        assert_eq!(settings.poll.interval_ms, 5000);
        assert_eq!(settings.poll.degraded_after, 3);
        assert!(settings.api.base_url.ends_with("/api/v1"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("settings/does-not-exist.toml")).is_err());
    }
}
