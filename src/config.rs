use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use unsegen::input::Key;

use crate::cmds::Cmd;
use crate::error::{Error, ErrorKind, Result};
use crate::profile::Section;

pub type KeyMap = HashMap<Key, Cmd>;

const CONFIG_PATH_ENV_VAR: &str = "TABLEBOOK_CONFIG_FILE";

pub const DEFAULT_AVATAR_MAX_BYTES: u64 = 5 * 1024 * 1024;

pub(crate) fn find_configfile_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();

    if let Ok(path) = env::var(CONFIG_PATH_ENV_VAR) {
        locations.push(PathBuf::from(path));
    }

    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("tablebook").join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".tablebook.toml"));
    }

    locations
}

/// Loads `path` if given, otherwise the first existing file of the default
/// locations. Falls back to the default configuration if none exists.
pub fn load_suitable_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path);
    }

    match find_configfile_locations()
        .into_iter()
        .find(|candidate| candidate.is_file())
    {
        Some(found) => Config::from_file(&found),
        None => {
            log::info!("No configuration file found, using defaults");
            Ok(Config::default())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub path: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            kind: SourceKind::Http,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub csrf_token: String,
    pub session_id: Option<String>,
    pub profile_update_path: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:8000".to_owned(),
            csrf_token: String::new(),
            session_id: None,
            profile_update_path: "/users/profile/update/".to_owned(),
            timeout: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub max_bytes: u64,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        AvatarConfig {
            max_bytes: DEFAULT_AVATAR_MAX_BYTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip, default = "default_key_map")]
    pub key_map: KeyMap,
    /// Update tick in milliseconds
    #[serde(rename = "tick_rate")]
    pub tick_rate_ms: u64,
    pub api: ApiConfig,
    pub source: SourceConfig,
    pub avatar: AvatarConfig,
}

fn default_key_map() -> KeyMap {
    let mut key_map = HashMap::new();

    key_map.insert(Key::Char('l'), Cmd::NextDay);
    key_map.insert(Key::Char('h'), Cmd::PrevDay);
    key_map.insert(Key::Char('j'), Cmd::NextWeek);
    key_map.insert(Key::Char('k'), Cmd::PrevWeek);
    key_map.insert(Key::Char('n'), Cmd::NextMonth);
    key_map.insert(Key::Char('p'), Cmd::PrevMonth);
    key_map.insert(Key::Char('t'), Cmd::Today);
    key_map.insert(Key::Char('\n'), Cmd::ShowDay);
    key_map.insert(Key::Char(']'), Cmd::NextReservation);
    key_map.insert(Key::Char('['), Cmd::PrevReservation);
    key_map.insert(Key::Char('r'), Cmd::Reload);
    key_map.insert(Key::Char(':'), Cmd::CommandMode);
    key_map.insert(Key::Char('q'), Cmd::Exit);

    for (i, section) in Section::ALL.iter().enumerate() {
        if let Some(c) = std::char::from_digit(i as u32 + 1, 10) {
            key_map.insert(Key::Char(c), Cmd::ShowSection(*section));
        }
    }

    key_map
}

impl Default for Config {
    fn default() -> Config {
        Config {
            key_map: default_key_map(),
            tick_rate_ms: 500,
            api: ApiConfig::default(),
            source: SourceConfig::default(),
            avatar: AvatarConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|err| {
            Error::new(
                ErrorKind::IOError(err),
                &format!("could not read '{}'", path.display()),
            )
        })?;

        let config = Config::from_toml(&content)?;
        log::info!("Loaded configuration from '{}'", path.display());

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;

        if config.source.kind == SourceKind::File && config.source.path.is_none() {
            return Err(Error::new(
                ErrorKind::ConfigParse,
                "source kind 'file' requires a 'path'",
            ));
        }

        Ok(config)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.tick_rate(), Duration::from_millis(500));
        assert_eq!(config.source.kind, SourceKind::Http);
        assert_eq!(config.avatar.max_bytes, DEFAULT_AVATAR_MAX_BYTES);
        assert_eq!(config.api.profile_update_path, "/users/profile/update/");
        assert_eq!(config.key_map.get(&Key::Char('q')), Some(&Cmd::Exit));
    }

    #[test]
    fn reads_all_sections() {
        let config = Config::from_toml(
            r#"
            tick_rate = 250

            [api]
            base_url = "https://booking.example.org"
            csrf_token = "abc"
            session_id = "s3ss10n"
            timeout = 3

            [source]
            kind = "file"
            path = "/tmp/reservations.json"

            [avatar]
            max_bytes = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.tick_rate_ms, 250);
        assert_eq!(config.api.base_url, "https://booking.example.org");
        assert_eq!(config.api.session_id.as_deref(), Some("s3ss10n"));
        assert_eq!(config.api.timeout, 3);
        assert_eq!(config.source.kind, SourceKind::File);
        assert_eq!(
            config.source.path,
            Some(PathBuf::from("/tmp/reservations.json"))
        );
        assert_eq!(config.avatar.max_bytes, 1024);
    }

    #[test]
    fn file_source_needs_path() {
        let err = Config::from_toml("[source]\nkind = \"file\"\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ConfigParse));
    }

    #[test]
    fn unknown_source_kind_is_rejected() {
        assert!(Config::from_toml("[source]\nkind = \"ftp\"\n").is_err());
    }

    #[test]
    fn digits_switch_sections() {
        let config = Config::default();
        assert_eq!(
            config.key_map.get(&Key::Char('2')),
            Some(&Cmd::ShowSection(Section::Calendar))
        );
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "tick_rate = 100\n").expect("write config");

        let config = load_suitable_config(Some(&path)).unwrap();
        assert_eq!(config.tick_rate_ms, 100);

        assert!(load_suitable_config(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
