use crate::error::ToolkitError;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the adb executable; overrides the provisioned copy
    pub adb_path: Option<String>,
    /// Directory holding adb/fastboot and driver libraries to provision from
    pub bundle_dir: Option<String>,
    /// Working directory; defaults to `<temp>/droidkit`
    pub work_dir: Option<String>,
    pub poll_interval_secs: u64,
    /// Kill leftover adb processes at shutdown
    pub reap_orphans: bool,
    pub alias: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adb_path: None,
            bundle_dir: None,
            work_dir: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            reap_orphans: true,
            alias: HashMap::new(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        match Config::get_config_path() {
            Some(path) => Config::load_from_path(&path),
            None => {
                debug!("No home directory, using default config");
                Config::default()
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Self {
        debug!("Loading config from: {:?}", config_path);

        if let Ok(content) = fs::read_to_string(config_path) {
            debug!("Config file contents: {}", content);
            match toml::from_str(&content) {
                Ok(config) => {
                    debug!("Parsed config: {:?}", config);
                    config
                }
                Err(e) => {
                    let err = ToolkitError::Config(format!("{}: {}", config_path.display(), e));
                    eprintln!("{}", err);
                    Config::default()
                }
            }
        } else {
            debug!("No config file found or unable to read it");
            Config::default()
        }
    }

    pub fn get_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".droidkit.toml"))
    }

    pub fn resolve_alias(&self, command: &str) -> String {
        debug!("Resolving alias for: {}", command);
        self.alias
            .get(command)
            .cloned()
            .unwrap_or_else(|| command.to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Resolved working directory, tilde-expanded
    pub fn work_dir(&self) -> PathBuf {
        match &self.work_dir {
            Some(dir) => expand(dir),
            None => std::env::temp_dir().join("droidkit"),
        }
    }

    pub fn bundle_dir(&self) -> Option<PathBuf> {
        self.bundle_dir.as_deref().map(expand)
    }

    /// Explicit adb path: `ADB_PATH` first, then the config file
    pub fn adb_path(&self) -> Option<PathBuf> {
        std::env::var("ADB_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| self.adb_path.clone())
            .map(|p| expand(&p))
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
