//! Global configuration (`~/.reqo/config.yaml`)
//!
//! A flat key/value file. A few keys provide defaults for execution flags:
//! `timeout` (seconds), `retries`, `backoff_ms`, `max_redirects` and `env`.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::CONFIG_FILE;
use crate::errors::{ReqoError, Result};
use crate::network::ExecOptions;

#[derive(Clone, Debug, Default)]
pub struct Config {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Config {
    /// `~/.reqo/config.yaml`
    pub fn default_path() -> PathBuf {
        crate::storage::home_dir().join(CONFIG_FILE)
    }

    /// Load from `path`; a missing file is an empty config
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_yaml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(ReqoError::FileRead { path, source }),
        };
        Ok(Config { path, values })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_yaml::to_string(&self.values)?)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ReqoError::Config(format!("invalid value {:?} for {:?}", raw, key))),
        }
    }

    /// Default environment name, if configured
    pub fn env(&self) -> Option<&str> {
        self.get("env").filter(|v| !v.is_empty())
    }

    /// Execution defaults with configured values applied on top
    pub fn exec_defaults(&self) -> Result<ExecOptions> {
        let mut options = ExecOptions::default();
        if let Some(secs) = self.parsed::<u64>("timeout")? {
            options.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = self.parsed::<u32>("retries")? {
            options.retries = retries;
        }
        if let Some(ms) = self.parsed::<u64>("backoff_ms")? {
            options.backoff = Duration::from_millis(ms);
        }
        if let Some(max) = self.parsed::<usize>("max_redirects")? {
            options.max_redirects = max;
        }
        Ok(options)
    }
}
