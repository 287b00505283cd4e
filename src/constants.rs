//! Application constants
//!
//! Centralized location for file names, environment variables and
//! execution defaults.

use std::time::Duration;

/// Directory holding a project's files, relative to the project root
pub const PROJECT_DIR: &str = ".reqo";

/// Project file name inside [`PROJECT_DIR`]
pub const PROJECT_FILE: &str = "project.yaml";

/// Marker file naming the active project for a directory
pub const CURRENT_FILE: &str = "current";

/// Global config file name inside `~/.reqo`
pub const CONFIG_FILE: &str = "config.yaml";

/// Environment variable selecting the environment when `--env` is absent
pub const ENV_VAR_ENV: &str = "REQO_ENV";

pub const DEFAULT_ENV_NAME: &str = "default";

/// Header set created by `init`
pub const DEFAULT_HEADER_SET: &str = "default";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

/// Ceiling for the doubled backoff between attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Application name
pub const APP_NAME: &str = "reqo";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
