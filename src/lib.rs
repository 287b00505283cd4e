//! # reqo
//!
//! curl, but with projects, environments, header sets and saved calls.
//!
//! ## Pipeline
//! - [`template`] - `${name}` expansion from variables and the process environment
//! - [`compose`] - project + [`RequestSpec`] into a fully resolved [`ComposedRequest`]
//! - [`network`] - execution with timeout, redirect limit and retry/backoff
//! - [`curl`] - equivalent curl command for a composed request
//! - [`output`] - status line, headers, pretty JSON and jq filtering
//!
//! Projects are YAML files under `.reqo/` (see [`storage`]); global defaults
//! live in `~/.reqo/config.yaml` (see [`config`]).

pub mod cli;
pub mod compose;
pub mod config;
pub mod constants;
pub mod curl;
pub mod errors;
pub mod models;
pub mod network;
pub mod output;
pub mod storage;
pub mod template;

// Re-export commonly used types
pub use compose::build;
pub use curl::to_shell_command;
pub use errors::{ReqoError, Result};
pub use models::{BodySpec, Call, ComposedRequest, Environment, Header, HttpMethod, Project, RequestSpec};
pub use network::{execute, ExecOptions};
pub use output::{render, RenderOptions};
