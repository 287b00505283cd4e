//! Shared helpers for reqo integration tests
//!
//! - a temp project directory wired to a mock server
//! - CLI invocation with an isolated HOME

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use reqo::models::{Environment, Project};
use reqo::storage;

/// Result of running the reqo binary
#[derive(Debug)]
pub struct CliResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// A project rooted in a temp directory, with `HOME` pointing inside it
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    /// New project whose default environment points at `base_url`
    pub fn new(base_url: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut project = storage::new_project("test");
        project
            .environments
            .insert("default".into(), Environment::new(base_url));
        storage::save(dir.path(), &project).expect("save project");
        TestProject { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn load(&self) -> Project {
        storage::load(self.root()).expect("load project")
    }

    pub fn update(&self, f: impl FnOnce(&mut Project)) {
        let mut project = self.load();
        f(&mut project);
        storage::save(self.root(), &project).expect("save project");
    }

    /// Run the reqo binary from the project root
    pub fn reqo(&self, args: &[&str]) -> CliResponse {
        let output = Command::new(env!("CARGO_BIN_EXE_reqo"))
            .args(args)
            .current_dir(self.root())
            .env("HOME", self.root().join("home"))
            .env_remove("REQO_ENV")
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to execute reqo");

        CliResponse {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        }
    }
}
