//! Project file storage
//!
//! A project lives in `<root>/.reqo/project.yaml`. Global projects are
//! rooted at `~/.reqo/projects/<name>`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    CURRENT_FILE, DEFAULT_ENV_NAME, DEFAULT_HEADER_SET, PROJECT_DIR, PROJECT_FILE,
};
use crate::errors::{ReqoError, Result};
use crate::models::{Environment, Project};

/// A loaded project together with the directory it was loaded from
#[derive(Clone, Debug)]
pub struct ProjectStore {
    pub root: PathBuf,
    pub project: Project,
}

impl ProjectStore {
    /// Load the project rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let project = load(&root)?;
        Ok(ProjectStore { root, project })
    }

    /// Write the project back to where it came from
    pub fn save(&self) -> Result<()> {
        save(&self.root, &self.project)
    }
}

pub fn project_file(root: &Path) -> PathBuf {
    root.join(PROJECT_DIR).join(PROJECT_FILE)
}

/// Read `<root>/.reqo/project.yaml`; a missing version is normalized to 1
pub fn load(root: &Path) -> Result<Project> {
    let path = project_file(root);
    let content = fs::read_to_string(&path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ReqoError::ProjectNotFound(root.to_path_buf()),
        _ => ReqoError::FileRead {
            path: path.clone(),
            source,
        },
    })?;
    let mut project: Project = serde_yaml::from_str(&content)?;
    if project.version == 0 {
        project.version = 1;
    }
    tracing::debug!(path = %path.display(), name = %project.name, "Loaded project");
    Ok(project)
}

/// Write the project file, creating `.reqo` if needed
pub fn save(root: &Path, project: &Project) -> Result<()> {
    let path = project_file(root);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let content = serde_yaml::to_string(project)?;
    fs::write(&path, content)?;
    tracing::debug!(path = %path.display(), "Saved project");
    Ok(())
}

/// Walk up from `start` to the first directory holding a project file
pub fn find_project(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| project_file(dir).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| ReqoError::ProjectNotFound(start.to_path_buf()))
}

/// `~/.reqo`
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PROJECT_DIR)
}

/// Root of a global project: `~/.reqo/projects/<name>`
pub fn global_project_root(name: &str) -> PathBuf {
    home_dir().join("projects").join(name)
}

/// Mark `name` as the active project for `dir`
pub fn set_current(dir: &Path, name: &str) -> Result<()> {
    let path = dir.join(PROJECT_DIR).join(CURRENT_FILE);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, name)?;
    Ok(())
}

/// Active project name for `dir`, if one was set
pub fn get_current(dir: &Path) -> Option<String> {
    let content = fs::read_to_string(dir.join(PROJECT_DIR).join(CURRENT_FILE)).ok()?;
    let name = content.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Resolve which project a command acts on.
///
/// Order: an explicit project name, then the `.reqo/current` marker in
/// `cwd`, then the nearest project file above `cwd`.
pub fn resolve_root(explicit: Option<&str>, cwd: &Path) -> Result<PathBuf> {
    if let Some(name) = explicit.filter(|n| !n.is_empty()) {
        return Ok(global_project_root(name));
    }
    if let Some(name) = get_current(cwd) {
        return Ok(global_project_root(&name));
    }
    find_project(cwd)
}

/// A fresh project with an empty `default` environment and a `default`
/// header set
pub fn new_project(name: &str) -> Project {
    let mut project = Project::new(name);
    project.default_env = DEFAULT_ENV_NAME.to_string();
    project
        .environments
        .insert(DEFAULT_ENV_NAME.to_string(), Environment::default());
    project.header_sets.insert(
        DEFAULT_HEADER_SET.to_string(),
        vec!["User-Agent: reqo/${version}".to_string()],
    );
    project
}
