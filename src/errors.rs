//! Error types for reqo

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Every failure the composer, executor, renderer and project store can report
#[derive(Error, Debug)]
pub enum ReqoError {
    #[error("environment {0:?} not defined")]
    UnknownEnvironment(String),

    #[error("header set {0:?} not defined")]
    UnknownHeaderSet(String),

    #[error("invalid header {0:?}: must be \"Key: Value\"")]
    MalformedHeader(String),

    #[error("cannot specify both a JSON body and a raw body")]
    ConflictingBody,

    #[error("read file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),

    #[error("deadline of {0:.1?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("invalid jq expression {expr:?}: {message}")]
    FilterSyntax { expr: String, message: String },

    #[error("jq execution error: {0}")]
    FilterExecution(String),

    #[error("cannot decode response body as JSON: {0}")]
    InvalidJsonBody(#[source] serde_json::Error),

    #[error("call {alias:?} not defined in project {project}")]
    UnknownCall { alias: String, project: String },

    #[error("no .reqo/project.yaml found above {}; run 'reqo init'", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ReqoError {
    /// True for failures detected while composing, before anything was sent
    pub fn is_composition_error(&self) -> bool {
        matches!(
            self,
            ReqoError::UnknownEnvironment(_)
                | ReqoError::UnknownHeaderSet(_)
                | ReqoError::MalformedHeader(_)
                | ReqoError::ConflictingBody
                | ReqoError::FileRead { .. }
                | ReqoError::InvalidUrl { .. }
                | ReqoError::InvalidMethod(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ReqoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_resource() {
        let err = ReqoError::UnknownEnvironment("staging".into());
        assert_eq!(err.to_string(), r#"environment "staging" not defined"#);

        let err = ReqoError::FileRead {
            path: PathBuf::from("/tmp/missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/tmp/missing.json"));
    }

    #[test]
    fn test_composition_errors_are_classified() {
        assert!(ReqoError::ConflictingBody.is_composition_error());
        assert!(ReqoError::MalformedHeader("BadHeader".into()).is_composition_error());
        assert!(!ReqoError::TooManyRedirects(10).is_composition_error());
        assert!(!ReqoError::DeadlineExceeded(Duration::from_secs(1)).is_composition_error());
    }
}
