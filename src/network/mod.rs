//! Network layer - HTTP request execution
//!
//! The executor sends a composed request with timeout, redirect guard and
//! retry/backoff, and hands back the final response.

pub mod client;
pub mod executor;

use std::time::Duration;

use crate::constants::{DEFAULT_BACKOFF, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT, MAX_BACKOFF};

pub use client::{create_client, ReqwestTransport, Transport};
pub use executor::{execute, execute_until, execute_with};

/// Runtime knobs for one execution
#[derive(Clone, Debug, PartialEq)]
pub struct ExecOptions {
    /// Overall deadline, covering every attempt and backoff sleep
    pub timeout: Duration,
    /// Extra attempts after the first one
    pub retries: u32,
    /// First backoff; doubled after every retry
    pub backoff: Duration,
    pub max_backoff: Duration,
    pub max_redirects: usize,
    /// Skip TLS certificate verification
    pub insecure: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        ExecOptions {
            timeout: DEFAULT_TIMEOUT,
            retries: 0,
            backoff: DEFAULT_BACKOFF,
            max_backoff: MAX_BACKOFF,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            insecure: false,
        }
    }
}
