//! HTTP client wrapper - builds the reqwest client and sends composed requests

use std::error::Error as _;
use std::future::Future;

use crate::errors::{ReqoError, Result};
use crate::models::ComposedRequest;
use crate::network::ExecOptions;

/// Sends one attempt of a composed request
pub trait Transport {
    fn send(
        &self,
        request: &ComposedRequest,
    ) -> impl Future<Output = Result<reqwest::Response>> + Send;
}

/// Transport backed by a configured `reqwest::Client`
pub struct ReqwestTransport {
    client: reqwest::Client,
    options: ExecOptions,
}

impl ReqwestTransport {
    pub fn new(options: &ExecOptions) -> Result<Self> {
        Ok(ReqwestTransport {
            client: create_client(options)?,
            options: options.clone(),
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: &ComposedRequest,
    ) -> impl Future<Output = Result<reqwest::Response>> + Send {
        let builder = build_request(&self.client, request);
        let url = request.url.to_string();
        let options = self.options.clone();
        async move {
            builder
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, &url, &options))
        }
    }
}

/// Build a request from the composed descriptor
fn build_request(client: &reqwest::Client, request: &ComposedRequest) -> reqwest::RequestBuilder {
    let mut req_builder = client.request(request.method.into(), request.url.clone());

    // append keeps repeated header names
    for header in &request.headers {
        req_builder = req_builder.header(header.key.as_str(), header.value.as_str());
    }

    if let Some(body) = &request.body {
        req_builder = req_builder.body(body.clone());
    }

    req_builder
}

/// Create an HTTP client with the timeout, redirect guard and TLS toggle
pub fn create_client(options: &ExecOptions) -> Result<reqwest::Client> {
    let max_redirects = options.max_redirects;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        // previous() holds the original URL plus every hop followed so far
        if attempt.previous().len() > max_redirects {
            attempt.error(format!("stopped after {} redirects", max_redirects))
        } else {
            attempt.follow()
        }
    });

    reqwest::Client::builder()
        .timeout(options.timeout)
        .redirect(policy)
        .danger_accept_invalid_certs(options.insecure)
        .user_agent(format!(
            "{}/{}",
            crate::constants::APP_NAME,
            crate::constants::APP_VERSION
        ))
        .build()
        .map_err(|e| ReqoError::Transport {
            url: String::new(),
            message: format!("cannot build HTTP client: {}", e),
        })
}

fn map_reqwest_error(err: reqwest::Error, url: &str, options: &ExecOptions) -> ReqoError {
    if err.is_redirect() {
        ReqoError::TooManyRedirects(options.max_redirects)
    } else if err.is_timeout() {
        ReqoError::DeadlineExceeded(options.timeout)
    } else {
        ReqoError::Transport {
            url: url.to_string(),
            message: error_chain(&err),
        }
    }
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
