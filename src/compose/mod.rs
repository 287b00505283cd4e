//! Request composition - turns a project plus a request spec into a
//! fully resolved request
//!
//! Composition never touches the network. The only side effects are file
//! reads for `@file` bodies and uploads.

pub mod body;

use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

use crate::errors::{ReqoError, Result};
use crate::models::{ComposedRequest, Environment, Header, HttpMethod, Project, RequestSpec};
use crate::template::{expand, Vars};

pub use body::{encode_multipart, read_possibly_file, select_body, EncodedBody};

/// Builds the request described by `spec` against `project`.
///
/// Headers are appended in this order, never replaced: environment headers,
/// the selected header set, then the request's own header lines.
pub fn build(project: &Project, spec: &RequestSpec) -> Result<ComposedRequest> {
    let env_name = match spec.env_name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => project.default_env.as_str(),
    };
    let env = project
        .environments
        .get(env_name)
        .ok_or_else(|| ReqoError::UnknownEnvironment(env_name.to_string()))?;

    let method = resolve_method(&spec.method)?;
    let url = resolve_url(env, spec)?;
    let body = select_body(spec)?;

    let mut headers = Vec::new();
    add_headers(&mut headers, &env.headers, &spec.vars)?;
    if let Some(set_name) = spec.use_header_set.as_deref().filter(|s| !s.is_empty()) {
        let set = project
            .header_sets
            .get(set_name)
            .ok_or_else(|| ReqoError::UnknownHeaderSet(set_name.to_string()))?;
        add_headers(&mut headers, set, &spec.vars)?;
    }
    add_headers(&mut headers, &spec.headers, &spec.vars)?;

    let content_type = body.as_ref().and_then(|b| b.content_type.clone());
    if let Some(ct) = &content_type {
        if !headers.iter().any(|h| h.key.eq_ignore_ascii_case("content-type")) {
            headers.push(Header::new("Content-Type", ct.clone()));
        }
    }

    tracing::debug!(env = env_name, %method, %url, headers = headers.len(), "Composed request");

    Ok(ComposedRequest {
        method,
        url,
        headers,
        body: body.map(|b| b.bytes),
        content_type,
    })
}

fn resolve_method(method: &str) -> Result<HttpMethod> {
    let method = method.trim();
    if method.is_empty() {
        return Ok(HttpMethod::GET);
    }
    HttpMethod::parse(method).ok_or_else(|| ReqoError::InvalidMethod(method.to_string()))
}

fn resolve_url(env: &Environment, spec: &RequestSpec) -> Result<Url> {
    let base_url = expand(&env.base_url, &spec.vars);
    let path = expand(&spec.path, &spec.vars);

    let full = if path.starts_with("http://") || path.starts_with("https://") {
        path
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };

    let mut url = Url::parse(&full).map_err(|source| ReqoError::InvalidUrl {
        url: full.clone(),
        source,
    })?;

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for raw in &spec.query_params {
        if let Some((k, v)) = raw.split_once('=') {
            pairs.push((expand(k, &spec.vars), expand(v, &spec.vars)));
        }
    }
    // canonical form: sorted by key, repeated keys keep their relative order
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&pairs);
    }
    Ok(url)
}

/// Parses "Key: Value" lines and appends them. Blank lines are skipped.
fn add_headers(headers: &mut Vec<Header>, lines: &[String], vars: &Vars) -> Result<()> {
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| ReqoError::MalformedHeader(line.to_string()))?;
        let key = key.trim();
        let value = expand(value.trim(), vars);

        if HeaderName::from_bytes(key.as_bytes()).is_err() || HeaderValue::from_str(&value).is_err()
        {
            return Err(ReqoError::MalformedHeader(line.to_string()));
        }
        headers.push(Header::new(key, value));
    }
    Ok(())
}
