//! Response rendering - status line, headers, pretty JSON, jq filter, raw
//! passthrough

pub mod filter;

use std::io::Write;

use futures_util::StreamExt;
use serde_json::Value as JsonValue;

use crate::errors::{ReqoError, Result};

pub use filter::Filter;

/// How a response is printed
#[derive(Clone, Debug, Default)]
pub struct RenderOptions {
    /// Print the status line and headers first (`-i`)
    pub show_headers: bool,
    /// Copy the body verbatim, no formatting or filtering
    pub raw_output: bool,
    /// jq expression applied to the JSON body
    pub filter: Option<String>,
}

/// Writes `response` to `out` according to `options`
pub async fn render<W: Write>(
    response: reqwest::Response,
    out: &mut W,
    options: &RenderOptions,
) -> Result<()> {
    if options.show_headers {
        write_head(&response, out)?;
    }

    let url = response.url().to_string();
    let read_error = |e: reqwest::Error| ReqoError::Transport {
        url: url.clone(),
        message: format!("error reading body: {}", e),
    };

    if options.raw_output {
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            out.write_all(&chunk.map_err(read_error)?)?;
        }
        out.flush()?;
        return Ok(());
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await.map_err(read_error)?;

    let body = format_body(&bytes, content_type.as_deref(), options.filter.as_deref())?;
    out.write_all(&body)?;
    if !body.is_empty() && !body.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// `HTTP/<ver> <code> <reason>`, every header, then a blank line
fn write_head<W: Write>(response: &reqwest::Response, out: &mut W) -> Result<()> {
    let status = response.status();
    writeln!(
        out,
        "{:?} {} {}",
        response.version(),
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )?;
    for (name, value) in response.headers() {
        writeln!(out, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()))?;
    }
    writeln!(out)?;
    Ok(())
}

/// Pretty-prints JSON bodies and applies the optional filter.
///
/// A JSON content type whose body does not parse is passed through as is.
pub fn format_body(
    body: &[u8],
    content_type: Option<&str>,
    filter_expr: Option<&str>,
) -> Result<Vec<u8>> {
    let mut out = body.to_vec();

    if content_type.is_some_and(|ct| ct.contains("application/json")) {
        if let Ok(pretty) = pretty_json(body) {
            out = pretty;
        }
    }

    if let Some(expr) = filter_expr.filter(|e| !e.is_empty()) {
        let filter = Filter::parse(expr)?;
        let input: JsonValue = serde_json::from_slice(&out).map_err(ReqoError::InvalidJsonBody)?;
        let results = filter.run(&input)?;
        out = serde_json::to_vec_pretty(&JsonValue::Array(results))
            .map_err(ReqoError::InvalidJsonBody)?;
    }

    Ok(out)
}

fn pretty_json(body: &[u8]) -> std::result::Result<Vec<u8>, serde_json::Error> {
    let value: JsonValue = serde_json::from_slice(body)?;
    serde_json::to_vec_pretty(&value)
}
