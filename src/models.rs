use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::template::Vars;

/// HTTP Method enum
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }

    /// Case-insensitive parse; `None` for anything that is not a known method
    pub fn parse(s: &str) -> Option<HttpMethod> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "PATCH" => Some(HttpMethod::PATCH),
            "DELETE" => Some(HttpMethod::DELETE),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }

    /// Methods retried after a 5xx
    pub fn is_idempotent(&self) -> bool {
        matches!(self, HttpMethod::GET | HttpMethod::HEAD | HttpMethod::OPTIONS)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::DELETE => reqwest::Method::DELETE,
            HttpMethod::HEAD => reqwest::Method::HEAD,
            HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
        }
    }
}

/// HTTP Header
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Header {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A project: environments, header sets and saved calls
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_env: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environments: BTreeMap<String, Environment>,
    /// name -> list of "Key: Value" lines
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub header_sets: BTreeMap<String, Vec<String>>,
    /// alias -> saved call
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub calls: BTreeMap<String, Call>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Project {
            version: 1,
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A named base URL plus headers applied to every request made against it
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
}

impl Environment {
    pub fn new(base_url: impl Into<String>) -> Self {
        Environment {
            base_url: base_url.into(),
            headers: Vec::new(),
        }
    }
}

/// A saved request
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Call {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodySpec>,
    #[serde(
        rename = "uses_header_set",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub use_header_set: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
}

impl Call {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Call {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Short label for listings: "[JSON body]", "[raw body]" or "[form body]"
    pub fn body_label(&self) -> Option<&'static str> {
        let body = self.body.as_ref()?;
        if body.json.is_some() {
            Some("[JSON body]")
        } else if body.raw.is_some() {
            Some("[raw body]")
        } else if !body.form.is_empty() {
            Some("[form body]")
        } else {
            None
        }
    }
}

/// Saved body: JSON or raw text (inline or `@file`), or multipart form fields
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// field -> value; `@path` uploads a file
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub form: BTreeMap<String, String>,
}

impl BodySpec {
    pub fn is_empty(&self) -> bool {
        self.json.is_none() && self.raw.is_none() && self.form.is_empty()
    }
}

/// Everything one invocation asks for. Built per execution, never persisted.
#[derive(Clone, Debug, Default)]
pub struct RequestSpec {
    pub method: String,
    pub path: String,
    /// raw "k=v" strings
    pub query_params: Vec<String>,
    /// raw "Key: Value" lines
    pub headers: Vec<String>,
    pub use_header_set: Option<String>,
    /// JSON body override (inline or `@file`)
    pub json_body: Option<String>,
    /// raw body override (inline or `@file`)
    pub raw_body: Option<String>,
    pub form_fields: BTreeMap<String, String>,
    /// body saved with the call, used when no override is present
    pub saved_body: Option<BodySpec>,
    pub vars: Vars,
    pub env_name: Option<String>,
}

impl RequestSpec {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        RequestSpec {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Seeds a spec from a saved call. Saved headers and query pairs come
    /// first so ad-hoc ones appended later follow them.
    pub fn from_call(call: &Call) -> Self {
        RequestSpec {
            method: call.method.clone(),
            path: call.path.clone(),
            query_params: call
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect(),
            headers: call.headers.clone(),
            use_header_set: call.use_header_set.clone(),
            saved_body: call.body.clone(),
            ..Default::default()
        }
    }
}

/// A fully resolved request, ready to send or to print as curl
#[derive(Clone, Debug, PartialEq)]
pub struct ComposedRequest {
    pub method: HttpMethod,
    pub url: url::Url,
    /// in merge order; repeated names are kept
    pub headers: Vec<Header>,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
}

impl ComposedRequest {
    /// First value of a header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.key.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// All values of a header, in order
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |h| h.key.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}
