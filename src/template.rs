//! `${name}` placeholder expansion
//!
//! Lookup order for each placeholder: the supplied variable table, then the
//! process environment (non-empty values only). Anything else is left in
//! place untouched. Expansion is a single pass; substituted values are not
//! scanned again.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex is valid"));

/// Variable table supplied by the caller (`--var key=value`)
pub type Vars = BTreeMap<String, String>;

/// Expands every `${name}` in `input`
pub fn expand(input: &str, vars: &Vars) -> String {
    expand_with(input, vars, |key| std::env::var(key).ok())
}

/// Expands using a custom fallback lookup instead of the process environment
pub fn expand_with<F>(input: &str, vars: &Vars, env_lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    VAR_RE
        .replace_all(input, |caps: &Captures| {
            let key = &caps[1];
            if let Some(value) = vars.get(key) {
                return value.clone();
            }
            match env_lookup(key) {
                Some(value) if !value.is_empty() => value,
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Expands every value of a mapping, keeping its keys
pub fn expand_map(input: &BTreeMap<String, String>, vars: &Vars) -> BTreeMap<String, String> {
    input
        .iter()
        .map(|(k, v)| (k.clone(), expand(v, vars)))
        .collect()
}

/// Builds a variable table from `key=value` tokens.
///
/// Tokens without `=` are ignored; on duplicate keys the last one wins.
pub fn parse_vars<I, S>(tokens: I) -> Vars
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .filter_map(|token| {
            token
                .as_ref()
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect()
}
