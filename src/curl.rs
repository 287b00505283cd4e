use crate::models::ComposedRequest;

/// Format a composed request as an equivalent curl command line.
///
/// Headers keep their merge order; user-info is dropped from the URL.
pub fn to_shell_command(request: &ComposedRequest) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X {}", request.method.as_str())];

    // Headers
    for header in &request.headers {
        parts.push(format!(
            "-H \"{}: {}\"",
            escape_double(&header.key),
            escape_double(&header.value)
        ));
    }

    // Body
    if let Some(body) = request.body_text() {
        let data = body.trim();
        if !data.is_empty() {
            parts.push(format!("--data-raw {}", shell_quote(data)));
        }
    }

    // URL
    let mut url = request.url.clone();
    let _ = url.set_username("");
    let _ = url.set_password(None);
    parts.push(shell_quote(url.as_str()));

    parts.join(" ")
}

fn escape_double(s: &str) -> String {
    s.replace('"', "\\\"")
}

/// Single-quote for a POSIX shell; embedded quotes become '\''
fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}
