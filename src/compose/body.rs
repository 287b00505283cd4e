//! Body selection and encoding
//!
//! At most one body is active per request. JSON, raw and form each take the
//! invocation's override over the call's saved value; the resolved kinds
//! then rank JSON, raw, form.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{ReqoError, Result};
use crate::models::RequestSpec;
use crate::template::{expand, expand_map};

pub const JSON_CONTENT_TYPE: &str = "application/json";

const BOUNDARY_BASE: &str = "------------------------reqoformboundary";

/// Encoded body plus the content type it implies, if any
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Picks the active body for `spec` and encodes it. File reads happen here.
///
/// Each kind resolves on its own: the override if given, else the saved
/// value. JSON and raw together are a conflict.
pub fn select_body(spec: &RequestSpec) -> Result<Option<EncodedBody>> {
    let saved = spec.saved_body.as_ref();

    let json = spec.json_body.clone().or_else(|| {
        saved
            .and_then(|b| b.json.as_deref())
            .map(|s| expand(s, &spec.vars))
    });
    let raw = spec.raw_body.clone().or_else(|| {
        saved
            .and_then(|b| b.raw.as_deref())
            .map(|s| expand(s, &spec.vars))
    });
    if json.is_some() && raw.is_some() {
        return Err(ReqoError::ConflictingBody);
    }

    let form = match saved {
        Some(body) if spec.form_fields.is_empty() => &body.form,
        _ => &spec.form_fields,
    };
    encode(json.as_deref(), raw.as_deref(), &expand_map(form, &spec.vars))
}

fn encode(
    json: Option<&str>,
    raw: Option<&str>,
    form: &BTreeMap<String, String>,
) -> Result<Option<EncodedBody>> {
    if let Some(json) = json {
        return Ok(Some(EncodedBody {
            bytes: read_possibly_file(json)?,
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
        }));
    }
    if let Some(raw) = raw {
        return Ok(Some(EncodedBody {
            bytes: read_possibly_file(raw)?,
            content_type: None,
        }));
    }
    if !form.is_empty() {
        let (bytes, content_type) = encode_multipart(form)?;
        return Ok(Some(EncodedBody {
            bytes,
            content_type: Some(content_type),
        }));
    }
    Ok(None)
}

/// `@path` yields the file's bytes, anything else the string itself
pub fn read_possibly_file(value: &str) -> Result<Vec<u8>> {
    match value.strip_prefix('@') {
        Some(path) => read_file(Path::new(path)),
        None => Ok(value.as_bytes().to_vec()),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| ReqoError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

enum PartData {
    Text(String),
    File { filename: String, data: Vec<u8> },
}

impl PartData {
    fn bytes(&self) -> &[u8] {
        match self {
            PartData::Text(text) => text.as_bytes(),
            PartData::File { data, .. } => data,
        }
    }
}

/// Encodes form fields as multipart/form-data.
///
/// Fields are written in key order and the boundary is derived only from the
/// content, so encoding the same fields twice gives the same bytes.
pub fn encode_multipart(fields: &BTreeMap<String, String>) -> Result<(Vec<u8>, String)> {
    let mut parts = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let data = match value.strip_prefix('@') {
            Some(path) => {
                let path = PathBuf::from(path);
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                PartData::File {
                    filename,
                    data: read_file(&path)?,
                }
            }
            None => PartData::Text(value.clone()),
        };
        parts.push((name.as_str(), data));
    }

    let mut boundary = BOUNDARY_BASE.to_string();
    while parts
        .iter()
        .any(|(_, data)| contains(data.bytes(), boundary.as_bytes()))
    {
        boundary.push('x');
    }

    let mut out = Vec::new();
    for (name, data) in &parts {
        out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match data {
            PartData::Text(text) => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        escape_quotes(name)
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(text.as_bytes());
            }
            PartData::File { filename, data } => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        escape_quotes(name),
                        escape_quotes(filename)
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(data);
            }
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    Ok((out, format!("multipart/form-data; boundary={}", boundary)))
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BodySpec;
    use std::io::Write;

    fn form(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_conflicting_overrides() {
        let mut spec = RequestSpec::new("POST", "/x");
        spec.json_body = Some("{}".into());
        spec.raw_body = Some("text".into());
        assert!(matches!(select_body(&spec), Err(ReqoError::ConflictingBody)));
    }

    #[test]
    fn test_saved_json_is_expanded() {
        let mut spec = RequestSpec::new("POST", "/x");
        spec.saved_body = Some(BodySpec {
            json: Some(r#"{"name":"${name}"}"#.into()),
            ..Default::default()
        });
        spec.vars.insert("name".into(), "Ann".into());

        let body = select_body(&spec).unwrap().unwrap();
        assert_eq!(body.bytes, br#"{"name":"Ann"}"#);
        assert_eq!(body.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn test_override_is_not_expanded() {
        let mut spec = RequestSpec::new("POST", "/x");
        spec.raw_body = Some("${literal}".into());
        spec.vars.insert("literal".into(), "nope".into());

        let body = select_body(&spec).unwrap().unwrap();
        assert_eq!(body.bytes, b"${literal}");
        assert_eq!(body.content_type, None);
    }

    #[test]
    fn test_saved_json_outranks_form_override() {
        let mut spec = RequestSpec::new("POST", "/x");
        spec.saved_body = Some(BodySpec {
            json: Some(r#"{"a":1}"#.into()),
            ..Default::default()
        });
        spec.form_fields = form(&[("f", "v")]);

        let body = select_body(&spec).unwrap().unwrap();
        assert_eq!(body.bytes, br#"{"a":1}"#);
        assert_eq!(body.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn test_json_override_conflicts_with_saved_raw() {
        let mut spec = RequestSpec::new("POST", "/x");
        spec.saved_body = Some(BodySpec {
            raw: Some("plain".into()),
            ..Default::default()
        });
        spec.json_body = Some("{}".into());
        assert!(matches!(select_body(&spec), Err(ReqoError::ConflictingBody)));
    }

    #[test]
    fn test_json_override_replaces_saved_json() {
        let mut spec = RequestSpec::new("POST", "/x");
        spec.saved_body = Some(BodySpec {
            json: Some(r#"{"saved":true}"#.into()),
            form: form(&[("f", "v")]),
            ..Default::default()
        });
        spec.json_body = Some(r#"{"saved":false}"#.into());

        let body = select_body(&spec).unwrap().unwrap();
        assert_eq!(body.bytes, br#"{"saved":false}"#);
    }

    #[test]
    fn test_form_override_replaces_saved_form() {
        let mut spec = RequestSpec::new("POST", "/x");
        spec.saved_body = Some(BodySpec {
            form: form(&[("old", "1")]),
            ..Default::default()
        });
        spec.form_fields = form(&[("new", "${v}")]);
        spec.vars.insert("v".into(), "2".into());

        let body = select_body(&spec).unwrap().unwrap();
        let text = String::from_utf8(body.bytes).unwrap();
        assert!(text.contains("name=\"new\"\r\n\r\n2\r\n"));
        assert!(!text.contains("name=\"old\""));
    }

    #[test]
    fn test_body_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"from":"file"}}"#).unwrap();

        let mut spec = RequestSpec::new("POST", "/x");
        spec.json_body = Some(format!("@{}", file.path().display()));
        let body = select_body(&spec).unwrap().unwrap();
        assert_eq!(body.bytes, br#"{"from":"file"}"#);
    }

    #[test]
    fn test_missing_body_file() {
        let mut spec = RequestSpec::new("POST", "/x");
        spec.raw_body = Some("@/definitely/not/here.txt".into());
        match select_body(&spec) {
            Err(ReqoError::FileRead { path, .. }) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.txt"))
            }
            other => panic!("expected FileRead, got {:?}", other),
        }
    }

    #[test]
    fn test_multipart_fields_and_upload() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("avatar.png");
        std::fs::write(&upload, b"PNGDATA").unwrap();

        let fields = form(&[
            ("name", "Ann"),
            ("avatar", &format!("@{}", upload.display())),
        ]);
        let (bytes, content_type) = encode_multipart(&fields).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(content_type.starts_with("multipart/form-data; boundary="));
        assert!(text.contains("name=\"name\"\r\n\r\nAnn\r\n"));
        assert!(text.contains("name=\"avatar\"; filename=\"avatar.png\""));
        assert!(text.contains("PNGDATA"));
        assert!(text.ends_with("--\r\n"));
    }

    #[test]
    fn test_multipart_is_deterministic() {
        let fields = form(&[("b", "2"), ("a", "1")]);
        assert_eq!(
            encode_multipart(&fields).unwrap(),
            encode_multipart(&fields).unwrap()
        );
    }

    #[test]
    fn test_boundary_avoids_content() {
        let fields = form(&[("trap", BOUNDARY_BASE)]);
        let (_, content_type) = encode_multipart(&fields).unwrap();
        assert!(content_type.ends_with(&format!("{}x", BOUNDARY_BASE)));
    }

    #[test]
    fn test_missing_upload() {
        let fields = form(&[("file", "@/no/such/upload.bin")]);
        assert!(matches!(
            encode_multipart(&fields),
            Err(ReqoError::FileRead { .. })
        ));
    }
}
