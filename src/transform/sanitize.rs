//! Removal of the tenant token field from backend responses.
//!
//! Prometheus echoes every label of a series back in query results, so the
//! label used for tenant scoping shows up as `"orgtoken":"<id>"` inside
//! `metric` objects. This is a lexical transform over JSON text, not a
//! document parse: it relies on the backend emitting the field as a quoted
//! name followed by a quoted word value.

use axum::http::{header, HeaderMap};
use regex::Regex;
use std::borrow::Cow;

/// Strips every occurrence of one field from JSON-shaped text.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    field: String,
    text: Regex,
    bytes: regex::bytes::Regex,
}

impl Sanitizer {
    /// Build a sanitizer for `field`.
    pub fn new(field: &str) -> Result<Self, regex::Error> {
        let pattern = field_pattern(field);
        Ok(Self {
            field: field.to_string(),
            text: Regex::new(&pattern)?,
            bytes: regex::bytes::Regex::new(&pattern)?,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Remove the field from `body`. Borrows when nothing matched.
    pub fn sanitize<'a>(&self, body: &'a str) -> Cow<'a, str> {
        self.text.replace_all(body, "")
    }

    /// Byte-level variant of [`Sanitizer::sanitize`] for raw response bodies.
    pub fn sanitize_bytes<'a>(&self, body: &'a [u8]) -> Cow<'a, [u8]> {
        self.bytes.replace_all(body, &b""[..])
    }
}

/// A member preceded by a comma takes that comma with it. The first member of
/// an object has none, so it takes the comma that follows instead.
fn field_pattern(field: &str) -> String {
    let member = format!(r#""{}"\s*:\s*"\w+""#, regex::escape(field));
    format!(r"\s*,\s*{member}|\s*{member}\s*,?")
}

/// Whether a response with these headers carries sanitizable text.
pub fn is_textual(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || mime.ends_with("+json") || mime.starts_with("text/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new("orgtoken").unwrap()
    }

    #[test]
    fn removes_first_member_with_trailing_comma() {
        let out = sanitizer().sanitize(r#"{"metric":{"orgtoken":"55","job":"Host"}}"#);
        assert_eq!(out, r#"{"metric":{"job":"Host"}}"#);
    }

    #[test]
    fn removes_only_member() {
        let out = sanitizer().sanitize(r#"{"metric":{"orgtoken":"1"},"values":[[1,"2"]]}"#);
        assert_eq!(out, r#"{"metric":{},"values":[[1,"2"]]}"#);
    }

    #[test]
    fn removes_trailing_member_with_leading_comma() {
        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[{"metric":{"__name__":"node_memory_MemTotal_bytes","instance":"192.168.1.121","job":"Host","orgtoken":"1"},"values":[[1586416665,"3605553152"],[1586420265,"3605553152"]]}]}}"#;
        let expected = r#"{"status":"success","data":{"resultType":"matrix","result":[{"metric":{"__name__":"node_memory_MemTotal_bytes","instance":"192.168.1.121","job":"Host"},"values":[[1586416665,"3605553152"],[1586420265,"3605553152"]]}]}}"#;
        assert_eq!(sanitizer().sanitize(body), expected);
    }

    #[test]
    fn handles_whitespace_and_repetition() {
        let body = "[{\"metric\": { \"orgtoken\" : \"a1\", \"job\": \"x\" }},\n {\"metric\": {\"job\": \"y\" ,\n \"orgtoken\": \"b2\"}}]";
        let out = sanitizer().sanitize(body);
        assert!(!out.contains("orgtoken"));

        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["metric"]["job"], "x");
        assert_eq!(parsed[1]["metric"]["job"], "y");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let s = sanitizer();
        for body in [
            r#"{"metric":{"orgtoken":"55","job":"Host"}}"#,
            r#"{"a":{"b":{"c":{"orgtoken":"9","orgtoken":"10"}}}}"#,
            r#"{"nothing":"here"}"#,
        ] {
            let once = s.sanitize(body).into_owned();
            assert_eq!(s.sanitize(&once), once);
        }
    }

    #[test]
    fn untouched_body_is_borrowed() {
        let body = r#"{"metric":{"job":"Host"}}"#;
        assert!(matches!(sanitizer().sanitize(body), Cow::Borrowed(_)));
    }

    #[test]
    fn other_fields_and_non_word_values_survive() {
        let s = sanitizer();
        assert_eq!(s.sanitize(r#"{"orgtokens":"1"}"#), r#"{"orgtokens":"1"}"#);
        assert_eq!(s.sanitize(r#"{"orgtoken":"a-b"}"#), r#"{"orgtoken":"a-b"}"#);
    }

    #[test]
    fn bytes_variant_matches_text_variant() {
        let body = r#"{"metric":{"orgtoken":"55","job":"Host"}}"#;
        let s = sanitizer();
        assert_eq!(&s.sanitize_bytes(body.as_bytes())[..], s.sanitize(body).as_bytes());
    }

    #[test]
    fn field_name_is_escaped() {
        let s = Sanitizer::new("org.token").unwrap();
        assert_eq!(s.sanitize(r#"{"orgXtoken":"1"}"#), r#"{"orgXtoken":"1"}"#);
        assert_eq!(s.sanitize(r#"{"org.token":"1"}"#), "{}");
    }

    #[test]
    fn textual_content_types() {
        let mut headers = HeaderMap::new();
        assert!(!is_textual(&headers));

        for (value, expected) in [
            ("application/json", true),
            ("application/json; charset=utf-8", true),
            ("application/vnd.api+json", true),
            ("text/plain; version=0.0.4", true),
            ("application/octet-stream", false),
            ("application/x-protobuf", false),
        ] {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
            assert_eq!(is_textual(&headers), expected, "{value}");
        }
    }
}
