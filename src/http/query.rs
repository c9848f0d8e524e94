//! Query string handling for forwarded requests.
//!
//! Grafana sends the PromQL expression either as `query` (instant and range
//! queries) or as `match[]` (series and label lookups). Exactly one of them is
//! rewritten per request: `query` wins whenever it is present and non-empty.

use url::form_urlencoded;

use crate::rewrite;

/// Parameter holding the expression for query endpoints.
pub const PRIMARY_PARAM: &str = "query";

/// Parameter holding the selector for series/label endpoints.
pub const SECONDARY_PARAM: &str = "match[]";

/// Rewrite the tenant placeholder in a raw query string.
///
/// Returns the raw input untouched when neither parameter is present.
/// Otherwise the string is re-encoded with the selected parameter replaced by
/// its rewritten value. Later duplicates of that parameter are dropped; all
/// other parameters keep their order and values.
pub fn rewrite_query_string(raw: Option<&str>, tenant_id: &str) -> String {
    let raw = raw.unwrap_or_default();
    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect();

    let Some((key, expression)) = select_expression(&pairs) else {
        return raw.to_string();
    };

    let rewritten = rewrite::rewrite(&expression, tenant_id);

    let mut replaced = false;
    pairs.retain_mut(|(k, v)| {
        if k != key {
            return true;
        }
        if replaced {
            return false;
        }
        replaced = true;
        *v = rewritten.clone();
        true
    });

    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish()
}

/// First non-empty expression parameter, by precedence.
fn select_expression(pairs: &[(String, String)]) -> Option<(&'static str, String)> {
    [PRIMARY_PARAM, SECONDARY_PARAM].into_iter().find_map(|key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .filter(|(_, v)| !v.is_empty())
            .map(|(_, v)| (key, v.clone()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(qs: &str) -> Vec<(String, String)> {
        form_urlencoded::parse(qs.as_bytes()).into_owned().collect()
    }

    #[test]
    fn rewrites_query_param() {
        let raw = "query=up%7Borgtoken%3D%22__org_token__%22%7D&time=1586416665";
        let out = decode(&rewrite_query_string(Some(raw), "abc123"));
        assert_eq!(
            out,
            vec![
                ("query".to_string(), r#"up{orgtoken="abc123"}"#.to_string()),
                ("time".to_string(), "1586416665".to_string()),
            ]
        );
    }

    #[test]
    fn falls_back_to_match() {
        let raw = "match%5B%5D=up%7Borgtoken%3D%22__org_token__%22%7D&start=1&end=2";
        let out = decode(&rewrite_query_string(Some(raw), "9"));
        assert_eq!(out[0], ("match[]".to_string(), r#"up{orgtoken="9"}"#.to_string()));
        assert_eq!(out[1], ("start".to_string(), "1".to_string()));
        assert_eq!(out[2], ("end".to_string(), "2".to_string()));
    }

    #[test]
    fn query_takes_precedence_over_match() {
        let raw = "match%5B%5D=a%7Borgtoken%3D%22__org_token__%22%7D&query=b%7Borgtoken%3D%22__org_token__%22%7D";
        let out = decode(&rewrite_query_string(Some(raw), "t"));
        assert_eq!(out[0].1, r#"a{orgtoken="__org_token__"}"#);
        assert_eq!(out[1].1, r#"b{orgtoken="t"}"#);
    }

    #[test]
    fn empty_query_falls_back_to_match() {
        let raw = "query=&match%5B%5D=up%7Borgtoken%3D%22__org_token__%22%7D";
        let out = decode(&rewrite_query_string(Some(raw), "t"));
        assert_eq!(out[0], ("query".to_string(), String::new()));
        assert_eq!(out[1].1, r#"up{orgtoken="t"}"#);
    }

    #[test]
    fn duplicate_selected_param_collapses() {
        let raw = "query=up%7Borgtoken%3D%22__org_token__%22%7D&query=other";
        let out = decode(&rewrite_query_string(Some(raw), "t"));
        assert_eq!(out, vec![("query".to_string(), r#"up{orgtoken="t"}"#.to_string())]);
    }

    #[test]
    fn passthrough_without_expression() {
        assert_eq!(rewrite_query_string(Some("start=1&end=2"), "t"), "start=1&end=2");
        assert_eq!(rewrite_query_string(None, "t"), "");
    }

    #[test]
    fn malformed_expression_is_forwarded() {
        let raw = "query=up%7Borgtoken%3D%22__org_token__%22";
        let out = decode(&rewrite_query_string(Some(raw), "t"));
        assert_eq!(out[0].1, r#"up{orgtoken="__org_token__""#);
    }
}
