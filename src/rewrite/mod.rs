//! PromQL tenant rewriting.
//!
//! Dashboards scope their queries with a placeholder label value,
//! e.g. `up{orgtoken="__org_token__"}`. Before a query is forwarded the
//! placeholder is replaced with the tenant identifier of the caller.
//!
//! # Design Decisions
//! - The expression is parsed, not string-replaced, so only label matcher
//!   values are touched (a metric or label *named* like the placeholder is not)
//! - Output is the parser's canonical form, not the caller's original spelling
//! - Unparseable input is forwarded unchanged; the backend reports the error

use promql_parser::label::{Matcher, Matchers};
use promql_parser::parser::{self, Expr};
use thiserror::Error;

use crate::observability::metrics;

/// Placeholder value substituted with the tenant identifier.
pub const ORG_TOKEN_PLACEHOLDER: &str = "__org_token__";

/// Error produced when an expression cannot be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("invalid PromQL expression: {0}")]
    Parse(String),
}

/// What a rewrite did to an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// At least one placeholder was replaced.
    Rewritten,
    /// Parsed, but no placeholder was present.
    Unchanged,
    /// Not valid PromQL; the input is forwarded as-is.
    ParseError,
}

impl RewriteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rewritten => "rewritten",
            Self::Unchanged => "unchanged",
            Self::ParseError => "parse_error",
        }
    }
}

/// A successfully re-serialized expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub expression: String,
    pub substitutions: usize,
}

/// Rewrite `expression` for `tenant_id`, falling back to the input on error.
pub fn rewrite(expression: &str, tenant_id: &str) -> String {
    rewrite_with_outcome(expression, tenant_id).0
}

/// [`rewrite`], also reporting what happened.
pub fn rewrite_with_outcome(expression: &str, tenant_id: &str) -> (String, RewriteOutcome) {
    let (rewritten, outcome) = match try_rewrite(expression, tenant_id) {
        Ok(Rewrite {
            expression: rewritten,
            substitutions,
        }) => {
            tracing::debug!(src = %expression, dst = %rewritten, substitutions, "Rewrote query expression");
            let outcome = if substitutions == 0 {
                RewriteOutcome::Unchanged
            } else {
                RewriteOutcome::Rewritten
            };
            (rewritten, outcome)
        }
        Err(e) => {
            tracing::warn!(expr = %expression, error = %e, "Failed to parse query expression, forwarding unchanged");
            (expression.to_string(), RewriteOutcome::ParseError)
        }
    };
    metrics::record_rewrite(outcome.as_str());
    (rewritten, outcome)
}

/// Parse `expression`, substitute the placeholder and re-serialize.
pub fn try_rewrite(expression: &str, tenant_id: &str) -> Result<Rewrite, RewriteError> {
    let mut expr = parser::parse(expression).map_err(RewriteError::Parse)?;
    // Matcher values are printed back verbatim between quotes.
    let value = escape_label_value(tenant_id);
    let substitutions = substitute(&mut expr, &value);
    Ok(Rewrite {
        expression: expr.to_string(),
        substitutions,
    })
}

/// Escape a value for use inside a double-quoted PromQL string.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Replace placeholder matcher values anywhere in `expr`, returning how many.
fn substitute(expr: &mut Expr, value: &str) -> usize {
    match expr {
        Expr::VectorSelector(vs) => substitute_matchers(&mut vs.matchers, value),
        Expr::MatrixSelector(ms) => substitute_matchers(&mut ms.vs.matchers, value),
        Expr::Aggregate(agg) => {
            let param = agg
                .param
                .as_mut()
                .map_or(0, |param| substitute(param, value));
            substitute(&mut agg.expr, value) + param
        }
        Expr::Binary(bin) => substitute(&mut bin.lhs, value) + substitute(&mut bin.rhs, value),
        Expr::Unary(unary) => substitute(&mut unary.expr, value),
        Expr::Paren(paren) => substitute(&mut paren.expr, value),
        Expr::Subquery(sq) => substitute(&mut sq.expr, value),
        Expr::Call(call) => call
            .args
            .args
            .iter_mut()
            .map(|arg| substitute(arg, value))
            .sum(),
        // Literals carry no matchers.
        _ => 0,
    }
}

fn substitute_matchers(matchers: &mut Matchers, value: &str) -> usize {
    let groups = std::iter::once(&mut matchers.matchers).chain(matchers.or_matchers.iter_mut());
    let mut replaced = 0;
    for matcher in groups.flat_map(|group| group.iter_mut()) {
        if is_placeholder(matcher) {
            matcher.value = value.to_string();
            replaced += 1;
        }
    }
    replaced
}

fn is_placeholder(matcher: &Matcher) -> bool {
    matcher.value == ORG_TOKEN_PLACEHOLDER
}
