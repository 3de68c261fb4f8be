//! Path Binder (C1).
//!
//! Substitutes `{name}` placeholders in an OpenAPI path template with bound
//! path-parameter values, percent-encodes query parameters, and joins the
//! result onto a base (server) URL that may itself carry a path prefix.

use std::collections::BTreeMap;

use url::Url;

use crate::error::OasError;

/// Replace every `{name}` placeholder in `template` with the URL-safe
/// rendering of `path_params[name]`, but only the *first* occurrence of each
/// distinct name — later occurrences of an already-substituted name are left
/// untouched, matching the upstream behavior this crate preserves.
fn substitute_path_params(template: &str, path_params: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut seen: Vec<&str> = Vec::new();
    let mut rest = template;

    loop {
        let Some(open) = rest.find('{') else {
            out.push_str(rest);
            break;
        };
        let Some(close_rel) = rest[open..].find('}') else {
            out.push_str(rest);
            break;
        };
        let close = open + close_rel;
        let name = &rest[open + 1..close];

        out.push_str(&rest[..open]);

        if !seen.contains(&name) {
            if let Some(value) = path_params.get(name) {
                out.push_str(&urlencoding::encode(value));
                seen.push(name);
            } else {
                out.push_str(&rest[open..=close]);
            }
        } else {
            out.push_str(&rest[open..=close]);
        }

        rest = &rest[close + 1..];
    }

    out
}

fn build_query_string(query: &BTreeMap<String, String>) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Bind `path_params` and `query` into `path_template`, then join the result
/// onto `base_url`. Fails only if `base_url` itself is unparseable.
pub fn bind_path(
    base_url: &str,
    path_template: &str,
    path_params: &BTreeMap<String, String>,
    query: &BTreeMap<String, String>,
) -> Result<Url, OasError> {
    let bound_path = substitute_path_params(path_template, path_params);

    let base_trimmed = base_url.trim_end_matches('/');
    let path_with_slash = if bound_path.starts_with('/') {
        bound_path
    } else {
        format!("/{bound_path}")
    };

    let mut joined = format!("{base_trimmed}{path_with_slash}");
    let query_string = build_query_string(query);
    if !query_string.is_empty() {
        joined.push('?');
        joined.push_str(&query_string);
    }

    Url::parse(&joined).map_err(|_| OasError::InvalidBaseUrl {
        url: base_url.to_string(),
    })
}
