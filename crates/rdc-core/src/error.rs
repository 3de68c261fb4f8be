//! Error taxonomy (`spec.md` §7). Every variant carries whatever data a
//! caller needs to react without re-parsing a message string; nothing is
//! retried or swallowed inside this crate — see `spec.md` §5/§7.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// RD missing a required field (`oasPath`, `resourceKind`, a non-empty
    /// `identifiers` list). Unusable; surfaced, never retried.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// `pathItem`/`operation` not present in the OpenAPI document for the
    /// planned call.
    #[error("OpenAPI validation error: {0}")]
    OasValidation(#[from] rdc_openapi::OasError),

    /// A required path or query parameter couldn't be bound from the
    /// Managed Object's spec/status fields.
    #[error("missing required parameter {name} ({location}) for {method} {path}")]
    MissingParameter {
        name: String,
        location: ParamLocation,
        method: String,
        path: String,
    },

    /// Remote 404 on a path where 404 isn't a declared success status.
    #[error("not found (404) calling {method} {path}")]
    NotFound { method: String, path: String },

    /// Non-success HTTP status. Preserves the integer code for
    /// `has_status`/`has_status_err`.
    #[error("unexpected status {status} calling {method} {path}")]
    StatusError {
        status: u16,
        method: String,
        path: String,
        body: Option<String>,
    },

    /// A success status that disallows an empty body returned one anyway.
    #[error("empty body for status {status} calling {method} {path}, which requires a body")]
    EmptyBody {
        status: u16,
        method: String,
        path: String,
    },

    /// FindBy's response body wasn't a list, nor an object with a
    /// first array-valued field.
    #[error("unexpected response shape for FindBy at {method} {path}: expected an array or an object containing one")]
    UnexpectedResponseShape { method: String, path: String },

    /// Surfaced opaquely from an `AuthApplier`/transport layer, or from the
    /// external REST call itself.
    #[error("transport or auth error calling {method} {path}: {source}")]
    Transport {
        method: String,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The caller's cancellation token fired mid-call.
    #[error("call to {method} {path} was cancelled")]
    Cancelled { method: String, path: String },

    /// Update was attempted against a Managed Object whose `status` subtree
    /// is absent — nothing has ever been observed to update against.
    #[error("cannot update {kind}/{name}: no status subtree (resource was never observed)")]
    StatusNotFound { kind: String, name: String },

    /// Resolving the RestDefinition for a Managed Object failed outright
    /// (e.g. no RestDefinition installed for the kind). Fatal for that call,
    /// per `spec.md` §4.7 step 1.
    #[error("failed to resolve RestDefinition for {kind}: {message}")]
    DefinitionUnresolved { kind: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
}

impl std::fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamLocation::Path => write!(f, "path"),
            ParamLocation::Query => write!(f, "query"),
        }
    }
}

impl CoreError {
    /// True iff this is a `StatusError` carrying one of `codes`.
    pub fn has_status(&self, codes: &[u16]) -> bool {
        matches!(self, CoreError::StatusError { status, .. } if codes.contains(status))
    }
}

/// Free-function form for call sites that don't have a `CoreError` receiver
/// handy (`spec.md` §7: "`HasStatusErr(err, codes...)`").
pub fn has_status_err(err: &CoreError, codes: &[u16]) -> bool {
    err.has_status(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_status_matches_only_status_error() {
        let err = CoreError::StatusError {
            status: 409,
            method: "POST".into(),
            path: "/widgets".into(),
            body: None,
        };
        assert!(has_status_err(&err, &[409, 422]));
        assert!(!has_status_err(&err, &[500]));

        let not_found = CoreError::NotFound {
            method: "GET".into(),
            path: "/widgets/1".into(),
        };
        assert!(!has_status_err(&not_found, &[404]));
    }
}
