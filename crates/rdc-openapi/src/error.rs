use thiserror::Error;

/// Errors raised while loading or introspecting an OpenAPI document.
///
/// These are distinct from `rdc_core::CoreError`: `rdc-openapi` never talks
/// to the external REST API, only to the document describing it.
#[derive(Error, Debug)]
pub enum OasError {
    #[error("failed to fetch OpenAPI document from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("OpenAPI document at {url} is neither valid JSON nor YAML: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },

    #[error("path item not found: {path}")]
    NoPathItem { path: String },

    #[error("operation {method} {path} not found")]
    NoOperation { method: String, path: String },

    #[error("base URL is unparseable: {url}")]
    InvalidBaseUrl { url: String },

    #[error("operation {method} {path} declares no server and no document-level server is set")]
    NoServer { method: String, path: String },
}

/// The two document formats this crate accepts.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("json: {0}")]
    Json(#[source] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[source] serde_yaml::Error),
}
