//! Stateless facade over a parsed OpenAPI 3 document.
//!
//! `rdc-openapi` answers exactly the questions the Call Planner and REST
//! Executor need — path-item/operation lookup, required-parameter sets,
//! request-body property names, accepted status codes, server resolution —
//! and binds path/query parameters into a concrete URL. It never talks to
//! the external REST API itself; that's `rdc-core`'s job.

pub mod binder;
pub mod error;
pub mod model;

pub use binder::bind_path;
pub use error::OasError;
pub use model::{OpenApiModel, RequiredParams};

pub use openapiv3::Operation;
pub use reqwest::Method;
