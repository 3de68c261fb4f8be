//! The data model shared by every component: the Managed Object, the
//! RestDefinition, and the two external collaborators (`DefinitionGetter`,
//! `StatusPersister`) the Reconciliation Handler is wired against.
//!
//! Everything here is an inert value type or a narrow trait — no network
//! code, no global state — following the same "contracts are pure wiring"
//! convention as `modkit::contracts`.

use async_trait::async_trait;
use serde_json::Value;

use crate::conditions::ConditionSet;
use crate::error::CoreError;

/// Stable identity of a Managed Object: group/version/kind/namespace/name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// Controller-relevant metadata. The core never touches any field here
/// except reading `verbose` and, indirectly through the surrounding
/// runtime, the finalizer set (the core only ever signals readiness for
/// finalizer removal via the `Deleting` condition; it never mutates
/// `finalizers` itself).
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub finalizers: Vec<String>,
    pub annotations: std::collections::BTreeMap<String, String>,
    pub verbose: bool,
}

/// The Managed Object: an opaque tree with three named sub-trees. The core
/// only ever mutates `status` and (indirectly, by requesting it) the
/// finalizer set — never `spec` or non-finalizer `metadata`.
#[derive(Debug, Clone)]
pub struct ManagedObject {
    pub object_ref: ObjectRef,
    pub spec: Value,
    pub status: Value,
    pub metadata: Metadata,
}

impl ManagedObject {
    pub fn new(object_ref: ObjectRef, spec: Value) -> Self {
        Self {
            object_ref,
            spec,
            status: Value::Null,
            metadata: Metadata::default(),
        }
    }

    /// `status.conditions`, parsed into a `ConditionSet`. Absent or
    /// malformed status yields an empty set — Observe/Create/Update/Delete
    /// tolerate a missing status subtree throughout.
    pub fn conditions(&self) -> ConditionSet {
        self.status
            .get("conditions")
            .cloned()
            .map(ConditionSet::from_value)
            .unwrap_or_default()
    }

    pub fn set_conditions(&mut self, conditions: ConditionSet) {
        if !self.status.is_object() {
            self.status = Value::Object(serde_json::Map::new());
        }
        self.status["conditions"] = conditions.into_value();
    }
}

/// Abstract action bound to a concrete HTTP method + path by a `Verb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Get,
    FindBy,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Case-insensitive parse, matching `spec.md` §4.5 step 1.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(Action::Get),
            "findby" => Some(Action::FindBy),
            "create" => Some(Action::Create),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }
}

/// One `{action, method, path}` entry in a RestDefinition's verb table.
#[derive(Debug, Clone)]
pub struct Verb {
    pub action: Action,
    pub method: reqwest::Method,
    pub path: String,
}

/// A capability to install authentication onto an outbound request. Modeled
/// as a closed set of variants rather than an opaque closure so the core can
/// guarantee the "safe to invoke from multiple threads, never mutates the
/// request after invocation" contract in `spec.md` §5 without relying on the
/// caller's discipline.
#[derive(Debug, Clone)]
pub enum AuthApplier {
    None,
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl AuthApplier {
    pub fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthApplier::None => builder,
            AuthApplier::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
            AuthApplier::Bearer { token } => builder.bearer_auth(token),
        }
    }
}

/// Configuration artifact binding a Managed Object kind to an OpenAPI
/// document and a verb table. Supplied by an external collaborator
/// (`DefinitionGetter`) — this crate never resolves one on its own.
#[derive(Debug, Clone)]
pub struct RestDefinition {
    pub oas_path: String,
    pub resource_kind: String,
    /// Ordered, non-empty; each entry is a dotted path rooted in the
    /// response body.
    pub identifiers: Vec<String>,
    /// At most one entry per `Action`.
    pub verbs: Vec<Verb>,
    pub additional_status_fields: Vec<String>,
    pub auth_applier: Option<AuthApplier>,
}

impl RestDefinition {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.oas_path.is_empty() {
            return Err(CoreError::Configuration {
                message: "oasPath is required".to_string(),
            });
        }
        if self.resource_kind.is_empty() {
            return Err(CoreError::Configuration {
                message: "resourceKind is required".to_string(),
            });
        }
        if self.identifiers.is_empty() {
            return Err(CoreError::Configuration {
                message: "identifiers must be non-empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn verb(&self, action: Action) -> Option<&Verb> {
        self.verbs.iter().find(|v| v.action == action)
    }
}

/// Result of Observe: whether the external resource exists, and whether it
/// matches the declared spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
}

/// Resolves the RestDefinition (and authentication) for a given Managed
/// Object. Out of scope per `spec.md` §1 to *implement* — the core only
/// consumes this trait.
#[async_trait]
pub trait DefinitionGetter: Send + Sync {
    async fn get(&self, mo: &ManagedObject) -> Result<RestDefinition, CoreError>;
}

/// Persists a Managed Object's `status` subtree, returning the object as
/// stored (which the runtime may have further mutated, e.g. resourceVersion
/// bumps irrelevant to this core).
#[async_trait]
pub trait StatusPersister: Send + Sync {
    async fn update_status(
        &self,
        cancel: &tokio_util::sync::CancellationToken,
        mo: &ManagedObject,
    ) -> Result<ManagedObject, CoreError>;
}
