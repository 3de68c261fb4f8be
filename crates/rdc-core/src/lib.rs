//! Generic reconciliation core binding declarative custom resources to
//! external HTTP/REST APIs described by OpenAPI 3 documents.
//!
//! This crate is the runtime-agnostic half: it knows how to plan, execute,
//! and verify one call against one resolved `RestDefinition`. It never talks
//! to the surrounding orchestration platform directly — that's
//! `DefinitionGetter`/`StatusPersister`'s job, implemented elsewhere.

pub mod conditions;
pub mod contracts;
pub mod drift;
pub mod error;
pub mod executor;
pub mod findby;
pub mod handler;
pub mod planner;
pub mod value;

pub use conditions::{Condition, ConditionSet, ConditionType};
pub use contracts::{
    Action, AuthApplier, DefinitionGetter, ExternalObservation, ManagedObject, Metadata,
    ObjectRef, RestDefinition, StatusPersister, Verb,
};
pub use drift::{DriftKind, DriftOutcome, DriftReason};
pub use error::{has_status_err, CoreError, ParamLocation};
pub use executor::RestResponse;
pub use handler::ReconciliationHandler;
pub use planner::{CallPlan, PlanOutcome};
