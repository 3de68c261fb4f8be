//! Reconciliation Handler (C7): orchestrates the Call Planner through the
//! REST Executor/FindBy Resolver, drives the Drift Detector, and persists
//! status conditions. The only component that touches a Managed Object's
//! `status` subtree directly.

use chrono::{DateTime, Utc};
use rdc_openapi::OpenApiModel;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::conditions::ConditionType;
use crate::contracts::{Action, ExternalObservation, ManagedObject, RestDefinition, StatusPersister};
use crate::drift::{self, DriftOutcome};
use crate::error::CoreError;
use crate::executor::{self, RestResponse};
use crate::findby;
use crate::planner::{self, CallPlan, PlanOutcome};
use crate::value::{render_value, set_dotted, top_level_fields};

/// The handler's fixed dependencies for one reconciliation call. Built once
/// per (MO, RD) pair by the caller; the handler itself is stateless.
pub struct ReconciliationHandler<'a> {
    pub client: &'a reqwest::Client,
    pub model: &'a OpenApiModel,
    pub persister: &'a dyn StatusPersister,
}

impl<'a> ReconciliationHandler<'a> {
    pub fn new(
        client: &'a reqwest::Client,
        model: &'a OpenApiModel,
        persister: &'a dyn StatusPersister,
    ) -> Self {
        Self {
            client,
            model,
            persister,
        }
    }

    /// `Observe`: §4.7 steps 2-10.
    pub async fn observe(
        &self,
        cancel: &CancellationToken,
        rd: &RestDefinition,
        mo: &mut ManagedObject,
        now: DateTime<Utc>,
    ) -> Result<ExternalObservation, CoreError> {
        let spec_fields = top_level_fields(&mo.spec);
        let status_fields = top_level_fields(&mo.status);

        let response = if self.is_known(rd, &spec_fields, &status_fields) {
            match self
                .plan_and_execute(cancel, Action::Get, rd, mo, &spec_fields, &status_fields)
                .await
            {
                Ok(resp) => resp,
                Err(CoreError::NotFound { .. }) => {
                    return Ok(ExternalObservation::default());
                }
                Err(e) => return Err(e),
            }
        } else if rd.verb(Action::FindBy).is_none() {
            let conditions = mo.conditions();
            if !conditions.has(ConditionType::Creating) && !conditions.has(ConditionType::Available) {
                return Ok(ExternalObservation::default());
            }
            let mut conditions = conditions;
            conditions.set(
                ConditionType::Available,
                "no-findby",
                "assumed up-to-date (no FindBy)",
                None,
                now,
            );
            mo.set_conditions(conditions);
            self.persist(cancel, mo).await?;
            return Ok(ExternalObservation {
                resource_exists: true,
                resource_up_to_date: true,
            });
        } else {
            match self
                .plan_and_find_by(cancel, rd, mo, &spec_fields, &status_fields)
                .await
            {
                Ok(resp) => resp,
                Err(CoreError::NotFound { .. }) => {
                    return Ok(ExternalObservation::default());
                }
                Err(e) => return Err(e),
            }
        };

        let Some(body) = &response.body else {
            let mut conditions = mo.conditions();
            conditions.set(ConditionType::Available, "observed", "no body returned", None, now);
            mo.set_conditions(conditions);
            self.persist(cancel, mo).await?;
            return Ok(ExternalObservation {
                resource_exists: true,
                resource_up_to_date: true,
            });
        };

        project_status(mo, rd, body);

        let drift_outcome = drift::compare(&mo.spec, body);
        let mut conditions = mo.conditions();
        match drift_outcome {
            DriftOutcome::NotEqual(reason) => {
                conditions.set(
                    ConditionType::Unavailable,
                    "drift",
                    format!("drift detected at {}", reason.path),
                    Some(reason),
                    now,
                );
                mo.set_conditions(conditions);
                self.persist(cancel, mo).await?;
                Ok(ExternalObservation {
                    resource_exists: true,
                    resource_up_to_date: false,
                })
            }
            DriftOutcome::Equal => {
                conditions.set(ConditionType::Available, "observed", "spec matches remote", None, now);
                mo.set_conditions(conditions);
                self.persist(cancel, mo).await?;
                Ok(ExternalObservation {
                    resource_exists: true,
                    resource_up_to_date: true,
                })
            }
        }
    }

    /// `Create`.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        rd: &RestDefinition,
        mo: &mut ManagedObject,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if rd.verb(Action::Create).is_none() {
            return Ok(());
        }
        let spec_fields = top_level_fields(&mo.spec);
        let status_fields = top_level_fields(&mo.status);
        let response = self
            .plan_and_execute(cancel, Action::Create, rd, mo, &spec_fields, &status_fields)
            .await?;

        if let Some(body) = &response.body {
            project_status(mo, rd, body);
        }
        let mut conditions = mo.conditions();
        conditions.set(ConditionType::Creating, "created", "create call succeeded", None, now);
        mo.set_conditions(conditions);
        self.persist(cancel, mo).await?;
        Ok(())
    }

    /// `Update`.
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        rd: &RestDefinition,
        mo: &mut ManagedObject,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if !mo.status.is_object() {
            return Err(CoreError::StatusNotFound {
                kind: mo.object_ref.kind.clone(),
                name: mo.object_ref.name.clone(),
            });
        }

        let spec_fields = top_level_fields(&mo.spec);
        let status_fields = top_level_fields(&mo.status);
        let response = self
            .plan_and_execute(cancel, Action::Update, rd, mo, &spec_fields, &status_fields)
            .await?;

        if let Some(body) = &response.body {
            project_status(mo, rd, body);
        }
        // Reusing `Creating` here (rather than a dedicated `Updating`) is
        // deliberate: it marks the object as mid-reconvergence the same way
        // a fresh create does, and nothing downstream distinguishes the two.
        let mut conditions = mo.conditions();
        conditions.set(ConditionType::Creating, "updated", "update call succeeded", None, now);
        mo.set_conditions(conditions);
        self.persist(cancel, mo).await?;
        Ok(())
    }

    /// `Delete`.
    pub async fn delete(
        &self,
        cancel: &CancellationToken,
        rd: &RestDefinition,
        mo: &mut ManagedObject,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if !mo.status.is_object() {
            let mut conditions = mo.conditions();
            conditions.set(ConditionType::Deleting, "never-created", "object was never created externally", None, now);
            mo.set_conditions(conditions);
            self.persist(cancel, mo).await?;
            return Ok(());
        }

        if rd.verb(Action::Delete).is_none() {
            let mut conditions = mo.conditions();
            conditions.set(ConditionType::Deleting, "no-delete-verb", "no delete verb declared", None, now);
            mo.set_conditions(conditions);
            self.persist(cancel, mo).await?;
            return Ok(());
        }

        let spec_fields = top_level_fields(&mo.spec);
        let status_fields = top_level_fields(&mo.status);
        self.plan_and_execute(cancel, Action::Delete, rd, mo, &spec_fields, &status_fields)
            .await?;

        let mut conditions = mo.conditions();
        conditions.set(ConditionType::Deleting, "deleted", "delete call succeeded", None, now);
        mo.set_conditions(conditions);
        self.persist(cancel, mo).await?;
        Ok(())
    }

    /// `isKnown`: true iff a `get` verb exists and its required path/query
    /// parameters are all satisfiable from spec/status fields, purely by
    /// name lookup — no network call.
    fn is_known(
        &self,
        rd: &RestDefinition,
        spec_fields: &[(String, Value)],
        status_fields: &[(String, Value)],
    ) -> bool {
        let Some(verb) = rd.verb(Action::Get) else {
            return false;
        };
        let Some(op) = self.model.operation(&verb.path, &verb.method) else {
            return false;
        };
        let required = self.model.required_params(&verb.path, op);
        let available: std::collections::HashSet<&str> = spec_fields
            .iter()
            .chain(status_fields.iter())
            .map(|(k, _)| k.as_str())
            .collect();
        required
            .path_params
            .iter()
            .chain(required.query_params.iter())
            .all(|name| available.contains(name.as_str()))
    }

    async fn plan_and_execute(
        &self,
        cancel: &CancellationToken,
        action: Action,
        rd: &RestDefinition,
        mo: &ManagedObject,
        spec_fields: &[(String, Value)],
        status_fields: &[(String, Value)],
    ) -> Result<RestResponse, CoreError> {
        let (_verb, plan) = self.build_plan(action, rd, spec_fields, status_fields)?;
        executor::execute(
            self.client,
            self.model,
            cancel,
            &plan,
            rd.auth_applier.as_ref(),
            mo.metadata.verbose,
        )
        .await
    }

    async fn plan_and_find_by(
        &self,
        cancel: &CancellationToken,
        rd: &RestDefinition,
        mo: &ManagedObject,
        spec_fields: &[(String, Value)],
        status_fields: &[(String, Value)],
    ) -> Result<RestResponse, CoreError> {
        let (_verb, plan) = self.build_plan(Action::FindBy, rd, spec_fields, status_fields)?;
        findby::find_by(
            self.client,
            self.model,
            cancel,
            &plan,
            rd.auth_applier.as_ref(),
            mo.metadata.verbose,
            &rd.identifiers,
            &mo.spec,
        )
        .await
    }

    fn build_plan(
        &self,
        action: Action,
        rd: &RestDefinition,
        spec_fields: &[(String, Value)],
        status_fields: &[(String, Value)],
    ) -> Result<(crate::contracts::Verb, CallPlan), CoreError> {
        match planner::plan(self.model, action, rd, spec_fields, status_fields) {
            PlanOutcome::Planned { verb, plan } => Ok((verb, plan)),
            PlanOutcome::NoSuchAction => Err(CoreError::DefinitionUnresolved {
                kind: rd.resource_kind.clone(),
                message: format!("no {action:?} verb declared"),
            }),
        }
    }

    /// Writes the in-memory condition/status mutations out through the
    /// wired `StatusPersister`, then adopts whatever it hands back as the
    /// object's new state — the persister may have stamped a resource
    /// version or otherwise touched the object on write.
    async fn persist(&self, cancel: &CancellationToken, mo: &mut ManagedObject) -> Result<(), CoreError> {
        let stored = self.persister.update_status(cancel, mo).await?;
        *mo = stored;
        Ok(())
    }
}

/// Status projection (§4.8): for every `k` in `RD.identifiers ∪
/// RD.additionalStatusFields`, if `body[k]` exists, write its string
/// rendering into `MO.status[k]`. Pre-existing status keys outside that
/// union are left untouched.
fn project_status(mo: &mut ManagedObject, rd: &RestDefinition, body: &Value) {
    let fields = rd.identifiers.iter().chain(rd.additional_status_fields.iter());
    for key in fields {
        if let Some(v) = crate::value::get_dotted(body, key) {
            set_dotted(&mut mo.status, key, Value::String(render_value(v)));
        }
    }
}
