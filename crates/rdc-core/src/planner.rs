//! Call Planner (C5): for an `(action, RestDefinition, spec, status)` tuple,
//! pick the verb and bind declared fields into path/query/body.

use std::collections::BTreeMap;

use rdc_openapi::OpenApiModel;
use reqwest::Method;
use serde_json::Value;

use crate::contracts::{Action, RestDefinition, Verb};
use crate::value::render_value;

/// An immutable, fully-bound HTTP call description. Every required path
/// parameter of the target operation is present in `path_params`; every
/// required query parameter is present in `query`; `body` keys, if any, are
/// a subset of the operation's declared request-body properties.
#[derive(Debug, Clone)]
pub struct CallPlan {
    pub method: Method,
    pub path: String,
    pub path_params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<serde_json::Map<String, Value>>,
}

/// Result of planning: either a verb was found and a plan was built, or the
/// RestDefinition simply has no entry for the requested action — a
/// distinguishable outcome, not an error (`spec.md` §4.5 step 1).
#[derive(Debug, Clone)]
pub enum PlanOutcome {
    Planned { verb: Verb, plan: CallPlan },
    NoSuchAction,
}

enum Slot {
    Path,
    Query,
    Body,
}

/// Plan a call for `action` against `rd`, binding `spec_fields` then
/// `status_fields` (in that order) into whichever slot each declared field
/// name belongs to.
pub fn plan(
    model: &OpenApiModel,
    action: Action,
    rd: &RestDefinition,
    spec_fields: &[(String, Value)],
    status_fields: &[(String, Value)],
) -> PlanOutcome {
    let Some(verb) = rd.verb(action) else {
        return PlanOutcome::NoSuchAction;
    };

    let Some(op) = model.operation(&verb.path, &verb.method) else {
        // No operation in the document for this verb's method+path: there is
        // nothing meaningful to bind against. The caller (REST Executor)
        // re-derives this as an `OasValidation` error when it re-resolves
        // the operation itself, so planning still returns a plan shaped by
        // an empty parameter/body universe rather than failing early here —
        // keeping validation concentrated at the point that actually talks
        // to the document's authority, the Executor.
        return PlanOutcome::Planned {
            verb: verb.clone(),
            plan: CallPlan {
                method: verb.method.clone(),
                path: verb.path.clone(),
                path_params: BTreeMap::new(),
                query: BTreeMap::new(),
                body: None,
            },
        };
    };

    let required = model.required_params(&verb.path, op);
    let body_props = if matches!(verb.method, Method::POST | Method::PUT | Method::PATCH) {
        model.body_property_names(op)
    } else {
        Default::default()
    };

    let mut path_params: BTreeMap<String, String> = BTreeMap::new();
    let mut query: BTreeMap<String, String> = BTreeMap::new();
    let mut body: serde_json::Map<String, Value> = serde_json::Map::new();

    for (k, v) in spec_fields.iter().chain(status_fields.iter()) {
        let Some(slot) = classify(k, &required, &body_props) else {
            continue;
        };
        let rendered = render_value(v);

        match slot {
            Slot::Path => bind_scalar(&mut path_params, k, rendered),
            Slot::Query => bind_scalar(&mut query, k, rendered),
            Slot::Body => bind_body(&mut body, k, v, &rendered),
        }
    }

    PlanOutcome::Planned {
        verb: verb.clone(),
        plan: CallPlan {
            method: verb.method.clone(),
            path: verb.path.clone(),
            path_params,
            query,
            body: if body.is_empty() { None } else { Some(body) },
        },
    }
}

fn classify(
    k: &str,
    required: &rdc_openapi::RequiredParams,
    body_props: &std::collections::HashSet<String>,
) -> Option<Slot> {
    if required.path_params.contains(k) {
        Some(Slot::Path)
    } else if required.query_params.contains(k) {
        Some(Slot::Query)
    } else if body_props.contains(k) {
        Some(Slot::Body)
    } else {
        None
    }
}

/// Assign into a path/query slot, honoring the empty-string rule: a new
/// value that renders to `""` never overwrites an already-bound non-empty
/// value (`spec.md` §4.5 step 4). Any other candidate overwrites freely —
/// this is what lets a later `statusFields` entry enrich a slot `specFields`
/// left blank, and what lets `specFields` win when both define the field.
fn bind_scalar(map: &mut BTreeMap<String, String>, k: &str, rendered: String) {
    if rendered.is_empty() {
        if let Some(existing) = map.get(k) {
            if !existing.is_empty() {
                return;
            }
        }
    }
    map.insert(k.to_string(), rendered);
}

fn bind_body(map: &mut serde_json::Map<String, Value>, k: &str, v: &Value, rendered: &str) {
    if rendered.is_empty() && !matches!(v, Value::Object(_) | Value::Array(_)) {
        if let Some(existing) = map.get(k) {
            if render_value(existing) != "" {
                return;
            }
        }
    }
    map.insert(k.to_string(), v.clone());
}
