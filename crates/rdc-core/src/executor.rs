//! REST Executor (C3): perform one validated HTTP call against a `CallPlan`,
//! decode its body, and classify the resulting status.
//!
//! No retries, no timeouts, no backoff live here — a single attempt per call,
//! cancellable via the caller's token. Retry policy belongs to whatever sits
//! above the Reconciliation Handler.

use rdc_openapi::OpenApiModel;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::contracts::AuthApplier;
use crate::error::{CoreError, ParamLocation};
use crate::planner::CallPlan;

/// Status codes that never carry a body even on success.
const EMPTY_BODY_STATUSES: [u16; 2] = [204, 304];

/// Statuses that signal the call hasn't finished yet, relevant to callers
/// that poll `Get` while a remote create/delete is asynchronous.
const PENDING_STATUSES: [u16; 3] = [100, 102, 202];

#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl RestResponse {
    pub fn is_pending(&self) -> bool {
        PENDING_STATUSES.contains(&self.status)
    }
}

/// Execute `plan` against `model`'s document. `model` is consulted again here
/// (not just at planning time) because the Executor, not the Planner, is the
/// authority for path/method/parameter validation and the declared success
/// codes.
pub async fn execute(
    client: &reqwest::Client,
    model: &OpenApiModel,
    cancel: &CancellationToken,
    plan: &CallPlan,
    auth: Option<&AuthApplier>,
    verbose: bool,
) -> Result<RestResponse, CoreError> {
    if model.path_item(&plan.path).is_none() {
        return Err(rdc_openapi::OasError::NoPathItem {
            path: plan.path.clone(),
        }
        .into());
    }
    let Some(op) = model.operation(&plan.path, &plan.method) else {
        return Err(rdc_openapi::OasError::NoOperation {
            method: plan.method.to_string(),
            path: plan.path.clone(),
        }
        .into());
    };

    let required = model.required_params(&plan.path, op);
    for name in &required.path_params {
        if !plan.path_params.contains_key(name) {
            return Err(CoreError::MissingParameter {
                name: name.clone(),
                location: ParamLocation::Path,
                method: plan.method.to_string(),
                path: plan.path.clone(),
            });
        }
    }
    for name in &required.query_params {
        if !plan.query.contains_key(name) {
            return Err(CoreError::MissingParameter {
                name: name.clone(),
                location: ParamLocation::Query,
                method: plan.method.to_string(),
                path: plan.path.clone(),
            });
        }
    }

    let Some(server) = model.server_for(op) else {
        return Err(rdc_openapi::OasError::NoServer {
            method: plan.method.to_string(),
            path: plan.path.clone(),
        }
        .into());
    };

    let url = rdc_openapi::bind_path(&server, &plan.path, &plan.path_params, &plan.query)?;

    let mut builder = client.request(plan.method.clone(), url.clone());
    if let Some(body) = &plan.body {
        if !body.is_empty() {
            builder = builder.json(&Value::Object(body.clone()));
        }
    }
    if let Some(auth) = auth {
        builder = auth.apply(builder);
    }

    if verbose {
        tracing::debug!(method = %plan.method, url = %url, body = ?plan.body, "dispatching REST call");
    }

    let span = tracing::span!(
        tracing::Level::INFO,
        "outgoing_http",
        http.method = %plan.method,
        http.url = %url,
        otel.kind = "client",
    );
    let _g = span.enter();

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(CoreError::Cancelled {
                method: plan.method.to_string(),
                path: plan.path.clone(),
            });
        }
        res = builder.send() => res.map_err(|source| CoreError::Transport {
            method: plan.method.to_string(),
            path: plan.path.clone(),
            source,
        })?,
    };

    let status = response.status().as_u16();
    span.record("http.status_code", status);
    let success_codes = model.success_codes(op);

    let bytes = response
        .bytes()
        .await
        .map_err(|source| CoreError::Transport {
            method: plan.method.to_string(),
            path: plan.path.clone(),
            source,
        })?;

    if verbose {
        tracing::debug!(status, body = %String::from_utf8_lossy(&bytes), "received REST response");
    }

    if success_codes.contains(&status) {
        if EMPTY_BODY_STATUSES.contains(&status) && bytes.is_empty() {
            return Ok(RestResponse { status, body: None });
        }
        if bytes.is_empty() {
            return Err(CoreError::EmptyBody {
                status,
                method: plan.method.to_string(),
                path: plan.path.clone(),
            });
        }

        let body: Value =
            serde_json::from_slice(&bytes).map_err(|_| CoreError::UnexpectedResponseShape {
                method: plan.method.to_string(),
                path: plan.path.clone(),
            })?;
        return Ok(RestResponse {
            status,
            body: Some(body),
        });
    }

    if status == 404 {
        return Err(CoreError::NotFound {
            method: plan.method.to_string(),
            path: plan.path.clone(),
        });
    }

    Err(CoreError::StatusError {
        status,
        method: plan.method.to_string(),
        path: plan.path.clone(),
        body: if bytes.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&bytes).into_owned())
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::CallPlan;
    use httpmock::MockServer;
    use reqwest::Method;
    use std::collections::BTreeMap;

    fn model_for(server_url: &str) -> OpenApiModel {
        let doc = format!(
            r#"{{
              "openapi": "3.0.0",
              "info": {{"title": "Widgets", "version": "1"}},
              "servers": [{{"url": "{server_url}"}}],
              "paths": {{
                "/widgets/{{id}}": {{
                  "get": {{
                    "parameters": [{{"name": "id", "in": "path", "required": true, "schema": {{"type": "string"}}}}],
                    "responses": {{"200": {{"description": "ok"}}, "404": {{"description": "missing"}}}}
                  }},
                  "delete": {{
                    "parameters": [{{"name": "id", "in": "path", "required": true, "schema": {{"type": "string"}}}}],
                    "responses": {{"204": {{"description": "deleted"}}}}
                  }}
                }}
              }}
            }}"#
        );
        OpenApiModel::parse(doc.as_bytes()).unwrap()
    }

    fn plan_for(path: &str, method: Method, id: &str) -> CallPlan {
        let mut path_params = BTreeMap::new();
        path_params.insert("id".to_string(), id.to_string());
        CallPlan {
            method,
            path: path.to_string(),
            path_params,
            query: BTreeMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn success_decodes_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/widgets/W-1");
            then.status(200).json_body(serde_json::json!({"id": "W-1"}));
        });

        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        let plan = plan_for("/widgets/{id}", Method::GET, "W-1");

        let resp = execute(&client, &model, &cancel, &plan, None, false)
            .await
            .unwrap();
        mock.assert();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body.unwrap()["id"], "W-1");
    }

    #[tokio::test]
    async fn not_found_maps_to_not_found_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/widgets/missing");
            then.status(404);
        });

        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        let plan = plan_for("/widgets/{id}", Method::GET, "missing");

        let err = execute(&client, &model, &cancel, &plan, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn no_content_status_yields_empty_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::DELETE).path("/widgets/W-1");
            then.status(204);
        });

        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        let plan = plan_for("/widgets/{id}", Method::DELETE, "W-1");

        let resp = execute(&client, &model, &cancel, &plan, None, false)
            .await
            .unwrap();
        assert_eq!(resp.status, 204);
        assert!(resp.body.is_none());
    }

    #[tokio::test]
    async fn no_content_status_with_body_still_decodes_it() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::DELETE).path("/widgets/W-1");
            then.status(204).json_body(serde_json::json!({"id": "W-1"}));
        });

        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        let plan = plan_for("/widgets/{id}", Method::DELETE, "W-1");

        let resp = execute(&client, &model, &cancel, &plan, None, false)
            .await
            .unwrap();
        assert_eq!(resp.status, 204);
        assert_eq!(resp.body.unwrap()["id"], "W-1");
    }

    #[tokio::test]
    async fn missing_path_param_fails_before_any_call() {
        let server = MockServer::start();
        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        let plan = CallPlan {
            method: Method::GET,
            path: "/widgets/{id}".to_string(),
            path_params: BTreeMap::new(),
            query: BTreeMap::new(),
            body: None,
        };

        let err = execute(&client, &model, &cancel, &plan, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingParameter { .. }));
    }

    #[tokio::test]
    async fn already_cancelled_token_short_circuits() {
        let server = MockServer::start();
        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let plan = plan_for("/widgets/{id}", Method::GET, "W-1");

        let err = execute(&client, &model, &cancel, &plan, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn server_error_maps_to_status_error_with_code() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/widgets/W-1");
            then.status(500).body("boom");
        });

        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        let plan = plan_for("/widgets/{id}", Method::GET, "W-1");

        let err = execute(&client, &model, &cancel, &plan, None, false)
            .await
            .unwrap_err();
        assert!(err.has_status(&[500]));
    }
}
