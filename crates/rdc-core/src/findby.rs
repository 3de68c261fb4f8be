//! FindBy Resolver (C4): list-and-match atop the REST Executor, for locating
//! a remote object whose identifier hasn't been observed yet.

use rdc_openapi::OpenApiModel;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::contracts::AuthApplier;
use crate::error::CoreError;
use crate::executor::{self, RestResponse};
use crate::planner::CallPlan;
use crate::value::{get_dotted, render_value};

/// Coerce a decoded response body into a lookup list: the body itself if
/// already an array, or its first array-valued field if an object.
fn coerce_to_list(body: &Value) -> Option<&Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.values().find_map(|v| v.as_array()),
        _ => None,
    }
}

/// Execute `plan` (already bound for the `findby` verb) and scan the decoded
/// list for the first element whose identifier fields all match `spec_fields`.
/// Iteration order is RD identifier order times array order; the first match
/// wins.
pub async fn find_by(
    client: &reqwest::Client,
    model: &OpenApiModel,
    cancel: &CancellationToken,
    plan: &CallPlan,
    auth: Option<&AuthApplier>,
    verbose: bool,
    identifiers: &[String],
    spec_fields: &Value,
) -> Result<RestResponse, CoreError> {
    let response = executor::execute(client, model, cancel, plan, auth, verbose).await?;

    let Some(body) = &response.body else {
        return Err(CoreError::UnexpectedResponseShape {
            method: plan.method.to_string(),
            path: plan.path.clone(),
        });
    };

    let Some(list) = coerce_to_list(body) else {
        return Err(CoreError::UnexpectedResponseShape {
            method: plan.method.to_string(),
            path: plan.path.clone(),
        });
    };

    for item in list {
        let Value::Object(_) = item else { continue };
        if identifiers.iter().all(|id| matches_identifier(item, id, spec_fields)) {
            return Ok(RestResponse {
                status: response.status,
                body: Some(item.clone()),
            });
        }
    }

    Err(CoreError::NotFound {
        method: plan.method.to_string(),
        path: plan.path.clone(),
    })
}

fn matches_identifier(item: &Value, id_path: &str, spec_fields: &Value) -> bool {
    let Some(item_value) = get_dotted(item, id_path) else {
        return false;
    };
    let Some(spec_value) = get_dotted(spec_fields, id_path) else {
        return false;
    };
    render_value(item_value) == render_value(spec_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use reqwest::Method;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn model_for(server_url: &str) -> OpenApiModel {
        let doc = format!(
            r#"{{
              "openapi": "3.0.0",
              "info": {{"title": "Widgets", "version": "1"}},
              "servers": [{{"url": "{server_url}"}}],
              "paths": {{
                "/widgets": {{
                  "get": {{
                    "responses": {{"200": {{"description": "ok"}}}}
                  }}
                }}
              }}
            }}"#
        );
        OpenApiModel::parse(doc.as_bytes()).unwrap()
    }

    fn list_plan() -> CallPlan {
        CallPlan {
            method: Method::GET,
            path: "/widgets".to_string(),
            path_params: BTreeMap::new(),
            query: BTreeMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn finds_matching_item_by_identifier() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/widgets");
            then.status(200).json_body(json!([
                {"name": "w1", "id": "W-1"},
                {"name": "w2", "id": "W-2"},
            ]));
        });

        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        let spec = json!({"name": "w2"});

        let resp = find_by(
            &client,
            &model,
            &cancel,
            &list_plan(),
            None,
            false,
            &["name".to_string()],
            &spec,
        )
        .await
        .unwrap();

        assert_eq!(resp.body.unwrap()["id"], "W-2");
    }

    #[tokio::test]
    async fn no_match_yields_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/widgets");
            then.status(200).json_body(json!([{"name": "w1"}]));
        });

        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        let spec = json!({"name": "nonexistent"});

        let err = find_by(
            &client,
            &model,
            &cancel,
            &list_plan(),
            None,
            false,
            &["name".to_string()],
            &spec,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn object_body_with_array_field_is_coerced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/widgets");
            then.status(200).json_body(json!({
                "items": [{"name": "w1"}],
                "total": 1,
            }));
        });

        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        let spec = json!({"name": "w1"});

        let resp = find_by(
            &client,
            &model,
            &cancel,
            &list_plan(),
            None,
            false,
            &["name".to_string()],
            &spec,
        )
        .await
        .unwrap();
        assert_eq!(resp.body.unwrap()["name"], "w1");
    }

    #[tokio::test]
    async fn scalar_body_is_unexpected_shape() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/widgets");
            then.status(200).json_body(json!("not a list"));
        });

        let model = model_for(&server.base_url());
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        let spec = json!({"name": "w1"});

        let err = find_by(
            &client,
            &model,
            &cancel,
            &list_plan(),
            None,
            false,
            &["name".to_string()],
            &spec,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedResponseShape { .. }));
    }
}
