//! OpenAPI Introspector (C2).
//!
//! A stateless facade over a parsed `openapiv3::OpenAPI` document. Owns only
//! the lookups the Call Planner and REST Executor need: path-item/operation
//! resolution, required-parameter extraction, request-body property flattening,
//! and accepted-status-code collection. Reference resolution (`$ref`) is done
//! by hand against `components` since `openapiv3` does not resolve eagerly.

use std::collections::HashSet;

use openapiv3::{
    Operation, Parameter, PathItem, ReferenceOr, RequestBody, Schema, SchemaKind, StatusCode as OasStatusCode, Type,
};
use reqwest::Method;

use crate::error::{OasError, ParseError};

pub struct OpenApiModel {
    doc: openapiv3::OpenAPI,
}

/// Required path and query parameter names for one operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequiredParams {
    pub path_params: HashSet<String>,
    pub query_params: HashSet<String>,
}

impl OpenApiModel {
    /// Parse a document from raw bytes, trying JSON first and falling back to YAML —
    /// OAS 3 documents are commonly published in either form and the oasPath URL's
    /// extension isn't a reliable signal.
    pub fn parse(bytes: &[u8]) -> Result<Self, OasError> {
        let doc = match serde_json::from_slice::<openapiv3::OpenAPI>(bytes) {
            Ok(doc) => doc,
            Err(_) => {
                let text = String::from_utf8_lossy(bytes);
                serde_yaml::from_str::<openapiv3::OpenAPI>(&text).map_err(|yaml_err| OasError::Parse {
                    url: String::new(),
                    source: ParseError::Yaml(yaml_err),
                })?
            }
        };
        Ok(Self { doc })
    }

    /// Fetch and parse the document at `url`.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Self, OasError> {
        tracing::debug!(url, "fetching OpenAPI document");
        let bytes = client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|source| OasError::Fetch {
                url: url.to_string(),
                source,
            })?
            .bytes()
            .await
            .map_err(|source| OasError::Fetch {
                url: url.to_string(),
                source,
            })?;
        Self::parse(&bytes).map_err(|e| match e {
            OasError::Parse { source, .. } => OasError::Parse {
                url: url.to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn path_item(&self, path: &str) -> Option<&PathItem> {
        self.doc
            .paths
            .paths
            .get(path)
            .and_then(|item| item.as_item())
    }

    pub fn operation<'a>(&'a self, path: &str, method: &Method) -> Option<&'a Operation> {
        let item = self.path_item(path)?;
        operation_for_method(item, method)
    }

    /// Required path and query parameters, merging path-item-level parameters
    /// with operation-level overrides (operation wins on (name, location) clash).
    pub fn required_params(&self, path: &str, op: &Operation) -> RequiredParams {
        let mut merged: Vec<&Parameter> = Vec::new();

        if let Some(item) = self.path_item(path) {
            for p in &item.parameters {
                if let Some(p) = self.resolve_parameter(p) {
                    merged.push(p);
                }
            }
        }
        for p in &op.parameters {
            if let Some(p) = self.resolve_parameter(p) {
                if let Some(existing) = merged
                    .iter()
                    .position(|m| param_key(m) == param_key(p))
                {
                    merged[existing] = p;
                } else {
                    merged.push(p);
                }
            }
        }

        let mut out = RequiredParams::default();
        for p in merged {
            match p {
                Parameter::Path { parameter_data, .. } if parameter_data.required => {
                    out.path_params.insert(parameter_data.name.clone());
                }
                Parameter::Query { parameter_data, .. } if parameter_data.required => {
                    out.query_params.insert(parameter_data.name.clone());
                }
                _ => {}
            }
        }
        out
    }

    fn resolve_parameter<'a>(&'a self, r: &'a ReferenceOr<Parameter>) -> Option<&'a Parameter> {
        match r {
            ReferenceOr::Item(p) => Some(p),
            ReferenceOr::Reference { reference } => {
                let name = component_name(reference, "parameters")?;
                self.doc
                    .components
                    .as_ref()?
                    .parameters
                    .get(name)
                    .and_then(|p| p.as_item())
            }
        }
    }

    fn resolve_schema<'a>(&'a self, r: &'a ReferenceOr<Schema>) -> Option<&'a Schema> {
        match r {
            ReferenceOr::Item(s) => Some(s),
            ReferenceOr::Reference { reference } => {
                let name = component_name(reference, "schemas")?;
                self.doc
                    .components
                    .as_ref()?
                    .schemas
                    .get(name)
                    .and_then(|s| s.as_item())
            }
        }
    }

    fn resolve_boxed_schema<'a>(&'a self, r: &'a ReferenceOr<Box<Schema>>) -> Option<&'a Schema> {
        match r {
            ReferenceOr::Item(s) => Some(s.as_ref()),
            ReferenceOr::Reference { reference } => {
                let name = component_name(reference, "schemas")?;
                self.doc
                    .components
                    .as_ref()?
                    .schemas
                    .get(name)
                    .and_then(|s| s.as_item())
            }
        }
    }

    fn resolve_request_body<'a>(&'a self, r: &'a ReferenceOr<RequestBody>) -> Option<&'a RequestBody> {
        match r {
            ReferenceOr::Item(b) => Some(b),
            ReferenceOr::Reference { reference } => {
                let name = component_name(reference, "requestBodies")?;
                self.doc
                    .components
                    .as_ref()?
                    .request_bodies
                    .get(name)
                    .and_then(|b| b.as_item())
            }
        }
    }

    /// Flattened set of `application/json` request-body property names:
    /// direct `properties`, the union of every `allOf` member's properties
    /// (recursively), and array `items` recursed into. Cycles are broken by
    /// remembering which named components have already been visited.
    pub fn body_property_names(&self, op: &Operation) -> HashSet<String> {
        let mut out = HashSet::new();
        let Some(body_ref) = &op.request_body else {
            return out;
        };
        let Some(body) = self.resolve_request_body(body_ref) else {
            return out;
        };
        let Some(media) = body.content.get("application/json") else {
            return out;
        };
        let Some(schema_ref) = &media.schema else {
            return out;
        };
        let Some(schema) = self.resolve_schema(schema_ref) else {
            return out;
        };

        let mut visited = HashSet::new();
        self.collect_property_names(schema, schema_ref, &mut out, &mut visited);
        out
    }

    fn collect_property_names(
        &self,
        schema: &Schema,
        schema_ref: &ReferenceOr<Schema>,
        out: &mut HashSet<String>,
        visited: &mut HashSet<String>,
    ) {
        if let ReferenceOr::Reference { reference } = schema_ref {
            if !visited.insert(reference.clone()) {
                return;
            }
        }

        match &schema.schema_kind {
            SchemaKind::Type(Type::Object(obj)) => {
                out.extend(obj.properties.keys().cloned());
            }
            SchemaKind::Type(Type::Array(arr)) => {
                if let Some(items) = &arr.items {
                    if let Some(item_schema) = self.resolve_boxed_schema(items) {
                        let as_ref_or = boxed_to_ref(items);
                        self.collect_property_names(item_schema, &as_ref_or, out, visited);
                    }
                }
            }
            SchemaKind::AllOf { all_of } => {
                for member in all_of {
                    if let Some(member_schema) = self.resolve_schema(member) {
                        self.collect_property_names(member_schema, member, out, visited);
                    }
                }
            }
            _ => {}
        }
    }

    /// All declared response codes in `[200, 300)`.
    pub fn success_codes(&self, op: &Operation) -> HashSet<u16> {
        op.responses
            .responses
            .keys()
            .filter_map(|code| match code {
                OasStatusCode::Code(c) => Some(*c),
                OasStatusCode::Range(_) => None,
            })
            .filter(|c| (200..300).contains(c))
            .collect()
    }

    /// Operation-level server override, falling back to the document's first
    /// top-level server.
    pub fn server_for(&self, op: &Operation) -> Option<String> {
        op.servers
            .first()
            .or_else(|| self.doc.servers.first())
            .map(|s| s.url.clone())
    }
}

fn boxed_to_ref(r: &ReferenceOr<Box<Schema>>) -> ReferenceOr<Schema> {
    match r {
        ReferenceOr::Item(s) => ReferenceOr::Item((**s).clone()),
        ReferenceOr::Reference { reference } => ReferenceOr::Reference {
            reference: reference.clone(),
        },
    }
}

fn component_name<'a>(reference: &'a str, kind: &str) -> Option<&'a str> {
    reference.strip_prefix(&format!("#/components/{kind}/"))
}

fn param_key(p: &Parameter) -> (&str, &'static str) {
    match p {
        Parameter::Query { parameter_data, .. } => (parameter_data.name.as_str(), "query"),
        Parameter::Path { parameter_data, .. } => (parameter_data.name.as_str(), "path"),
        Parameter::Header { parameter_data, .. } => (parameter_data.name.as_str(), "header"),
        Parameter::Cookie { parameter_data, .. } => (parameter_data.name.as_str(), "cookie"),
    }
}

fn operation_for_method<'a>(item: &'a PathItem, method: &Method) -> Option<&'a Operation> {
    match method.as_str() {
        "GET" => item.get.as_ref(),
        "PUT" => item.put.as_ref(),
        "POST" => item.post.as_ref(),
        "DELETE" => item.delete.as_ref(),
        "OPTIONS" => item.options.as_ref(),
        "HEAD" => item.head.as_ref(),
        "PATCH" => item.patch.as_ref(),
        "TRACE" => item.trace.as_ref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
    {
      "openapi": "3.0.0",
      "info": {"title": "Widgets", "version": "1"},
      "servers": [{"url": "https://api.example.com"}],
      "paths": {
        "/widgets/{id}": {
          "get": {
            "operationId": "getWidget",
            "parameters": [
              {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}
            ],
            "responses": {
              "200": {"description": "ok"},
              "404": {"description": "missing"}
            }
          }
        },
        "/widgets": {
          "post": {
            "operationId": "createWidget",
            "requestBody": {
              "content": {
                "application/json": {
                  "schema": {
                    "type": "object",
                    "properties": {
                      "name": {"type": "string"},
                      "description": {"type": "string"}
                    }
                  }
                }
              }
            },
            "responses": {"201": {"description": "created"}}
          },
          "get": {
            "operationId": "listWidgets",
            "parameters": [
              {"name": "tag", "in": "query", "required": false, "schema": {"type": "string"}}
            ],
            "responses": {"200": {"description": "ok"}}
          }
        }
      }
    }
    "#;

    fn model() -> OpenApiModel {
        OpenApiModel::parse(DOC.as_bytes()).unwrap()
    }

    #[test]
    fn path_item_and_operation_lookup() {
        let m = model();
        assert!(m.path_item("/widgets/{id}").is_some());
        assert!(m.path_item("/nope").is_none());
        let op = m.operation("/widgets/{id}", &Method::GET).unwrap();
        assert_eq!(op.operation_id.as_deref(), Some("getWidget"));
        assert!(m.operation("/widgets/{id}", &Method::POST).is_none());
    }

    #[test]
    fn required_params_only_includes_required_true() {
        let m = model();
        let op = m.operation("/widgets/{id}", &Method::GET).unwrap();
        let req = m.required_params("/widgets/{id}", op);
        assert!(req.path_params.contains("id"));
        assert!(req.query_params.is_empty());

        let list_op = m.operation("/widgets", &Method::GET).unwrap();
        let req = m.required_params("/widgets", list_op);
        assert!(req.query_params.is_empty(), "tag is not required");
    }

    #[test]
    fn body_property_names_flattens_object_properties() {
        let m = model();
        let op = m.operation("/widgets", &Method::POST).unwrap();
        let props = m.body_property_names(op);
        assert_eq!(
            props,
            ["name", "description"].into_iter().map(String::from).collect()
        );
    }

    #[test]
    fn success_codes_are_2xx_only() {
        let m = model();
        let op = m.operation("/widgets/{id}", &Method::GET).unwrap();
        let codes = m.success_codes(op);
        assert_eq!(codes, [200].into_iter().collect());
    }

    #[test]
    fn server_for_falls_back_to_document_server() {
        let m = model();
        let op = m.operation("/widgets/{id}", &Method::GET).unwrap();
        assert_eq!(m.server_for(op).as_deref(), Some("https://api.example.com"));
    }
}
