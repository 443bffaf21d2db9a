//! Default handlers for non-tool MCP entities (prompts, resources, apps) and
//! the JSON-schema-backed elicitation request builder.

use rmcp::model::{
    CreateElicitationRequestParam, CreateElicitationResult, ElicitationSchema, GetPromptResult,
    JsonObject, PromptMessage, PromptMessageRole, ReadResourceResult, ResourceContents,
};
use rmcp::service::Peer;
use rmcp::{ErrorData as McpError, RoleServer};
use serde_json::json;

/// Default prompt result: a single user message carrying the prompt
/// description. Placeholder for prompts declared via MCP proto options;
/// replace by registering your own handler.
pub fn default_prompt_result(description: &str) -> GetPromptResult {
    GetPromptResult {
        description: Some(description.to_string()),
        messages: vec![PromptMessage::new_text(
            PromptMessageRole::User,
            description.to_string(),
        )],
    }
}

/// Default resource result: an empty JSON object at the requested URI.
pub fn default_resource_result(uri: &str) -> ReadResourceResult {
    ReadResourceResult {
        contents: vec![ResourceContents::text("{}", uri)],
    }
}

/// Canonical `ui://` resource URI for a service app.
pub fn app_resource_uri(service_name: &str) -> String {
    format!("ui://{}/app.html", service_name.to_lowercase())
}

/// Minimal HTML page for an MCP App placeholder.
pub fn default_app_html(app_name: &str, version: &str, description: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{app_name}</title>
<style>
  body {{ font-family: system-ui, sans-serif; max-width: 600px; margin: 40px auto; padding: 0 20px; color: #333; }}
  h1 {{ font-size: 1.5rem; }} p {{ color: #666; }} .version {{ font-size: 0.85rem; color: #999; }}
</style>
</head>
<body>
  <h1>{app_name}</h1>
  <p class="version">v{version}</p>
  <p>{description}</p>
  <p>This is a generated MCP App placeholder. Replace this resource with your own UI.</p>
</body>
</html>"#
    )
}

/// Resource result serving the default app HTML page.
pub fn app_resource_result(
    uri: &str,
    app_name: &str,
    version: &str,
    description: &str,
) -> ReadResourceResult {
    ReadResourceResult {
        contents: vec![ResourceContents::TextResourceContents {
            uri: uri.to_string(),
            mime_type: Some("text/html".to_string()),
            text: default_app_html(app_name, version, description),
            meta: None,
        }],
    }
}

/// A field of an elicitation request.
#[derive(Debug, Clone)]
pub struct ElicitField {
    pub name: String,
    pub description: String,
    pub required: bool,
    /// `"string"`, `"number"`, or `"boolean"`.
    pub field_type: String,
    pub enum_values: Vec<String>,
}

/// Builds the `requestedSchema` object for an elicitation request: named
/// string/number/boolean properties with optional enums, and a `required`
/// array listing fields marked required.
pub fn elicitation_schema(fields: &[ElicitField]) -> JsonObject {
    let mut properties = serde_json::Map::new();
    let mut required: Vec<String> = Vec::new();

    for field in fields {
        let mut prop = serde_json::Map::new();
        prop.insert("type".to_string(), json!(field.field_type));
        if !field.description.is_empty() {
            prop.insert("description".to_string(), json!(field.description));
        }
        if !field.enum_values.is_empty() {
            prop.insert("enum".to_string(), json!(field.enum_values));
        }
        properties.insert(field.name.clone(), serde_json::Value::Object(prop));
        if field.required {
            required.push(field.name.clone());
        }
    }

    let mut schema = serde_json::Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), serde_json::Value::Object(properties));
    schema.insert("required".to_string(), json!(required));
    schema
}

/// Performs an elicitation request on the session peer, building the JSON
/// schema from the given fields. The caller decides how to proceed when the
/// user declines (`action != accept`).
pub async fn run_elicitation(
    peer: &Peer<RoleServer>,
    message: &str,
    fields: &[ElicitField],
) -> Result<CreateElicitationResult, McpError> {
    let requested_schema = ElicitationSchema::from_json_schema(elicitation_schema(fields))
        .map_err(|err| McpError::internal_error(format!("invalid elicitation schema: {err}"), None))?;
    peer.create_elicitation(CreateElicitationRequestParam {
        message: message.to_string(),
        requested_schema,
    })
    .await
    .map_err(|err| McpError::internal_error(format!("elicitation failed: {err}"), None))
}

/// Prefix-filters autocomplete values for a prompt argument,
/// case-insensitively.
pub fn filter_completions(values: &[String], prefix: &str) -> Vec<String> {
    let prefix = prefix.to_lowercase();
    values
        .iter()
        .filter(|v| v.to_lowercase().starts_with(&prefix))
        .cloned()
        .collect()
}
