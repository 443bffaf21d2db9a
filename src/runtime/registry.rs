//! The in-memory MCP registry: tools, prompts, resources, and an optional
//! app, served through a manual [`ServerHandler`] implementation (no macros).
//!
//! The registry is populated by generated `register_*` / `forward_to_*`
//! functions before the server starts and is never mutated afterwards; each
//! transport session works on its own clone.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::BoxFuture;
use rmcp::model::{
    AnnotateAble, CallToolRequestParam, CallToolResult, CompleteRequestParam, CompleteResult,
    CompletionInfo,
    GetPromptRequestParam, GetPromptResult, Implementation, JsonObject, ListPromptsResult,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, Meta,
    PaginatedRequestParam, Prompt, PromptArgument, ProgressToken, RawResource,
    RawResourceTemplate, ReadResourceRequestParam, ReadResourceResult, Reference,
    ResourceContents, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tonic::metadata::MetadataMap;

use super::config::ExtraProperty;
use super::metadata::{forward_metadata, with_progress_token, ForwardedHeaders};
use super::primitives::{app_resource_uri, default_app_html, filter_completions};

/// Everything a tool handler can observe about one invocation.
pub struct ToolCallContext {
    /// Parsed JSON arguments (extra properties already extracted).
    pub args: Value,
    /// The MCP session peer, for progress notifications and elicitation.
    pub peer: rmcp::service::Peer<RoleServer>,
    /// Progress token from `params._meta`, when the client sent one.
    pub progress_token: Option<ProgressToken>,
    /// HTTP headers captured by the headers middleware, keyed by gRPC
    /// metadata key.
    pub http_headers: ForwardedHeaders,
    /// Incoming gRPC metadata for proxy scenarios. Empty unless the caller
    /// runs inside a gRPC server.
    pub incoming_metadata: MetadataMap,
    /// Values extracted from configured extra properties.
    pub extras: HashMap<String, Value>,
    /// Token for background work spawned by this invocation. Independent of
    /// the request lifetime: streaming tools answer immediately and keep
    /// working.
    pub ct: CancellationToken,
}

impl ToolCallContext {
    /// Assembles outgoing gRPC metadata for the Forward path: incoming
    /// metadata merged with HTTP-sourced pairs (HTTP wins), plus the progress
    /// token when present.
    pub fn forward_metadata(&self) -> MetadataMap {
        let mut md = forward_metadata(&self.incoming_metadata, &self.http_headers);
        if let Some(token) = &self.progress_token {
            with_progress_token(&mut md, token);
        }
        md
    }
}

/// Boxed async tool handler.
pub type ToolHandler =
    Arc<dyn Fn(ToolCallContext) -> BoxFuture<'static, Result<CallToolResult, McpError>> + Send + Sync>;

/// One tool as registered by generated code.
#[derive(Clone)]
pub struct ToolRegistration {
    pub name: String,
    pub description: String,
    /// The exact schema string emitted by the generator.
    pub schema_json: String,
    /// `ui://` resource of the service app, when the service declares one.
    pub app_resource_uri: Option<String>,
    pub handler: ToolHandler,
}

impl ToolRegistration {
    /// Builds a registration from an async closure handler.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema_json: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolCallContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<CallToolResult, McpError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema_json: schema_json.into(),
            app_resource_uri: None,
            handler: Arc::new(move |ctx| Box::pin(handler(ctx))),
        }
    }

    /// Annotates the tool with the service app's `ui://` resource.
    pub fn with_app_resource_uri(mut self, uri: Option<String>) -> Self {
        self.app_resource_uri = uri;
        self
    }
}

/// One prompt argument definition.
#[derive(Debug, Clone)]
pub struct PromptArgumentDef {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// One prompt as registered by generated code.
#[derive(Debug, Clone)]
pub struct PromptRegistration {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgumentDef>,
}

/// One resource (or resource template) with static contents.
#[derive(Debug, Clone)]
pub struct ResourceRegistration {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    /// Static text served on read. Defaults to `"{}"`.
    pub text: String,
    /// True when `uri` is an RFC 6570 template rather than a concrete URI.
    pub is_template: bool,
}

#[derive(Debug, Clone)]
struct AppRegistration {
    uri: String,
    name: String,
    version: String,
    description: String,
}

/// Mapping of tool names to handlers plus prompt, resource, and app
/// surfaces. Cloning yields an independent snapshot; the runtime clones once
/// per transport family so the registry is effectively frozen at serve time.
#[derive(Clone, Default)]
pub struct McpRegistry {
    name: String,
    version: String,
    tools: BTreeMap<String, ToolRegistration>,
    prompts: BTreeMap<String, PromptRegistration>,
    resources: BTreeMap<String, ResourceRegistration>,
    app: Option<AppRegistration>,
    /// Autocomplete values keyed `"promptName:argName"`.
    completions: BTreeMap<String, Vec<String>>,
    extra_properties: Vec<ExtraProperty>,
}

impl McpRegistry {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Registers a tool. Later registrations under the same name replace
    /// earlier ones.
    pub fn add_tool(&mut self, registration: ToolRegistration) {
        self.tools.insert(registration.name.clone(), registration);
    }

    /// Registers a prompt served by the default prompt handler.
    pub fn add_prompt(&mut self, registration: PromptRegistration) {
        for arg in &registration.arguments {
            let key = format!("{}:{}", registration.name, arg.name);
            self.completions.entry(key).or_default();
        }
        self.prompts.insert(registration.name.clone(), registration);
    }

    /// Registers autocomplete values for a prompt argument.
    pub fn add_prompt_completion(
        &mut self,
        prompt: &str,
        argument: &str,
        values: Vec<String>,
    ) {
        self.completions
            .insert(format!("{prompt}:{argument}"), values);
    }

    /// Registers a resource with static contents.
    pub fn add_resource(&mut self, registration: ResourceRegistration) {
        self.resources.insert(registration.uri.clone(), registration);
    }

    /// Declares the service app: registers its `ui://` resource and annotates
    /// subsequently listed tools of the service with `_meta.ui.resourceUri`.
    pub fn set_app(&mut self, service_name: &str, name: &str, version: &str, description: &str) {
        let uri = app_resource_uri(service_name);
        self.resources.insert(
            uri.clone(),
            ResourceRegistration {
                uri: uri.clone(),
                name: name.to_string(),
                description: description.to_string(),
                mime_type: "text/html".to_string(),
                text: default_app_html(name, version, description),
                is_template: false,
            },
        );
        self.app = Some(AppRegistration {
            uri,
            name: name.to_string(),
            version: version.to_string(),
            description: description.to_string(),
        });
    }

    /// Configures extra properties injected into every tool schema and
    /// extracted from request arguments into [`ToolCallContext::extras`].
    pub fn set_extra_properties(&mut self, properties: Vec<ExtraProperty>) {
        self.extra_properties = properties;
    }

    /// The verbatim generator-emitted schema string for a tool.
    pub fn tool_schema(&self, name: &str) -> Option<&str> {
        self.tools.get(name).map(|t| t.schema_json.as_str())
    }

    /// Registered tool names, sorted.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn prompt_names(&self) -> Vec<&str> {
        self.prompts.keys().map(String::as_str).collect()
    }

    pub fn resource_uris(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Parses a tool's schema string and overlays configured extra
    /// properties.
    fn input_schema(&self, registration: &ToolRegistration) -> JsonObject {
        let mut schema: JsonObject =
            serde_json::from_str(&registration.schema_json).unwrap_or_default();
        if self.extra_properties.is_empty() {
            return schema;
        }

        if let Some(Value::Object(properties)) = schema.get_mut("properties") {
            for extra in &self.extra_properties {
                properties.insert(
                    extra.name.clone(),
                    json!({ "type": "string", "description": extra.description }),
                );
            }
        }
        if let Some(Value::Array(required)) = schema.get_mut("required") {
            for extra in self.extra_properties.iter().filter(|p| p.required) {
                required.push(json!(extra.name));
            }
        }
        schema
    }

    fn tools_list(&self) -> Vec<Tool> {
        self.tools
            .values()
            .map(|registration| {
                let mut tool = Tool::new(
                    registration.name.clone(),
                    registration.description.clone(),
                    Arc::new(self.input_schema(registration)),
                );
                if let Some(uri) = &registration.app_resource_uri {
                    let mut meta = Meta::new();
                    meta.insert(
                        "ui".to_string(),
                        json!({ "resourceUri": uri }),
                    );
                    tool.meta = Some(meta);
                }
                tool
            })
            .collect()
    }

    fn call_context(
        &self,
        arguments: Option<JsonObject>,
        context: &RequestContext<RoleServer>,
    ) -> ToolCallContext {
        let mut args = arguments.map(Value::Object).unwrap_or_else(|| json!({}));

        // HTTP headers captured by the middleware travel in the request parts.
        let http_headers = context
            .extensions
            .get::<http::request::Parts>()
            .and_then(|parts| parts.extensions.get::<ForwardedHeaders>().cloned())
            .unwrap_or_default();

        let mut extras = HashMap::new();
        if let Some(obj) = args.as_object_mut() {
            for extra in &self.extra_properties {
                if let Some(value) = obj.remove(&extra.name) {
                    extras.insert(extra.name.clone(), value);
                }
            }
        }

        ToolCallContext {
            args,
            peer: context.peer.clone(),
            progress_token: context.meta.get_progress_token(),
            http_headers,
            incoming_metadata: MetadataMap::new(),
            extras,
            ct: CancellationToken::new(),
        }
    }
}

impl ServerHandler for McpRegistry {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .enable_completions()
                .build(),
            server_info: Implementation {
                name: self.name.clone().into(),
                version: self.version.clone().into(),
                ..Default::default()
            },
            instructions: None,
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.tools_list(),
            ..Default::default()
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let Some(registration) = self.tools.get(request.name.as_ref()) else {
                return Err(McpError::invalid_params(
                    format!("unknown tool: {}", request.name),
                    None,
                ));
            };
            let ctx = self.call_context(request.arguments, &context);
            (registration.handler)(ctx).await
        }
    }

    fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListPromptsResult, McpError>> + Send + '_ {
        let prompts = self
            .prompts
            .values()
            .map(|p| Prompt {
                name: p.name.clone(),
                title: None,
                description: Some(p.description.clone()),
                arguments: if p.arguments.is_empty() {
                    None
                } else {
                    Some(
                        p.arguments
                            .iter()
                            .map(|a| PromptArgument {
                                name: a.name.clone(),
                                title: None,
                                description: Some(a.description.clone()),
                                required: Some(a.required),
                            })
                            .collect(),
                    )
                },
                icons: None,
            })
            .collect();
        std::future::ready(Ok(ListPromptsResult {
            prompts,
            ..Default::default()
        }))
    }

    fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<GetPromptResult, McpError>> + Send + '_ {
        let result = match self.prompts.get(request.name.as_str()) {
            Some(p) => Ok(super::primitives::default_prompt_result(&p.description)),
            None => Err(McpError::invalid_params(
                format!("unknown prompt: {}", request.name),
                None,
            )),
        };
        std::future::ready(result)
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self
            .resources
            .values()
            .filter(|r| !r.is_template)
            .map(|r| {
                let mut raw = RawResource::new(r.uri.clone(), r.name.clone());
                raw.description = Some(r.description.clone());
                raw.mime_type = Some(r.mime_type.clone());
                raw.no_annotation()
            })
            .collect();
        std::future::ready(Ok(ListResourcesResult {
            resources,
            ..Default::default()
        }))
    }

    fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourceTemplatesResult, McpError>> + Send + '_
    {
        let resource_templates = self
            .resources
            .values()
            .filter(|r| r.is_template)
            .map(|r| {
                RawResourceTemplate {
                    uri_template: r.uri.clone(),
                    name: r.name.clone(),
                    title: None,
                    description: Some(r.description.clone()),
                    mime_type: Some(r.mime_type.clone()),
                }
                .no_annotation()
            })
            .collect();
        std::future::ready(Ok(ListResourceTemplatesResult {
            resource_templates,
            ..Default::default()
        }))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        let result = match self.resources.get(request.uri.as_str()) {
            Some(r) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::TextResourceContents {
                    uri: r.uri.clone(),
                    mime_type: Some(r.mime_type.clone()),
                    text: r.text.clone(),
                    meta: None,
                }],
            }),
            None => Err(McpError::resource_not_found(
                format!("unknown resource: {}", request.uri),
                None,
            )),
        };
        std::future::ready(result)
    }

    fn complete(
        &self,
        request: CompleteRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CompleteResult, McpError>> + Send + '_ {
        let values = match &request.r#ref {
            Reference::Prompt(prompt_ref) => {
                let key = format!("{}:{}", prompt_ref.name, request.argument.name);
                self.completions
                    .get(&key)
                    .map(|values| filter_completions(values, &request.argument.value))
                    .unwrap_or_default()
            }
            _ => Vec::new(),
        };
        std::future::ready(Ok(CompleteResult {
            completion: CompletionInfo {
                total: Some(values.len() as u32),
                values,
                has_more: Some(false),
            },
        }))
    }
}
