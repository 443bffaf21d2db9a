//! Language-neutral binding of descriptor files to template data.
//!
//! Each per-language generator starts from the same [`TemplateParams`]: the
//! binder walks services and methods, filters unsupported streaming shapes,
//! derives tool names and schemas, and resolves option schema references.
//! Maps are `BTreeMap` so template expansion iterates deterministically.

use std::collections::BTreeMap;

use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor};

use crate::error::{Error, Result};

use super::helpers::{clean_comment, leading_comment, to_screaming_snake_case, to_snake_case};
use super::options::{
    extract_google_api_resources, extract_method_options, extract_service_options,
    resolve_schema_fields, McpMethodOpts, McpServiceOpts,
};
use super::progress::{detect_progress_stream, StreamProgressInfo};
use super::schema::message_schema_json;
use super::tool_name::build_tool_name;

/// MCP tool name and description for a single RPC method.
#[derive(Debug, Clone)]
pub struct ToolMeta {
    pub name: String,
    pub description: String,
}

/// A bound RPC method with everything the templates need.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    /// RPC name as declared (e.g. `CreateTodo`).
    pub proto_name: String,
    /// snake_case method name (e.g. `create_todo`).
    pub snake_name: String,
    /// SCREAMING_SNAKE constant prefix (e.g. `TODO_SERVICE_CREATE_TODO`).
    pub const_name: String,
    /// Schema/tool-meta map key: `ServiceName_MethodName`.
    pub key: String,
    pub input: MessageDescriptor,
    pub output: MessageDescriptor,
    pub opts: Option<McpMethodOpts>,
    /// Present iff the method is a progress-convention server stream.
    pub progress: Option<StreamProgressInfo>,
}

impl BoundMethod {
    pub fn is_streaming(&self) -> bool {
        self.progress.is_some()
    }
}

/// A bound service with its methods and service-level metadata.
#[derive(Debug, Clone)]
pub struct BoundService {
    /// Short name (e.g. `TodoService`).
    pub name: String,
    /// Fully-qualified name (e.g. `todo.v1.TodoService`).
    pub full_name: String,
    /// Canonical MCP base path (`/todo/v1/todoservice/mcp`).
    pub base_path: String,
    pub opts: Option<McpServiceOpts>,
    pub methods: Vec<BoundMethod>,
}

/// The top-level data fed into every code template, one per output file.
#[derive(Debug, Clone)]
pub struct TemplateParams {
    pub version: String,
    pub source_path: String,
    /// Proto package of the source file.
    pub package: String,
    /// `ServiceName_MethodName` -> serialized JSON Schema (stable key order).
    pub schema_json: BTreeMap<String, String>,
    /// `ServiceName_MethodName` -> tool name and description.
    pub tool_meta: BTreeMap<String, ToolMeta>,
    pub services: Vec<BoundService>,
}

impl TemplateParams {
    /// `ServiceName` -> canonical base path, for templates that need the map form.
    pub fn service_base_paths(&self) -> BTreeMap<String, String> {
        self.services
            .iter()
            .map(|s| (s.name.clone(), s.base_path.clone()))
            .collect()
    }
}

/// Binds one descriptor file into [`TemplateParams`].
///
/// Client-streaming and bidirectional methods are skipped entirely; pure
/// server-streaming methods are kept only when they follow the progress
/// convention, so every bound method maps to exactly one MCP tool. Two
/// methods resolving to the same tool name within one file (possible only
/// through `MCPTool.name` overrides) are a generator error.
pub fn bind_file(
    pool: &DescriptorPool,
    file: &FileDescriptor,
    version: &str,
) -> Result<TemplateParams> {
    let mut schema_json = BTreeMap::new();
    let mut tool_meta = BTreeMap::new();
    let mut services = Vec::new();
    let mut seen_tool_names: BTreeMap<String, String> = BTreeMap::new();

    for svc in file.services() {
        let svc_name = svc.name().to_string();
        let mut methods = Vec::new();

        for meth in svc.methods() {
            if meth.is_client_streaming() {
                continue;
            }
            let progress = if meth.is_server_streaming() {
                match detect_progress_stream(&meth) {
                    Some(info) => Some(info),
                    // Streaming without the progress convention is not
                    // projected to an MCP tool.
                    None => continue,
                }
            } else {
                None
            };

            let key = format!("{}_{}", svc_name, meth.name());
            let mut tool_name = build_tool_name(meth.full_name());
            let mut tool_desc = clean_comment(&leading_comment(file, meth.path()));

            let mut opts = extract_method_options(pool, &meth);
            if let Some(opts) = opts.as_mut() {
                if !opts.tool_name.is_empty() {
                    tool_name = opts.tool_name.clone();
                }
                if !opts.tool_description.is_empty() {
                    tool_desc = opts.tool_description.clone();
                }
                // Resolve schema references into flat field lists.
                if let Some(prompt) = opts.prompt.as_mut() {
                    if !prompt.schema.is_empty() {
                        prompt.arguments = resolve_schema_fields(pool, &prompt.schema);
                    }
                }
                if let Some(elicitation) = opts.elicitation.as_mut() {
                    if !elicitation.schema.is_empty() {
                        elicitation.fields = resolve_schema_fields(pool, &elicitation.schema);
                    }
                }
            }

            if let Some(other) = seen_tool_names.insert(tool_name.clone(), key.clone()) {
                return Err(Error::Generator(format!(
                    "tool name {tool_name:?} assigned to both {other} and {key}"
                )));
            }

            schema_json.insert(key.clone(), message_schema_json(pool, &meth.input(), false));
            tool_meta.insert(
                key.clone(),
                ToolMeta {
                    name: tool_name,
                    description: tool_desc,
                },
            );

            methods.push(BoundMethod {
                proto_name: meth.name().to_string(),
                snake_name: to_snake_case(meth.name()),
                const_name: to_screaming_snake_case(&key),
                key,
                input: meth.input(),
                output: meth.output(),
                opts,
                progress,
            });
        }

        let base_path = format!("/{}/mcp", svc.full_name().replace('.', "/").to_lowercase());

        // Explicit MCP service options + auto-detected google.api.resource.
        let mut svc_opts = extract_service_options(pool, &svc);
        let api_resources = extract_google_api_resources(pool, &svc);
        if !api_resources.is_empty() {
            let entry = svc_opts.get_or_insert_with(McpServiceOpts::default);
            entry.resources = api_resources;
        }

        services.push(BoundService {
            name: svc_name,
            full_name: svc.full_name().to_string(),
            base_path,
            opts: svc_opts,
            methods,
        });
    }

    Ok(TemplateParams {
        version: version.to_string(),
        source_path: file.name().to_string(),
        package: file.package_name().to_string(),
        schema_json,
        tool_meta,
        services,
    })
}
