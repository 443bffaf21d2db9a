//! Rust code generation: one `<dir>/<stem>.mcp.rs` per proto source file.
//!
//! The emitted file is JSON-level: it defines a handler trait working on
//! `serde_json::Value`, registration functions for the in-process and
//! forward paths, and embeds the descriptor set for dynamic gRPC dispatch.
//! The output is re-parsed with `syn` before being written; malformed
//! generated source is a generator error, not a deferred compile error.

use std::path::Path;

use prost_reflect::{DescriptorPool, FileDescriptor};

use crate::error::{Error, Result};

use super::binder::{bind_file, BoundService, TemplateParams};
use super::helpers::{rs_string_escape, to_screaming_snake_case, to_snake_case};
use super::GeneratedFile;

/// Produces the `*.mcp.rs` output file. No-op for files without services.
pub fn generate(
    pool: &DescriptorPool,
    file: &FileDescriptor,
    version: &str,
) -> Result<Vec<GeneratedFile>> {
    if file.services().count() == 0 {
        return Ok(Vec::new());
    }

    // One MCP file per proto source file (e.g. "todo/v1/todo_service.mcp.rs").
    // Per-package naming would let a later service overwrite an earlier one
    // when multiple services share a package.
    let source = Path::new(file.name());
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("generated");
    let out_name = dir
        .join(format!("{stem}.mcp.rs"))
        .to_string_lossy()
        .replace('\\', "/");

    let params = bind_file(pool, file, version)?;
    let content = render(&params, stem);

    // Malformed generated source is our bug; fail the file instead of
    // handing the user an unbuildable artifact.
    if let Err(err) = syn::parse_file(&content) {
        return Err(Error::Generator(format!(
            "{out_name}: unparsable Rust source: {err}"
        )));
    }

    Ok(vec![GeneratedFile {
        name: out_name,
        content,
    }])
}

fn render(params: &TemplateParams, stem: &str) -> String {
    let mut buf = String::new();

    buf.push_str(&format!(
        "// @generated by protoc-gen-mcp v{}. DO NOT EDIT.\n// source: {}\n\n",
        params.version, params.source_path
    ));
    buf.push_str("#![allow(dead_code, unused_imports, unused_variables, clippy::all)]\n\n");
    buf.push_str("use std::sync::{Arc, OnceLock};\n\n");
    buf.push_str("use async_trait::async_trait;\n");
    buf.push_str(
        "use grpc_mcp_gateway::runtime::{self, McpRegistry, McpServerConfig, ToolRegistration};\n",
    );
    buf.push_str("use prost_reflect::DescriptorPool;\n");
    buf.push_str("use rmcp::ErrorData as McpError;\n");
    buf.push_str("use serde_json::Value;\n");
    buf.push_str("use tokio_util::sync::CancellationToken;\n\n");

    buf.push_str(
        "/// Descriptor set for dynamic gRPC dispatch; produce it with\n\
         /// tonic-build's `file_descriptor_set_path` in your build script.\n",
    );
    buf.push_str(&format!(
        "const DESCRIPTOR_SET: &[u8] = include_bytes!(\"./{stem}_descriptor.bin\");\n\n"
    ));
    buf.push_str(
        "fn descriptor_pool() -> &'static DescriptorPool {\n\
         \x20   static POOL: OnceLock<DescriptorPool> = OnceLock::new();\n\
         \x20   POOL.get_or_init(|| {\n\
         \x20       DescriptorPool::decode(DESCRIPTOR_SET).expect(\"embedded descriptor set is valid\")\n\
         \x20   })\n\
         }\n\n",
    );
    buf.push_str(
        "fn mcp_method(service: &str, method: &str) -> Result<prost_reflect::MethodDescriptor, McpError> {\n\
         \x20   descriptor_pool()\n\
         \x20       .get_service_by_name(service)\n\
         \x20       .and_then(|svc| svc.methods().find(|m| m.name() == method))\n\
         \x20       .ok_or_else(|| {\n\
         \x20           McpError::internal_error(\n\
         \x20               format!(\"method {service}/{method} missing from descriptor set\"),\n\
         \x20               None,\n\
         \x20           )\n\
         \x20       })\n\
         }\n\n",
    );

    for service in &params.services {
        render_service(&mut buf, params, service);
    }

    buf
}

fn render_service(buf: &mut String, params: &TemplateParams, service: &BoundService) {
    let svc_snake = to_snake_case(&service.name);
    let svc_const = to_screaming_snake_case(&service.name);

    buf.push_str(&format!(
        "// --- {} ---\n\n/// Canonical MCP base path for `{}`.\n",
        service.full_name, service.full_name
    ));
    buf.push_str(&format!(
        "pub const {svc_const}_MCP_DEFAULT_BASE_PATH: &str = \"{}\";\n\n",
        service.base_path
    ));

    // Per-method tool constants carry the exact schema deriver output.
    for method in &service.methods {
        let meta = &params.tool_meta[&method.key];
        let schema = &params.schema_json[&method.key];
        buf.push_str(&format!(
            "pub const {}_TOOL: &str = \"{}\";\n",
            method.const_name,
            rs_string_escape(&meta.name)
        ));
        buf.push_str(&format!(
            "pub const {}_DESCRIPTION: &str = \"{}\";\n",
            method.const_name,
            rs_string_escape(&meta.description)
        ));
        buf.push_str(&format!(
            "pub const {}_SCHEMA: &str = \"{}\";\n\n",
            method.const_name,
            rs_string_escape(schema)
        ));
    }

    // Handler trait.
    buf.push_str(&format!(
        "/// JSON-level handler trait for `{}` MCP tools.\n#[async_trait]\npub trait {}McpServer: Send + Sync + 'static {{\n",
        service.full_name, service.name
    ));
    for method in &service.methods {
        let meta = &params.tool_meta[&method.key];
        if !meta.description.is_empty() {
            buf.push_str(&format!("    /// {}\n", meta.description));
        }
        if method.is_streaming() {
            buf.push_str(&format!(
                "    async fn {}(\n        &self,\n        args: Value,\n        stream: Arc<runtime::InProcessServerStream<runtime::ProgressEvent>>,\n    ) -> Result<(), McpError>;\n",
                method.snake_name
            ));
        } else {
            buf.push_str(&format!(
                "    async fn {}(&self, args: Value) -> Result<Value, McpError>;\n",
                method.snake_name
            ));
        }
    }
    buf.push_str("}\n\n");

    let app_uri_expr = match service.opts.as_ref().and_then(|o| o.app.as_ref()) {
        Some(_) => format!(
            "Some(\"ui://{}/app.html\".to_string())",
            service.name.to_lowercase()
        ),
        None => "None".to_string(),
    };

    // Register path: each handler calls the local implementation directly.
    buf.push_str(&format!(
        "/// Registers every `{}` tool backed by a local implementation.\npub fn register_{svc_snake}_mcp_handler<S: {}McpServer>(\n    registry: &mut McpRegistry,\n    server: Arc<S>,\n) {{\n",
        service.full_name, service.name
    ));
    for method in &service.methods {
        buf.push_str("    {\n        let server = server.clone();\n");
        buf.push_str(&format!(
            "        registry.add_tool(\n            ToolRegistration::new({c}_TOOL, {c}_DESCRIPTION, {c}_SCHEMA, move |ctx| {{\n                let server = server.clone();\n                async move {{\n",
            c = method.const_name
        ));
        if method.is_streaming() {
            buf.push_str(&format!(
                "                    let stream = Arc::new(runtime::InProcessServerStream::new(ctx.ct.clone()));\n\
                 \x20                   let producer = server.clone();\n\
                 \x20                   let producer_stream = stream.clone();\n\
                 \x20                   let args = ctx.args.clone();\n\
                 \x20                   tokio::spawn(async move {{\n\
                 \x20                       if let Err(err) = producer.{m}(args, producer_stream.clone()).await {{\n\
                 \x20                           tracing::debug!(error = %err, \"{m} producer failed\");\n\
                 \x20                       }}\n\
                 \x20                       producer_stream.close();\n\
                 \x20                   }});\n\
                 \x20                   runtime::spawn_progress_relay(\n\
                 \x20                       ctx.peer.clone(),\n\
                 \x20                       ctx.progress_token.clone(),\n\
                 \x20                       stream,\n\
                 \x20                       ctx.ct.clone(),\n\
                 \x20                   );\n\
                 \x20                   Ok(runtime::started_result())\n",
                m = method.snake_name
            ));
        } else {
            buf.push_str(&format!(
                "                    let value = server.{}(ctx.args).await?;\n\
                 \x20                   Ok(runtime::json_result(&value))\n",
                method.snake_name
            ));
        }
        buf.push_str(&format!(
            "                }}\n            }})\n            .with_app_resource_uri({app_uri_expr}),\n        );\n    }}\n"
        ));
    }
    buf.push_str(&format!(
        "    register_{svc_snake}_mcp_primitives(registry);\n}}\n\n"
    ));

    // Forward path: each handler dials the remote server through the
    // embedded descriptors.
    buf.push_str(&format!(
        "/// Registers every `{}` tool forwarding to a remote gRPC server.\npub fn forward_to_{svc_snake}_mcp_client(\n    registry: &mut McpRegistry,\n    channel: tonic::transport::Channel,\n) {{\n",
        service.full_name
    ));
    for method in &service.methods {
        buf.push_str("    {\n        let channel = channel.clone();\n");
        buf.push_str(&format!(
            "        registry.add_tool(\n            ToolRegistration::new({c}_TOOL, {c}_DESCRIPTION, {c}_SCHEMA, move |ctx| {{\n                let channel = channel.clone();\n                async move {{\n",
            c = method.const_name
        ));
        buf.push_str(&format!(
            "                    let method = mcp_method(\"{}\", \"{}\")?;\n\
             \x20                   let metadata = ctx.forward_metadata();\n",
            service.full_name, method.proto_name
        ));
        if let Some(progress) = &method.progress {
            buf.push_str(&format!(
                "                    match runtime::server_streaming_json(channel, &method, ctx.args, metadata).await {{\n\
                 \x20                       Ok(stream) => {{\n\
                 \x20                           runtime::spawn_forward_progress_relay(\n\
                 \x20                               ctx.peer.clone(),\n\
                 \x20                               ctx.progress_token.clone(),\n\
                 \x20                               stream,\n\
                 \x20                               \"{}\".to_string(),\n\
                 \x20                               \"{}\".to_string(),\n\
                 \x20                           );\n\
                 \x20                           Ok(runtime::started_result())\n\
                 \x20                       }}\n\
                 \x20                       Err(status) => Ok(runtime::grpc_error_result(&status)),\n\
                 \x20                   }}\n",
                progress.progress_field, progress.result_field
            ));
        } else {
            buf.push_str(
                "                    match runtime::unary_json(channel, &method, ctx.args, metadata).await {\n\
                 \x20                       Ok(value) => Ok(runtime::json_result(&value)),\n\
                 \x20                       Err(status) => Ok(runtime::grpc_error_result(&status)),\n\
                 \x20                   }\n",
            );
        }
        buf.push_str(&format!(
            "                }}\n            }})\n            .with_app_resource_uri({app_uri_expr}),\n        );\n    }}\n"
        ));
    }
    buf.push_str(&format!(
        "    register_{svc_snake}_mcp_primitives(registry);\n}}\n\n"
    ));

    render_primitives(buf, service, &svc_snake);
    render_serve(buf, service, &svc_snake, &svc_const);
}

fn render_primitives(buf: &mut String, service: &BoundService, svc_snake: &str) {
    buf.push_str(&format!(
        "/// Registers prompts, resources, and the app declared via proto options.\nfn register_{svc_snake}_mcp_primitives(registry: &mut McpRegistry) {{\n"
    ));

    if let Some(opts) = &service.opts {
        if let Some(app) = &opts.app {
            buf.push_str(&format!(
                "    registry.set_app(\"{}\", \"{}\", \"{}\", \"{}\");\n",
                rs_string_escape(&service.name),
                rs_string_escape(&app.name),
                rs_string_escape(&app.version),
                rs_string_escape(&app.description)
            ));
        }
        for resource in &opts.resources {
            let uri = if resource.uri.is_empty() {
                &resource.uri_template
            } else {
                &resource.uri
            };
            buf.push_str(&format!(
                "    registry.add_resource(grpc_mcp_gateway::runtime::ResourceRegistration {{\n\
                 \x20       uri: \"{}\".to_string(),\n\
                 \x20       name: \"{}\".to_string(),\n\
                 \x20       description: \"{}\".to_string(),\n\
                 \x20       mime_type: \"{}\".to_string(),\n\
                 \x20       text: \"{{}}\".to_string(),\n\
                 \x20       is_template: {},\n\
                 \x20   }});\n",
                rs_string_escape(uri),
                rs_string_escape(&resource.name),
                rs_string_escape(&resource.description),
                rs_string_escape(&resource.mime_type),
                resource.uri.is_empty()
            ));
        }
    }

    for method in &service.methods {
        let Some(opts) = &method.opts else { continue };
        if let Some(prompt) = &opts.prompt {
            buf.push_str(&format!(
                "    registry.add_prompt(grpc_mcp_gateway::runtime::PromptRegistration {{\n\
                 \x20       name: \"{}\".to_string(),\n\
                 \x20       description: \"{}\".to_string(),\n\
                 \x20       arguments: vec![\n",
                rs_string_escape(&prompt.name),
                rs_string_escape(&prompt.description)
            ));
            for arg in &prompt.arguments {
                buf.push_str(&format!(
                    "            grpc_mcp_gateway::runtime::PromptArgumentDef {{\n\
                     \x20               name: \"{}\".to_string(),\n\
                     \x20               description: \"{}\".to_string(),\n\
                     \x20               required: {},\n\
                     \x20           }},\n",
                    rs_string_escape(&arg.name),
                    rs_string_escape(&arg.description),
                    arg.required
                ));
            }
            buf.push_str("        ],\n    });\n");
            for arg in &prompt.arguments {
                if arg.enum_values.is_empty() {
                    continue;
                }
                let values = arg
                    .enum_values
                    .iter()
                    .map(|v| format!("\"{}\".to_string()", rs_string_escape(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                buf.push_str(&format!(
                    "    registry.add_prompt_completion(\"{}\", \"{}\", vec![{values}]);\n",
                    rs_string_escape(&prompt.name),
                    rs_string_escape(&arg.name)
                ));
            }
        }
    }
    buf.push_str("}\n\n");

    // Elicitation helpers: one per method that declares an elicitation.
    for method in &service.methods {
        let Some(elicitation) = method.opts.as_ref().and_then(|o| o.elicitation.as_ref()) else {
            continue;
        };
        buf.push_str(&format!(
            "/// Runs the elicitation declared for `{}`.\npub async fn {}_{}_elicitation(\n    peer: &rmcp::service::Peer<rmcp::RoleServer>,\n) -> Result<rmcp::model::CreateElicitationResult, McpError> {{\n    let fields = vec![\n",
            method.proto_name, svc_snake, method.snake_name
        ));
        for field in &elicitation.fields {
            let values = field
                .enum_values
                .iter()
                .map(|v| format!("\"{}\".to_string()", rs_string_escape(v)))
                .collect::<Vec<_>>()
                .join(", ");
            buf.push_str(&format!(
                "        grpc_mcp_gateway::runtime::ElicitField {{\n\
                 \x20           name: \"{}\".to_string(),\n\
                 \x20           description: \"{}\".to_string(),\n\
                 \x20           required: {},\n\
                 \x20           field_type: \"{}\".to_string(),\n\
                 \x20           enum_values: vec![{values}],\n\
                 \x20       }},\n",
                rs_string_escape(&field.name),
                rs_string_escape(&field.description),
                field.required,
                rs_string_escape(&field.json_type)
            ));
        }
        buf.push_str(&format!(
            "    ];\n    grpc_mcp_gateway::runtime::run_elicitation(peer, \"{}\", &fields).await\n}}\n\n",
            rs_string_escape(&elicitation.message)
        ));
    }
}

fn render_serve(buf: &mut String, service: &BoundService, svc_snake: &str, svc_const: &str) {
    buf.push_str(&format!(
        "/// Boots an MCP server for `{}`: registers the in-process handlers\n/// and serves the configured transports until cancellation.\npub async fn serve_{svc_snake}_mcp<S: {}McpServer>(\n    server: Arc<S>,\n    cfg: McpServerConfig,\n) -> grpc_mcp_gateway::Result<()> {{\n",
        service.full_name, service.name
    ));
    buf.push_str(&format!(
        "    let mut cfg = cfg;\n    if cfg.generated_base_path.is_empty() {{\n        cfg.generated_base_path = {svc_const}_MCP_DEFAULT_BASE_PATH.to_string();\n    }}\n"
    ));
    buf.push_str("    let mut registry = McpRegistry::new(&cfg.name, &cfg.version);\n");
    buf.push_str(&format!(
        "    register_{svc_snake}_mcp_handler(&mut registry, server);\n"
    ));
    buf.push_str("    runtime::start_server(CancellationToken::new(), cfg, registry).await\n}\n\n");

    buf.push_str(&format!(
        "/// As `serve_{svc_snake}_mcp`, over stdio only (for CLI hosts).\npub async fn serve_{svc_snake}_mcp_stdio<S: {}McpServer>(\n    server: Arc<S>,\n) -> grpc_mcp_gateway::Result<()> {{\n",
        service.name
    ));
    buf.push_str(&format!(
        "    let mut cfg = McpServerConfig::new(\"{svc_snake}\", env!(\"CARGO_PKG_VERSION\"));\n    cfg.transports = vec![grpc_mcp_gateway::runtime::Transport::Stdio];\n    serve_{svc_snake}_mcp(server, cfg).await\n}}\n\n"
    ));
}
