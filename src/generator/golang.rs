//! Go code generation: one `<stem>.pb.mcp.go` per proto source file,
//! targeting the Go runtime module and the official MCP Go SDK.
//!
//! Generated code sits in the same package as the `*.pb.go` output (or a
//! sub-package when `package_suffix` is set) and exposes the four
//! registration entry points per service.

use std::collections::BTreeMap;
use std::path::Path;

use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor};

use crate::error::{Error, Result};

use super::binder::{bind_file, BoundService, TemplateParams};
use super::helpers::{go_string_escape, to_pascal_case};
use super::GeneratedFile;

const GO_RUNTIME_IMPORT: &str = "github.com/machanirobotics/grpc-mcp-gateway/runtime";
const GO_MCP_SDK_IMPORT: &str = "github.com/modelcontextprotocol/go-sdk/mcp";

/// Produces the `*.pb.mcp.go` output file. No-op for files without services.
pub fn generate(
    pool: &DescriptorPool,
    file: &FileDescriptor,
    version: &str,
    package_suffix: &str,
) -> Result<Vec<GeneratedFile>> {
    if file.services().count() == 0 {
        return Ok(Vec::new());
    }

    if !package_suffix.is_empty() && !is_go_identifier(package_suffix) {
        return Err(Error::Generator(format!(
            "package_suffix {package_suffix:?} is not a valid Go identifier"
        )));
    }

    let source = Path::new(file.name());
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("generated");

    // With a suffix, output moves to a sub-package directory and the implied
    // package name becomes the original name plus the suffix.
    let mut package = go_package_name(file);
    let out_name = if package_suffix.is_empty() {
        dir.join(format!("{stem}.pb.mcp.go"))
    } else {
        package.push_str(package_suffix);
        dir.join(package_suffix).join(format!("{stem}.pb.mcp.go"))
    }
    .to_string_lossy()
    .replace('\\', "/");

    let params = bind_file(pool, file, version)?;
    let content = render(file, &params, &package);

    Ok(vec![GeneratedFile {
        name: out_name,
        content,
    }])
}

fn render(file: &FileDescriptor, params: &TemplateParams, package: &str) -> String {
    let mut resolver = GoTypeResolver::new(file);

    // Resolve all types first so the import block is complete.
    let mut bodies = String::new();
    for service in &params.services {
        render_service(&mut bodies, params, service, &mut resolver);
    }

    let mut buf = String::new();
    buf.push_str(&format!(
        "// Code generated by protoc-gen-mcp v{}. DO NOT EDIT.\n// source: {}\n\npackage {package}\n\n",
        params.version, params.source_path
    ));
    buf.push_str("import (\n\t\"context\"\n\t\"encoding/json\"\n\n");
    buf.push_str(&format!("\truntime \"{GO_RUNTIME_IMPORT}\"\n"));
    buf.push_str(&format!("\t\"{GO_MCP_SDK_IMPORT}\"\n"));
    buf.push_str("\t\"google.golang.org/grpc\"\n");
    buf.push_str("\t\"google.golang.org/protobuf/encoding/protojson\"\n");
    for (import_path, alias) in &resolver.extra_imports {
        buf.push_str(&format!("\t{alias} \"{import_path}\"\n"));
    }
    buf.push_str(")\n\n");
    buf.push_str(&bodies);
    buf
}

fn render_service(
    buf: &mut String,
    params: &TemplateParams,
    service: &BoundService,
    resolver: &mut GoTypeResolver,
) {
    let svc = &service.name;

    buf.push_str(&format!(
        "// {svc}MCPDefaultBasePath is the canonical MCP endpoint path for {}.\nconst {svc}MCPDefaultBasePath = \"{}\"\n\n",
        service.full_name, service.base_path
    ));

    // Schema constants carry the exact bytes produced by the schema deriver.
    for method in &service.methods {
        let schema = &params.schema_json[&method.key];
        buf.push_str(&format!(
            "// {svc}_{}_Schema is the JSON Schema for the {} request.\n",
            method.proto_name, method.proto_name
        ));
        if schema.contains('`') {
            buf.push_str(&format!(
                "const {svc}_{}_Schema = \"{}\"\n\n",
                method.proto_name,
                go_string_escape(schema)
            ));
        } else {
            buf.push_str(&format!(
                "const {svc}_{}_Schema = `{schema}`\n\n",
                method.proto_name
            ));
        }
    }

    // Local service surface. Any implementation of the generated gRPC server
    // interface satisfies it; streaming methods accept an
    // InProcessServerStream in place of the network stream.
    buf.push_str(&format!(
        "// {svc}MCPServer is the local service surface invoked by the in-process MCP handlers.\ntype {svc}MCPServer interface {{\n"
    ));
    for method in &service.methods {
        let input = resolver.resolve(&method.input);
        if let Some(progress) = &method.progress {
            let chunk = resolver.resolve(&progress.chunk_message);
            buf.push_str(&format!(
                "\t{}(req *{input}, stream grpc.ServerStreamingServer[{chunk}]) error\n",
                method.proto_name
            ));
        } else {
            let output = resolver.resolve(&method.output);
            buf.push_str(&format!(
                "\t{}(ctx context.Context, req *{input}) (*{output}, error)\n",
                method.proto_name
            ));
        }
    }
    buf.push_str("}\n\n");

    // Serve = boot + register + run.
    buf.push_str(&format!(
        "// Serve{svc}MCP boots an MCP server for {}, registers the in-process\n// handlers, and serves the configured transports until ctx is done.\nfunc Serve{svc}MCP(ctx context.Context, srv {svc}MCPServer, cfg *runtime.MCPServerConfig) error {{\n\tif cfg.GeneratedBasePath == \"\" {{\n\t\tcfg.GeneratedBasePath = {svc}MCPDefaultBasePath\n\t}}\n\treturn runtime.StartServer(ctx, cfg, func(s *mcp.Server) {{\n\t\tRegister{svc}MCPHandler(s, srv)\n\t}})\n}}\n\n",
        service.full_name
    ));

    render_register(buf, params, service, resolver);
    render_forward(buf, params, service, resolver);
    render_primitives(buf, service);
}

fn render_register(
    buf: &mut String,
    params: &TemplateParams,
    service: &BoundService,
    resolver: &mut GoTypeResolver,
) {
    let svc = &service.name;
    buf.push_str(&format!(
        "// Register{svc}MCPHandler registers every {svc} tool against a local implementation.\nfunc Register{svc}MCPHandler(s *mcp.Server, srv {svc}MCPServer) {{\n"
    ));
    for method in &service.methods {
        let meta = &params.tool_meta[&method.key];
        let input = resolver.resolve(&method.input);
        buf.push_str(&format!(
            "\ts.AddTool(&mcp.Tool{{\n\t\tName:        \"{}\",\n\t\tDescription: \"{}\",\n\t\tInputSchema: json.RawMessage({svc}_{}_Schema),\n\t}}, func(ctx context.Context, req *mcp.CallToolRequest) (*mcp.CallToolResult, error) {{\n",
            go_string_escape(&meta.name),
            go_string_escape(&meta.description),
            method.proto_name
        ));
        buf.push_str(&format!(
            "\t\tin := &{input}{{}}\n\t\tif err := protojson.Unmarshal(req.Params.Arguments, in); err != nil {{\n\t\t\treturn runtime.HandleError(err)\n\t\t}}\n"
        ));
        if let Some(progress) = &method.progress {
            let chunk = resolver.resolve(&progress.chunk_message);
            let progress_case = format!("{chunk}_{}", to_pascal_case(&progress.progress_field));
            let result_case = format!("{chunk}_{}", to_pascal_case(&progress.result_field));
            buf.push_str(&format!(
                "\t\ttoken := req.Params.GetProgressToken()\n\
                 \t\t// Detach from the request context: the tool returns immediately\n\
                 \t\t// while the stream keeps producing.\n\
                 \t\tcallCtx := context.WithoutCancel(ctx)\n\
                 \t\tif token != nil {{\n\t\t\tcallCtx = runtime.WithIncomingProgressToken(callCtx, token)\n\t\t}}\n\
                 \t\tstream := runtime.NewInProcessServerStream[*{chunk}](callCtx)\n\
                 \t\tgo func() {{\n\t\t\tdefer stream.Close()\n\t\t\t_ = srv.{}(in, stream)\n\t\t}}()\n\
                 \t\tgo func() {{\n\t\t\tfor {{\n\t\t\t\tchunk, ok := stream.Recv()\n\t\t\t\tif !ok {{\n\t\t\t\t\treturn\n\t\t\t\t}}\n\t\t\t\tif token == nil {{\n\t\t\t\t\tcontinue\n\t\t\t\t}}\n\t\t\t\tswitch payload := chunk.{}.(type) {{\n\t\t\t\tcase *{progress_case}:\n\t\t\t\t\t_ = req.Session.NotifyProgress(callCtx, &mcp.ProgressNotificationParams{{\n\t\t\t\t\t\tProgressToken: token,\n\t\t\t\t\t\tProgress:      payload.{}.GetProgress(),\n\t\t\t\t\t\tTotal:         payload.{}.GetTotal(),\n\t\t\t\t\t\tMessage:       payload.{}.GetMessage(),\n\t\t\t\t\t}})\n\t\t\t\tcase *{result_case}:\n\t\t\t\t\tb, _ := protojson.Marshal(payload.{})\n\t\t\t\t\t_ = req.Session.NotifyProgress(callCtx, &mcp.ProgressNotificationParams{{\n\t\t\t\t\t\tProgressToken: token,\n\t\t\t\t\t\tProgress:      1.0,\n\t\t\t\t\t\tTotal:         1.0,\n\t\t\t\t\t\tMessage:       string(b),\n\t\t\t\t\t}})\n\t\t\t\t\treturn\n\t\t\t\t}}\n\t\t\t}}\n\t\t}}()\n\
                 \t\treturn &mcp.CallToolResult{{Content: []mcp.Content{{&mcp.TextContent{{Text: `{{\"status\":\"started\"}}`}}}}}}, nil\n",
                method.proto_name,
                oneof_go_name(progress),
                to_pascal_case(&progress.progress_field),
                to_pascal_case(&progress.progress_field),
                to_pascal_case(&progress.progress_field),
                to_pascal_case(&progress.result_field),
            ));
        } else {
            buf.push_str(&format!(
                "\t\tout, err := srv.{}(ctx, in)\n\t\tif err != nil {{\n\t\t\treturn runtime.HandleError(err)\n\t\t}}\n\t\tb, err := protojson.Marshal(out)\n\t\tif err != nil {{\n\t\t\treturn runtime.HandleError(err)\n\t\t}}\n\t\treturn &mcp.CallToolResult{{Content: []mcp.Content{{&mcp.TextContent{{Text: string(b)}}}}}}, nil\n",
                method.proto_name
            ));
        }
        buf.push_str("\t})\n");
    }
    buf.push_str(&format!("\tregister{svc}MCPPrimitives(s)\n}}\n\n"));
}

fn render_forward(
    buf: &mut String,
    params: &TemplateParams,
    service: &BoundService,
    resolver: &mut GoTypeResolver,
) {
    let svc = &service.name;
    buf.push_str(&format!(
        "// ForwardTo{svc}MCPClient registers every {svc} tool forwarding to a remote gRPC server.\nfunc ForwardTo{svc}MCPClient(s *mcp.Server, client {svc}Client) {{\n"
    ));
    for method in &service.methods {
        let meta = &params.tool_meta[&method.key];
        let input = resolver.resolve(&method.input);
        buf.push_str(&format!(
            "\ts.AddTool(&mcp.Tool{{\n\t\tName:        \"{}\",\n\t\tDescription: \"{}\",\n\t\tInputSchema: json.RawMessage({svc}_{}_Schema),\n\t}}, func(ctx context.Context, req *mcp.CallToolRequest) (*mcp.CallToolResult, error) {{\n",
            go_string_escape(&meta.name),
            go_string_escape(&meta.description),
            method.proto_name
        ));
        buf.push_str(&format!(
            "\t\tin := &{input}{{}}\n\t\tif err := protojson.Unmarshal(req.Params.Arguments, in); err != nil {{\n\t\t\treturn runtime.HandleError(err)\n\t\t}}\n\t\tcallCtx := runtime.ForwardMetadata(ctx)\n\t\ttoken := req.Params.GetProgressToken()\n\t\tif token != nil {{\n\t\t\tcallCtx = runtime.WithProgressToken(callCtx, token)\n\t\t}}\n"
        ));
        if let Some(progress) = &method.progress {
            let chunk = resolver.resolve(&progress.chunk_message);
            let progress_case = format!("{chunk}_{}", to_pascal_case(&progress.progress_field));
            let result_case = format!("{chunk}_{}", to_pascal_case(&progress.result_field));
            buf.push_str(&format!(
                "\t\tstreamCtx := context.WithoutCancel(callCtx)\n\
                 \t\tstream, err := client.{}(streamCtx, in)\n\t\tif err != nil {{\n\t\t\treturn runtime.HandleError(err)\n\t\t}}\n\
                 \t\tgo func() {{\n\t\t\tfor {{\n\t\t\t\tchunk, err := stream.Recv()\n\t\t\t\tif err != nil {{\n\t\t\t\t\treturn\n\t\t\t\t}}\n\t\t\t\tif token == nil {{\n\t\t\t\t\tcontinue\n\t\t\t\t}}\n\t\t\t\tswitch payload := chunk.{}.(type) {{\n\t\t\t\tcase *{progress_case}:\n\t\t\t\t\t_ = req.Session.NotifyProgress(streamCtx, &mcp.ProgressNotificationParams{{\n\t\t\t\t\t\tProgressToken: token,\n\t\t\t\t\t\tProgress:      payload.{}.GetProgress(),\n\t\t\t\t\t\tTotal:         payload.{}.GetTotal(),\n\t\t\t\t\t\tMessage:       payload.{}.GetMessage(),\n\t\t\t\t\t}})\n\t\t\t\tcase *{result_case}:\n\t\t\t\t\tb, _ := protojson.Marshal(payload.{})\n\t\t\t\t\t_ = req.Session.NotifyProgress(streamCtx, &mcp.ProgressNotificationParams{{\n\t\t\t\t\t\tProgressToken: token,\n\t\t\t\t\t\tProgress:      1.0,\n\t\t\t\t\t\tTotal:         1.0,\n\t\t\t\t\t\tMessage:       string(b),\n\t\t\t\t\t}})\n\t\t\t\t\treturn\n\t\t\t\t}}\n\t\t\t}}\n\t\t}}()\n\
                 \t\treturn &mcp.CallToolResult{{Content: []mcp.Content{{&mcp.TextContent{{Text: `{{\"status\":\"started\"}}`}}}}}}, nil\n",
                method.proto_name,
                oneof_go_name(progress),
                to_pascal_case(&progress.progress_field),
                to_pascal_case(&progress.progress_field),
                to_pascal_case(&progress.progress_field),
                to_pascal_case(&progress.result_field),
            ));
        } else {
            buf.push_str(&format!(
                "\t\tout, err := client.{}(callCtx, in)\n\t\tif err != nil {{\n\t\t\treturn runtime.HandleError(err)\n\t\t}}\n\t\tb, err := protojson.Marshal(out)\n\t\tif err != nil {{\n\t\t\treturn runtime.HandleError(err)\n\t\t}}\n\t\treturn &mcp.CallToolResult{{Content: []mcp.Content{{&mcp.TextContent{{Text: string(b)}}}}}}, nil\n",
                method.proto_name
            ));
        }
        buf.push_str("\t})\n");
    }
    buf.push_str(&format!("\tregister{svc}MCPPrimitives(s)\n}}\n\n"));
}

fn render_primitives(buf: &mut String, service: &BoundService) {
    let svc = &service.name;
    buf.push_str(&format!(
        "// register{svc}MCPPrimitives registers prompts, resources, and the app\n// declared via proto options.\nfunc register{svc}MCPPrimitives(s *mcp.Server) {{\n"
    ));

    if let Some(opts) = &service.opts {
        if let Some(app) = &opts.app {
            buf.push_str(&format!(
                "\ts.AddResource(&mcp.Resource{{\n\t\tURI:      runtime.AppResourceURI(\"{}\"),\n\t\tName:     \"{}\",\n\t\tMIMEType: \"text/html\",\n\t}}, runtime.DefaultAppResourceHandler(\"{}\", \"{}\", \"{}\"))\n",
                go_string_escape(svc),
                go_string_escape(&app.name),
                go_string_escape(&app.name),
                go_string_escape(&app.version),
                go_string_escape(&app.description)
            ));
        }
        for resource in &opts.resources {
            if resource.uri_template.is_empty() {
                buf.push_str(&format!(
                    "\ts.AddResource(&mcp.Resource{{\n\t\tURI:         \"{}\",\n\t\tName:        \"{}\",\n\t\tDescription: \"{}\",\n\t\tMIMEType:    \"{}\",\n\t}}, runtime.DefaultResourceHandler())\n",
                    go_string_escape(&resource.uri),
                    go_string_escape(&resource.name),
                    go_string_escape(&resource.description),
                    go_string_escape(&resource.mime_type)
                ));
            } else {
                buf.push_str(&format!(
                    "\ts.AddResourceTemplate(&mcp.ResourceTemplate{{\n\t\tURITemplate: \"{}\",\n\t\tName:        \"{}\",\n\t\tDescription: \"{}\",\n\t\tMIMEType:    \"{}\",\n\t}}, runtime.DefaultResourceHandler())\n",
                    go_string_escape(&resource.uri_template),
                    go_string_escape(&resource.name),
                    go_string_escape(&resource.description),
                    go_string_escape(&resource.mime_type)
                ));
            }
        }
    }

    for method in &service.methods {
        let Some(prompt) = method.opts.as_ref().and_then(|o| o.prompt.as_ref()) else {
            continue;
        };
        buf.push_str(&format!(
            "\ts.AddPrompt(&mcp.Prompt{{\n\t\tName:        \"{}\",\n\t\tDescription: \"{}\",\n\t\tArguments: []*mcp.PromptArgument{{\n",
            go_string_escape(&prompt.name),
            go_string_escape(&prompt.description)
        ));
        for arg in &prompt.arguments {
            buf.push_str(&format!(
                "\t\t\t{{Name: \"{}\", Description: \"{}\", Required: {}}},\n",
                go_string_escape(&arg.name),
                go_string_escape(&arg.description),
                arg.required
            ));
        }
        buf.push_str(&format!(
            "\t\t}},\n\t}}, runtime.DefaultPromptHandler(\"{}\"))\n",
            go_string_escape(&prompt.description)
        ));
    }
    buf.push_str("}\n\n");
}

/// Go name of the oneof interface field on the chunk struct.
fn oneof_go_name(progress: &super::progress::StreamProgressInfo) -> String {
    progress
        .chunk_message
        .oneofs()
        .find(|oo| oo.fields().any(|f| f.name() == progress.progress_field))
        .map(|oo| to_pascal_case(oo.name()))
        .unwrap_or_else(|| "Payload".to_string())
}

/// Resolves message types to Go identifiers, collecting aliased imports for
/// cross-package references.
struct GoTypeResolver {
    current_go_package: String,
    /// import path -> alias, sorted for deterministic import blocks.
    extra_imports: BTreeMap<String, String>,
}

impl GoTypeResolver {
    fn new(file: &FileDescriptor) -> Self {
        Self {
            current_go_package: go_import_path(file),
            extra_imports: BTreeMap::new(),
        }
    }

    fn resolve(&mut self, msg: &MessageDescriptor) -> String {
        // Nested messages become Parent_Child in protoc-gen-go output.
        let file = msg.parent_file();
        let local = msg
            .full_name()
            .strip_prefix(&format!("{}.", file.package_name()))
            .unwrap_or(msg.full_name())
            .replace('.', "_");

        let import_path = go_import_path(&file);
        if import_path == self.current_go_package || import_path.is_empty() {
            return local;
        }
        let alias = import_path
            .rsplit('/')
            .next()
            .unwrap_or("pb")
            .replace(['.', '-'], "");
        self.extra_imports.insert(import_path, alias.clone());
        format!("{alias}.{local}")
    }
}

/// The declared Go import path of a file (`go_package` before any `;`).
fn go_import_path(file: &FileDescriptor) -> String {
    file.file_descriptor_proto()
        .options
        .as_ref()
        .and_then(|o| o.go_package.clone())
        .map(|p| p.split(';').next().unwrap_or(&p).to_string())
        .unwrap_or_default()
}

/// The Go package name: after `;` in `go_package`, else the last path
/// segment, else the proto package with dots removed.
fn go_package_name(file: &FileDescriptor) -> String {
    let declared = file
        .file_descriptor_proto()
        .options
        .as_ref()
        .and_then(|o| o.go_package.clone());
    if let Some(declared) = declared {
        if let Some((_, name)) = declared.split_once(';') {
            return name.to_string();
        }
        if let Some(last) = declared.rsplit('/').next() {
            if !last.is_empty() {
                return last.replace(['.', '-'], "");
            }
        }
    }
    file.package_name().replace('.', "")
}

fn is_go_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
