//! C++ code generation: per-file gRPC-client adapters plus a one-shot set of
//! shared project files (a Rust cxx bridge hosting the MCP server, build
//! scripts, and a gRPC server main).
//!
//! The C++ target is special-cased by the dispatcher: in batch mode the
//! shared files are emitted exactly once, for the first file in sorted
//! order. Emitting them per file would silently overwrite earlier services.

use std::path::Path;

use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor};

use crate::error::Result;

use super::binder::{bind_file, TemplateParams};
use super::helpers::{cpp_string_escape, to_snake_case};
use super::GeneratedFile;

/// Produces `<dir>/<stem>.mcp.{h,cc}` and, when `emit_shared` is set, the
/// shared `rust/` bridge crate, `Makefile`, and `main.cc`.
pub fn generate(
    pool: &DescriptorPool,
    file: &FileDescriptor,
    version: &str,
    emit_shared: bool,
) -> Result<Vec<GeneratedFile>> {
    if file.services().count() == 0 {
        return Ok(Vec::new());
    }

    let source = Path::new(file.name());
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("generated");

    let params = bind_file(pool, file, version)?;
    let ctx = CppContext::new(&params, dir, stem);

    let mut files = vec![
        GeneratedFile {
            name: ctx.header_path.clone(),
            content: render_header(&params, &ctx),
        },
        GeneratedFile {
            name: ctx.impl_path.clone(),
            content: render_impl(&params, &ctx),
        },
    ];

    if emit_shared {
        files.push(GeneratedFile {
            name: "rust/lib.rs".to_string(),
            content: render_bridge(&ctx),
        });
        files.push(GeneratedFile {
            name: "rust/mcp_handler.rs".to_string(),
            content: render_handler(&params, &ctx),
        });
        files.push(GeneratedFile {
            name: "rust/Cargo.toml".to_string(),
            content: render_cargo_toml(&ctx),
        });
        files.push(GeneratedFile {
            name: "rust/build.rs".to_string(),
            content: render_build_rs(&ctx),
        });
        files.push(GeneratedFile {
            name: "rust/mcp_include.h".to_string(),
            content: render_mcp_include(&ctx),
        });
        files.push(GeneratedFile {
            name: "Makefile".to_string(),
            content: render_makefile(&ctx),
        });
        files.push(GeneratedFile {
            name: "main.cc".to_string(),
            content: render_main_cc(&params, &ctx),
        });
    }

    Ok(files)
}

struct CppContext {
    namespace_open: String,
    namespace_close: String,
    header_path: String,
    impl_path: String,
    grpc_include: String,
    crate_name: String,
    first_service: String,
    first_service_snake: String,
    package: String,
}

impl CppContext {
    fn new(params: &TemplateParams, dir: &Path, stem: &str) -> Self {
        let parts: Vec<&str> = params
            .package
            .split('.')
            .filter(|p| !p.is_empty())
            .collect();
        let namespace_open = parts
            .iter()
            .map(|p| format!("namespace {p} {{"))
            .collect::<Vec<_>>()
            .join(" ");
        let namespace_close = format!(
            "{} // namespace {}",
            "} ".repeat(parts.len()).trim_end(),
            params.package.replace('.', "::")
        );
        let first = params.services.first();
        Self {
            namespace_open,
            namespace_close,
            header_path: dir
                .join(format!("{stem}.mcp.h"))
                .to_string_lossy()
                .replace('\\', "/"),
            impl_path: dir
                .join(format!("{stem}.mcp.cc"))
                .to_string_lossy()
                .replace('\\', "/"),
            grpc_include: dir
                .join(format!("{stem}.grpc.pb.h"))
                .to_string_lossy()
                .replace('\\', "/"),
            crate_name: format!("{}_mcp_cpp", params.package.replace('.', "_")),
            first_service: first.map(|s| s.name.clone()).unwrap_or_default(),
            first_service_snake: first.map(|s| to_snake_case(&s.name)).unwrap_or_default(),
            package: params.package.clone(),
        }
    }
}

/// C++ type for a message relative to the current package: short name with
/// `_` for nesting inside the package, fully-qualified `::` form outside it.
fn cpp_type_name(msg: &MessageDescriptor, current_pkg: &str) -> String {
    let msg_pkg = msg.parent_file().package_name().to_string();
    let local = msg
        .full_name()
        .strip_prefix(&format!("{msg_pkg}."))
        .unwrap_or(msg.full_name())
        .replace('.', "_");
    if msg_pkg == current_pkg {
        return local;
    }
    format!("::{}::{local}", msg_pkg.replace('.', "::"))
}

fn render_header(params: &TemplateParams, ctx: &CppContext) -> String {
    let mut buf = String::new();
    buf.push_str(&format!(
        "// Generated by protoc-gen-mcp v{}. DO NOT EDIT.\n// source: {}\n\n#pragma once\n\n#include <functional>\n#include <map>\n#include <memory>\n#include <string>\n#include <vector>\n\n#include <grpcpp/grpcpp.h>\n\n#include \"{}\"\n\n",
        params.version, params.source_path, ctx.grpc_include
    ));
    buf.push_str(&format!("{}\n\n", ctx.namespace_open));
    buf.push_str(
        "// One MCP tool backed by a gRPC method.\nstruct McpToolInfo {\n  std::string name;\n  std::string description;\n  std::string input_schema;  // JSON Schema, exact generator output\n  bool streaming = false;\n};\n\n",
    );

    for service in &params.services {
        let svc = &service.name;
        buf.push_str(&format!(
            "// Adapter publishing {} methods as MCP tools over a gRPC channel.\nclass {svc}McpAdapter {{\n public:\n  explicit {svc}McpAdapter(std::shared_ptr<grpc::Channel> channel);\n\n  // The canonical MCP endpoint path for this service.\n  static const char* DefaultBasePath();\n\n  // Tool metadata in registration order.\n  static const std::vector<McpToolInfo>& Tools();\n\n  // Invokes the tool named `tool_name` with JSON arguments. On gRPC failure\n  // the returned JSON carries {{\"code\", \"message\"}}.\n  std::string CallTool(const std::string& tool_name, const std::string& args_json);\n\n",
            service.full_name
        ));
        buf.push_str(&format!(
            " private:\n  std::unique_ptr<{svc}::Stub> stub_;\n"
        ));
        for method in &service.methods {
            buf.push_str(&format!(
                "  std::string Call{}(const std::string& args_json);\n",
                method.proto_name
            ));
        }
        buf.push_str("};\n\n");
    }
    buf.push_str(&format!("{}\n", ctx.namespace_close));
    buf
}

fn render_impl(params: &TemplateParams, ctx: &CppContext) -> String {
    let mut buf = String::new();
    buf.push_str(&format!(
        "// Generated by protoc-gen-mcp v{}. DO NOT EDIT.\n// source: {}\n\n#include \"{}\"\n\n#include <google/protobuf/util/json_util.h>\n\n",
        params.version, params.source_path, ctx.header_path
    ));
    buf.push_str(&format!("{}\n\nnamespace {{\n\n", ctx.namespace_open));
    buf.push_str(
        "std::string GrpcErrorJson(const grpc::Status& status) {\n  return \"{\\\"code\\\":\\\"\" + std::to_string(status.error_code()) + \"\\\",\\\"message\\\":\\\"\" +\n         status.error_message() + \"\\\"}\";\n}\n\n}  // namespace\n\n",
    );

    for service in &params.services {
        let svc = &service.name;

        buf.push_str(&format!(
            "{svc}McpAdapter::{svc}McpAdapter(std::shared_ptr<grpc::Channel> channel)\n    : stub_({svc}::NewStub(std::move(channel))) {{}}\n\n"
        ));
        buf.push_str(&format!(
            "const char* {svc}McpAdapter::DefaultBasePath() {{ return \"{}\"; }}\n\n",
            service.base_path
        ));

        buf.push_str(&format!(
            "const std::vector<McpToolInfo>& {svc}McpAdapter::Tools() {{\n  static const std::vector<McpToolInfo> kTools = {{\n"
        ));
        for method in &service.methods {
            let meta = &params.tool_meta[&method.key];
            let schema = &params.schema_json[&method.key];
            buf.push_str(&format!(
                "      {{\"{}\", \"{}\", \"{}\", {}}},\n",
                cpp_string_escape(&meta.name),
                cpp_string_escape(&meta.description),
                cpp_string_escape(schema),
                if method.is_streaming() { "true" } else { "false" }
            ));
        }
        buf.push_str("  };\n  return kTools;\n}\n\n");

        buf.push_str(&format!(
            "std::string {svc}McpAdapter::CallTool(const std::string& tool_name, const std::string& args_json) {{\n"
        ));
        for method in &service.methods {
            let meta = &params.tool_meta[&method.key];
            buf.push_str(&format!(
                "  if (tool_name == \"{}\") return Call{}(args_json);\n",
                cpp_string_escape(&meta.name),
                method.proto_name
            ));
        }
        buf.push_str(
            "  return \"{\\\"code\\\":\\\"NotFound\\\",\\\"message\\\":\\\"unknown tool\\\"}\";\n}\n\n",
        );

        for method in &service.methods {
            let input = cpp_type_name(&method.input, &ctx.package);
            buf.push_str(&format!(
                "std::string {svc}McpAdapter::Call{}(const std::string& args_json) {{\n  {input} request;\n  auto parse = google::protobuf::util::JsonStringToMessage(args_json, &request);\n  if (!parse.ok()) {{\n    return \"{{\\\"code\\\":\\\"InvalidArgument\\\",\\\"message\\\":\\\"bad arguments\\\"}}\";\n  }}\n  grpc::ClientContext context;\n",
                method.proto_name
            ));
            if let Some(progress) = &method.progress {
                let chunk = cpp_type_name(&progress.chunk_message, &ctx.package);
                buf.push_str(&format!(
                    "  {chunk} chunk;\n  std::string last_result = \"{{}}\";\n  auto reader = stub_->{}(&context, request);\n  while (reader->Read(&chunk)) {{\n    if (chunk.has_{}()) {{\n      google::protobuf::util::MessageToJsonString(chunk.{}(), &last_result);\n    }}\n  }}\n  grpc::Status status = reader->Finish();\n  if (!status.ok()) return GrpcErrorJson(status);\n  return last_result;\n}}\n\n",
                    method.proto_name, progress.result_field, progress.result_field
                ));
            } else {
                let output = cpp_type_name(&method.output, &ctx.package);
                buf.push_str(&format!(
                    "  {output} response;\n  grpc::Status status = stub_->{}(&context, request, &response);\n  if (!status.ok()) return GrpcErrorJson(status);\n  std::string out;\n  google::protobuf::util::MessageToJsonString(response, &out);\n  return out;\n}}\n\n",
                    method.proto_name
                ));
            }
        }
    }
    buf.push_str(&format!("{}\n", ctx.namespace_close));
    buf
}

fn render_bridge(ctx: &CppContext) -> String {
    format!(
        "// Generated by protoc-gen-mcp. cxx bridge between the Rust MCP server\n\
         // and the C++ gRPC adapter.\n\n\
         mod mcp_handler;\n\n\
         pub use mcp_handler::serve;\n\n\
         #[cxx::bridge]\n\
         pub mod ffi {{\n\
         \x20   unsafe extern \"C++\" {{\n\
         \x20       include!(\"mcp_include.h\");\n\n\
         \x20       type {svc}AdapterFfi;\n\n\
         \x20       fn new_{snake}_adapter(target: &str) -> UniquePtr<{svc}AdapterFfi>;\n\
         \x20       fn tools_json(adapter: &{svc}AdapterFfi) -> String;\n\
         \x20       fn call_tool(adapter: Pin<&mut {svc}AdapterFfi>, name: &str, args: &str) -> String;\n\
         \x20   }}\n\
         }}\n",
        svc = ctx.first_service,
        snake = ctx.first_service_snake,
    )
}

fn render_handler(params: &TemplateParams, ctx: &CppContext) -> String {
    let base_path = params
        .services
        .first()
        .map(|s| s.base_path.clone())
        .unwrap_or_else(|| "/mcp".to_string());
    format!(
        "// Generated by protoc-gen-mcp. rmcp server handler dispatching through FFI.\n\n\
         use std::sync::Mutex;\n\n\
         use rmcp::model::*;\n\
         use rmcp::service::RequestContext;\n\
         use rmcp::{{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt}};\n\n\
         use crate::ffi;\n\n\
         pub const DEFAULT_BASE_PATH: &str = \"{base_path}\";\n\n\
         pub struct BridgeHandler {{\n\
         \x20   adapter: Mutex<cxx::UniquePtr<ffi::{svc}AdapterFfi>>,\n\
         }}\n\n\
         impl BridgeHandler {{\n\
         \x20   pub fn new(grpc_target: &str) -> Self {{\n\
         \x20       Self {{ adapter: Mutex::new(ffi::new_{snake}_adapter(grpc_target)) }}\n\
         \x20   }}\n\
         }}\n\n\
         impl ServerHandler for BridgeHandler {{\n\
         \x20   fn get_info(&self) -> ServerInfo {{\n\
         \x20       ServerInfo {{\n\
         \x20           capabilities: ServerCapabilities::builder().enable_tools().build(),\n\
         \x20           ..Default::default()\n\
         \x20       }}\n\
         \x20   }}\n\n\
         \x20   fn list_tools(\n\
         \x20       &self,\n\
         \x20       _request: Option<PaginatedRequestParams>,\n\
         \x20       _context: RequestContext<RoleServer>,\n\
         \x20   ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {{\n\
         \x20       let tools_json = {{\n\
         \x20           let adapter = self.adapter.lock().unwrap();\n\
         \x20           ffi::tools_json(&adapter)\n\
         \x20       }};\n\
         \x20       std::future::ready(\n\
         \x20           serde_json::from_str(&tools_json)\n\
         \x20               .map(|tools| ListToolsResult {{ tools, ..Default::default() }})\n\
         \x20               .map_err(|err| McpError::internal_error(err.to_string(), None)),\n\
         \x20       )\n\
         \x20   }}\n\n\
         \x20   fn call_tool(\n\
         \x20       &self,\n\
         \x20       request: CallToolRequestParams,\n\
         \x20       _context: RequestContext<RoleServer>,\n\
         \x20   ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {{\n\
         \x20       let args = request\n\
         \x20           .arguments\n\
         \x20           .map(|a| serde_json::Value::Object(a).to_string())\n\
         \x20           .unwrap_or_else(|| \"{{}}\".to_string());\n\
         \x20       let text = {{\n\
         \x20           let mut adapter = self.adapter.lock().unwrap();\n\
         \x20           ffi::call_tool(adapter.as_mut().pin_mut(), &request.name, &args)\n\
         \x20       }};\n\
         \x20       std::future::ready(Ok(CallToolResult::success(vec![Content::text(text)])))\n\
         \x20   }}\n\
         }}\n\n\
         /// Serves the bridge handler over stdio.\n\
         pub async fn serve(grpc_target: &str) -> Result<(), Box<dyn std::error::Error>> {{\n\
         \x20   let service = BridgeHandler::new(grpc_target)\n\
         \x20       .serve(rmcp::transport::stdio())\n\
         \x20       .await?;\n\
         \x20   service.waiting().await?;\n\
         \x20   Ok(())\n\
         }}\n",
        svc = ctx.first_service,
        snake = ctx.first_service_snake,
    )
}

fn render_cargo_toml(ctx: &CppContext) -> String {
    format!(
        "# Generated by protoc-gen-mcp.\n\
         [package]\n\
         name = \"{crate_name}\"\n\
         version = \"0.1.0\"\n\
         edition = \"2021\"\n\n\
         [lib]\n\
         crate-type = [\"staticlib\", \"rlib\"]\n\n\
         [dependencies]\n\
         cxx = \"1\"\n\
         rmcp = {{ version = \"0.8\", features = [\"server\", \"transport-io\"] }}\n\
         serde_json = \"1\"\n\
         tokio = {{ version = \"1\", features = [\"full\"] }}\n\n\
         [build-dependencies]\n\
         cxx-build = \"1\"\n",
        crate_name = ctx.crate_name,
    )
}

fn render_build_rs(ctx: &CppContext) -> String {
    format!(
        "// Generated by protoc-gen-mcp.\n\
         fn main() {{\n\
         \x20   cxx_build::bridge(\"lib.rs\")\n\
         \x20       .file(\"../{impl_path}\")\n\
         \x20       .include(\"..\")\n\
         \x20       .include(\".\")\n\
         \x20       .flag_if_supported(\"-std=c++17\")\n\
         \x20       .compile(\"{crate_name}\");\n\
         \x20   println!(\"cargo:rerun-if-changed=lib.rs\");\n\
         \x20   println!(\"cargo:rerun-if-changed=../{impl_path}\");\n\
         \x20   println!(\"cargo:rustc-link-lib=grpc++\");\n\
         \x20   println!(\"cargo:rustc-link-lib=protobuf\");\n\
         }}\n",
        impl_path = ctx.impl_path,
        crate_name = ctx.crate_name,
    )
}

fn render_mcp_include(ctx: &CppContext) -> String {
    format!(
        "// Generated by protoc-gen-mcp. C ABI surface for the cxx bridge.\n\
         #pragma once\n\n\
         #include <memory>\n\
         #include <string>\n\n\
         #include \"rust/cxx.h\"\n\n\
         class {svc}AdapterFfi;\n\n\
         std::unique_ptr<{svc}AdapterFfi> new_{snake}_adapter(rust::Str target);\n\
         rust::String tools_json(const {svc}AdapterFfi& adapter);\n\
         rust::String call_tool({svc}AdapterFfi& adapter, rust::Str name, rust::Str args);\n",
        svc = ctx.first_service,
        snake = ctx.first_service_snake,
    )
}

fn render_makefile(ctx: &CppContext) -> String {
    format!(
        "# Generated by protoc-gen-mcp.\n\
         CXX ?= g++\n\
         CXXFLAGS ?= -std=c++17 -O2\n\
         GRPC_LIBS := $(shell pkg-config --libs grpc++ protobuf)\n\
         GRPC_CFLAGS := $(shell pkg-config --cflags grpc++ protobuf)\n\n\
         .PHONY: all server mcp clean\n\n\
         all: server mcp\n\n\
         server: main.cc\n\
         \t$(CXX) $(CXXFLAGS) $(GRPC_CFLAGS) -o {snake}_server main.cc *.pb.cc $(GRPC_LIBS)\n\n\
         mcp:\n\
         \tcd rust && cargo build --release\n\n\
         clean:\n\
         \trm -f {snake}_server\n\
         \tcd rust && cargo clean\n",
        snake = ctx.first_service_snake,
    )
}

fn render_main_cc(params: &TemplateParams, ctx: &CppContext) -> String {
    let ns = ctx.package.replace('.', "::");
    format!(
        "// Generated by protoc-gen-mcp. gRPC server scaffold; fill in the\n\
         // service implementation and wire the MCP bridge from rust/.\n\n\
         #include <iostream>\n\
         #include <memory>\n\
         #include <string>\n\n\
         #include <grpcpp/grpcpp.h>\n\n\
         #include \"{header}\"\n\n\
         int main(int argc, char** argv) {{\n\
         \x20 std::string target = argc > 1 ? argv[1] : \"localhost:50051\";\n\
         \x20 auto channel = grpc::CreateChannel(target, grpc::InsecureChannelCredentials());\n\
         \x20 {ns}::{svc}McpAdapter adapter(channel);\n\
         \x20 std::cout << \"{count} tool(s) available at \" << adapter.DefaultBasePath() << std::endl;\n\
         \x20 for (const auto& tool : {ns}::{svc}McpAdapter::Tools()) {{\n\
         \x20   std::cout << \"  \" << tool.name << \": \" << tool.description << std::endl;\n\
         \x20 }}\n\
         \x20 return 0;\n\
         }}\n",
        header = ctx.header_path,
        ns = ns,
        svc = ctx.first_service,
        count = params.services.iter().map(|s| s.methods.len()).sum::<usize>(),
    )
}
