//! Python code generation: one `<stem>_pb2_mcp.py` per proto source file,
//! targeting the official MCP Python SDK and `grpc.aio`.

use std::collections::BTreeSet;
use std::path::Path;

use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor};

use crate::error::Result;

use super::binder::{bind_file, BoundService, TemplateParams};
use super::helpers::{py_string_literal, to_snake_case};
use super::GeneratedFile;

/// Produces the `*_pb2_mcp.py` output file. No-op for files without services.
pub fn generate(
    pool: &DescriptorPool,
    file: &FileDescriptor,
    version: &str,
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
    let out_name = dir
        .join(format!("{stem}_pb2_mcp.py"))
        .to_string_lossy()
        .replace('\\', "/");

    let params = bind_file(pool, file, version)?;
    let content = render(&params);

    Ok(vec![GeneratedFile {
        name: out_name,
        content,
    }])
}

/// Python module for a message's `*_pb2` file, e.g.
/// `store.apps.todo.v1.todo_pb2` for a message from `store/apps/todo/v1/todo.proto`.
fn proto_py_module(msg: &MessageDescriptor) -> String {
    let path = msg.parent_file().name().trim_end_matches(".proto").to_string();
    format!("{}_pb2", path.replace('/', "."))
}

/// Fully-qualified Python type for a message, e.g.
/// `store.apps.todo.v1.todo_pb2.Todo`.
fn proto_py_type(msg: &MessageDescriptor) -> String {
    format!("{}.{}", proto_py_module(msg), msg.name())
}

fn render(params: &TemplateParams) -> String {
    let mut buf = String::new();

    buf.push_str(&format!(
        "# Generated by protoc-gen-mcp v{}. DO NOT EDIT.\n# source: {}\n",
        params.version, params.source_path
    ));
    buf.push_str("\"\"\"MCP bindings for the gRPC services defined in the source proto.\"\"\"\n\n");
    buf.push_str("from __future__ import annotations\n\n");
    buf.push_str("import asyncio\nimport contextlib\nimport json\nimport logging\n\n");
    buf.push_str("import grpc\nimport mcp.types as types\nfrom google.protobuf import json_format\nfrom mcp.server.lowlevel import Server\n\n");

    // Import every *_pb2 module the request/response types live in.
    let mut modules = BTreeSet::new();
    for service in &params.services {
        for method in &service.methods {
            modules.insert(proto_py_module(&method.input));
            modules.insert(proto_py_module(&method.output));
        }
    }
    for module in &modules {
        buf.push_str(&format!("import {module}\n"));
    }
    buf.push_str("\nlog = logging.getLogger(__name__)\n\n");
    buf.push_str("_PROGRESS_COMPLETE_TOTAL = 1.0\n\n");

    for service in &params.services {
        render_service(&mut buf, params, service);
    }

    buf
}

fn render_service(buf: &mut String, params: &TemplateParams, service: &BoundService) {
    let svc_snake = to_snake_case(&service.name);
    let svc_upper = svc_snake.to_uppercase();

    buf.push_str(&format!(
        "{svc_upper}_MCP_DEFAULT_BASE_PATH = \"{}\"\n\"\"\"Canonical MCP endpoint path for {}.\"\"\"\n\n",
        service.base_path, service.full_name
    ));

    // Tool table: name -> (description, schema, request type).
    buf.push_str(&format!("{svc_upper}_TOOLS = {{\n"));
    for method in &service.methods {
        let meta = &params.tool_meta[&method.key];
        let schema = &params.schema_json[&method.key];
        buf.push_str(&format!(
            "    \"{}\": {{\n        \"description\": {},\n        \"schema\": json.loads({}),\n        \"request\": {},\n        \"streaming\": {},\n    }},\n",
            meta.name,
            py_string_literal(&meta.description),
            py_string_literal(schema),
            proto_py_type(&method.input),
            if method.is_streaming() { "True" } else { "False" }
        ));
    }
    buf.push_str("}\n\n");

    // In-process registration.
    buf.push_str(&format!(
        "def register_{svc_snake}_mcp_handler(server: Server, impl) -> None:\n    \"\"\"Register every {} tool against a local implementation.\n\n    The implementation exposes one ``async def`` per RPC, taking the request\n    message and returning the response message; streaming methods take an\n    additional queue and put (progress, result) chunks on it.\n    \"\"\"\n\n",
        service.full_name
    ));
    buf.push_str(&format!(
        "    @server.list_tools()\n    async def _list_tools() -> list[types.Tool]:\n        return [\n            types.Tool(name=name, description=tool[\"description\"], inputSchema=tool[\"schema\"])\n            for name, tool in {svc_upper}_TOOLS.items()\n        ]\n\n"
    ));
    buf.push_str("    @server.call_tool()\n    async def _call_tool(name: str, arguments: dict) -> list[types.TextContent]:\n");
    for method in &service.methods {
        let meta = &params.tool_meta[&method.key];
        let request_type = proto_py_type(&method.input);
        buf.push_str(&format!("        if name == \"{}\":\n", meta.name));
        buf.push_str(&format!(
            "            request = json_format.ParseDict(arguments, {request_type}())\n"
        ));
        if method.is_streaming() {
            buf.push_str(&format!(
                "            session = server.request_context.session\n\
                 \x20           token = None\n\
                 \x20           meta = server.request_context.meta\n\
                 \x20           if meta is not None:\n\
                 \x20               token = meta.progressToken\n\
                 \x20           queue: asyncio.Queue = asyncio.Queue(maxsize=16)\n\
                 \x20           asyncio.create_task(_run_{svc_snake}_{m}(impl, request, queue))\n\
                 \x20           asyncio.create_task(_relay_{svc_snake}_{m}(session, token, queue))\n\
                 \x20           return [types.TextContent(type=\"text\", text='{{\"status\":\"started\"}}')]\n",
                m = method.snake_name
            ));
        } else {
            buf.push_str(&format!(
                "            response = await impl.{}(request)\n\
                 \x20           return [types.TextContent(type=\"text\", text=json_format.MessageToJson(response))]\n",
                method.snake_name
            ));
        }
    }
    buf.push_str("        raise ValueError(f\"unknown tool: {name}\")\n\n");

    // Streaming helpers.
    for method in &service.methods {
        let Some(_progress) = &method.progress else { continue };
        buf.push_str(&format!(
            "async def _run_{svc_snake}_{}(impl, request, queue: asyncio.Queue) -> None:\n    \"\"\"Drive the streaming implementation and close the queue with ``None``.\"\"\"\n    try:\n        await impl.{}(request, queue)\n    except Exception:\n        log.exception(\"stream producer failed\")\n    finally:\n        await queue.put(None)\n\n",
            method.snake_name, method.snake_name
        ));
    }
    for method in &service.methods {
        let Some(progress) = &method.progress else { continue };
        buf.push_str(&format!(
            "async def _relay_{svc_snake}_{}(session, token, queue: asyncio.Queue) -> None:\n\
             \x20   \"\"\"Forward queued chunks as MCP progress notifications.\"\"\"\n\
             \x20   while True:\n\
             \x20       chunk = await queue.get()\n\
             \x20       if chunk is None:\n\
             \x20           return\n\
             \x20       if token is None:\n\
             \x20           continue\n\
             \x20       which = chunk.WhichOneof(\"{}\")\n\
             \x20       if which == \"{}\":\n\
             \x20           p = chunk.{}\n\
             \x20           await session.send_progress_notification(token, p.progress, total=p.total, message=p.message)\n\
             \x20       elif which == \"{}\":\n\
             \x20           payload = json_format.MessageToJson(chunk.{})\n\
             \x20           await session.send_progress_notification(\n\
             \x20               token, _PROGRESS_COMPLETE_TOTAL, total=_PROGRESS_COMPLETE_TOTAL, message=payload\n\
             \x20           )\n\
             \x20           return\n\n",
            method.snake_name,
            oneof_py_name(progress),
            progress.progress_field,
            progress.progress_field,
            progress.result_field,
            progress.result_field
        ));
    }

    // Forward registration.
    buf.push_str(&format!(
        "def forward_to_{svc_snake}_mcp_client(server: Server, stub) -> None:\n    \"\"\"Register every {} tool forwarding to a remote gRPC stub.\"\"\"\n\n",
        service.full_name
    ));
    buf.push_str(&format!(
        "    @server.list_tools()\n    async def _list_tools() -> list[types.Tool]:\n        return [\n            types.Tool(name=name, description=tool[\"description\"], inputSchema=tool[\"schema\"])\n            for name, tool in {svc_upper}_TOOLS.items()\n        ]\n\n"
    ));
    buf.push_str("    @server.call_tool()\n    async def _call_tool(name: str, arguments: dict) -> list[types.TextContent]:\n");
    for method in &service.methods {
        let meta = &params.tool_meta[&method.key];
        let request_type = proto_py_type(&method.input);
        buf.push_str(&format!("        if name == \"{}\":\n", meta.name));
        buf.push_str(&format!(
            "            request = json_format.ParseDict(arguments, {request_type}())\n"
        ));
        if let Some(progress) = &method.progress {
            buf.push_str(&format!(
                "            session = server.request_context.session\n\
                 \x20           meta = server.request_context.meta\n\
                 \x20           token = meta.progressToken if meta is not None else None\n\
                 \x20           metadata = [(\"mcp-progress-token\", str(token))] if token is not None else []\n\
                 \x20           stream = stub.{}(request, metadata=metadata)\n\
                 \x20           asyncio.create_task(_forward_{svc_snake}_{}(session, token, stream))\n\
                 \x20           return [types.TextContent(type=\"text\", text='{{\"status\":\"started\"}}')]\n",
                method.proto_name, method.snake_name
            ));
            // Forward relay helper appended after the function body.
            let _ = progress;
        } else {
            buf.push_str(&format!(
                "            try:\n\
                 \x20               response = await stub.{}(request)\n\
                 \x20           except grpc.aio.AioRpcError as err:\n\
                 \x20               error = {{\"code\": err.code().name, \"message\": err.details()}}\n\
                 \x20               return [types.TextContent(type=\"text\", text=json.dumps(error))]\n\
                 \x20           return [types.TextContent(type=\"text\", text=json_format.MessageToJson(response))]\n",
                method.proto_name
            ));
        }
    }
    buf.push_str("        raise ValueError(f\"unknown tool: {name}\")\n\n");

    for method in &service.methods {
        let Some(progress) = &method.progress else { continue };
        buf.push_str(&format!(
            "async def _forward_{svc_snake}_{}(session, token, stream) -> None:\n\
             \x20   \"\"\"Relay remote stream chunks as MCP progress notifications.\"\"\"\n\
             \x20   with contextlib.suppress(grpc.aio.AioRpcError):\n\
             \x20       async for chunk in stream:\n\
             \x20           if token is None:\n\
             \x20               continue\n\
             \x20           which = chunk.WhichOneof(\"{}\")\n\
             \x20           if which == \"{}\":\n\
             \x20               p = chunk.{}\n\
             \x20               await session.send_progress_notification(token, p.progress, total=p.total, message=p.message)\n\
             \x20           elif which == \"{}\":\n\
             \x20               payload = json_format.MessageToJson(chunk.{})\n\
             \x20               await session.send_progress_notification(\n\
             \x20                   token, _PROGRESS_COMPLETE_TOTAL, total=_PROGRESS_COMPLETE_TOTAL, message=payload\n\
             \x20               )\n\
             \x20               return\n\n",
            method.snake_name,
            oneof_py_name(progress),
            progress.progress_field,
            progress.progress_field,
            progress.result_field,
            progress.result_field
        ));
    }

    // Serve = boot + register + run.
    buf.push_str(&format!(
        "async def serve_{svc_snake}_mcp(\n    impl,\n    *,\n    transport: str = \"streamable-http\",\n    host: str = \"0.0.0.0\",\n    port: int = 8080,\n    base_path: str = {svc_upper}_MCP_DEFAULT_BASE_PATH,\n) -> None:\n    \"\"\"Boot an MCP server for {}, register the in-process handlers, and serve.\"\"\"\n    server = Server(\"{svc_snake}\")\n    register_{svc_snake}_mcp_handler(server, impl)\n    await _serve_{svc_snake}(server, transport=transport, host=host, port=port, base_path=base_path)\n\n",
        service.full_name
    ));
    buf.push_str(&format!(
        "async def _serve_{svc_snake}(server: Server, *, transport: str, host: str, port: int, base_path: str) -> None:\n\
         \x20   if transport == \"stdio\":\n\
         \x20       from mcp.server.stdio import stdio_server\n\n\
         \x20       async with stdio_server() as (read_stream, write_stream):\n\
         \x20           await server.run(read_stream, write_stream, server.create_initialization_options())\n\
         \x20       return\n\
         \x20   if transport == \"sse\":\n\
         \x20       from mcp.server.sse import SseServerTransport\n\n\
         \x20       import uvicorn\n\
         \x20       from starlette.applications import Starlette\n\
         \x20       from starlette.routing import Mount, Route\n\n\
         \x20       sse = SseServerTransport(base_path + \"/message\")\n\n\
         \x20       async def handle_sse(request):\n\
         \x20           async with sse.connect_sse(request.scope, request.receive, request._send) as streams:\n\
         \x20               await server.run(streams[0], streams[1], server.create_initialization_options())\n\n\
         \x20       app = Starlette(routes=[\n\
         \x20           Route(base_path + \"/sse\", endpoint=handle_sse),\n\
         \x20           Mount(base_path + \"/message\", app=sse.handle_post_message),\n\
         \x20       ])\n\
         \x20       await uvicorn.Server(uvicorn.Config(app, host=host, port=port, log_level=\"info\")).serve()\n\
         \x20       return\n\
         \x20   if transport == \"streamable-http\":\n\
         \x20       import uvicorn\n\
         \x20       from mcp.server.streamable_http_manager import StreamableHTTPSessionManager\n\
         \x20       from starlette.applications import Starlette\n\
         \x20       from starlette.routing import Mount\n\n\
         \x20       manager = StreamableHTTPSessionManager(app=server, json_response=False)\n\n\
         \x20       app = Starlette(routes=[Mount(base_path, app=manager.handle_request)], lifespan=lambda app: manager.run())\n\
         \x20       await uvicorn.Server(uvicorn.Config(app, host=host, port=port, log_level=\"info\")).serve()\n\
         \x20       return\n\
         \x20   raise ValueError(f\"unsupported transport: {{transport}}\")\n\n"
    ));
}

fn oneof_py_name(progress: &super::progress::StreamProgressInfo) -> String {
    progress
        .chunk_message
        .oneofs()
        .find(|oo| oo.fields().any(|f| f.name() == progress.progress_field))
        .map(|oo| oo.name().to_string())
        .unwrap_or_else(|| "payload".to_string())
}
