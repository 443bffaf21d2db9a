//! Extraction of MCP and Google-API proto options from descriptors.
//!
//! Three extension families are read: our `mcp.protobuf.*` options,
//! `google.api.resource` / `google.api.field_behavior`, and
//! `buf.validate.field`. Extension payloads are decoded out of the dynamic
//! option message into small mirror types that carry only the fields the
//! generator consumes.

use prost::Message;
use prost_reflect::{
    DescriptorPool, DynamicMessage, ExtensionDescriptor, FieldDescriptor, Kind, MessageDescriptor,
    MethodDescriptor, ServiceDescriptor, Value,
};
use serde_json::{json, Map};

use crate::mcppb;

use super::helpers::{clean_comment, field_description, leading_comment, to_screaming_snake_case};

/// Fully-qualified names of the extensions the generator reads.
pub const EXT_MCP_SERVICE: &str = "mcp.protobuf.service";
pub const EXT_MCP_TOOL: &str = "mcp.protobuf.tool";
pub const EXT_MCP_PROMPT: &str = "mcp.protobuf.prompt";
pub const EXT_MCP_ELICITATION: &str = "mcp.protobuf.elicitation";
pub const EXT_GOOGLE_RESOURCE: &str = "google.api.resource";
pub const EXT_GOOGLE_FIELD_BEHAVIOR: &str = "google.api.field_behavior";
pub const EXT_BUF_VALIDATE_FIELD: &str = "buf.validate.field";

/// `google.api.FieldBehavior.REQUIRED`.
const FIELD_BEHAVIOR_REQUIRED: i32 = 2;

/// Language-neutral view of `MCPServiceOptions` for templates.
#[derive(Debug, Clone, Default)]
pub struct McpServiceOpts {
    pub app: Option<McpAppOpts>,
    pub resources: Vec<McpResourceOpts>,
}

/// Language-neutral view of per-RPC MCP options for templates.
#[derive(Debug, Clone, Default)]
pub struct McpMethodOpts {
    pub tool_name: String,
    pub tool_description: String,
    pub prompt: Option<McpPromptOpts>,
    pub elicitation: Option<McpElicitationOpts>,
}

/// Mirrors `MCPApp` for templates.
#[derive(Debug, Clone)]
pub struct McpAppOpts {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Mirrors `MCPPrompt` for templates. Arguments are derived from the proto
/// message referenced by `schema`.
#[derive(Debug, Clone, Default)]
pub struct McpPromptOpts {
    pub name: String,
    pub description: String,
    pub schema: String,
    pub arguments: Vec<SchemaField>,
}

/// Mirrors `MCPResource` for templates.
#[derive(Debug, Clone)]
pub struct McpResourceOpts {
    pub uri: String,
    pub uri_template: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Mirrors `MCPElicitation` for templates. Fields are derived from the proto
/// message referenced by `schema`.
#[derive(Debug, Clone, Default)]
pub struct McpElicitationOpts {
    pub message: String,
    pub schema: String,
    pub fields: Vec<SchemaField>,
}

/// A resolved field from a schema proto message.
#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub json_type: String,
    pub enum_values: Vec<String>,
}

// Partial mirrors of third-party option messages. Only the fields the
// generator reads are declared; prost skips the rest on decode.

#[derive(Clone, PartialEq, ::prost::Message)]
struct RawResourceDescriptor {
    #[prost(string, tag = "1")]
    r#type: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "2")]
    pattern: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, tag = "5")]
    plural: ::prost::alloc::string::String,
    #[prost(string, tag = "6")]
    singular: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct RawFieldRules {
    #[prost(message, optional, tag = "3")]
    pub int32: ::core::option::Option<RawInt32Rules>,
    #[prost(message, optional, tag = "4")]
    pub int64: ::core::option::Option<RawInt64Rules>,
    #[prost(message, optional, tag = "14")]
    pub string: ::core::option::Option<RawStringRules>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct RawStringRules {
    #[prost(uint64, optional, tag = "2")]
    pub min_len: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "3")]
    pub max_len: ::core::option::Option<u64>,
    #[prost(string, optional, tag = "6")]
    pub pattern: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "12")]
    pub email: ::core::option::Option<bool>,
    #[prost(bool, optional, tag = "22")]
    pub uuid: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct RawInt32Rules {
    #[prost(int32, optional, tag = "2")]
    pub lt: ::core::option::Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub lte: ::core::option::Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub gt: ::core::option::Option<i32>,
    #[prost(int32, optional, tag = "5")]
    pub gte: ::core::option::Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct RawInt64Rules {
    #[prost(int64, optional, tag = "2")]
    pub lt: ::core::option::Option<i64>,
    #[prost(int64, optional, tag = "3")]
    pub lte: ::core::option::Option<i64>,
    #[prost(int64, optional, tag = "4")]
    pub gt: ::core::option::Option<i64>,
    #[prost(int64, optional, tag = "5")]
    pub gte: ::core::option::Option<i64>,
}

/// Decodes an extension payload from a dynamic options message into `T`.
fn decode_extension<T: Message + Default>(
    opts: &DynamicMessage,
    ext: &ExtensionDescriptor,
) -> Option<T> {
    if !opts.has_extension(ext) {
        return None;
    }
    let val = opts.get_extension(ext);
    if let Value::Message(msg) = val.as_ref() {
        return T::decode(msg.encode_to_vec().as_slice()).ok();
    }
    None
}

/// Reads the `mcp.protobuf.service` extension from a service descriptor.
pub fn extract_service_options(
    pool: &DescriptorPool,
    svc: &ServiceDescriptor,
) -> Option<McpServiceOpts> {
    let ext = pool.get_extension_by_name(EXT_MCP_SERVICE)?;
    let raw: mcppb::McpServiceOptions = decode_extension(&svc.options(), &ext)?;

    let mut result = McpServiceOpts::default();
    if let Some(app) = raw.app {
        result.app = Some(McpAppOpts {
            name: app.name,
            version: app.version,
            description: app.description,
        });
    }
    for res in raw.resources {
        let mime = mcppb::McpMimeType::try_from(res.mime_type)
            .unwrap_or(mcppb::McpMimeType::Unspecified);
        result.resources.push(McpResourceOpts {
            uri: res.uri,
            uri_template: res.uri_template,
            name: res.name,
            description: res.description,
            mime_type: mime_type_to_string(mime).to_string(),
        });
    }
    Some(result)
}

/// Reads `mcp.protobuf.tool`, `mcp.protobuf.prompt`, and
/// `mcp.protobuf.elicitation` extensions from a method descriptor and merges
/// them into a single [`McpMethodOpts`].
pub fn extract_method_options(
    pool: &DescriptorPool,
    meth: &MethodDescriptor,
) -> Option<McpMethodOpts> {
    let opts = meth.options();
    let mut result = McpMethodOpts::default();
    let mut has_anything = false;

    if let Some(ext) = pool.get_extension_by_name(EXT_MCP_TOOL) {
        if let Some(tool) = decode_extension::<mcppb::McpToolOptions>(&opts, &ext) {
            result.tool_name = tool.name;
            result.tool_description = tool.description;
            has_anything = true;
        }
    }

    if let Some(ext) = pool.get_extension_by_name(EXT_MCP_PROMPT) {
        if let Some(prompt) = decode_extension::<mcppb::McpPrompt>(&opts, &ext) {
            result.prompt = Some(McpPromptOpts {
                name: prompt.name,
                description: prompt.description,
                schema: prompt.schema,
                arguments: Vec::new(),
            });
            has_anything = true;
        }
    }

    if let Some(ext) = pool.get_extension_by_name(EXT_MCP_ELICITATION) {
        if let Some(elicit) = decode_extension::<mcppb::McpElicitation>(&opts, &ext) {
            result.elicitation = Some(McpElicitationOpts {
                message: elicit.message,
                schema: elicit.schema,
                fields: Vec::new(),
            });
            has_anything = true;
        }
    }

    if !has_anything {
        return None;
    }
    Some(result)
}

/// Scans all unary methods of a service and collects `google.api.resource`
/// annotations from response message types. Each unique resource pattern
/// becomes an [`McpResourceOpts`] with a URI template derived from the
/// pattern and a scheme based on the resource's singular name.
pub fn extract_google_api_resources(
    pool: &DescriptorPool,
    svc: &ServiceDescriptor,
) -> Vec<McpResourceOpts> {
    let Some(ext) = pool.get_extension_by_name(EXT_GOOGLE_RESOURCE) else {
        return Vec::new();
    };

    let mut seen = std::collections::HashSet::new();
    let mut resources = Vec::new();

    for meth in svc.methods() {
        if meth.is_client_streaming() || meth.is_server_streaming() {
            continue;
        }
        let Some(rd) = decode_extension::<RawResourceDescriptor>(&meth.output().options(), &ext)
        else {
            continue;
        };

        // Scheme from singular name, or fall back to the type's resource kind.
        let type_kind = rd.r#type.split_once('/').map(|(_, kind)| kind);
        let scheme = if !rd.singular.is_empty() {
            rd.singular.clone()
        } else {
            type_kind
                .map(|k| k.to_ascii_lowercase())
                .unwrap_or_else(|| "resource".to_string())
        };
        let display_name = type_kind.map(str::to_string).unwrap_or_else(|| scheme.clone());

        for pattern in &rd.pattern {
            let uri_template = format!("{scheme}://{pattern}");
            if !seen.insert(uri_template.clone()) {
                continue;
            }
            resources.push(McpResourceOpts {
                uri: String::new(),
                uri_template,
                name: display_name.clone(),
                description: format!("{display_name} resource ({pattern})"),
                mime_type: "application/json".to_string(),
            });
        }
    }
    resources
}

/// Checks whether a field has the REQUIRED `google.api.field_behavior`.
pub fn is_field_required(pool: &DescriptorPool, fd: &FieldDescriptor) -> bool {
    let Some(ext) = pool.get_extension_by_name(EXT_GOOGLE_FIELD_BEHAVIOR) else {
        return false;
    };
    let opts = fd.options();
    if !opts.has_extension(&ext) {
        return false;
    }
    match opts.get_extension(&ext).as_ref() {
        Value::List(behaviors) => behaviors
            .iter()
            .any(|v| matches!(v, Value::EnumNumber(n) if *n == FIELD_BEHAVIOR_REQUIRED)),
        _ => false,
    }
}

/// Reads `buf.validate.field` rules and returns JSON Schema constraints.
pub fn extract_validate_constraints(
    pool: &DescriptorPool,
    fd: &FieldDescriptor,
) -> Map<String, serde_json::Value> {
    let Some(ext) = pool.get_extension_by_name(EXT_BUF_VALIDATE_FIELD) else {
        return Map::new();
    };
    match decode_extension::<RawFieldRules>(&fd.options(), &ext) {
        Some(rules) => constraints_from_rules(&rules),
        None => Map::new(),
    }
}

/// Projects decoded validation rules into JSON Schema keywords. Open integer
/// bounds are tightened: `gt` becomes `minimum: gt + 1`, `lt` becomes
/// `maximum: lt - 1`.
pub(crate) fn constraints_from_rules(rules: &RawFieldRules) -> Map<String, serde_json::Value> {
    let mut constraints = Map::new();

    if let Some(sr) = &rules.string {
        if sr.uuid == Some(true) {
            constraints.insert("format".to_string(), json!("uuid"));
        }
        if sr.email == Some(true) {
            constraints.insert("format".to_string(), json!("email"));
        }
        if let Some(pattern) = sr.pattern.as_deref().filter(|p| !p.is_empty()) {
            constraints.insert("pattern".to_string(), json!(pattern));
        }
        if let Some(min) = sr.min_len {
            constraints.insert("minLength".to_string(), json!(min));
        }
        if let Some(max) = sr.max_len {
            constraints.insert("maxLength".to_string(), json!(max));
        }
    }

    if let Some(r) = &rules.int32 {
        apply_int_range(
            &mut constraints,
            r.gt.map(i64::from),
            r.gte.map(i64::from),
            r.lt.map(i64::from),
            r.lte.map(i64::from),
        );
    }
    if let Some(r) = &rules.int64 {
        apply_int_range(&mut constraints, r.gt, r.gte, r.lt, r.lte);
    }

    constraints
}

fn apply_int_range(
    constraints: &mut Map<String, serde_json::Value>,
    gt: Option<i64>,
    gte: Option<i64>,
    lt: Option<i64>,
    lte: Option<i64>,
) {
    if let Some(gt) = gt {
        constraints.insert("minimum".to_string(), json!(gt + 1));
    } else if let Some(gte) = gte {
        constraints.insert("minimum".to_string(), json!(gte));
    }
    if let Some(lt) = lt {
        constraints.insert("maximum".to_string(), json!(lt - 1));
    } else if let Some(lte) = lte {
        constraints.insert("maximum".to_string(), json!(lte));
    }
}

/// Looks up a proto message by its fully-qualified name (e.g.
/// `"todo.v1.CreateTodoConfirmation"`) across every file in the plugin input,
/// then extracts each field's name, description (from the leading comment),
/// required-ness, JSON type, and enum values. An unresolved reference yields
/// an empty list: schemas may live in files not visible to every run.
pub fn resolve_schema_fields(pool: &DescriptorPool, schema_fqn: &str) -> Vec<SchemaField> {
    if schema_fqn.is_empty() {
        return Vec::new();
    }

    let mut msg = None;
    'files: for file in pool.files() {
        for top in file.messages() {
            if let Some(found) = find_message(&top, schema_fqn) {
                msg = Some(found);
                break 'files;
            }
        }
    }
    let Some(msg) = msg else {
        return Vec::new();
    };

    let file = msg.parent_file();
    let mut fields = Vec::new();
    for field in msg.fields() {
        let comment = clean_comment(&leading_comment(&file, field.path()));
        let mut sf = SchemaField {
            name: field.name().to_string(),
            description: field_description(field.name(), &comment),
            required: is_field_required(pool, &field),
            json_type: proto_kind_to_json_type(&field.kind()),
            enum_values: Vec::new(),
        };
        // Enum fields are presented as string choices (skip UNSPECIFIED).
        if let Kind::Enum(enum_desc) = field.kind() {
            for value in enum_desc.values() {
                let name = value.name();
                if name.ends_with("_UNSPECIFIED") {
                    continue;
                }
                sf.enum_values
                    .push(enum_value_friendly_name(name, enum_desc.name()));
            }
            sf.json_type = "string".to_string();
        }
        fields.push(sf);
    }
    fields
}

/// Recursively searches a message and its nested messages by fully-qualified name.
fn find_message(msg: &MessageDescriptor, fqn: &str) -> Option<MessageDescriptor> {
    if msg.full_name() == fqn {
        return Some(msg.clone());
    }
    for child in msg.child_messages() {
        if let Some(found) = find_message(&child, fqn) {
            return Some(found);
        }
    }
    None
}

/// Maps protobuf field kinds to JSON Schema types for resolved schema fields.
fn proto_kind_to_json_type(kind: &Kind) -> String {
    match kind {
        Kind::Bool => "boolean",
        Kind::Int32
        | Kind::Sint32
        | Kind::Uint32
        | Kind::Int64
        | Kind::Sint64
        | Kind::Uint64
        | Kind::Fixed32
        | Kind::Fixed64
        | Kind::Sfixed32
        | Kind::Sfixed64 => "integer",
        Kind::Float | Kind::Double => "number",
        _ => "string",
    }
    .to_string()
}

/// Strips the enum type prefix and lowercases the result.
/// E.g. `"CONFIRM_ACTION_YES"` with enum name `"ConfirmAction"` becomes `"yes"`.
fn enum_value_friendly_name(value_name: &str, enum_name: &str) -> String {
    let prefix = to_screaming_snake_case(enum_name) + "_";
    match value_name.strip_prefix(&prefix) {
        Some(rest) => rest.to_ascii_lowercase(),
        None => value_name.to_ascii_lowercase(),
    }
}

/// Maps the `MCPMimeType` enum to its MIME string.
pub fn mime_type_to_string(mt: mcppb::McpMimeType) -> &'static str {
    use mcppb::McpMimeType::*;
    match mt {
        TextPlain => "text/plain",
        TextHtml => "text/html",
        TextMarkdown => "text/markdown",
        ApplicationXml => "application/xml",
        ApplicationOctetStream => "application/octet-stream",
        ApplicationPdf => "application/pdf",
        ImagePng => "image/png",
        ImageJpeg => "image/jpeg",
        _ => "application/json",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_value_friendly_name() {
        assert_eq!(
            enum_value_friendly_name("CONFIRM_ACTION_YES", "ConfirmAction"),
            "yes"
        );
        assert_eq!(
            enum_value_friendly_name("PRIORITY_HIGH", "Priority"),
            "high"
        );
        assert_eq!(enum_value_friendly_name("ODDBALL", "Priority"), "oddball");
    }

    #[test]
    fn test_mime_type_to_string() {
        assert_eq!(
            mime_type_to_string(mcppb::McpMimeType::TextHtml),
            "text/html"
        );
        assert_eq!(
            mime_type_to_string(mcppb::McpMimeType::Unspecified),
            "application/json"
        );
        assert_eq!(
            mime_type_to_string(mcppb::McpMimeType::ApplicationJson),
            "application/json"
        );
    }

    #[test]
    fn test_string_constraints() {
        let rules = RawFieldRules {
            string: Some(RawStringRules {
                min_len: Some(1),
                max_len: Some(40),
                pattern: Some("^todo-".to_string()),
                email: None,
                uuid: Some(true),
            }),
            ..Default::default()
        };
        let constraints = constraints_from_rules(&rules);
        assert_eq!(constraints["format"], "uuid");
        assert_eq!(constraints["pattern"], "^todo-");
        assert_eq!(constraints["minLength"], 1);
        assert_eq!(constraints["maxLength"], 40);
    }

    #[test]
    fn test_int_open_bounds_tightened() {
        let rules = RawFieldRules {
            int32: Some(RawInt32Rules {
                gt: Some(0),
                lt: Some(100),
                gte: None,
                lte: None,
            }),
            ..Default::default()
        };
        let constraints = constraints_from_rules(&rules);
        assert_eq!(constraints["minimum"], 1);
        assert_eq!(constraints["maximum"], 99);
    }

    #[test]
    fn test_int_closed_bounds_kept() {
        let rules = RawFieldRules {
            int64: Some(RawInt64Rules {
                gte: Some(5),
                lte: Some(10),
                gt: None,
                lt: None,
            }),
            ..Default::default()
        };
        let constraints = constraints_from_rules(&rules);
        assert_eq!(constraints["minimum"], 5);
        assert_eq!(constraints["maximum"], 10);
    }

    #[test]
    fn test_no_rules_no_constraints() {
        assert!(constraints_from_rules(&RawFieldRules::default()).is_empty());
    }
}
