//! Shared helpers for the per-language generators: case conversion, comment
//! cleanup, string escaping, and source-info comment lookup.

use prost_reflect::FileDescriptor;

/// Converts a CamelCase string to snake_case.
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Converts a CamelCase or snake_case string to SCREAMING_SNAKE_CASE.
pub fn to_screaming_snake_case(s: &str) -> String {
    to_snake_case(s).to_ascii_uppercase()
}

/// Converts a dotted, underscored, or dashed string to PascalCase.
pub fn to_pascal_case(input: &str) -> String {
    input
        .split(|c: char| c == '.' || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

const STRIPPED_COMMENT_PREFIXES: &[&str] = &["buf:lint:", "@ignore-comment"];

/// Strips annotation prefixes that should not appear in MCP tool descriptions
/// and joins the remaining lines with single spaces.
pub fn clean_comment(comment: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    'lines: for line in comment.split('\n') {
        let trimmed = line.trim();
        for prefix in STRIPPED_COMMENT_PREFIXES {
            if trimmed.starts_with(prefix) {
                continue 'lines;
            }
        }
        if !trimmed.is_empty() {
            out.push(trimmed);
        }
    }
    out.join(" ").trim().to_string()
}

/// Escapes backslashes and double quotes for use inside a Rust "..." string literal.
pub fn rs_string_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escapes backslashes and double quotes for use inside a C++ "..." string literal.
pub fn cpp_string_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escapes backslashes and double quotes for use inside a Go "..." string literal.
pub fn go_string_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Wraps a string as a Python string literal, using triple-quotes for multiline.
pub fn py_string_literal(s: &str) -> String {
    let s = s.trim().replace('\\', "\\\\").replace('"', "\\\"");
    if s.contains('\n') {
        format!("\"\"\"{s}\"\"\"")
    } else {
        format!("\"{s}\"")
    }
}

/// Returns the leading comment recorded in the file's source info for the
/// element at `path`, or an empty string when the file carries no source info
/// (descriptor sets built without `--include_source_info`).
pub fn leading_comment(file: &FileDescriptor, path: &[i32]) -> String {
    let Some(info) = file.file_descriptor_proto().source_code_info.as_ref() else {
        return String::new();
    };
    info.location
        .iter()
        .find(|loc| loc.path == path)
        .and_then(|loc| loc.leading_comments.clone())
        .unwrap_or_default()
}

/// Human-readable description for a schema field: the cleaned leading comment
/// when present, else the field name with underscores opened up.
pub fn field_description(name: &str, cleaned_comment: &str) -> String {
    if !cleaned_comment.is_empty() {
        return cleaned_comment.to_string();
    }
    name.replace('_', " ")
}
