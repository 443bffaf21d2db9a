//! MCP tool-name derivation from fully-qualified RPC names.

use sha1::{Digest, Sha1};

use super::helpers::to_snake_case;

const MAX_TOOL_NAME_LEN: usize = 64;

/// Produces a compact, lowercase MCP tool name in the format
/// `servicename-methodname_v{version}` from the protobuf full method name
/// (e.g. `"store.apps.utilities.clock.v1.ClockService.ConvertTime"`).
/// The result is always lowercase and capped at 64 characters.
pub fn build_tool_name(full_name: &str) -> String {
    let parts: Vec<&str> = full_name.split('.').collect();
    if parts.len() < 2 {
        // Fallback: lowercase the whole thing with underscores.
        let name = full_name.replace('.', "_").to_ascii_lowercase();
        return mangle_head_if_too_long(&name, MAX_TOOL_NAME_LEN);
    }

    let method_name = parts[parts.len() - 1];
    let svc_name = parts[parts.len() - 2];

    // Find version segment (e.g. "v1") by scanning from the end.
    let version = parts[..parts.len() - 2]
        .iter()
        .rev()
        .find(|p| is_version_segment(p));

    let svc_snake = to_snake_case(svc_name);
    let meth_snake = to_snake_case(method_name);

    let name = match version {
        Some(v) => format!("{svc_snake}-{meth_snake}_{v}"),
        None => format!("{svc_snake}-{meth_snake}"),
    };

    mangle_head_if_too_long(&name, MAX_TOOL_NAME_LEN)
}

fn is_version_segment(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
}

/// Truncates the head of `name` and prepends a short hash when `name` exceeds
/// `max_len`. The tail (most-specific part) is preserved.
pub fn mangle_head_if_too_long(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }
    let hash = Sha1::digest(name.as_bytes());
    let prefix: String = base36(hash.as_slice()).chars().take(6).collect();
    if max_len <= prefix.len() + 1 {
        return prefix;
    }
    let available = max_len - prefix.len() - 1;
    format!("{prefix}_{}", &name[name.len() - available..])
}

/// Renders a big-endian byte string as a lowercase base-36 integer, matching
/// big-integer text semantics (no leading zeros).
fn base36(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut limbs: Vec<u8> = bytes.to_vec();
    let mut out: Vec<u8> = Vec::new();

    while limbs.iter().any(|&b| b != 0) {
        let mut rem: u32 = 0;
        for limb in limbs.iter_mut() {
            let acc = (rem << 8) | u32::from(*limb);
            *limb = (acc / 36) as u8;
            rem = acc % 36;
        }
        out.push(DIGITS[rem as usize]);
    }

    if out.is_empty() {
        return "0".to_string();
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
