//! protoc plugin protocol: reads a `CodeGeneratorRequest` from a byte
//! buffer, drives the per-language generators, and produces a
//! `CodeGeneratorResponse`.
//!
//! The request is first decoded with raw byte fields so that extension
//! payloads survive intact into the `prost_reflect` descriptor pool; a typed
//! decode would drop the unknown option fields the generators depend on.

use std::collections::HashSet;
use std::str::FromStr;

use prost::Message;
use prost_reflect::{DescriptorPool, FileDescriptor};
use prost_types::compiler::{code_generator_response, CodeGeneratorResponse};

use crate::error::{Error, Result};
use crate::generator::{
    self, generate_all, generate_cpp_batch, generate_file, GenerateOptions, Language,
};

/// `CodeGeneratorResponse.Feature.FEATURE_PROTO3_OPTIONAL`.
const FEATURE_PROTO3_OPTIONAL: u64 = 1;

#[derive(Clone, PartialEq, ::prost::Message)]
struct RawCodeGeneratorRequest {
    #[prost(string, repeated, tag = "1")]
    pub file_to_generate: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub parameter: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bytes, repeated, tag = "15")]
    pub proto_file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct RawFileDescriptorSet {
    #[prost(bytes, repeated, tag = "1")]
    pub file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

/// Parsed plugin parameters (`--mcp_opt=lang=rust,package_suffix=mcp`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginParams {
    /// Requested target, or `None` for `lang=all`.
    pub lang: Option<Language>,
    /// Go-specific sub-package suffix.
    pub package_suffix: String,
}

impl Default for PluginParams {
    fn default() -> Self {
        Self {
            lang: Some(Language::Go),
            package_suffix: String::new(),
        }
    }
}

/// Parses the protoc parameter string. Unknown keys are ignored so that
/// wrapper tooling can pass extra options through.
pub fn parse_params(parameter: Option<&str>) -> Result<PluginParams> {
    let mut params = PluginParams::default();
    let Some(parameter) = parameter else {
        return Ok(params);
    };

    for part in parameter.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some(("lang", "all")) => params.lang = None,
            Some(("lang", value)) => params.lang = Some(Language::from_str(value)?),
            Some(("package_suffix", value)) => params.package_suffix = value.to_string(),
            _ => {}
        }
    }
    Ok(params)
}

/// Runs the generator over a serialized `CodeGeneratorRequest` and returns
/// the response. Descriptor errors are reported through the response `error`
/// field; they suppress output for the offending file only.
pub fn run(input: &[u8]) -> Result<CodeGeneratorResponse> {
    let request = RawCodeGeneratorRequest::decode(input)
        .map_err(|err| Error::descriptor(format!("decode CodeGeneratorRequest: {err}")))?;

    let params = match parse_params(request.parameter.as_deref()) {
        Ok(params) => params,
        Err(err) => {
            return Ok(CodeGeneratorResponse {
                error: Some(err.to_string()),
                supported_features: Some(FEATURE_PROTO3_OPTIONAL),
                ..Default::default()
            })
        }
    };

    let pool = build_descriptor_pool(&request)?;
    let targets: Vec<FileDescriptor> = pool
        .files()
        .filter(|f| is_target_file(&request.file_to_generate, f.name()))
        .collect();

    let mut files = Vec::new();
    let mut errors = Vec::new();

    match params.lang {
        Some(Language::Cpp) => {
            // C++ runs in batch mode so shared project files are emitted
            // exactly once across the whole input.
            match generate_cpp_batch(&pool, &targets) {
                Ok(generated) => files.extend(generated),
                Err(err) => errors.push(err.to_string()),
            }
        }
        Some(lang) => {
            let opts = GenerateOptions {
                lang,
                package_suffix: params.package_suffix.clone(),
                cpp_emit_shared: None,
            };
            for file in &targets {
                match generate_file(&pool, file, &opts) {
                    Ok(generated) => files.extend(generated),
                    Err(err) => errors.push(format!("{}: {err}", file.name())),
                }
            }
        }
        None => {
            for file in &targets {
                match generate_all(&pool, file, &params.package_suffix) {
                    Ok(generated) => files.extend(generated),
                    Err(err) => errors.push(format!("{}: {err}", file.name())),
                }
            }
            match generate_cpp_batch(&pool, &targets) {
                Ok(generated) => files.extend(generated),
                Err(err) => errors.push(err.to_string()),
            }
        }
    }

    Ok(CodeGeneratorResponse {
        error: if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        },
        supported_features: Some(FEATURE_PROTO3_OPTIONAL),
        file: files
            .into_iter()
            .map(|f| code_generator_response::File {
                name: Some(f.name),
                insertion_point: None,
                content: Some(f.content),
                generated_code_info: None,
            })
            .collect(),
        ..Default::default()
    })
}

/// The version banner printed for `--version`.
pub fn version_banner() -> String {
    format!("protoc-gen-mcp {}", generator::PLUGIN_VERSION)
}

fn build_descriptor_pool(request: &RawCodeGeneratorRequest) -> Result<DescriptorPool> {
    let fds = RawFileDescriptorSet {
        file: request.proto_file.clone(),
    };
    let mut bytes = Vec::new();
    fds.encode(&mut bytes)
        .map_err(|err| Error::descriptor(format!("re-encode descriptor set: {err}")))?;
    DescriptorPool::decode(bytes.as_slice())
        .map_err(|err| Error::descriptor(format!("decode descriptor pool: {err}")))
}

/// Matches a pool file against the `file_to_generate` list, tolerating
/// relative-path and separator differences between protoc invocations.
fn is_target_file(targets: &[String], file_name: &str) -> bool {
    let target_set: HashSet<&str> = targets.iter().map(String::as_str).collect();
    if target_set.contains(file_name) {
        return true;
    }

    let f_norm = file_name.replace('\\', "/");
    for t in &target_set {
        let t_norm = t.replace('\\', "/");
        if t_norm.ends_with(&f_norm) || f_norm.ends_with(&t_norm) {
            return true;
        }
    }
    false
}
