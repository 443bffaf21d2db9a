//! The protoc-plugin code generator: per-file, per-language dispatch.
//!
//! Each target language implements the same binder-plus-render contract over
//! [`binder::TemplateParams`]; this module selects the generator per file and
//! owns the C++ batch mode, which must emit the shared project files exactly
//! once across a multi-file input.

pub mod binder;
pub mod cpp;
pub mod golang;
pub mod helpers;
pub mod options;
pub mod progress;
pub mod python;
pub mod rust;
pub mod schema;
pub mod tool_name;

use std::fmt;
use std::str::FromStr;

use prost_reflect::{DescriptorPool, FileDescriptor};

use crate::error::{Error, Result};

/// Version string stamped into generated file headers.
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One generated output file, relative to the protoc output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub content: String,
}

/// A supported code generation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Go,
    Python,
    Rust,
    Cpp,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "go" => Ok(Language::Go),
            "python" => Ok(Language::Python),
            "rust" => Ok(Language::Rust),
            "cpp" => Ok(Language::Cpp),
            other => Err(Error::Generator(format!(
                "unsupported language: {other:?} (supported: go, python, rust, cpp)"
            ))),
        }
    }
}

/// All languages the dispatcher can generate for.
pub fn supported_languages() -> [Language; 4] {
    [Language::Go, Language::Python, Language::Rust, Language::Cpp]
}

/// Configuration for a single file generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Target language.
    pub lang: Language,
    /// Go-specific: sub-package suffix for generated files.
    pub package_suffix: String,
    /// C++ only: whether to emit the shared project files. `None` defaults
    /// to true.
    pub cpp_emit_shared: Option<bool>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            lang: Language::Go,
            package_suffix: String::new(),
            cpp_emit_shared: None,
        }
    }
}

/// Dispatches code generation for a single protobuf file to the appropriate
/// language-specific generator.
pub fn generate_file(
    pool: &DescriptorPool,
    file: &FileDescriptor,
    opts: &GenerateOptions,
) -> Result<Vec<GeneratedFile>> {
    match opts.lang {
        Language::Go => golang::generate(pool, file, PLUGIN_VERSION, &opts.package_suffix),
        Language::Python => python::generate(pool, file, PLUGIN_VERSION),
        Language::Rust => rust::generate(pool, file, PLUGIN_VERSION),
        Language::Cpp => cpp::generate(
            pool,
            file,
            PLUGIN_VERSION,
            opts.cpp_emit_shared.unwrap_or(true),
        ),
    }
}

/// Runs code generation for every target language on a single file. C++ is
/// excluded; use [`generate_cpp_batch`] for C++.
pub fn generate_all(
    pool: &DescriptorPool,
    file: &FileDescriptor,
    package_suffix: &str,
) -> Result<Vec<GeneratedFile>> {
    let mut files = Vec::new();
    for lang in supported_languages() {
        if lang == Language::Cpp {
            continue;
        }
        files.extend(generate_file(
            pool,
            file,
            &GenerateOptions {
                lang,
                package_suffix: package_suffix.to_string(),
                cpp_emit_shared: None,
            },
        )?);
    }
    Ok(files)
}

/// Runs C++ generation for all files with services, emitting the shared
/// project files only for the first file in path-sorted order.
pub fn generate_cpp_batch(
    pool: &DescriptorPool,
    files: &[FileDescriptor],
) -> Result<Vec<GeneratedFile>> {
    let mut targets: Vec<&FileDescriptor> = files
        .iter()
        .filter(|f| f.services().count() > 0)
        .collect();
    targets.sort_by(|a, b| a.name().cmp(b.name()));

    let mut out = Vec::new();
    for (i, file) in targets.iter().enumerate() {
        out.extend(generate_file(
            pool,
            file,
            &GenerateOptions {
                lang: Language::Cpp,
                package_suffix: String::new(),
                cpp_emit_shared: Some(i == 0),
            },
        )?);
    }
    Ok(out)
}
