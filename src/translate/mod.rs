// ==============================================================================
// Translator: IDL → JSON Intermediate Representation
// ==============================================================================
//
// Two interchangeable strategies sit behind the `Translator` trait:
//
//   - `ProcessTranslator` runs a local executable as
//     `<program> -j <json out> <idl in>`.
//   - `HttpTranslator` POSTs the IDL file and its sibling files to a
//     translation service and writes the response body to the JSON path.
//
// The strategy is picked once, from the configured endpoint string: anything
// starting with `http://` or `https://` is a service URL, everything else is a
// program name. Both end in the same state: a JSON array written to the
// request's JSON path, or a `BuildError` describing why not.

pub mod http;
pub mod process;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use walkdir::WalkDir;

use crate::discover::IdlFile;
use crate::error::{BuildError, Result};

pub use http::HttpTranslator;
pub use process::ProcessTranslator;

/// Converts one IDL file into its JSON intermediate representation.
pub trait Translator {
    /// Translate `request.idl`, leaving a JSON array at `request.json_path`.
    fn translate(&self, request: &TranslationRequest<'_>) -> Result<()>;

    /// The configured program name or service URL, for log messages.
    fn endpoint(&self) -> &str;
}

/// One unit of translation work.
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    pub idl: &'a IdlFile,
    pub json_path: &'a Path,
}

/// A file sent to the translation service: bare name plus raw content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl<'a> TranslationRequest<'a> {
    #[must_use]
    pub fn new(idl: &'a IdlFile, json_path: &'a Path) -> Self {
        TranslationRequest { idl, json_path }
    }

    /// The primary IDL file followed by every other regular file in its
    /// directory, in file-name order. IDL files may include their siblings,
    /// so a remote translator needs all of them.
    pub fn sources(&self) -> Result<Vec<SourceFile>> {
        let primary = self.idl.path();
        let mut sources = vec![read_source(primary)?];

        let dir = self.idl.parent();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                // Dangling symlink: not a regular file, so not a source.
                Err(e) if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => {
                    continue;
                }
                Err(e) => {
                    return Err(BuildError::io(format!("list {}", dir.display()), e.into()));
                }
            };
            if !entry.file_type().is_file() || entry.path() == primary {
                continue;
            }
            sources.push(read_source(entry.path())?);
        }
        Ok(sources)
    }
}

fn read_source(path: &Path) -> Result<SourceFile> {
    let content =
        fs::read(path).map_err(|e| BuildError::io(format!("read {}", path.display()), e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SourceFile { name, content })
}

/// How the translator endpoint string was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslatorEndpoint {
    /// A translation service URL.
    Http(String),
    /// A local executable name or path.
    Executable(String),
}

impl TranslatorEndpoint {
    #[must_use]
    pub fn parse(endpoint: &str) -> Self {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            TranslatorEndpoint::Http(endpoint.to_string())
        } else {
            TranslatorEndpoint::Executable(endpoint.to_string())
        }
    }
}

/// Check that translator output is a JSON array, i.e. starts with `[`.
///
/// `source_name` identifies where the bytes came from (service URL or
/// program) in the resulting error.
pub fn validate_json_array(data: &[u8], source_name: &str) -> Result<()> {
    if data.first() == Some(&b'[') {
        Ok(())
    } else {
        Err(BuildError::InvalidTranslationResponse {
            source_name: source_name.to_string(),
            body: String::from_utf8_lossy(data).into_owned(),
        })
    }
}

/// Write validated translator output, byte for byte, creating parent
/// directories as needed.
pub(crate) fn write_json(data: &[u8], json_path: &Path) -> Result<()> {
    if let Some(parent) = json_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BuildError::io(format!("create {}", parent.display()), e))?;
    }
    fs::write(json_path, data)
        .map_err(|e| BuildError::io(format!("write {}", json_path.display()), e))
}
