// ==============================================================================
// Error Taxonomy for the IDL Build Step
// ==============================================================================
//
// Every failure in the pipeline is a `BuildError`. Each variant carries the
// context needed to diagnose it without re-running the build: the offending
// path, the exact translator argument list, or the body the translation
// service sent back. The binary renders these through miette's report handler.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Convenient result type for build-step operations.
pub type Result<T, E = BuildError> = std::result::Result<T, E>;

/// The step of the per-file sub-pipeline at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// IDL → JSON translation.
    Translate,
    /// JSON → source generation.
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Translate => f.write_str("translate"),
            Stage::Generate => f.write_str("generate"),
        }
    }
}

/// Errors raised while discovering, translating, or generating IDL files.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    /// A path named in the input list does not exist.
    #[error("File not found: {}", path.display())]
    #[diagnostic(
        code(idl2src::path_not_found),
        help("every comma-separated entry in `idl-files` must exist")
    )]
    PathNotFound { path: PathBuf },

    /// Wiping the output directory stopped at a path that could not be
    /// removed. Anything deleted before this point stays deleted.
    #[error("Unable to delete: {}", path.display())]
    #[diagnostic(code(idl2src::delete_failure))]
    DeleteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to create base output directory: {}", path.display())]
    #[diagnostic(code(idl2src::directory_create_failure))]
    DirectoryCreateFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The local translator could not be started, could not be waited on,
    /// timed out, or exited unsuccessfully.
    #[error("Translator command {args:?} failed: {detail}")]
    #[diagnostic(
        code(idl2src::translation_process_failure),
        help("the translator's own output is logged above this error")
    )]
    TranslationProcessFailure { args: Vec<String>, detail: String },

    /// The translation service answered with HTTP 500; `body` is its error
    /// text, verbatim.
    #[error("Error translating IDL: {body}")]
    #[diagnostic(code(idl2src::translation_service_failure))]
    TranslationServiceFailure { endpoint: String, body: String },

    /// The translator reported success but its output is not a JSON array.
    #[error("Unexpected response from: {source_name} response: {body}")]
    #[diagnostic(
        code(idl2src::invalid_translation_response),
        help("translator output must be a JSON array starting with `[`")
    )]
    InvalidTranslationResponse { source_name: String, body: String },

    /// Connection-level failure, or an error status other than 500.
    #[error("Request to translation service {endpoint} failed")]
    #[diagnostic(code(idl2src::translation_transport))]
    TranslationTransport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Error running generator for {}: {detail}", json_path.display())]
    #[diagnostic(code(idl2src::generator_failure))]
    GeneratorFailure { json_path: PathBuf, detail: String },

    #[error("{context}")]
    #[diagnostic(code(idl2src::io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config file: {}", path.display())]
    #[diagnostic(code(idl2src::config_read))]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {}", path.display())]
    #[diagnostic(code(idl2src::config_parse))]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    #[diagnostic(code(idl2src::usage), help("run `idl2src --help` for usage"))]
    Usage(String),

    /// Wraps the first failure of a run with the IDL file it belongs to.
    #[error("Error processing: {} ({stage})", path.display())]
    #[diagnostic(code(idl2src::file))]
    File {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    /// The innermost error, looking through any per-file wrappers.
    #[must_use]
    pub fn root(&self) -> &BuildError {
        match self {
            BuildError::File { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_wrapper_names_path_and_stage() {
        let err = BuildError::File {
            path: PathBuf::from("idl/service.idl"),
            stage: Stage::Translate,
            source: Box::new(BuildError::TranslationServiceFailure {
                endpoint: "http://localhost/idl2json".to_string(),
                body: "line 3: unexpected token".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "Error processing: idl/service.idl (translate)"
        );
        assert_eq!(
            err.root().to_string(),
            "Error translating IDL: line 3: unexpected token"
        );
    }

    #[test]
    fn process_failure_lists_arguments() {
        let err = BuildError::TranslationProcessFailure {
            args: vec!["barrister".into(), "-j".into(), "out.json".into(), "in.idl".into()],
            detail: "exited with exit status: 2".to_string(),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @r#"Translator command ["barrister", "-j", "out.json", "in.idl"] failed: exited with exit status: 2"#
        );
    }
}
