// ==============================================================================
// Generator Boundary: JSON → Target-Language Sources
// ==============================================================================
//
// Source generation itself lives outside this crate. The pipeline calls a
// `Generator` once per translated IDL file with the JSON path and the package
// layout to generate into. Two implementations are provided:
//
//   - `CommandGenerator` runs an external generator executable.
//   - `JsonOnly` generates nothing; the run stops at the JSON files.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BuildError, Result};
use crate::log::DynLogSink;
use crate::translate::process::run_to_completion;

/// Arguments for generating the sources of one IDL file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Absolute path of the translated JSON file.
    pub json_path: PathBuf,
    /// Package for this file's sources: `<base_package>.<idl stem>`.
    pub package: String,
    pub base_package: String,
    /// Root source directory the package directories live under.
    pub source_root: PathBuf,
    /// Generate immutable struct types.
    pub immutable: bool,
}

/// Turns one translated JSON file into target-language sources.
pub trait Generator {
    fn generate(&self, request: &GenerateRequest) -> Result<()>;
}

impl<F> Generator for F
where
    F: Fn(&GenerateRequest) -> Result<()>,
{
    fn generate(&self, request: &GenerateRequest) -> Result<()> {
        self(request)
    }
}

/// Runs an external generator:
///
/// ```text
/// <program> [args...] --json <path> --package <pkg> --base-package <base> --out <root> [--immutable]
/// ```
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    log: DynLogSink,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, log: DynLogSink) -> Self {
        CommandGenerator {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            log,
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn command_line(&self, request: &GenerateRequest) -> Vec<String> {
        let mut argv = vec![self.program.clone()];
        argv.extend(self.args.iter().cloned());
        argv.extend([
            "--json".to_string(),
            request.json_path.to_string_lossy().into_owned(),
            "--package".to_string(),
            request.package.clone(),
            "--base-package".to_string(),
            request.base_package.clone(),
            "--out".to_string(),
            request.source_root.to_string_lossy().into_owned(),
        ]);
        if request.immutable {
            argv.push("--immutable".to_string());
        }
        argv
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, request: &GenerateRequest) -> Result<()> {
        let argv = self.command_line(request);
        self.log.debug(&format!("Running: {}", argv.join(" ")));
        run_to_completion(&argv, self.timeout, &self.log).map_err(|detail| {
            BuildError::GeneratorFailure {
                json_path: request.json_path.clone(),
                detail: format!("{argv:?} {detail}"),
            }
        })
    }
}

/// Leaves the translated JSON in place and generates nothing.
pub struct JsonOnly {
    log: DynLogSink,
}

impl JsonOnly {
    pub fn new(log: DynLogSink) -> Self {
        JsonOnly { log }
    }
}

impl Generator for JsonOnly {
    fn generate(&self, request: &GenerateRequest) -> Result<()> {
        self.log.info(&format!(
            "No generator configured; skipping sources for package {} ({})",
            request.package,
            request.json_path.display()
        ));
        Ok(())
    }
}
