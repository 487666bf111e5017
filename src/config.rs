// ==============================================================================
// Configuration: TOML File Plus Command-Line Overrides
// ==============================================================================
//
// Every setting has a default, so an empty (or absent) config file is valid.
// Keys are kebab-case:
//
//     translator = "http://localhost:9233/idl2json"
//     idl-files = "idl/,extra/legacy.idl"
//     exclude = "draft.idl"
//     base-package = "com.example.generated"
//     output-directory = "target/generated-sources"
//     clean = true
//     timeout-secs = 60

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::discover::ExclusionSet;
use crate::error::{BuildError, Result};
use crate::generate::{CommandGenerator, Generator, JsonOnly};
use crate::log::DynLogSink;
use crate::pipeline::RunOptions;
use crate::translate::{HttpTranslator, ProcessTranslator, Translator, TranslatorEndpoint};

pub const DEFAULT_TRANSLATOR: &str = "barrister";
pub const DEFAULT_IDL_FILES: &str = "src/main/resources/barrister/";
pub const DEFAULT_BASE_PACKAGE: &str = "generated";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "src/main/java";

/// Settings for one build, as read from a config file and the command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BuildConfig {
    /// Translator program name, or an `http(s)://` translation service URL.
    pub translator: String,
    /// Arguments placed before `-j` when running a local translator.
    pub translator_args: Vec<String>,
    /// Comma-separated IDL files and directories.
    pub idl_files: String,
    /// Comma-separated bare file names to skip inside directories.
    pub exclude: String,
    pub immutable: bool,
    pub base_package: String,
    pub output_directory: PathBuf,
    /// Wipe `<output-directory>/<base-package>` before building.
    pub clean: bool,
    /// External generator program; when unset only JSON is produced.
    pub generator: Option<String>,
    pub generator_args: Vec<String>,
    /// Upper bound on each translator/generator call.
    pub timeout_secs: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            translator: DEFAULT_TRANSLATOR.to_string(),
            translator_args: Vec::new(),
            idl_files: DEFAULT_IDL_FILES.to_string(),
            exclude: String::new(),
            immutable: false,
            base_package: DEFAULT_BASE_PACKAGE.to_string(),
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            clean: false,
            generator: None,
            generator_args: Vec::new(),
            timeout_secs: None,
        }
    }
}

/// Interpret a textual flag: only `true` (after trimming) is true.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    value.trim() == "true"
}

impl BuildConfig {
    /// Load settings from a TOML file; unspecified keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| BuildError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| BuildError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            path_spec: self.idl_files.clone(),
            exclusions: ExclusionSet::parse(&self.exclude),
            output_root: self.output_directory.clone(),
            base_package: self.base_package.clone(),
            immutable: self.immutable,
            wipe_existing: self.clean,
        }
    }

    /// The translation strategy selected by [`translator`](Self::translator).
    pub fn translator(&self, log: &DynLogSink) -> Result<Box<dyn Translator>> {
        Ok(match TranslatorEndpoint::parse(&self.translator) {
            TranslatorEndpoint::Http(url) => {
                Box::new(HttpTranslator::new(url, self.timeout(), Arc::clone(log))?)
            }
            TranslatorEndpoint::Executable(program) => Box::new(
                ProcessTranslator::new(program, Arc::clone(log))
                    .args(self.translator_args.iter().cloned())
                    .timeout(self.timeout()),
            ),
        })
    }

    #[must_use]
    pub fn generator(&self, log: &DynLogSink) -> Box<dyn Generator> {
        match &self.generator {
            Some(program) => Box::new(
                CommandGenerator::new(program.clone(), Arc::clone(log))
                    .args(self.generator_args.iter().cloned())
                    .timeout(self.timeout()),
            ),
            None => Box::new(JsonOnly::new(Arc::clone(log))),
        }
    }
}
