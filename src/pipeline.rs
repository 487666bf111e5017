// ==============================================================================
// Pipeline Orchestrator
// ==============================================================================
//
// One run:
//
//   1. sanitize the base package and prepare (optionally wipe) the output dir;
//   2. discover the IDL files;
//   3. for each file, in order: translate to JSON, then generate sources.
//
// Files are processed strictly one after another. The first failure stops
// the run and is reported wrapped with the file and stage it happened at;
// later files are never started.

use std::path::PathBuf;
use std::sync::Arc;

use crate::discover::{ExclusionSet, IdlFile, discover};
use crate::error::{BuildError, Result, Stage};
use crate::generate::{GenerateRequest, Generator};
use crate::log::{DynLogSink, TracingSink};
use crate::output::{OutputLocation, prepare};
use crate::package::file_package;
use crate::translate::{TranslationRequest, Translator};

/// Inputs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Comma-separated IDL files and directories.
    pub path_spec: String,
    pub exclusions: ExclusionSet,
    pub output_root: PathBuf,
    pub base_package: String,
    pub immutable: bool,
    /// Wipe the resolved output directory before building.
    pub wipe_existing: bool,
}

/// What a successful run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// The resolved `<output root>/<base package>` directory.
    pub output_dir: PathBuf,
    /// One entry per processed IDL file, in processing order.
    pub generated: Vec<GenerateRequest>,
}

/// Sequences discovery, translation, and generation.
pub struct Pipeline {
    translator: Box<dyn Translator>,
    generator: Box<dyn Generator>,
    log: DynLogSink,
}

impl Pipeline {
    /// A pipeline that logs through [`TracingSink`].
    pub fn new(translator: Box<dyn Translator>, generator: Box<dyn Generator>) -> Self {
        Pipeline {
            translator,
            generator,
            log: Arc::new(TracingSink),
        }
    }

    /// Replace the log sink used for the orchestrator's own messages.
    #[must_use]
    pub fn log_sink(mut self, log: DynLogSink) -> Self {
        self.log = log;
        self
    }

    pub fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        let location = OutputLocation::resolve(&options.output_root, &options.base_package);
        if location.base_package.is_empty() {
            self.log.warn(&format!(
                "Base package {:?} is empty after sanitizing; output goes directly into {}",
                options.base_package,
                location.root.display()
            ));
        }

        if options.wipe_existing {
            self.log
                .info(&format!("Cleaning output dir: {}", location.dir.display()));
        } else {
            self.log.info(&format!(
                "Using output dir: {} - consider setting clean = true to ensure this directory is clean on build",
                location.dir.display()
            ));
        }
        prepare(&location.root, &location.base_package, options.wipe_existing)?;

        self.log
            .info(&format!("Using translator: {}", self.translator.endpoint()));

        let files = discover(&options.path_spec, &options.exclusions, self.log.as_ref())?;
        let mut summary = RunSummary {
            output_dir: location.dir.clone(),
            generated: Vec::with_capacity(files.len()),
        };
        if files.is_empty() {
            self.log
                .info(&format!("No IDL files found in: {}", options.path_spec));
            return Ok(summary);
        }

        for idl in &files {
            let request = self.process(idl, &location, options.immutable)?;
            summary.generated.push(request);
        }
        Ok(summary)
    }

    /// Translate and generate one file. Errors come back wrapped with the
    /// file's path and the failing stage.
    fn process(
        &self,
        idl: &IdlFile,
        location: &OutputLocation,
        immutable: bool,
    ) -> Result<GenerateRequest> {
        let wrap = |stage: Stage| {
            move |source: BuildError| BuildError::File {
                path: idl.path().to_path_buf(),
                stage,
                source: Box::new(source),
            }
        };

        let file_name = idl.file_name();
        let json_path = location.json_path(&file_name);
        let json_path = std::path::absolute(&json_path)
            .map_err(|e| BuildError::io(format!("resolve {}", json_path.display()), e))
            .map_err(wrap(Stage::Translate))?;

        self.log.info(&format!(
            "Translating: {} to: {}",
            idl.path().display(),
            json_path.display()
        ));
        self.translator
            .translate(&TranslationRequest::new(idl, &json_path))
            .map_err(wrap(Stage::Translate))?;

        let request = GenerateRequest {
            json_path,
            package: file_package(&location.base_package, &file_name),
            base_package: location.base_package.clone(),
            source_root: location.root.clone(),
            immutable,
        };
        self.generator
            .generate(&request)
            .map_err(wrap(Stage::Generate))?;
        Ok(request)
    }
}
