//! IDL build step: discover `.idl` files, translate each one to its JSON
//! intermediate representation, and hand the JSON to a source generator.
//!
//! Translation goes through a [`Translator`], which is one of:
//!
//! - [`ProcessTranslator`]: runs a local translator executable
//!   (`barrister -j <out.json> <in.idl>`) and drains its output into the log.
//! - [`HttpTranslator`]: POSTs the IDL file and its sibling files to a
//!   translation service.
//!
//! [`Pipeline`] ties discovery, translation, and generation together and stops
//! at the first failure.
//!
//! # Running a build
//!
//! ```no_run
//! use std::sync::Arc;
//! use idl2src::{BuildConfig, Pipeline, TracingSink};
//!
//! let config = BuildConfig::from_file("idl2src.toml")?;
//! let log: idl2src::DynLogSink = Arc::new(TracingSink);
//! let summary = Pipeline::new(config.translator(&log)?, config.generator(&log))
//!     .log_sink(log)
//!     .run(&config.run_options())?;
//! for generated in &summary.generated {
//!     println!("{} -> {}", generated.json_path.display(), generated.package);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Error handling
//!
//! All fallible operations return [`BuildError`], which implements
//! [`miette::Diagnostic`]. A per-file failure arrives as [`BuildError::File`],
//! naming the IDL file and stage; [`BuildError::root`] reaches the cause.

pub mod config;
pub mod discover;
pub mod drain;
pub mod error;
pub mod generate;
pub mod log;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod translate;

// Re-export the commonly used API at the crate root.
pub use config::{BuildConfig, parse_flag};
pub use discover::{ExclusionSet, IdlFile, discover};
pub use error::{BuildError, Result, Stage};
pub use generate::{CommandGenerator, GenerateRequest, Generator, JsonOnly};
pub use log::{DynLogSink, LogSink, MemorySink, Severity, TracingSink};
pub use output::{OutputLocation, prepare};
pub use package::{file_package, package_dir, sanitize};
pub use pipeline::{Pipeline, RunOptions, RunSummary};
pub use translate::{
    HttpTranslator, ProcessTranslator, SourceFile, TranslationRequest, Translator,
    TranslatorEndpoint,
};
