// ==============================================================================
// CLI for the IDL Build Step
// ==============================================================================
//
//   idl2src [OPTIONS] [PATHS]...
//
// Settings come from an optional TOML config file (`--config`), overridden by
// command-line flags. Positional PATHS are joined with `,` and replace the
// configured `idl-files`.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use idl2src::{BuildConfig, BuildError, DynLogSink, LogSink, Pipeline, TracingSink, parse_flag};
use lexopt::prelude::*;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Translate IDL files to JSON and generate sources from them

Usage: idl2src [OPTIONS] [PATHS]...

Arguments:
  [PATHS]...  IDL files or directories, comma-separated or repeated
              [default: src/main/resources/barrister/]

Options:
  -c, --config <FILE>          Read settings from a TOML file
  -i, --idl-files <PATHS>      Same as [PATHS] (repeatable)
  -t, --translator <CMD|URL>   Translator program or http(s) service URL [default: barrister]
      --translator-arg <ARG>   Argument passed to the translator before `-j` (repeatable)
  -x, --exclude <NAMES>        Comma-separated file names to skip in directories
  -p, --base-package <PKG>     Base package for generated sources [default: generated]
  -o, --output-dir <DIR>       Source root to write into [default: src/main/java]
      --immutable[=<BOOL>]     Generate immutable structs
      --clean[=<BOOL>]         Wipe <output-dir>/<base-package> before building
  -g, --generator <CMD>        External generator to run on each JSON file
      --generator-arg <ARG>    Argument passed to the generator (repeatable)
      --timeout <SECS>         Kill translator/generator calls that run longer
  -h, --help                   Print help
  -V, --version                Print version

Logging is controlled by IDL2SRC_LOG (default: info).
";

// ==============================================================================
// Argument Parsing
// ==============================================================================

enum Action {
    Run(Box<Overrides>),
    Help,
    Version,
}

/// Command-line values that override the config file.
#[derive(Default)]
struct Overrides {
    config: Option<PathBuf>,
    translator: Option<String>,
    translator_args: Vec<String>,
    paths: Vec<String>,
    exclude: Option<String>,
    immutable: Option<bool>,
    base_package: Option<String>,
    output_dir: Option<PathBuf>,
    clean: Option<bool>,
    generator: Option<String>,
    generator_args: Vec<String>,
    timeout_secs: Option<u64>,
}

fn parse_args(args: impl IntoIterator<Item = OsString>) -> Result<Action, lexopt::Error> {
    let mut o = Overrides::default();
    let mut parser = lexopt::Parser::from_iter(args);
    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => return Ok(Action::Help),
            Short('V') | Long("version") => return Ok(Action::Version),
            Short('c') | Long("config") => o.config = Some(parser.value()?.into()),
            Short('t') | Long("translator") => o.translator = Some(parser.value()?.string()?),
            Long("translator-arg") => o.translator_args.push(parser.value()?.string()?),
            Short('i') | Long("idl-files") => o.paths.push(parser.value()?.string()?),
            Short('x') | Long("exclude") => o.exclude = Some(parser.value()?.string()?),
            Short('p') | Long("base-package") => {
                o.base_package = Some(parser.value()?.string()?);
            }
            Short('o') | Long("output-dir") => o.output_dir = Some(parser.value()?.into()),
            Long("immutable") => o.immutable = Some(flag_value(&mut parser)?),
            Long("clean") => o.clean = Some(flag_value(&mut parser)?),
            Short('g') | Long("generator") => o.generator = Some(parser.value()?.string()?),
            Long("generator-arg") => o.generator_args.push(parser.value()?.string()?),
            Long("timeout") => o.timeout_secs = Some(parser.value()?.parse()?),
            Value(path) => o.paths.push(path.string()?),
            _ => return Err(arg.unexpected()),
        }
    }
    Ok(Action::Run(Box::new(o)))
}

/// `--flag` alone means true; `--flag=VALUE` is true only for `true`.
fn flag_value(parser: &mut lexopt::Parser) -> Result<bool, lexopt::Error> {
    match parser.optional_value() {
        None => Ok(true),
        Some(value) => Ok(parse_flag(&value.string()?)),
    }
}

impl Overrides {
    fn into_config(self) -> Result<BuildConfig, BuildError> {
        let mut config = match &self.config {
            Some(path) => BuildConfig::from_file(path)?,
            None => BuildConfig::default(),
        };

        if let Some(translator) = self.translator {
            config.translator = translator;
        }
        if !self.translator_args.is_empty() {
            config.translator_args = self.translator_args;
        }
        if !self.paths.is_empty() {
            config.idl_files = self.paths.join(",");
        }
        if let Some(exclude) = self.exclude {
            config.exclude = exclude;
        }
        if let Some(immutable) = self.immutable {
            config.immutable = immutable;
        }
        if let Some(base_package) = self.base_package {
            config.base_package = base_package;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_directory = output_dir;
        }
        if let Some(clean) = self.clean {
            config.clean = clean;
        }
        if let Some(generator) = self.generator {
            config.generator = Some(generator);
        }
        if !self.generator_args.is_empty() {
            config.generator_args = self.generator_args;
        }
        if self.timeout_secs.is_some() {
            config.timeout_secs = self.timeout_secs;
        }
        Ok(config)
    }
}

// ==============================================================================
// Entry Point
// ==============================================================================

fn main() -> miette::Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().build())
    }))?;

    let overrides = match parse_args(std::env::args_os())
        .map_err(|e| BuildError::Usage(e.to_string()))?
    {
        Action::Help => {
            print!("{USAGE}");
            return Ok(());
        }
        Action::Version => {
            println!("idl2src {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Action::Run(overrides) => overrides,
    };

    init_tracing();

    let config = overrides.into_config()?;
    let log: DynLogSink = Arc::new(TracingSink);
    let pipeline = Pipeline::new(config.translator(&log)?, config.generator(&log))
        .log_sink(Arc::clone(&log));
    let summary = pipeline.run(&config.run_options())?;

    log.info(&format!(
        "Processed {} IDL file(s) into {}",
        summary.generated.len(),
        summary.output_dir.display()
    ));
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("IDL2SRC_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
