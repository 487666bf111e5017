// ==============================================================================
// Local-Process Translation Strategy
// ==============================================================================
//
// Runs the translator executable as
//
//     <program> [leading args...] -j <json output path> <idl input path>
//
// and waits for it to exit. While it runs, two drain threads forward its
// stdout (info) and stderr (error) to the log sink so a large diagnostic dump
// cannot fill a pipe and stall the child. The drains are joined after exit,
// so every line the translator printed is logged before this call returns.
// With a timeout configured that join is bounded too: a killed translator's
// own children may hold the pipes open indefinitely.
//
// Any JSON file left at the output path is removed first; after a clean exit
// the file must exist and hold a JSON array.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use super::{TranslationRequest, Translator, validate_json_array};
use crate::drain::spawn_drain;
use crate::error::{BuildError, Result};
use crate::log::{DynLogSink, LogSink, Severity};

/// How long drains may outlive the process once a timeout is configured.
const DRAIN_GRACE: Duration = Duration::from_secs(1);
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Translates by invoking a local executable.
pub struct ProcessTranslator {
    program: String,
    leading_args: Vec<String>,
    timeout: Option<Duration>,
    log: DynLogSink,
}

impl ProcessTranslator {
    pub fn new(program: impl Into<String>, log: DynLogSink) -> Self {
        ProcessTranslator {
            program: program.into(),
            leading_args: Vec::new(),
            timeout: None,
            log,
        }
    }

    /// Add an argument placed before `-j`, e.g. the script path when the
    /// program is an interpreter.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Kill the translator if it has not exited after `timeout`.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The full argument list for one request, program first.
    pub fn command_line(&self, request: &TranslationRequest<'_>) -> Result<Vec<String>> {
        let json_path = absolute_string(request.json_path)?;
        let idl_path = absolute_string(request.idl.path())?;

        let mut argv = Vec::with_capacity(self.leading_args.len() + 4);
        argv.push(self.program.clone());
        argv.extend(self.leading_args.iter().cloned());
        argv.push("-j".to_string());
        argv.push(json_path);
        argv.push(idl_path);
        Ok(argv)
    }
}

impl Translator for ProcessTranslator {
    fn translate(&self, request: &TranslationRequest<'_>) -> Result<()> {
        let argv = self.command_line(request)?;

        match fs::remove_file(request.json_path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                return Err(BuildError::io(
                    format!("remove previous output {}", request.json_path.display()),
                    e,
                ));
            }
            _ => {}
        }

        self.log.debug(&format!("Running: {}", argv.join(" ")));
        run_to_completion(&argv, self.timeout, &self.log)
            .map_err(|detail| BuildError::TranslationProcessFailure { args: argv, detail })?;

        let output = match fs::read(request.json_path) {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BuildError::InvalidTranslationResponse {
                    source_name: self.program.clone(),
                    body: format!("no output written to {}", request.json_path.display()),
                });
            }
            Err(e) => {
                return Err(BuildError::io(
                    format!("read translator output {}", request.json_path.display()),
                    e,
                ));
            }
        };
        validate_json_array(&output, &self.program)
    }

    fn endpoint(&self) -> &str {
        &self.program
    }
}

fn absolute_string(path: &Path) -> Result<String> {
    let abs = std::path::absolute(path)
        .map_err(|e| BuildError::io(format!("resolve {}", path.display()), e))?;
    Ok(abs.to_string_lossy().into_owned())
}

/// Spawn `argv`, drain its output into `log`, and wait for it to exit.
///
/// On failure returns a human-readable detail (spawn error, timeout, or exit
/// status) for the caller to wrap in its own error variant.
pub(crate) fn run_to_completion(
    argv: &[String],
    timeout: Option<Duration>,
    log: &DynLogSink,
) -> std::result::Result<(), String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| "empty command line".to_string())?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to start: {e}"))?;

    let drains = match start_drains(&mut child, log) {
        Ok(drains) => drains,
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(format!("failed to start output drain: {e}"));
        }
    };

    let waited = match timeout {
        None => child.wait().map(Some),
        Some(limit) => child.wait_timeout(limit),
    };

    let outcome = match waited {
        Ok(Some(status)) if status.success() => Ok(()),
        Ok(Some(status)) => Err(format!("exited with {status}")),
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(format!(
                "timed out after {}",
                humanize(timeout.unwrap_or_default())
            ))
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(format!("failed waiting for exit: {e}"))
        }
    };

    let grace = timeout.map(|_| DRAIN_GRACE);
    join_drains(drains, grace, log.as_ref());
    outcome
}

fn start_drains(child: &mut Child, log: &DynLogSink) -> std::io::Result<Vec<JoinHandle<()>>> {
    let mut drains = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        drains.push(spawn_drain("stdout", stdout, Severity::Info, Arc::clone(log))?);
    }
    if let Some(stderr) = child.stderr.take() {
        drains.push(spawn_drain("stderr", stderr, Severity::Error, Arc::clone(log))?);
    }
    Ok(drains)
}

/// Join the drain threads. With a `grace` bound, drains still running when it
/// runs out are detached and keep logging until their pipe closes.
fn join_drains(drains: Vec<JoinHandle<()>>, grace: Option<Duration>, log: &dyn LogSink) {
    if let Some(grace) = grace {
        let deadline = Instant::now() + grace;
        while Instant::now() < deadline && !drains.iter().all(JoinHandle::is_finished) {
            thread::sleep(DRAIN_POLL);
        }
    }

    for drain in drains {
        if grace.is_some() && !drain.is_finished() {
            log.warn("process output still open after exit; no longer waiting for it");
            continue;
        }
        if drain.join().is_err() {
            log.error("output drain thread panicked");
        }
    }
}

fn humanize(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}
