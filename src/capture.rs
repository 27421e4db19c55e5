//! Single-shot capture flow: load one URL, then print or write the screenshot

use crate::{Engine, Error, LoadStatus, OutputFormat, PageError, Result, ShotConfig};
use base64::Engine as Base64Engine;
use log::{debug, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Where the rendered page goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Base64-encoded PNG on standard output
    Stdout,
    /// A file whose extension selects the format
    File(PathBuf),
}

impl From<Option<PathBuf>> for Destination {
    fn from(path: Option<PathBuf>) -> Self {
        match path {
            Some(p) => Destination::File(p),
            None => Destination::Stdout,
        }
    }
}

/// Process exit status of a capture run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// The page did not load, or the host failed
    Failure,
    /// The page raised a script error and `fail_on_page_error` was set
    PageError,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::PageError => 2,
        }
    }
}

/// What a capture run ended with
#[derive(Debug)]
pub enum Outcome {
    /// Base64 PNG written to stdout
    Printed,
    /// Screenshot written to this path
    Written(PathBuf),
    /// Navigation failed with the host's reason
    LoadFailed(String),
    /// The page raised a script error and the run was configured to fail on it
    RenderFailed(PageError),
    /// Browser host or output failure
    HostError(Error),
}

impl Outcome {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Outcome::Printed | Outcome::Written(_) => ExitStatus::Success,
            Outcome::LoadFailed(_) | Outcome::HostError(_) => ExitStatus::Failure,
            Outcome::RenderFailed(_) => ExitStatus::PageError,
        }
    }
}

/// A configured capture of one URL
#[derive(Debug, Clone)]
pub struct Capture {
    config: ShotConfig,
    destination: Destination,
}

impl Capture {
    pub fn new(config: ShotConfig, destination: Destination) -> Self {
        Self { config, destination }
    }

    /// Load `url` in `engine` and emit the screenshot.
    ///
    /// `out` stands in for standard output: it receives the base64 PNG and
    /// the `rendering failed: ...` diagnostics of page errors. Diagnostics stop
    /// once the base64 line is written, so it is always the last line. The
    /// engine is closed before returning.
    pub fn run<E, W>(&self, mut engine: E, url: &str, out: W) -> Outcome
    where
        E: Engine,
        W: Write + Send + 'static,
    {
        let out = Arc::new(Mutex::new(out));
        let first_error: Arc<Mutex<Option<PageError>>> = Arc::new(Mutex::new(None));
        let saw_error = Arc::new(AtomicBool::new(false));
        let printed = Arc::new(AtomicBool::new(false));

        {
            let out = out.clone();
            let first_error = first_error.clone();
            let saw_error = saw_error.clone();
            let printed = printed.clone();
            engine.on_page_error(move |err: &PageError| {
                if let Ok(mut w) = out.lock() {
                    if printed.load(Ordering::SeqCst) {
                        debug!("Dropping page error after output: {}", err.message);
                    } else {
                        let _ = writeln!(w, "rendering failed: {}", err.message);
                        let _ = w.flush();
                    }
                }
                if !saw_error.swap(true, Ordering::SeqCst) {
                    if let Ok(mut slot) = first_error.lock() {
                        *slot = Some(err.clone());
                    }
                }
            });
        }

        info!("Loading {}", url);
        let outcome = match engine.load_url(url) {
            Ok(LoadStatus::Success) => {
                if self.config.fail_on_page_error && saw_error.load(Ordering::SeqCst) {
                    let err = first_error
                        .lock()
                        .ok()
                        .and_then(|mut slot| slot.take())
                        .unwrap_or_else(|| PageError {
                            message: "unknown page error".into(),
                            source: None,
                            line: None,
                            column: None,
                        });
                    Outcome::RenderFailed(err)
                } else {
                    match self.emit(&engine, &out, &printed) {
                        Ok(outcome) => outcome,
                        Err(e) => Outcome::HostError(e),
                    }
                }
            }
            Ok(LoadStatus::Fail(reason)) => {
                warn!("Loading {} failed: {}", url, reason);
                Outcome::LoadFailed(reason)
            }
            Err(e) => Outcome::HostError(e),
        };

        engine.clear_on_page_error();
        if let Err(e) = engine.close() {
            warn!("Failed to close engine: {}", e);
        }

        if let Outcome::HostError(e) = &outcome {
            warn!("Capture of {} failed: {}", url, e);
        }
        debug!("Capture of {} finished: {:?}", url, outcome);
        outcome
    }

    fn emit<E, W>(&self, engine: &E, out: &Mutex<W>, printed: &AtomicBool) -> Result<Outcome>
    where
        E: Engine,
        W: Write,
    {
        match &self.destination {
            Destination::Stdout => {
                let png = engine.render_png(self.config.clip)?;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
                let mut w = out
                    .lock()
                    .map_err(|_| Error::RenderError("stdout writer poisoned".into()))?;
                writeln!(w, "{}", encoded)?;
                w.flush()?;
                // Set under the writer lock so no diagnostic can follow the line
                printed.store(true, Ordering::SeqCst);
                Ok(Outcome::Printed)
            }
            Destination::File(path) => {
                let format = OutputFormat::from_path(path);
                let bytes = engine.render(format, self.config.clip)?;
                std::fs::write(path, &bytes).map_err(|e| {
                    Error::RenderError(format!("Failed to write {}: {}", path.display(), e))
                })?;
                info!("Wrote {} bytes of {} to {}", bytes.len(), format, path.display());
                Ok(Outcome::Written(path.clone()))
            }
        }
    }
}
