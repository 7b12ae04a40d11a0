//! User-facing progress lines and failure reporting
//!
//! Every line shown to the user goes through a [`Console`], which forwards
//! it to an optional callback (the CLI prints, embedding hosts show it in
//! their own log view) and traces it. Failures caught at a pipeline
//! boundary go through [`report_failure`], which also lands them in the
//! persistent error log as an `ERROR` event.

use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Callback receiving each console line
pub type ConsoleCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Line-oriented message sink
#[derive(Clone, Default)]
pub struct Console {
    callback: Option<ConsoleCallback>,
}

impl Console {
    /// Console that only traces
    pub fn silent() -> Self {
        Self { callback: None }
    }

    /// Console forwarding lines to `callback`
    pub fn with_callback(callback: ConsoleCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Console printing lines to stdout
    pub fn stdout() -> Self {
        Self::with_callback(Arc::new(|line| println!("{}", line)))
    }

    /// Console collecting lines into a shared buffer
    pub fn recording() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let console = Self::with_callback(Arc::new(move |line| {
            if let Ok(mut lines) = sink.lock() {
                lines.push(line.to_string());
            }
        }));
        (console, lines)
    }

    /// Emit a line
    pub fn emit(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        info!("{}", line);
        if let Some(ref callback) = self.callback {
            callback(line);
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Classify an error for the error log
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<crate::config::ConfigError>().is_some() {
        "ConfigError"
    } else if let Some(e) = err.downcast_ref::<crate::cache::PatchError>() {
        e.kind()
    } else if err.downcast_ref::<std::io::Error>().is_some() {
        "IoError"
    } else if err.downcast_ref::<serde_json::Error>().is_some() {
        "JsonError"
    } else if err.downcast_ref::<zip::result::ZipError>().is_some() {
        "ZipError"
    } else {
        "Error"
    }
}

/// Record a caught failure in the error log.
///
/// The full error chain stands in for a stack trace.
pub fn report_failure(context: &str, err: &anyhow::Error) {
    error!(
        context = context,
        kind = error_kind(err),
        chain = ?err,
        "{}",
        err
    );
}
