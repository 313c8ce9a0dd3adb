//! Cache Logger Module
//!
//! Explicit logging handle for the `Cache: set/hit/miss` lines emitted by stores.
//! Each `Cache` owns its own handle; there is no process-wide logger.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::dispatcher::{self, Dispatch};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::{CacheError, Result};

// == Sink ==
#[derive(Clone)]
enum Sink {
    /// Own subscriber writing to stdout or a file
    Writer {
        path: Option<PathBuf>,
        dispatch: Dispatch,
    },
    /// Whatever subscriber is current on the calling thread
    Tracing,
    Silent,
}

// == Logger ==
/// Cloneable handle writing leveled cache messages to one sink.
///
/// Stdout and file loggers carry their own `tracing` subscriber, so two
/// caches can log to different places in the same process.
/// Defaults to standard output.
#[derive(Clone)]
pub struct Logger {
    sink: Sink,
}

impl Logger {
    /// Logger writing to standard output.
    pub fn stdout() -> Self {
        Self {
            sink: Sink::Writer {
                path: None,
                dispatch: writer_dispatch(io::stdout),
            },
        }
    }

    /// Logger appending to `path`, creating the file if needed.
    pub fn to_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| CacheError::LogFile {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            sink: Sink::Writer {
                path: Some(path),
                dispatch: writer_dispatch(Mutex::new(file)),
            },
        })
    }

    /// Logger forwarding to the current `tracing` subscriber at info level.
    pub fn tracing() -> Self {
        Self { sink: Sink::Tracing }
    }

    /// Logger that drops every message.
    pub fn silent() -> Self {
        Self { sink: Sink::Silent }
    }

    /// Builds a logger from a textual target.
    ///
    /// `None` and `"stdout"` select standard output, `"off"`/`"none"` silence,
    /// `"tracing"` the tracing subscriber; anything else is a file path.
    pub fn from_target(target: Option<&str>) -> Result<Self> {
        match target.map(str::trim) {
            None | Some("") | Some("stdout") => Ok(Self::stdout()),
            Some("off") | Some("none") => Ok(Self::silent()),
            Some("tracing") => Ok(Self::tracing()),
            Some(path) => Self::to_file(path),
        }
    }

    /// Path of the backing file, if this logger writes to one.
    pub fn path(&self) -> Option<&Path> {
        match &self.sink {
            Sink::Writer { path, .. } => path.as_deref(),
            _ => None,
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self.sink, Sink::Silent)
    }

    /// Writes one informational message.
    pub fn info(&self, message: impl fmt::Display) {
        match &self.sink {
            Sink::Writer { dispatch, .. } => dispatcher::with_default(dispatch, || {
                tracing::info!(target: "icebox", "{}", message)
            }),
            Sink::Tracing => tracing::info!(target: "icebox", "{}", message),
            Sink::Silent => {}
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sink = match &self.sink {
            Sink::Writer { path: Some(path), .. } => path.display().to_string(),
            Sink::Writer { path: None, .. } => "stdout".to_string(),
            Sink::Tracing => "tracing".to_string(),
            Sink::Silent => "silent".to_string(),
        };
        f.debug_struct("Logger").field("sink", &sink).finish()
    }
}

fn writer_dispatch<W>(writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .finish();
    Dispatch::new(subscriber)
}
