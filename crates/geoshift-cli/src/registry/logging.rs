use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

use super::{RegistryError, RegistryResult};

/// Progress lines on stdout (`RUST_LOG`, default `info`) plus NDJSON events
/// in the run directory.
pub fn init_run_logging(path: &Path) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| RegistryError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    let writer = RunLogWriter {
        file: Arc::new(Mutex::new(file)),
    };

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(false)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(BoxMakeWriter::new(move || writer.clone()));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time()
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))
}

/// Shared handle to `logs.ndjson`; every event goes through the same file.
#[derive(Clone)]
struct RunLogWriter {
    file: Arc<Mutex<File>>,
}

impl RunLogWriter {
    fn lock(&self) -> io::Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("run log writer poisoned"))
    }
}

impl Write for RunLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}
