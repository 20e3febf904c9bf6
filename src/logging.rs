//! Routing of the crate's own log records to a caller-chosen sink.
//!
//! Everything in this crate logs through the [`log`] facade. Applications that
//! already install a logger (`env_logger` and friends) can ignore this module.
//! Others call [`init`] once and pick a sink and a threshold:
//!
//! ```no_run
//! use log::LevelFilter;
//!
//! wss::logging::init().ok();
//! wss::logging::set_level(LevelFilter::Debug);
//! wss::logging::set_sink(|level, message, location| {
//!     println!("{level} {}:{} {message}", location.file.unwrap_or("?"), location.line.unwrap_or(0));
//! });
//! ```

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::sync::{PoisonError, RwLock};

/// Source position of a log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location<'a> {
    /// Source file, if known.
    pub file: Option<&'a str>,
    /// Line within [`file`](Self::file).
    pub line: Option<u32>,
    /// Module that logged the record.
    pub module_path: Option<&'a str>,
}

type Sink = Box<dyn Fn(Level, &str, &Location<'_>) + Send + Sync>;

static SINK: RwLock<Option<Sink>> = RwLock::new(None);
static DISPATCH: Dispatch = Dispatch;

const CRATE: &str = env!("CARGO_CRATE_NAME");

/// Install the crate dispatcher as the process-wide `log` logger.
///
/// The threshold starts at [`LevelFilter::Error`]. Fails if another logger was
/// installed first.
pub fn init() -> Result<(), SetLoggerError> {
    log::set_logger(&DISPATCH)?;
    log::set_max_level(LevelFilter::Error);
    Ok(())
}

/// Send records to `sink` instead of standard error.
pub fn set_sink<F>(sink: F)
where
    F: Fn(Level, &str, &Location<'_>) + Send + Sync + 'static,
{
    *SINK.write().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(sink));
}

/// Go back to writing records to standard error.
pub fn reset_sink() {
    *SINK.write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Drop records less severe than `level`. [`LevelFilter::Off`] silences the crate.
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

/// The `log` backend behind [`init`].
#[derive(Debug, Clone, Copy)]
struct Dispatch;

impl Log for Dispatch {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && is_ours(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let location =
            Location { file: record.file(), line: record.line(), module_path: record.module_path() };
        let message = record.args().to_string();
        match *SINK.read().unwrap_or_else(PoisonError::into_inner) {
            Some(ref sink) => sink(record.level(), &message, &location),
            None => eprintln!(
                "{} [{}:{}] {}",
                record.level(),
                location.file.unwrap_or("<unknown>"),
                location.line.unwrap_or(0),
                message
            ),
        }
    }

    fn flush(&self) {}
}

fn is_ours(target: &str) -> bool {
    target == CRATE || target.strip_prefix(CRATE).map_or(false, |rest| rest.starts_with("::"))
}
