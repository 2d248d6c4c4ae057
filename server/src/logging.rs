//! Logging capability injected into the server core
//!
//! Sessions, the registry and the dispatcher report events through a
//! `Logger` handed to them at construction. The default `LogFacade`
//! forwards to the `log` crate, so sink configuration (console colors, log
//! file, level filter) stays with whoever installs the global logger.

use log::Level;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Logging capability handed to the server core.
///
/// Records are pre-formatted arguments so implementations decide whether to
/// allocate.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    fn warning(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }
}

/// Forwards records to the global `log` logger under a fixed target
#[derive(Debug, Clone)]
pub struct LogFacade {
    target: &'static str,
}

impl LogFacade {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for LogFacade {
    fn default() -> Self {
        Self::new("server")
    }
}

impl Logger for LogFacade {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: self.target, level, "{}", args);
    }
}

/// Keeps every record in memory, for tests and embedders that inspect events
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every captured record, oldest first
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True if any record at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, args.to_string()));
    }
}
