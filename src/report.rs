//! User-facing progress messages.
//!
//! The pipeline never prints on its own; it reports through a [`MessageSink`]
//! handed in by the caller.

use log::Level;

pub trait MessageSink {
    fn message(&self, level: Level, text: &str);

    fn info(&self, text: &str) {
        self.message(Level::Info, text);
    }

    fn warn(&self, text: &str) {
        self.message(Level::Warn, text);
    }

    fn error(&self, text: &str) {
        self.message(Level::Error, text);
    }
}

/// Forwards messages to the `log` facade. The binary's logger adds timestamps.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn message(&self, level: Level, text: &str) {
        log::log!(target: "polarsteps_gpx", level, "{text}");
    }
}

impl<F> MessageSink for F
where
    F: Fn(Level, &str),
{
    fn message(&self, level: Level, text: &str) {
        self(level, text)
    }
}
