//! Caller-visible configuration: where log messages go, and how noisy they
//! are. The loader performs no logging of its own beyond this sink — there
//! is no global logging facade wired in, matching the rest of the core,
//! which is free of ambient I/O.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Info,
    Debug,
}

/// Runtime configuration for a single load call.
///
/// `Config` does not implement `Clone` or `Copy`: the log sink is a boxed
/// closure, matched one-to-one with a single `load_str`/`load_reader` call.
pub struct Config {
    pub log_sink: Option<Box<dyn Fn(LogLevel, &str)>>,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_sink: None,
            log_level: LogLevel::Error,
        }
    }
}

impl Config {
    pub(crate) fn log(&self, level: LogLevel, message: impl FnOnce() -> String) {
        let Some(sink) = &self.log_sink else {
            return;
        };
        if level > self.log_level {
            return;
        }
        sink(level, &message());
    }
}
