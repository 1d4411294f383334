//! Console logger implementation

use super::traits::{Level, Logger};

/// Writes lines at or above a threshold to the console
///
/// `Info` goes to stdout, every other level to stderr.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    prefix: String,
    threshold: Level,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    /// `[askit]` prefix, `Info` and above
    pub fn new() -> Self {
        Self {
            prefix: "[askit]".to_string(),
            threshold: Level::Info,
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::new()
        }
    }

    /// Lowest level that gets printed
    pub fn with_threshold(mut self, threshold: Level) -> Self {
        self.threshold = threshold;
        self
    }

    fn enabled(&self, level: Level) -> bool {
        level >= self.threshold
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, level: Level, message: &str) {
        if !self.enabled(level) {
            return;
        }
        match level {
            Level::Info => println!("{} {}: {}", self.prefix, level, message),
            _ => eprintln!("{} {}: {}", self.prefix, level, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold() {
        let logger = ConsoleLogger::new();
        assert_eq!(logger.prefix, "[askit]");
        assert!(!logger.enabled(Level::Debug));
        assert!(logger.enabled(Level::Warn));

        let chatty = ConsoleLogger::with_prefix("[cli]").with_threshold(Level::Debug);
        assert_eq!(chatty.prefix, "[cli]");
        assert!(chatty.enabled(Level::Debug));
    }
}
