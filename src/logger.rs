use std::error::Error;

use log::{error, info, warn};

/// Abstraction for printing progress messages, every component that reports progress receives one
pub trait ILogger {
    fn inform(&self, message: impl AsRef<str>) {
        println!("{}", message.as_ref());
    }

    fn error(&self, error: Box<dyn Error>) {
        println!("ERROR | {error}")
    }

    fn warn(&self, warning: impl AsRef<str>) {
        println!("WARN | {}", warning.as_ref())
    }
}

/// Prints to stdout, for tests that do not check what was reported
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLogger;

/// Forwards every message to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

#[cfg(test)]
impl ILogger for DefaultLogger {}

impl ILogger for Logger {
    fn inform(&self, message: impl AsRef<str>) {
        info!("{}", message.as_ref());
    }

    fn warn(&self, warning: impl AsRef<str>) {
        warn!("{}", warning.as_ref());
    }

    fn error(&self, error: Box<dyn Error>) {
        error!("{error}");
    }
}

pub fn init_logger() {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

#[cfg(test)]
pub mod mock {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Level {
        Info,
        Warn,
        Error,
    }

    /// Keeps every message in memory so tests can check what was reported
    #[derive(Debug, Clone, Default)]
    pub struct RecordingLogger {
        messages: Arc<Mutex<Vec<(Level, String)>>>,
    }

    impl RecordingLogger {
        pub fn new() -> Self {
            Self::default()
        }

        fn record(&self, level: Level, message: String) {
            self.messages.lock().unwrap().push((level, message));
        }

        pub fn messages(&self, level: Level) -> Vec<String> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .filter(|(message_level, _)| *message_level == level)
                .map(|(_, message)| message.clone())
                .collect()
        }

        pub fn has_message(&self, level: Level, fragment: &str) -> bool {
            self.messages(level).iter().any(|message| message.contains(fragment))
        }
    }

    impl ILogger for RecordingLogger {
        fn inform(&self, message: impl AsRef<str>) {
            self.record(Level::Info, message.as_ref().to_string());
        }

        fn warn(&self, warning: impl AsRef<str>) {
            self.record(Level::Warn, warning.as_ref().to_string());
        }

        fn error(&self, error: Box<dyn Error>) {
            self.record(Level::Error, error.to_string());
        }
    }
}
