//! Operator-facing event log boundary.
//!
//! Diagnostics go through `tracing`; events the operator reviews (file
//! found, moved, API rejection reasons) additionally flow through a
//! [`LogSink`] so the host application can persist them.

use tracing::{error, info, warn};

/// Severity of an operator event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Label used in persisted logs ("INFO", "WARNING", "ERROR").
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

/// Destination for operator events.
pub trait LogSink: Send + Sync {
    fn record(&self, message: &str, severity: Severity);
}

impl<T: LogSink + ?Sized> LogSink for std::sync::Arc<T> {
    fn record(&self, message: &str, severity: Severity) {
        (**self).record(message, severity);
    }
}

/// Sink that forwards events to `tracing` only.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!("{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink collecting events for assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<(String, Severity)>>,
    }

    impl RecordingSink {
        pub fn messages(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|(m, _)| m.clone())
                .collect()
        }

        pub fn has_error(&self) -> bool {
            self.events
                .lock()
                .unwrap()
                .iter()
                .any(|(_, s)| *s == Severity::Error)
        }
    }

    impl LogSink for RecordingSink {
        fn record(&self, message: &str, severity: Severity) {
            self.events
                .lock()
                .unwrap()
                .push((message.to_string(), severity));
        }
    }
}
