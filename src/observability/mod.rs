//! Observability for the versioning engine
//!
//! - Structured JSON logging
//! - Typed lifecycle events
//!
//! Observability is read-only and never fails the operation it describes.
//!
//! ```ignore
//! use memories::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::SnapshotCaptured, &[("doc_id", "book-1")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity, DEFAULT_MIN_SEVERITY};

/// Log a lifecycle event at its default severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::PolicyConfigured);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::DocumentSaved, &[("doc_id", "d"), ("rev", "1-a")]);
    }
}
