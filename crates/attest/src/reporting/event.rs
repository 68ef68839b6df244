//! Structured events delivered to reporting plugins.

use std::time::SystemTime;

use crate::level::Level;

/// One leveled log or step event emitted while a test runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportingEvent {
    level: Level,
    test_description: String,
    sequence: Option<u32>,
    text: String,
    timestamp: SystemTime,
}

impl ReportingEvent {
    pub(crate) fn new(
        level: Level,
        test_description: impl Into<String>,
        sequence: Option<u32>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            level,
            test_description: test_description.into(),
            sequence,
            text: text.into(),
            timestamp: SystemTime::now(),
        }
    }

    /// Event level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Description of the test that emitted the event.
    #[must_use]
    pub fn test_description(&self) -> &str {
        &self.test_description
    }

    /// Step sequence number, starting at 1; `None` for non-step events.
    #[must_use]
    pub fn sequence(&self) -> Option<u32> {
        self.sequence
    }

    /// Event text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Wall-clock time the event was formatted.
    #[must_use]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}
