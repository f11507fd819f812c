//! Progress and status reporting interface
//!
//! The pipeline reports through a narrow sink: status text, an optional
//! numeric `(current, max)` pair, and exactly one terminal notification per
//! run. Presentation layers implement the trait however they like; the CLI
//! renders it with indicatif.

use crate::app::pipeline::RunOutcome;
use std::sync::Mutex;

/// Receiver of pipeline status updates
///
/// Implementations are shared between the orchestrating task and parse
/// workers, so they must tolerate concurrent calls.
pub trait ProgressSink: Send + Sync {
    /// Discrete status text
    fn status(&self, message: &str);

    /// Numeric progress; `max` is `None` when the total is unknown
    fn progress(&self, current: u64, max: Option<u64>);

    /// Terminal notification, delivered once per run
    fn finish(&self, outcome: &RunOutcome);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn status(&self, _message: &str) {}

    fn progress(&self, _current: u64, _max: Option<u64>) {}

    fn finish(&self, _outcome: &RunOutcome) {}
}

/// One recorded sink call
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Status(String),
    Progress { current: u64, max: Option<u64> },
    Finished(String),
}

/// Sink that keeps every update in memory
///
/// Useful for embedding callers that poll state, and for tests.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Recorded status texts in order
    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Status(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Number of terminal notifications received
    pub fn finish_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ProgressEvent::Finished(_)))
            .count()
    }

    /// Last numeric progress pair
    pub fn last_progress(&self) -> Option<(u64, Option<u64>)> {
        self.events().into_iter().rev().find_map(|event| match event {
            ProgressEvent::Progress { current, max } => Some((current, max)),
            _ => None,
        })
    }

    fn push(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ProgressSink for RecordingProgress {
    fn status(&self, message: &str) {
        self.push(ProgressEvent::Status(message.to_string()));
    }

    fn progress(&self, current: u64, max: Option<u64>) {
        self.push(ProgressEvent::Progress { current, max });
    }

    fn finish(&self, outcome: &RunOutcome) {
        self.push(ProgressEvent::Finished(outcome.to_string()));
    }
}

/// Percentage of `current` over `max`, `None` when the total is unknown
pub fn percentage(current: u64, max: Option<u64>) -> Option<f64> {
    match max {
        Some(total) if total > 0 => Some((current as f64 / total as f64) * 100.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_progress_keeps_order() {
        let sink = RecordingProgress::new();
        sink.status("Downloading ZIP...");
        sink.progress(10, Some(100));
        sink.progress(20, Some(100));
        sink.status("Extracting ZIP...");

        assert_eq!(sink.statuses(), vec!["Downloading ZIP...", "Extracting ZIP..."]);
        assert_eq!(sink.last_progress(), Some((20, Some(100))));
        assert_eq!(sink.finish_count(), 0);
    }

    #[test]
    fn test_percentage_handles_unknown_totals() {
        assert_eq!(percentage(50, Some(200)), Some(25.0));
        assert_eq!(percentage(50, None), None);
        assert_eq!(percentage(0, Some(0)), None);
    }

    #[test]
    fn test_null_progress_accepts_everything() {
        let sink = NullProgress;
        sink.status("anything");
        sink.progress(1, None);
    }
}
