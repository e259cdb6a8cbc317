// ABOUTME: Progress events emitted while exporting or importing tables
// ABOUTME: Delivered over a tokio channel so a front end can render them on its own task

use tokio::sync::mpsc;

/// A single progress notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Work on a table has started
    TableStarted {
        name: String,
        index: usize,
        total: usize,
    },
    /// A batch of rows was written (export) or inserted (import)
    BatchWritten {
        name: String,
        rows_done: u64,
        rows_total: u64,
    },
    /// A table finished successfully
    TableFinished { name: String, rows: u64 },
    /// A table was skipped (filtered out, or missing from the export)
    TableSkipped { name: String, reason: String },
    /// Every table has been processed
    Finished { tables: usize, rows: u64 },
}

/// Sending half of a progress channel
///
/// Cloning is cheap. A sink without a receiver (or whose receiver was
/// dropped) silently discards events, so reporting never fails an export.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    /// Create a sink and the receiver that consumes its events
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A sink that drops every event
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn report(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_receiver_in_order() {
        let (sink, mut receiver) = ProgressSink::channel();
        sink.report(ProgressEvent::TableStarted {
            name: "Action".into(),
            index: 0,
            total: 2,
        });
        sink.report(ProgressEvent::TableFinished {
            name: "Action".into(),
            rows: 3,
        });

        assert!(matches!(
            receiver.try_recv(),
            Ok(ProgressEvent::TableStarted { index: 0, .. })
        ));
        assert_eq!(
            receiver.try_recv().unwrap(),
            ProgressEvent::TableFinished {
                name: "Action".into(),
                rows: 3
            }
        );
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (sink, receiver) = ProgressSink::channel();
        drop(receiver);
        sink.report(ProgressEvent::Finished { tables: 0, rows: 0 });
    }

    #[test]
    fn test_disabled_sink() {
        ProgressSink::disabled().report(ProgressEvent::Finished { tables: 1, rows: 1 });
    }
}
