use std::sync::Mutex;

use shared::types::{Notification, NotificationCategory, ProgressEvent};

/// Write-only diagnostics channel. The analyzer reports pre-flight findings
/// here; the driver reports solver-status messages.
#[cfg_attr(feature = "test-support", mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Write-only incumbent stream. Events must be delivered to the observer in
/// the order they are published.
#[cfg_attr(feature = "test-support", mockall::automock)]
pub trait ProgressSink: Send + Sync {
    fn publish(&self, event: ProgressEvent);
}

/// Default sink: forwards notifications to the tracing pipeline.
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, notification: Notification) {
        match notification.category {
            NotificationCategory::Error => tracing::error!("{}", notification.message),
            NotificationCategory::Warning => tracing::warn!("{}", notification.message),
            NotificationCategory::Info => tracing::info!("{}", notification.message),
        }
    }
}

/// Default sink: logs each incumbent as it arrives.
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn publish(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Reset => tracing::debug!("progress reset"),
            ProgressEvent::Incumbent {
                solution_index,
                elapsed_seconds,
                objective_value,
            } => tracing::info!(
                solution_index,
                elapsed_seconds,
                objective_value,
                "incumbent solution"
            ),
        }
    }
}

/// Collects notifications so a caller can attach them to its response.
#[derive(Default)]
pub struct MemoryNotificationSink {
    inner: Mutex<Vec<Notification>>,
}

impl MemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner.lock().expect("notification sink poisoned").clone()
    }
}

impl NotificationSink for MemoryNotificationSink {
    fn notify(&self, notification: Notification) {
        self.inner
            .lock()
            .expect("notification sink poisoned")
            .push(notification);
    }
}

/// Collects progress events in publish order.
#[derive(Default)]
pub struct MemoryProgressSink {
    inner: Mutex<Vec<ProgressEvent>>,
}

impl MemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<ProgressEvent> {
        self.inner.lock().expect("progress sink poisoned").clone()
    }
}

impl ProgressSink for MemoryProgressSink {
    fn publish(&self, event: ProgressEvent) {
        self.inner.lock().expect("progress sink poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_preserves_order() {
        let sink = MemoryProgressSink::new();
        sink.publish(ProgressEvent::Reset);
        sink.publish(ProgressEvent::Incumbent {
            solution_index: 1,
            elapsed_seconds: 0.5,
            objective_value: 100,
        });
        let events = sink.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ProgressEvent::Reset);
    }

    #[test]
    fn notification_helpers_set_category() {
        let sink = MemoryNotificationSink::new();
        sink.notify(Notification::error("boom"));
        sink.notify(Notification::warning("hmm"));
        let notes = sink.snapshot();
        assert_eq!(notes[0].category, NotificationCategory::Error);
        assert_eq!(notes[1].category, NotificationCategory::Warning);
    }
}
