//! In-process job event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`JobEventBus`] is the publish/subscribe hub for [`JobEvent`]s. It is
//! designed to be shared via `Arc<JobEventBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// A build job lifecycle event.
///
/// Constructed via [`JobEvent::new`] and enriched with
/// [`with_payload`](JobEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    /// Dot-separated event name, e.g. `"job.ready"`.
    pub event_type: String,

    pub job_id: Uuid,

    pub project_id: Uuid,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(event_type: impl Into<String>, job_id: Uuid, project_id: Uuid) -> Self {
        Self {
            event_type: event_type.into(),
            job_id,
            project_id,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// JobEventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for job events.
pub struct JobEventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl JobEventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are
    /// dropped and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: JobEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = JobEventBus::default();
        let mut rx = bus.subscribe();

        let job_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        bus.publish(
            JobEvent::new("job.ready", job_id, project_id)
                .with_payload(serde_json::json!({"component_name": "SpinningLogo"})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "job.ready");
        assert_eq!(received.job_id, job_id);
        assert_eq!(received.payload["component_name"], "SpinningLogo");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = JobEventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(JobEvent::new("job.submitted", Uuid::new_v4(), Uuid::new_v4()));

        assert_eq!(rx1.recv().await.unwrap().event_type, "job.submitted");
        assert_eq!(rx2.recv().await.unwrap().event_type, "job.submitted");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let bus = JobEventBus::default();
        bus.publish(JobEvent::new("job.submitted", Uuid::new_v4(), Uuid::new_v4()));
    }
}
