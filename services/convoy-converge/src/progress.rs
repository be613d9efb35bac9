//! Structured progress events.
//!
//! Every container transition emits one event on a broadcast channel; the
//! convergence run owns a single [`ProgressWriter`] and renderers subscribe.
//! Sends never block and never fail: a run with no subscribers is silent.

use convoy_engine::ContainerSummary;
use tokio::sync::broadcast;

/// Capacity of the progress channel; slow subscribers lose old events
/// rather than stalling convergence.
const CHANNEL_CAPACITY: usize = 256;

/// Event status, mirroring the container transition it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// Container create issued.
    Creating,
    /// Container created.
    Created,
    /// Container start issued.
    Starting,
    /// Container started.
    Started,
    /// Waiting on a dependency condition.
    Waiting,
    /// Dependency reported healthy.
    Healthy,
    /// Dependency exited successfully.
    Exited,
    /// Operation failed.
    Error,
    /// Operation skipped.
    Skipped,
    /// Non-fatal warning.
    Warning,
    /// Multi-step operation in flight.
    Working,
    /// Multi-step operation finished.
    Done,
}

/// One structured progress event.
#[derive(Debug, Clone)]
pub struct Event {
    /// Stable identity of the resource the event concerns, e.g.
    /// `Container shop-db-1`.
    pub id: String,
    /// Transition being reported.
    pub status: EventStatus,
    /// Optional human-readable detail.
    pub text: Option<String>,
}

impl Event {
    /// Creates an event with free-form detail text.
    #[must_use]
    pub fn new(id: impl Into<String>, status: EventStatus, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status,
            text: Some(text.into()),
        }
    }

    fn plain(id: impl Into<String>, status: EventStatus) -> Self {
        Self {
            id: id.into(),
            status,
            text: None,
        }
    }

    /// Container create issued.
    #[must_use]
    pub fn creating(id: impl Into<String>) -> Self {
        Self::plain(id, EventStatus::Creating)
    }

    /// Container created.
    #[must_use]
    pub fn created(id: impl Into<String>) -> Self {
        Self::plain(id, EventStatus::Created)
    }

    /// Container start issued.
    #[must_use]
    pub fn starting(id: impl Into<String>) -> Self {
        Self::plain(id, EventStatus::Starting)
    }

    /// Container started.
    #[must_use]
    pub fn started(id: impl Into<String>) -> Self {
        Self::plain(id, EventStatus::Started)
    }

    /// Waiting on a dependency condition.
    #[must_use]
    pub fn waiting(id: impl Into<String>) -> Self {
        Self::plain(id, EventStatus::Waiting)
    }

    /// Dependency reported healthy.
    #[must_use]
    pub fn healthy(id: impl Into<String>) -> Self {
        Self::plain(id, EventStatus::Healthy)
    }

    /// Dependency exited successfully.
    #[must_use]
    pub fn exited(id: impl Into<String>) -> Self {
        Self::plain(id, EventStatus::Exited)
    }

    /// Operation failed, with the failure text.
    #[must_use]
    pub fn error(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, EventStatus::Error, text)
    }

    /// Operation skipped, with the reason.
    #[must_use]
    pub fn skipped(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(id, EventStatus::Skipped, reason)
    }

    /// Non-fatal warning.
    #[must_use]
    pub fn warning(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, EventStatus::Warning, text)
    }

    /// Multi-step operation in flight, e.g. `Recreate`.
    #[must_use]
    pub fn working(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, EventStatus::Working, text)
    }

    /// Multi-step operation finished, e.g. `Recreated`.
    #[must_use]
    pub fn done(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, EventStatus::Done, text)
    }
}

/// Progress event ID for a container.
#[must_use]
pub fn container_progress_id(container: &ContainerSummary) -> String {
    format!("Container {}", container.canonical_name())
}

/// Concurrency-safe fan-out of progress events.
#[derive(Debug, Clone)]
pub struct ProgressWriter {
    sender: broadcast::Sender<Event>,
}

impl ProgressWriter {
    /// Creates a writer with no subscribers yet.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribes to events emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Emits one event.
    pub fn event(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    /// Emits a batch of events.
    pub fn events(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.event(event);
        }
    }
}

impl Default for ProgressWriter {
    fn default() -> Self {
        Self::new()
    }
}
