//! The generic event-draining subsystem.

use crate::{
    queue::{EventQueue, EventSender},
    DrainReport, EventError, SystemEvent,
};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Subsystem-specific event processing.
pub trait EventHandler<E: SystemEvent>: Send {
    /// Handles one drained event.
    fn event_received(&mut self, event: E) -> Result<(), EventError>;

    /// Called once per tick after the drain.
    fn on_tick(&mut self, _delta: Duration) {}
}

/// Object-safe view of an [`EventSystem`] used by the scheduler.
pub trait Subsystem<E: SystemEvent>: Send {
    fn name(&self) -> &str;

    fn update(&mut self, delta: Duration) -> DrainReport;

    fn is_accepted_event_type(&self, kind: E::Kind) -> bool;

    fn accepted_event_types(&self) -> HashSet<E::Kind>;

    fn sender(&self) -> EventSender<E>;
}

/// A subsystem with its own LIFO event queue.
///
/// The set of accepted event kinds is fixed at construction. It is advisory:
/// routers consult [`EventSystem::is_accepted_event_type`] before delivering,
/// while [`EventSystem::push_event`] itself buffers any event.
///
/// # Example
///
/// ```rust
/// use frog_systems::{EventError, EventHandler, EventSystem, SystemEvent};
/// use std::time::Duration;
///
/// struct Ping;
/// impl SystemEvent for Ping {
///     type Kind = ();
///     fn kind(&self) -> Self::Kind {}
/// }
///
/// struct Counter(usize);
/// impl EventHandler<Ping> for Counter {
///     fn event_received(&mut self, _event: Ping) -> Result<(), EventError> {
///         self.0 += 1;
///         Ok(())
///     }
/// }
///
/// let mut system = EventSystem::new("counter", [()], Counter(0));
/// system.push_event(Ping);
/// system.update(Duration::from_millis(16));
/// assert_eq!(system.handler().0, 1);
/// ```
pub struct EventSystem<E: SystemEvent, H> {
    name: String,
    queue: Arc<EventQueue<E>>,
    accepted: HashSet<E::Kind>,
    handler: H,
}

impl<E, H> EventSystem<E, H>
where
    E: SystemEvent,
    H: EventHandler<E>,
{
    pub fn new(name: impl Into<String>, accepted: impl IntoIterator<Item = E::Kind>, handler: H) -> Self {
        Self {
            name: name.into(),
            queue: Arc::new(EventQueue::new()),
            accepted: accepted.into_iter().collect(),
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Buffers an event for the next [`update`](Self::update).
    pub fn push_event(&self, event: E) {
        self.queue.push(event);
    }

    /// Handle for pushing events from other threads or components.
    pub fn sender(&self) -> EventSender<E> {
        EventSender::new(Arc::clone(&self.queue))
    }

    pub fn is_accepted_event_type(&self, kind: E::Kind) -> bool {
        self.accepted.contains(&kind)
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Drains the events buffered before this call, most recent first.
    ///
    /// A failing event is logged and skipped; the drain continues with the
    /// next one. Events pushed by the handler during the drain stay queued.
    pub fn update(&mut self, delta: Duration) -> DrainReport {
        let mut batch = self.queue.take_all();
        let mut report = DrainReport::default();

        while let Some(event) = batch.pop() {
            report.processed += 1;
            let kind = event.kind();
            let handler = &mut self.handler;
            match catch_unwind(AssertUnwindSafe(|| handler.event_received(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    error!("System '{}' failed to handle {:?} event: {}", self.name, kind, e);
                }
                Err(_) => {
                    report.failed += 1;
                    error!("System '{}' panicked while handling {:?} event", self.name, kind);
                }
            }
        }

        self.handler.on_tick(delta);

        if report.processed > 0 {
            debug!(
                "System '{}' drained {} event(s), {} failed",
                self.name, report.processed, report.failed
            );
        }
        report
    }
}

impl<E, H> Subsystem<E> for EventSystem<E, H>
where
    E: SystemEvent,
    H: EventHandler<E>,
{
    fn name(&self) -> &str {
        EventSystem::name(self)
    }

    fn update(&mut self, delta: Duration) -> DrainReport {
        EventSystem::update(self, delta)
    }

    fn is_accepted_event_type(&self, kind: E::Kind) -> bool {
        EventSystem::is_accepted_event_type(self, kind)
    }

    fn accepted_event_types(&self) -> HashSet<E::Kind> {
        self.accepted.clone()
    }

    fn sender(&self) -> EventSender<E> {
        EventSystem::sender(self)
    }
}
