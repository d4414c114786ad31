//! Tick scheduling and event routing across subsystems.

use crate::{queue::EventSender, system::Subsystem, DrainReport, SystemEvent};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Delivers events to every subsystem that declared interest in their kind.
pub struct EventRouter<E: SystemEvent> {
    routes: Vec<(String, HashSet<E::Kind>, EventSender<E>)>,
}

impl<E: SystemEvent> Clone for EventRouter<E> {
    fn clone(&self) -> Self {
        Self {
            routes: self.routes.clone(),
        }
    }
}

impl<E: SystemEvent + Clone> EventRouter<E> {
    /// Pushes the event into each accepting subsystem, returning how many received it.
    pub fn route(&self, event: E) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for (name, accepted, sender) in &self.routes {
            if accepted.contains(&kind) {
                sender.push_event(event.clone());
                delivered += 1;
                debug!("Routed {:?} event to system '{}'", kind, name);
            }
        }
        delivered
    }
}

impl<E: SystemEvent> EventRouter<E> {
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

/// Owns the subsystems and ticks them in registration order.
pub struct SystemScheduler<E: SystemEvent> {
    systems: Vec<Box<dyn Subsystem<E>>>,
    ticks: u64,
}

impl<E: SystemEvent> SystemScheduler<E> {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            ticks: 0,
        }
    }

    pub fn add_system(&mut self, system: Box<dyn Subsystem<E>>) {
        info!("Registered system '{}'", system.name());
        self.systems.push(system);
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Runs one update on every system.
    pub fn tick(&mut self, delta: Duration) -> DrainReport {
        self.ticks += 1;
        self.systems
            .iter_mut()
            .map(|system| system.update(delta))
            .fold(DrainReport::default(), DrainReport::merge)
    }

    /// Router snapshot over the currently registered systems.
    pub fn router(&self) -> EventRouter<E> {
        EventRouter {
            routes: self
                .systems
                .iter()
                .map(|s| (s.name().to_string(), s.accepted_event_types(), s.sender()))
                .collect(),
        }
    }
}

impl<E: SystemEvent> Default for SystemScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventError, EventHandler, EventSystem};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Moved,
        Spoke,
    }

    #[derive(Debug, Clone)]
    struct Event(Kind);

    impl SystemEvent for Event {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            self.0
        }
    }

    struct Count(Arc<AtomicUsize>);

    impl EventHandler<Event> for Count {
        fn event_received(&mut self, _event: Event) -> Result<(), EventError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_router_respects_accepted_kinds() {
        let movement = Arc::new(AtomicUsize::new(0));
        let chat = Arc::new(AtomicUsize::new(0));

        let mut scheduler = SystemScheduler::new();
        scheduler.add_system(Box::new(EventSystem::new(
            "movement",
            [Kind::Moved],
            Count(Arc::clone(&movement)),
        )));
        scheduler.add_system(Box::new(EventSystem::new(
            "chat",
            [Kind::Spoke, Kind::Moved],
            Count(Arc::clone(&chat)),
        )));

        let router = scheduler.router();
        assert_eq!(router.route(Event(Kind::Moved)), 2);
        assert_eq!(router.route(Event(Kind::Spoke)), 1);

        let report = scheduler.tick(Duration::from_millis(50));
        assert_eq!(report.processed, 3);
        assert_eq!(movement.load(Ordering::SeqCst), 1);
        assert_eq!(chat.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.tick_count(), 1);
    }

    #[test]
    fn test_empty_tick() {
        let mut scheduler: SystemScheduler<Event> = SystemScheduler::new();
        assert_eq!(scheduler.tick(Duration::ZERO), DrainReport::default());
        assert_eq!(scheduler.router().route(Event(Kind::Moved)), 0);
    }
}
