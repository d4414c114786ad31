//! # Frog Systems
//!
//! Subsystems that buffer domain events and process them once per tick.
//!
//! ## Architecture
//!
//! * [`EventQueue`] / [`EventSender`] - thread-safe LIFO buffer any component may push into
//! * [`EventSystem`] - owns a queue, a fixed set of accepted event kinds and an
//!   [`EventHandler`]; [`EventSystem::update`] drains the events buffered before the tick
//! * [`SystemScheduler`] - ticks every registered [`Subsystem`]
//! * [`EventRouter`] - delivers an event to every subsystem that accepts its kind
//!
//! Events pushed while a drain is running are kept for the next tick, so a
//! handler that emits follow-up events can never recurse within one tick.

pub mod queue;
pub mod scheduler;
pub mod system;

pub use queue::{EventQueue, EventSender};
pub use scheduler::{EventRouter, SystemScheduler};
pub use system::{EventHandler, EventSystem, Subsystem};

use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

/// An event that can be buffered by an [`EventSystem`].
pub trait SystemEvent: Send + 'static {
    /// Discriminant used by routers to decide which subsystems receive the event.
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// Errors raised while handling a single event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
    #[error("Event rejected: {0}")]
    Rejected(String),
}

/// Outcome of one [`EventSystem::update`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Events handed to the handler
    pub processed: usize,
    /// Events whose handling returned an error or panicked
    pub failed: usize,
}

impl DrainReport {
    pub fn merge(self, other: DrainReport) -> DrainReport {
        DrainReport {
            processed: self.processed + other.processed,
            failed: self.failed + other.failed,
        }
    }
}
