//! LIFO event buffers.

use parking_lot::Mutex;
use std::sync::Arc;

/// Thread-safe stack of pending events.
#[derive(Debug)]
pub struct EventQueue<E> {
    stack: Mutex<Vec<E>>,
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            stack: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, event: E) {
        self.stack.lock().push(event);
    }

    /// Removes every buffered event, returned in push order.
    ///
    /// Popping from the end of the returned vector yields the most recently
    /// pushed event first.
    pub fn take_all(&self) -> Vec<E> {
        std::mem::take(&mut *self.stack.lock())
    }

    pub fn len(&self) -> usize {
        self.stack.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.lock().is_empty()
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle that pushes into one subsystem's queue.
#[derive(Debug)]
pub struct EventSender<E> {
    queue: Arc<EventQueue<E>>,
}

impl<E> EventSender<E> {
    pub(crate) fn new(queue: Arc<EventQueue<E>>) -> Self {
        Self { queue }
    }

    pub fn push_event(&self, event: E) {
        self.queue.push(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<E> Clone for EventSender<E> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}
