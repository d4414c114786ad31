//! Fan-out of received packets to subscribers.

use crate::error::SubscriberError;
use crossbeam::channel::{self, Receiver, Sender};
use frog_types::Message;
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{error, warn};

/// Receives every packet read from the connection.
///
/// Called on the connection's reader thread, so implementations should hand
/// work off rather than block.
pub trait PacketSubscriber: Send + Sync {
    fn push_packet(&self, message: &Message) -> Result<(), SubscriberError>;
}

impl<F> PacketSubscriber for F
where
    F: Fn(&Message) -> Result<(), SubscriberError> + Send + Sync,
{
    fn push_packet(&self, message: &Message) -> Result<(), SubscriberError> {
        self(message)
    }
}

/// Forwards packets into a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    sender: Sender<Message>,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, Receiver<Message>) {
        let (sender, receiver) = channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl PacketSubscriber for ChannelSubscriber {
    fn push_packet(&self, message: &Message) -> Result<(), SubscriberError> {
        self.sender
            .send(message.clone())
            .map_err(|_| SubscriberError::Disconnected)
    }
}

/// Handle returned by [`PacketDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Entry {
    id: SubscriberId,
    subscriber: Arc<dyn PacketSubscriber>,
    // Held for the whole delivery to this subscriber. Reentrant so that a
    // subscriber may unsubscribe itself from inside `push_packet`.
    active: ReentrantMutex<Cell<bool>>,
}

/// The subscriber set of one connection.
///
/// Delivery iterates over a snapshot of the set, so concurrent
/// [`subscribe`](Self::subscribe) calls never observe a half-updated list.
/// [`unsubscribe`](Self::unsubscribe) waits for an in-flight delivery to the
/// removed subscriber to finish; once it returns, that subscriber receives
/// nothing more.
pub struct PacketDispatcher {
    subscribers: RwLock<Vec<Arc<Entry>>>,
    next_id: AtomicU64,
}

impl PacketDispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<S>(&self, subscriber: S) -> SubscriberId
    where
        S: PacketSubscriber + 'static,
    {
        self.subscribe_shared(Arc::new(subscriber))
    }

    pub fn subscribe_shared(&self, subscriber: Arc<dyn PacketSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push(Arc::new(Entry {
            id,
            subscriber,
            active: ReentrantMutex::new(Cell::new(true)),
        }));
        id
    }

    /// Removes a subscriber. Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = {
            let mut subscribers = self.subscribers.write();
            let index = subscribers.iter().position(|entry| entry.id == id);
            index.map(|index| subscribers.remove(index))
        };

        match removed {
            Some(entry) => {
                entry.active.lock().set(false);
                true
            }
            None => false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Delivers a packet to every current subscriber, returning how many
    /// accepted it.
    ///
    /// A subscriber that fails or panics is logged and skipped.
    pub fn dispatch(&self, message: &Message) -> usize {
        let snapshot: Vec<Arc<Entry>> = self.subscribers.read().clone();
        let mut delivered = 0;

        for entry in snapshot {
            let active = entry.active.lock();
            if !active.get() {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| entry.subscriber.push_packet(message))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!("Subscriber {:?} failed to handle {}: {}", entry.id, message.kind(), e)
                }
                Err(_) => error!("Subscriber {:?} panicked while handling {}", entry.id, message.kind()),
            }
        }

        delivered
    }
}

impl Default for PacketDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
