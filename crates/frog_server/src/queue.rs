//! Tasks and the shared FIFO request queue.

use crate::{error::QueueError, shutdown::ShutdownSignal};
use crossbeam::channel::{self, select, Receiver, Sender};
use frog_types::{Request, RequestResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Receives the result of a finished task.
///
/// Invoked exactly once per task, on the worker thread that executed it.
pub trait CompletionListener: Send + Sync {
    fn request_execution_finished(&self, result: RequestResult);
}

impl CompletionListener for Sender<RequestResult> {
    fn request_execution_finished(&self, result: RequestResult) {
        // The waiting side may have given up; the result is simply dropped.
        let _ = self.send(result);
    }
}

/// A request paired with whoever wants its result.
pub struct Task {
    request: Request,
    completion: Option<Arc<dyn CompletionListener>>,
}

impl Task {
    pub fn new(request: Request, completion: Arc<dyn CompletionListener>) -> Self {
        Self {
            request,
            completion: Some(completion),
        }
    }

    /// A task nobody waits for. Its result is only logged.
    pub fn detached(request: Request) -> Self {
        Self {
            request,
            completion: None,
        }
    }

    /// A task whose result can be awaited through the returned handle.
    pub fn with_handle(request: Request) -> (Self, ResultHandle) {
        let (sender, receiver) = channel::bounded(1);
        (Self::new(request, Arc::new(sender)), ResultHandle { receiver })
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Hands the result to the completion listener, consuming the task.
    pub fn complete(self, result: RequestResult) {
        match self.completion {
            Some(listener) => listener.request_execution_finished(result),
            None => debug!(
                "Detached {} request {} finished with {:?}",
                result.kind(),
                result.request_id(),
                result.status()
            ),
        }
    }
}

/// Future-like handle on the result of one task.
#[derive(Debug)]
pub struct ResultHandle {
    receiver: Receiver<RequestResult>,
}

impl ResultHandle {
    /// Blocks until the result arrives. `None` if the task was dropped
    /// without running, which only happens during shutdown.
    pub fn wait(self) -> Option<RequestResult> {
        self.receiver.recv().ok()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<RequestResult> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// Thread-safe FIFO of tasks shared by all connection workers and all pool workers.
///
/// Ordering is first-submitted, first-taken across the whole queue; there is
/// no per-connection fairness.
#[derive(Clone)]
pub struct RequestQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    shutdown: ShutdownSignal,
}

impl RequestQueue {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            sender,
            receiver,
            shutdown,
        }
    }

    /// Appends a task without blocking.
    ///
    /// # Errors
    ///
    /// [`QueueError::Closed`] once shutdown has been triggered.
    pub fn submit(&self, task: Task) -> Result<(), QueueError> {
        if self.shutdown.is_triggered() {
            return Err(QueueError::Closed);
        }
        self.sender.send(task).map_err(|_| QueueError::Closed)
    }

    /// Blocks until a task is available, or returns `None` on shutdown.
    pub fn take(&self) -> Option<Task> {
        if self.shutdown.is_triggered() {
            return None;
        }
        select! {
            recv(self.receiver) -> task => task.ok(),
            recv(self.shutdown.receiver()) -> _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}
