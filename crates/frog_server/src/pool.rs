//! The fixed-size pool of task-execution threads.

use crate::{error::ServerError, handlers::HandlerRegistry, queue::RequestQueue};
use frog_types::{Request, RequestResult};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Runs a request through its registered handler.
///
/// Always produces a result: handler errors and panics become failures, and a
/// kind without a handler takes the default not-handled path.
pub fn execute_request(registry: &HandlerRegistry, request: &Request) -> RequestResult {
    let Some(handler) = registry.get(request.kind()) else {
        debug!("No handler for {} request {}, using default path", request.kind(), request.id());
        return RequestResult::not_handled(request);
    };

    match catch_unwind(AssertUnwindSafe(|| handler.handle(request))) {
        Ok(Ok(payload)) => RequestResult::success(request, payload),
        Ok(Err(e)) => {
            warn!("Handler '{}' failed on request {}: {}", handler.name(), request.id(), e);
            RequestResult::failure(request, e.to_string())
        }
        Err(_) => {
            error!("Handler '{}' panicked on request {}", handler.name(), request.id());
            RequestResult::failure(request, format!("handler '{}' crashed", handler.name()))
        }
    }
}

/// Worker threads draining one [`RequestQueue`].
///
/// Each worker takes one task at a time, executes it to completion and calls
/// its completion listener before taking the next. Workers exit once the
/// queue's shutdown signal fires while they wait.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    executed: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawns the worker threads.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of workers; 0 is raised to 1
    /// * `queue` - The queue shared with every connection worker
    /// * `registry` - Handlers the workers dispatch requests to
    ///
    /// # Returns
    ///
    /// The running pool, or [`ServerError::Io`] if a worker thread could not
    /// be spawned.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frog_server::{HandlerRegistry, RequestQueue, ShutdownSignal, Task, WorkerPool};
    /// use frog_types::{Request, RequestKind, ResultStatus};
    /// use std::sync::Arc;
    ///
    /// let shutdown = ShutdownSignal::new();
    /// let queue = RequestQueue::new(shutdown.clone());
    /// let pool = WorkerPool::start(2, queue.clone(), Arc::new(HandlerRegistry::new())).unwrap();
    ///
    /// let request = Request::new(RequestKind::TileQuery, serde_json::json!({}));
    /// let (task, result) = Task::with_handle(request);
    /// queue.submit(task).unwrap();
    /// assert_eq!(result.wait().unwrap().status(), ResultStatus::NotHandled);
    ///
    /// shutdown.trigger();
    /// pool.join();
    /// ```
    pub fn start(size: usize, queue: RequestQueue, registry: Arc<HandlerRegistry>) -> Result<Self, ServerError> {
        let size = size.max(1);
        let executed = Arc::new(AtomicUsize::new(0));
        let mut workers = Vec::with_capacity(size);

        for index in 0..size {
            let queue = queue.clone();
            let registry = Arc::clone(&registry);
            let executed = Arc::clone(&executed);
            let handle = thread::Builder::new()
                .name(format!("frog-worker-{index}"))
                .spawn(move || worker_loop(index, &queue, &registry, &executed))?;
            workers.push(handle);
        }

        info!("⚙️ Worker pool started with {} thread(s)", size);
        Ok(Self { workers, executed })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Tasks executed since the pool started.
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::Relaxed)
    }

    /// Waits for every worker to exit. Call after triggering shutdown.
    pub fn join(self) {
        for worker in self.workers {
            if worker.join().is_err() {
                error!("Worker thread panicked");
            }
        }
        info!("Worker pool stopped");
    }
}

fn worker_loop(index: usize, queue: &RequestQueue, registry: &HandlerRegistry, executed: &AtomicUsize) {
    while let Some(task) = queue.take() {
        let result = execute_request(registry, task.request());
        executed.fetch_add(1, Ordering::Relaxed);

        if catch_unwind(AssertUnwindSafe(|| task.complete(result))).is_err() {
            error!("Completion listener panicked on worker {}", index);
        }
    }
    debug!("Worker {} observed shutdown while waiting for a task", index);
}
