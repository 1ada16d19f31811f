//! Decode job descriptors and the worker-pool seam.
//!
//! The streaming controller hands work to the pool through the
//! [`JobQueue`] trait and never learns how the pool is scheduled. The crate
//! ships [`ThreadPool`], a plain preemptive-thread implementation; tests
//! substitute manual queues to drive jobs deterministically.

use crate::queue::{BoundedQueue, QueueFull};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// Unit of work submitted to the worker pool.
///
/// Pairs a boxed closure with a short static label used only in
/// diagnostics, mirroring the task descriptors most job systems carry.
pub struct Job {
    label: &'static str,
    run: Box<dyn FnOnce() + Send>,
}

impl Job {
    /// Create a job running `f` on some worker thread.
    pub fn new(label: &'static str, f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label,
            run: Box::new(f),
        }
    }

    /// Diagnostic label for this job.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Execute the job, consuming it.
    pub fn run(self) {
        (self.run)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Accepts jobs for asynchronous execution on a worker pool.
///
/// # Contract
///
/// Each accepted job is executed exactly once, on some worker thread, with
/// no ordering guarantee relative to other jobs. `submit` must return
/// without running the job on the calling thread: callers may hold locks
/// that the job itself acquires. A full queue is reported by handing the
/// job back, never by blocking.
pub trait JobQueue: Send + Sync {
    /// Enqueue `job`, failing fast if the pool's queue is saturated.
    fn submit(&self, job: Job) -> Result<(), QueueFull<Job>>;
}

/// Configuration for [`ThreadPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads (default: available parallelism).
    pub threads: usize,
    /// Capacity of the pending-job queue (default: 64).
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            queue_capacity: 64,
        }
    }
}

impl PoolConfig {
    /// Set the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the pending-job queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

/// Fixed-size pool of worker threads draining a bounded job queue.
///
/// Workers poll the queue with a short timeout so they can observe the
/// shutdown flag; `Drop` raises the flag and joins every worker, letting
/// already-dequeued jobs finish.
pub struct ThreadPool {
    queue: Arc<BoundedQueue<Job>>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn the worker threads described by `config`.
    pub fn new(config: PoolConfig) -> Self {
        let queue = Arc::new(BoundedQueue::new(config.queue_capacity));
        let shutdown = Arc::new(AtomicBool::new(false));

        debug!(
            threads = config.threads,
            queue_capacity = config.queue_capacity,
            "starting decode worker pool"
        );

        let mut workers = Vec::with_capacity(config.threads);
        for i in 0..config.threads {
            let queue = Arc::clone(&queue);
            let shutdown = Arc::clone(&shutdown);
            let handle = thread::Builder::new()
                .name(format!("decode-worker-{}", i))
                .spawn(move || Self::worker_loop(queue, shutdown))
                .expect("failed to spawn decode worker thread");
            workers.push(handle);
        }

        Self {
            queue,
            shutdown,
            workers,
        }
    }

    fn worker_loop(queue: Arc<BoundedQueue<Job>>, shutdown: Arc<AtomicBool>) {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            let Some(job) = queue.pop_timeout(Duration::from_millis(100)) else {
                continue;
            };
            trace!(label = job.label(), "worker executing job");
            job.run();
        }
    }

    /// Number of jobs waiting to be picked up.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl JobQueue for ThreadPool {
    fn submit(&self, job: Job) -> Result<(), QueueFull<Job>> {
        self.queue.try_push(job)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
