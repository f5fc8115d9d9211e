//! Bounded Compute Pool
//!
//! Fire-and-forget workers for pure motion and collision math. Jobs hand
//! their results back through the shard's apply queue; nothing ever joins on
//! a job from the tick thread.
//!
//! ```text
//! tick thread ──try_send──► [ bounded queue ] ──► worker 0..N
//!      │                          full?
//!      └──────── run inline ◄─────┘
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender, TrySendError};
use tracing::{debug, warn};

use crate::error::Result;

/// A unit of offloaded work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size worker pool fed by a bounded queue.
///
/// With zero threads every job runs inline on the submitting thread, which
/// makes scheduling fully deterministic.
pub struct ComputePool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl ComputePool {
    /// Start `threads` workers sharing a queue of `capacity` jobs.
    pub fn new(threads: usize, capacity: usize) -> Result<Self> {
        if threads == 0 {
            return Ok(Self::inline());
        }

        let (sender, receiver) = bounded::<Job>(capacity.max(1));
        let mut workers = Vec::with_capacity(threads);
        for i in 0..threads {
            let receiver = receiver.clone();
            let worker = std::thread::Builder::new()
                .name(format!("effect-compute-{}", i))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        run_guarded(job);
                    }
                })?;
            workers.push(worker);
        }
        debug!("Compute pool started with {} threads (queue {})", threads, capacity);

        Ok(Self { sender: Some(sender), workers })
    }

    /// Pool that runs every job on the caller.
    pub fn inline() -> Self {
        Self { sender: None, workers: Vec::new() }
    }

    /// Number of worker threads. Zero for an inline pool.
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Submit a job. Runs it inline when the queue is full or closed.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        let job: Job = Box::new(job);
        let Some(sender) = &self.sender else {
            run_guarded(job);
            return;
        };
        match sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                debug!("Compute queue full, running job inline");
                run_guarded(job);
            }
            Err(TrySendError::Disconnected(job)) => run_guarded(job),
        }
    }

    /// Close the queue and wait for the workers to drain it.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Compute worker exited with a panic");
            }
        }
    }
}

impl Drop for ComputePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_guarded(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        warn!("Compute job panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn test_inline_pool_runs_immediately() {
        let pool = ComputePool::new(0, 16).unwrap();
        assert_eq!(pool.threads(), 0);
        let (tx, rx) = unbounded();
        pool.submit(move || tx.send(7).unwrap());
        assert_eq!(rx.try_recv().unwrap(), 7);
    }

    #[test]
    fn test_workers_complete_all_jobs() {
        let pool = ComputePool::new(4, 64).unwrap();
        let (tx, rx) = unbounded();
        for i in 0..100u64 {
            let tx = tx.clone();
            pool.submit(move || tx.send(i * i).unwrap());
        }
        let mut total = 0;
        for _ in 0..100 {
            total += rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        assert_eq!(total, (0..100u64).map(|i| i * i).sum::<u64>());
    }

    #[test]
    fn test_full_queue_runs_inline() {
        let pool = ComputePool::new(1, 1).unwrap();
        let (started_tx, started_rx) = bounded(0);
        let (gate_tx, gate_rx) = bounded::<()>(0);

        // Occupy the only worker
        pool.submit(move || {
            started_tx.send(()).unwrap();
            gate_rx.recv().unwrap();
        });
        started_rx.recv().unwrap();

        // Fill the queue
        pool.submit(|| {});

        let (tx, rx) = unbounded();
        pool.submit(move || tx.send(std::thread::current().id()).unwrap());
        assert_eq!(rx.try_recv().unwrap(), std::thread::current().id());

        gate_tx.send(()).unwrap();
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let pool = ComputePool::new(1, 8).unwrap();
        pool.submit(|| panic!("boom"));
        let (tx, rx) = unbounded();
        pool.submit(move || tx.send(1).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
    }
}
