//! Cooperative Frame Clock
//!
//! The host's repeating-task scheduler. Every live task runs once per
//! [`FrameClock::advance`], on the calling thread, one after another; tasks
//! never run concurrently with each other.
//!
//! Tasks scheduled while a frame is running first run on the next frame.
//! A task stops by returning [`TaskStatus::Stop`] or through its
//! [`TaskHandle`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// What a task wants after a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Run again next frame
    Continue,
    /// Never run again
    Stop,
}

/// A repeating task.
pub type Task = Box<dyn FnMut() -> TaskStatus + Send>;

#[derive(Debug, Default)]
struct TaskFlags {
    cancelled: AtomicBool,
    done: AtomicBool,
}

/// Handle to a scheduled task.
#[derive(Clone)]
pub struct TaskHandle {
    id: u64,
    flags: Arc<TaskFlags>,
}

impl TaskHandle {
    /// Task id, unique per clock.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the task before its next run.
    pub fn cancel(&self) {
        self.flags.cancelled.store(true, Ordering::Release);
    }

    /// Whether the task may still run.
    pub fn is_running(&self) -> bool {
        !self.flags.cancelled.load(Ordering::Acquire) && !self.flags.done.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .finish()
    }
}

struct Entry {
    id: u64,
    flags: Arc<TaskFlags>,
    task: Task,
}

/// Single-threaded repeating-task registry.
#[derive(Default)]
pub struct FrameClock {
    next_id: AtomicU64,
    frame: AtomicU64,
    tasks: Mutex<Vec<Entry>>,
}

impl FrameClock {
    /// Empty clock at frame zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. It first runs on the next `advance`.
    pub fn schedule(&self, task: impl FnMut() -> TaskStatus + Send + 'static) -> TaskHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let flags = Arc::new(TaskFlags::default());
        self.tasks.lock().push(Entry {
            id,
            flags: flags.clone(),
            task: Box::new(task),
        });
        TaskHandle { id, flags }
    }

    /// Run every live task once. Returns how many ran.
    pub fn advance(&self) -> usize {
        let frame = self.frame.fetch_add(1, Ordering::AcqRel) + 1;
        // Run without the lock so tasks can schedule more tasks
        let mut batch = std::mem::take(&mut *self.tasks.lock());
        let mut ran = 0;

        batch.retain_mut(|entry| {
            if entry.flags.cancelled.load(Ordering::Acquire) {
                entry.flags.done.store(true, Ordering::Release);
                return false;
            }
            ran += 1;
            match (entry.task)() {
                TaskStatus::Continue => true,
                TaskStatus::Stop => {
                    trace!("Task {} stopped at frame {}", entry.id, frame);
                    entry.flags.done.store(true, Ordering::Release);
                    false
                }
            }
        });

        let mut tasks = self.tasks.lock();
        let scheduled_meanwhile = std::mem::take(&mut *tasks);
        *tasks = batch;
        tasks.extend(scheduled_meanwhile);
        ran
    }

    /// Frames advanced so far.
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }

    /// Registered tasks that have not stopped or been swept after a cancel.
    pub fn active_tasks(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|e| !e.flags.cancelled.load(Ordering::Acquire))
            .count()
    }

    /// Cancel every task.
    pub fn cancel_all(&self) {
        for entry in self.tasks.lock().drain(..) {
            entry.flags.cancelled.store(true, Ordering::Release);
            entry.flags.done.store(true, Ordering::Release);
        }
    }
}

impl fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameClock")
            .field("frame", &self.frame())
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}
