//! Pluggable thread-pool abstraction that reaction bodies are handed to.
//!
//! The runtime only requires [`Executor`]; [`FixedThreadPool`] is the bundled
//! implementation. A reaction body that performs a blocking emission occupies
//! its worker until the reply arrives, so pools must be sized beyond the
//! maximum blocking-emit depth — or a second pool supplied for reactions with
//! blocking inputs (see
//! [`JoinDefinition::activate_with_reply_pool`](crate::JoinDefinition::activate_with_reply_pool)).

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::ExecutorError;

/// Unit of work submitted by a join definition: one reaction firing.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Hand-off point between the decision cycle and the threads that run
/// reaction bodies.
pub trait Executor: Send + Sync {
    /// Enqueue a task. Must not block the submitter beyond enqueueing.
    fn submit(&self, task: Task) -> Result<(), ExecutorError>;

    /// Stop accepting tasks; already queued tasks still run. Blocks until
    /// the workers have drained and exited.
    fn shutdown(&self);

    /// Stop accepting tasks and drop the queued ones; tasks already running
    /// finish. Blocks until the workers have exited.
    fn shutdown_now(&self);
}

/// Fixed-size worker pool draining an unbounded task queue.
pub struct FixedThreadPool {
    sender: Mutex<Option<Sender<Task>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    cancel: Arc<AtomicBool>,
}

impl FixedThreadPool {
    /// Spawn a pool with the given number of worker threads.
    pub fn new(threads: usize) -> io::Result<FixedThreadPool> {
        assert_ne!(threads, 0, "threads must be at least 1");

        let (sender, receiver) = unbounded::<Task>();
        let cancel = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let receiver = receiver.clone();
            let cancel = cancel.clone();
            let handle = thread::Builder::new()
                .name(format!("soup-worker-{i}"))
                .spawn(move || worker_loop(receiver, cancel))?;
            handles.push(handle);
        }

        Ok(FixedThreadPool {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
            cancel,
        })
    }

    fn join_workers(&self) {
        for handle in self.handles.lock().unwrap().drain(..) {
            if handle.join().is_err() {
                log::error!("pool worker exited with a panic");
            }
        }
    }
}

fn worker_loop(receiver: Receiver<Task>, cancel: Arc<AtomicBool>) {
    for task in receiver {
        if cancel.load(Ordering::Relaxed) {
            // Drain without running once shutdown_now was requested.
            continue;
        }
        // Reaction firings guard their bodies themselves; this keeps an
        // ad-hoc panicking task from taking the worker down with it.
        if catch_unwind(AssertUnwindSafe(task)).is_err() {
            log::error!("pool task panicked");
        }
    }
}

impl Executor for FixedThreadPool {
    fn submit(&self, task: Task) -> Result<(), ExecutorError> {
        match self.sender.lock().unwrap().as_ref() {
            Some(sender) => sender.send(task).map_err(|_| ExecutorError::Rejected),
            None => Err(ExecutorError::Rejected),
        }
    }

    fn shutdown(&self) {
        // Closing the channel signals the workers to exit once drained.
        let sender = self.sender.lock().unwrap().take();
        drop(sender);
        self.join_workers();
    }

    fn shutdown_now(&self) {
        self.cancel.store(true, Ordering::Relaxed);
        let sender = self.sender.lock().unwrap().take();
        drop(sender);
        self.join_workers();
    }
}

impl Drop for FixedThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
