//! Thread-safe invoke-later queue.
//!
//! Jobs may be queued from any thread through an [`InvokeLaterHandle`] and are run on the
//! GUI thread once per frame. Draining swaps two pre-allocated buffers under the lock, so
//! no allocation happens while the lock is held and jobs run without it.
//!
//! # Usage
//!
//! ```
//! use trellis_core::InvokeQueue;
//!
//! let queue = InvokeQueue::<Vec<u32>>::new();
//! let handle = queue.handle();
//! std::thread::spawn(move || {
//!     handle.invoke_later(|log: &mut Vec<u32>| log.push(1)).unwrap();
//! })
//! .join()
//! .unwrap();
//!
//! let mut log = Vec::new();
//! let mut batch = queue.take_batch();
//! for job in batch.drain(..) {
//!     job(&mut log);
//! }
//! queue.recycle(batch);
//! assert_eq!(log, vec![1]);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{CoreError, Result};
use crate::logging::targets;

/// Initial capacity of each queue buffer.
const INITIAL_CAPACITY: usize = 16;

/// A job queued for the GUI thread.
pub type Job<C> = Box<dyn FnOnce(&mut C) + Send>;

struct Buffers<C: ?Sized> {
    pending: Vec<Job<C>>,
    spare: Vec<Job<C>>,
    closed: bool,
}

/// The owning side of the queue. Dropping it closes every handle.
pub struct InvokeQueue<C: ?Sized> {
    shared: Arc<Mutex<Buffers<C>>>,
}

/// A cloneable, `Send` handle used to queue jobs from any thread.
pub struct InvokeLaterHandle<C: ?Sized> {
    shared: Arc<Mutex<Buffers<C>>>,
}

impl<C: ?Sized> Clone for InvokeLaterHandle<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: ?Sized + 'static> InvokeLaterHandle<C> {
    /// Queue `job` to run on the GUI thread during the next frame.
    ///
    /// Fails with [`CoreError::InvokeQueueClosed`] once the owning queue was dropped.
    pub fn invoke_later<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        let mut buffers = self.shared.lock();
        if buffers.closed {
            return Err(CoreError::InvokeQueueClosed);
        }
        buffers.pending.push(Box::new(job));
        Ok(())
    }
}

impl<C: ?Sized + 'static> InvokeQueue<C> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Buffers {
                pending: Vec::with_capacity(INITIAL_CAPACITY),
                spare: Vec::with_capacity(INITIAL_CAPACITY),
                closed: false,
            })),
        }
    }

    /// Create a handle for queuing jobs.
    pub fn handle(&self) -> InvokeLaterHandle<C> {
        InvokeLaterHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Queue a job from the owning thread.
    pub fn push<F>(&self, job: F)
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.shared.lock().pending.push(Box::new(job));
    }

    /// Number of queued jobs.
    pub fn len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Whether no job is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swap out the pending jobs. The returned buffer must be given back with
    /// [`recycle`](Self::recycle) once drained.
    pub fn take_batch(&self) -> Vec<Job<C>> {
        let mut buffers = self.shared.lock();
        let spare = std::mem::take(&mut buffers.spare);
        let batch = std::mem::replace(&mut buffers.pending, spare);
        if !batch.is_empty() {
            tracing::trace!(target: targets::INVOKE, count = batch.len(), "draining invoke-later queue");
        }
        batch
    }

    /// Return a drained buffer so its allocation is reused.
    pub fn recycle(&self, mut batch: Vec<Job<C>>) {
        batch.clear();
        let mut buffers = self.shared.lock();
        if buffers.spare.capacity() < batch.capacity() {
            buffers.spare = batch;
        }
    }
}

impl<C: ?Sized + 'static> Default for InvokeQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> Drop for InvokeQueue<C> {
    fn drop(&mut self) {
        let mut buffers = self.shared.lock();
        buffers.closed = true;
        buffers.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(InvokeLaterHandle<Vec<u8>>: Send, Sync, Clone);

    #[test]
    fn test_jobs_run_in_order() {
        let queue = InvokeQueue::<Vec<u32>>::new();
        queue.push(|v: &mut Vec<u32>| v.push(1));
        queue.handle().invoke_later(|v: &mut Vec<u32>| v.push(2)).unwrap();
        assert_eq!(queue.len(), 2);

        let mut out = Vec::new();
        let mut batch = queue.take_batch();
        for job in batch.drain(..) {
            job(&mut out);
        }
        queue.recycle(batch);
        assert_eq!(out, vec![1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_jobs_queued_while_draining_wait_for_next_batch() {
        let queue = InvokeQueue::<Vec<u32>>::new();
        let handle = queue.handle();
        queue.push(move |v: &mut Vec<u32>| {
            v.push(1);
            handle.invoke_later(|v: &mut Vec<u32>| v.push(2)).unwrap();
        });
        let mut out = Vec::new();
        let mut batch = queue.take_batch();
        for job in batch.drain(..) {
            job(&mut out);
        }
        queue.recycle(batch);
        assert_eq!(out, vec![1]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_handle_fails_after_queue_dropped() {
        let queue = InvokeQueue::<u32>::new();
        let handle = queue.handle();
        drop(queue);
        assert!(matches!(
            handle.invoke_later(|_: &mut u32| {}),
            Err(CoreError::InvokeQueueClosed)
        ));
    }
}
