//! Render scheduler: the explicit task queue standing in for the host's commit cycle.
//!
//! Mutations enqueue work; [`crate::provider::Provider::flush`] drains it in
//! FIFO order. Phase-2 eviction is queued behind the render that committed the
//! new entry, so it can never run before or alongside that commit.

use std::collections::VecDeque;

use tracing::trace;

/// A unit of deferred provider work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Run one render pass and commit it to the off-screen surface.
    Render,
    /// Apply the capacity bound; schedules a render if anything was evicted.
    EvictOverflow,
}

/// FIFO queue of pending tasks.
#[derive(Debug, Default)]
pub struct RenderQueue {
    queue: VecDeque<Task>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task.
    ///
    /// A render requested while another render is already the last queued task
    /// is folded into it, the same way a host batches pending updates.
    pub fn schedule(&mut self, task: Task) {
        if task == Task::Render && self.queue.back() == Some(&Task::Render) {
            trace!("Coalesced render into pending pass");
            return;
        }

        trace!(?task, pending = self.queue.len() + 1, "Scheduled task");
        self.queue.push_back(task);
    }

    /// Dequeue the next task.
    pub fn next(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Drop all pending work.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
