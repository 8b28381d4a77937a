// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! FIFO of pending fetches shared by all scan workers.
//!
//! Workers may push new tasks while others are draining the queue, so an
//! empty queue alone does not mean the run is over. The frontier counts
//! tasks handed out but not yet finished; `next_task` only reports
//! exhaustion once the queue is empty *and* nothing is in flight.

use crate::models::crawler::Task;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

#[derive(Default)]
struct FrontierState {
    queue: VecDeque<Task>,
    in_flight: usize,
}

/// Thread-safe task queue with drain tracking
#[derive(Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    changed: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frontier pre-loaded with tasks
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let frontier = Self::new();
        frontier.state.lock().queue.extend(tasks);
        frontier
    }

    /// Append a task to the back of the queue
    pub fn push(&self, task: Task) {
        self.state.lock().queue.push_back(task);
        self.changed.notify_waiters();
    }

    /// Take the oldest task without waiting.
    /// The caller owns the task and must call [`Frontier::task_done`] afterwards.
    pub fn pop(&self) -> Option<Task> {
        let mut state = self.state.lock();
        let task = state.queue.pop_front()?;
        state.in_flight += 1;
        Some(task)
    }

    /// Take the next task, waiting while peers may still enqueue work.
    /// Returns `None` once the queue is empty and no task is in flight.
    pub async fn next_task(&self) -> Option<Task> {
        loop {
            // Registered before the check so a push or completion in between is not lost
            let changed = self.changed.notified();
            {
                let mut state = self.state.lock();
                if let Some(task) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(task);
                }
                if state.in_flight == 0 {
                    return None;
                }
            }
            changed.await;
        }
    }

    /// Mark a task taken with `pop`/`next_task` as finished
    pub fn task_done(&self) {
        {
            let mut state = self.state.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    /// Guard that calls [`Frontier::task_done`] when dropped, including on unwind
    pub fn in_flight_guard(&self) -> InFlightGuard<'_> {
        InFlightGuard { frontier: self }
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }
}

/// Marks one task finished when it goes out of scope
pub struct InFlightGuard<'a> {
    frontier: &'a Frontier,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.frontier.task_done();
    }
}
