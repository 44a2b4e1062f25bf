//! A single virtual-time task queue.
//!
//! [`Scheduler`] holds tasks ordered by due time and post order, and a virtual clock that
//! only moves when the queue is advanced. Running a task never holds the queue's lock, so a
//! task may post further tasks; those become eligible within the same advance if their due
//! time falls inside the advanced window.

use std::{
    collections::BTreeMap,
    fmt,
    sync::Mutex,
};

use strum::{Display, EnumIter};

/// A unit of work queued on a [`Scheduler`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle identifying a posted task, used with [`Scheduler::remove`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Raw sequence number of the task.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Whether a queue is currently running tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SchedulerPhase {
    /// No advance is in progress.
    Idle,
    /// An advance is running due tasks.
    Draining,
}

struct PendingTask {
    id: TaskId,
    task: Task,
}

/// Queue key: due time first, then post order. Front-of-queue posts use negative sequence
/// numbers so they sort before everything due at the same time.
type QueueKey = (u64, i64);

#[derive(Default)]
struct SchedulerState {
    current_time: u64,
    queue: BTreeMap<QueueKey, PendingTask>,
    next_id: u64,
    next_seq: i64,
    next_front_seq: i64,
    drain_depth: usize,
}

impl SchedulerState {
    fn enqueue(&mut self, due: u64, seq: i64, task: Task) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.queue.insert((due, seq), PendingTask { id, task });
        id
    }

    fn pop_due(&mut self, end: u64) -> Option<Task> {
        let entry = self.queue.first_entry()?;
        let (due, _) = *entry.key();
        if due > end {
            return None;
        }
        let pending = entry.remove();
        self.current_time = self.current_time.max(due);
        Some(pending.task)
    }
}

/// Deterministic virtual-time task queue.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
/// use shadowhost::scheduler::Scheduler;
///
/// let scheduler = Scheduler::new();
/// let ran = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&ran);
/// scheduler.post_delayed(100, move || { counter.fetch_add(1, Ordering::SeqCst); });
///
/// assert_eq!(scheduler.advance_by(99), 0);
/// assert_eq!(scheduler.advance_by(1), 1);
/// assert_eq!(ran.load(Ordering::SeqCst), 1);
/// assert_eq!(scheduler.current_time(), 100);
/// ```
#[derive(Default)]
pub struct Scheduler {
    state: Mutex<SchedulerState>,
}

/// Leaves the draining phase when dropped, including on unwind out of a task.
struct DrainGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.scheduler.state.lock() {
            state.drain_depth = state.drain_depth.saturating_sub(1);
        }
    }
}

impl Scheduler {
    /// Creates an empty queue at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts `task` to run once the queue reaches the current time.
    pub fn post<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_delayed(0, task)
    }

    /// Posts `task` to run `delay_millis` after the current virtual time.
    ///
    /// Tasks due at the same time run in the order they were posted.
    pub fn post_delayed<F>(&self, delay_millis: u64, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = lock!(self.state);
        let due = state.current_time.saturating_add(delay_millis);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.enqueue(due, seq, Box::new(task))
    }

    /// Posts `task` ahead of every task due at the current time.
    pub fn post_at_front_of_queue<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = lock!(self.state);
        let due = state.current_time;
        state.next_front_seq -= 1;
        let seq = state.next_front_seq;
        state.enqueue(due, seq, Box::new(task))
    }

    /// Removes a pending task before it runs.
    ///
    /// # Returns
    ///
    /// `true` if the task was still queued.
    pub fn remove(&self, id: TaskId) -> bool {
        let mut state = lock!(self.state);
        let key = state
            .queue
            .iter()
            .find_map(|(key, pending)| (pending.id == id).then_some(*key));
        key.and_then(|key| state.queue.remove(&key)).is_some()
    }

    /// Advances virtual time by `millis`, running every task that becomes due.
    ///
    /// # Returns
    ///
    /// The number of tasks run.
    pub fn advance_by(&self, millis: u64) -> usize {
        let end = self.current_time().saturating_add(millis);
        self.advance_to(end)
    }

    /// Advances virtual time to `end`, running every task due at or before it.
    ///
    /// Tasks run in due-time order, ties in post order. Tasks posted by a running task are
    /// picked up in the same call when due by `end`. Time never moves backwards.
    pub fn advance_to(&self, end: u64) -> usize {
        let _guard = self.enter_drain();
        let mut ran = 0usize;

        loop {
            let next = lock!(self.state).pop_due(end);
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }

        let mut state = lock!(self.state);
        state.current_time = state.current_time.max(end);
        if ran > 0 {
            log::debug!("ran {ran} tasks, virtual time now {}", state.current_time);
        }
        ran
    }

    /// Runs every task due at the current time without moving the clock.
    pub fn idle(&self) -> usize {
        self.advance_by(0)
    }

    /// Advances to the due time of the last task currently queued.
    ///
    /// # Returns
    ///
    /// The number of tasks run; zero if the queue was empty.
    pub fn advance_to_last_posted_task(&self) -> usize {
        let last = lock!(self.state)
            .queue
            .last_key_value()
            .map(|((due, _), _)| *due);
        last.map_or(0, |due| self.advance_to(due))
    }

    /// Advances to the due time of the next queued task, running all tasks due then.
    ///
    /// # Returns
    ///
    /// `false` if the queue was empty.
    pub fn advance_to_next_posted_task(&self) -> bool {
        match self.next_task_due() {
            Some(due) => {
                self.advance_to(due);
                true
            }
            None => false,
        }
    }

    /// Runs only the next queued task, moving the clock to its due time if later.
    ///
    /// # Returns
    ///
    /// `false` if the queue was empty.
    pub fn run_one_task(&self) -> bool {
        let _guard = self.enter_drain();
        let next = lock!(self.state).pop_due(u64::MAX);
        match next {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Drops every queued task and rewinds the clock to zero.
    pub fn reset(&self) {
        let mut state = lock!(self.state);
        let dropped = state.queue.len();
        state.queue.clear();
        state.current_time = 0;
        if dropped > 0 {
            log::debug!("reset dropped {dropped} queued tasks");
        }
    }

    /// Removes every queued task, returned with its due time in run order.
    pub(crate) fn take_pending(&self) -> Vec<(u64, Task)> {
        let mut state = lock!(self.state);
        std::mem::take(&mut state.queue)
            .into_iter()
            .map(|((due, _), pending)| (due, pending.task))
            .collect()
    }

    /// Queues `tasks` at their absolute due times, behind everything already due at the same
    /// time and in the order given. Tasks due in the past run on the next advance.
    ///
    /// # Returns
    ///
    /// The number of tasks queued.
    pub(crate) fn adopt(&self, tasks: Vec<(u64, Task)>) -> usize {
        let mut state = lock!(self.state);
        let count = tasks.len();
        for (due, task) in tasks {
            let seq = state.next_seq;
            state.next_seq += 1;
            state.enqueue(due, seq, task);
        }
        count
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn size(&self) -> usize {
        lock!(self.state).queue.len()
    }

    /// Current virtual time in milliseconds.
    #[must_use]
    pub fn current_time(&self) -> u64 {
        lock!(self.state).current_time
    }

    /// Due time of the next queued task.
    #[must_use]
    pub fn next_task_due(&self) -> Option<u64> {
        lock!(self.state).queue.first_key_value().map(|((due, _), _)| *due)
    }

    /// Returns `true` if a queued task is due at the current time.
    #[must_use]
    pub fn are_any_runnable(&self) -> bool {
        let state = lock!(self.state);
        state
            .queue
            .first_key_value()
            .is_some_and(|((due, _), _)| *due <= state.current_time)
    }

    /// Current phase of the queue.
    #[must_use]
    pub fn phase(&self) -> SchedulerPhase {
        if lock!(self.state).drain_depth > 0 {
            SchedulerPhase::Draining
        } else {
            SchedulerPhase::Idle
        }
    }

    fn enter_drain(&self) -> DrainGuard<'_> {
        lock!(self.state).drain_depth += 1;
        DrainGuard { scheduler: self }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock!(self.state);
        f.debug_struct("Scheduler")
            .field("current_time", &state.current_time)
            .field("queued", &state.queue.len())
            .field("draining", &(state.drain_depth > 0))
            .finish()
    }
}
