//! The named foreground and background queues.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use strum::{Display, EnumIter, EnumString};

use crate::scheduler::queue::{Scheduler, TaskId};

/// Name of one of the two simulated execution queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum QueueName {
    /// The simulated main thread's queue.
    Foreground,
    /// The queue standing in for background executors.
    Background,
}

struct SetState {
    foreground: Arc<Scheduler>,
    background: Arc<Scheduler>,
    global: bool,
}

/// Foreground and background schedulers, optionally merged into one timeline.
///
/// In global mode the background queue is the very same [`Scheduler`] as the foreground one,
/// so everything posted to either runs when the foreground queue is advanced. Otherwise the
/// two queues advance independently.
///
/// Cloning is cheap and clones are handles to the same set: a mode switch made through one
/// clone is seen by every other, and each operation resolves its queue when it is called.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
/// use shadowhost::scheduler::{QueueName, SchedulerSet};
///
/// let set = SchedulerSet::new(false);
/// let ran = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&ran);
/// set.post(QueueName::Background, 10, move || { counter.fetch_add(1, Ordering::SeqCst); });
///
/// set.advance_by(QueueName::Foreground, 10);
/// assert_eq!(ran.load(Ordering::SeqCst), 0);
///
/// // Pending background work follows the merge onto the foreground timeline.
/// set.set_global(true);
/// assert!(Arc::ptr_eq(&set.foreground(), &set.background()));
/// set.advance_by(QueueName::Foreground, 0);
/// assert_eq!(ran.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct SchedulerSet {
    state: Arc<RwLock<SetState>>,
}

impl SchedulerSet {
    /// Creates a fresh set. With `global`, background aliases foreground.
    #[must_use]
    pub fn new(global: bool) -> Self {
        Self::with_master(Arc::new(Scheduler::new()), global)
    }

    /// Creates a set whose foreground queue is `master`.
    #[must_use]
    pub fn with_master(master: Arc<Scheduler>, global: bool) -> Self {
        let background = if global {
            Arc::clone(&master)
        } else {
            Arc::new(Scheduler::new())
        };
        Self {
            state: Arc::new(RwLock::new(SetState {
                foreground: master,
                background,
                global,
            })),
        }
    }

    /// Switches between merged and independent timelines.
    ///
    /// Entering global mode moves every task still queued on the background scheduler onto
    /// the foreground one, keeping absolute due times and post order; tasks already overdue
    /// on the foreground clock run on its next advance. Leaving global mode gives the
    /// background queue a fresh, empty scheduler; tasks already posted to the merged queue
    /// stay on the foreground timeline.
    ///
    /// A [`Scheduler`] obtained earlier through [`SchedulerSet::background`] is not
    /// redirected; post through the set to follow mode switches.
    pub fn set_global(&self, global: bool) {
        let mut state = write_lock!(self.state);
        if global == state.global {
            return;
        }
        if global {
            let moved = state.foreground.adopt(state.background.take_pending());
            state.background = Arc::clone(&state.foreground);
            if moved > 0 {
                log::debug!("moved {moved} pending background tasks onto the foreground queue");
            }
        } else {
            state.background = Arc::new(Scheduler::new());
        }
        state.global = global;
        log::debug!("global scheduler {}", if global { "enabled" } else { "disabled" });
    }

    /// Returns `true` if background operations run on the foreground timeline.
    #[must_use]
    pub fn is_global(&self) -> bool {
        read_lock!(self.state).global
    }

    /// The foreground (main-thread) scheduler.
    #[must_use]
    pub fn foreground(&self) -> Arc<Scheduler> {
        Arc::clone(&read_lock!(self.state).foreground)
    }

    /// The current background scheduler; the foreground one in global mode.
    #[must_use]
    pub fn background(&self) -> Arc<Scheduler> {
        Arc::clone(&read_lock!(self.state).background)
    }

    /// Returns the scheduler currently behind `queue`.
    #[must_use]
    pub fn get(&self, queue: QueueName) -> Arc<Scheduler> {
        match queue {
            QueueName::Foreground => self.foreground(),
            QueueName::Background => self.background(),
        }
    }

    /// Posts `task` to `queue`, due `delay_millis` after that queue's current time.
    pub fn post<F>(&self, queue: QueueName, delay_millis: u64, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.get(queue).post_delayed(delay_millis, task)
    }

    /// Advances `queue` by `millis`. Returns the number of tasks run.
    pub fn advance_by(&self, queue: QueueName, millis: u64) -> usize {
        self.get(queue).advance_by(millis)
    }

    /// Advances `queue` to its last posted task. Returns the number of tasks run.
    pub fn advance_to_last_posted_task(&self, queue: QueueName) -> usize {
        self.get(queue).advance_to_last_posted_task()
    }

    /// Drops the tasks queued on `queue` and rewinds its clock.
    pub fn reset(&self, queue: QueueName) {
        self.get(queue).reset();
    }

    /// Resets both queues.
    pub fn reset_all(&self) {
        let state = read_lock!(self.state);
        state.foreground.reset();
        if !state.global {
            state.background.reset();
        }
    }
}

impl fmt::Debug for SchedulerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read_lock!(self.state);
        f.debug_struct("SchedulerSet")
            .field("foreground", &state.foreground)
            .field("background", &state.background)
            .field("global", &state.global)
            .finish()
    }
}
