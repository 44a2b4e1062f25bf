//! Deterministic virtual-time scheduling.
//!
//! The simulated platform's event loops are replaced by [`Scheduler`] queues whose clocks only
//! move when a test advances them. Nothing here is preemptive and nothing blocks: "waiting"
//! is an explicit [`Scheduler::advance_by`] call that runs every task the advanced window
//! covers, synchronously, on the calling thread.
//!
//! Two named queues exist, grouped in a [`SchedulerSet`]:
//!
//! | Queue | Driven by |
//! |-------|-----------|
//! | [`QueueName::Foreground`] | the test, and the environment's idle hook |
//! | [`QueueName::Background`] | the test only, unless global mode merges it into foreground |
//!
//! # State Machine
//!
//! ```text
//!        advance_by / advance_to / run_one_task
//!   ┌──────┐ ─────────────────────────────► ┌──────────┐
//!   │ Idle │                                │ Draining │ ──┐ task posts more work:
//!   └──────┘ ◄───────────────────────────── └──────────┘ ◄─┘ appended, may run now
//!                  no more due tasks
//! ```

pub mod queue;
pub mod set;

pub use queue::{Scheduler, SchedulerPhase, Task, TaskId};
pub use set::{QueueName, SchedulerSet};
