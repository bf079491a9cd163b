//! Domain module for task management.
//!
//! Plain data types and the clock abstraction. Nothing in here performs I/O.

pub mod clock;
pub mod task;

pub use clock::{Clock, FixedClock, SystemClock};
pub use task::{
    DEFAULT_CATEGORY, InvalidPriority, NewTask, OwnerId, Priority, Task, TaskChanges, TaskId,
    TaskPatch, Timestamp,
};
