//! Application services.

pub mod task_store;

pub use task_store::{FieldViolation, TaskStore, TaskStoreError};
