//! CLI command implementations.

pub mod enqueue;
pub mod list;
pub mod queue;
pub mod status;
pub mod sync;
