//! # Infrastructure Adapters
//!
//! Event log implementations selected by the configured connection URI.

pub mod filesystem_event_log;
pub mod memory_event_log;

pub use filesystem_event_log::FilesystemEventLog;
pub use memory_event_log::InMemoryEventLog;
