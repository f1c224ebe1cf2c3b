//! Best-effort file logging under the tankwatch data directory.
//!
//! - [`events`]: plain-text operational log (`tankwatch.log`)
//! - [`polls`]: one JSON line per pipeline cycle (`poll-log.jsonl`)
//!
//! Logging never fails a command: write errors are swallowed.

pub mod events;
pub mod polls;

pub use events::log_event;
