//! Broadcasting of job status changes.

pub mod status_events;

pub use status_events::{StatusBroadcaster, StatusEvent};
