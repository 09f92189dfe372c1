//! Cancellation: the stop surface and the checkpoints that observe it.

pub mod checkpoint;
pub mod surface;

pub use checkpoint::{CancellationCheck, Checkpoint, HaltReason, StatusCheckpoint};
pub use surface::{CancellationSurface, StopOutcome};
