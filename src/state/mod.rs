//! Control state module
//!
//! Holds the stateful parts of the pipeline:
//! - MuteDebouncer: Released/Holding fist state machine driving mute toggles
//! - Controller: per-frame orchestration owning all mutable state

mod controller;
mod debouncer;

pub use controller::{Controller, FrameReport, FrameSnapshot, OperatorCommand};
pub use debouncer::{AbsentHandPolicy, HoldState, MuteDebouncer};
