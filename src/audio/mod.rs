//! Audio output for volume and mute commands

mod sink;

pub use sink::{AudioError, AudioSink, DryRunSink, OsascriptSink};
