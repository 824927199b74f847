//! Hand module for landmark input
//!
//! Reads per-frame landmark sets produced by the external hand detector
//! and exposes them as an explicit present/absent hand state.

mod landmarks;
mod reader;

pub use landmarks::{ids, Hand, HandState, LandmarkPoint, LANDMARK_COUNT};
pub use reader::{parse_frame, FrameError, FrameReader};
