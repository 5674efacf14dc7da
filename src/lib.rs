//! Evidence-driven adaptive sweep engine for contrast sensitivity measurement.
//!
//! The engine tracks, frame by frame, whether an observer is visually
//! following moving probe stimuli, accumulates that evidence per sweep and
//! per trial, and advances each sweep along a predefined path through
//! (spatial frequency x contrast) space. Rendering, audio, and gaze signal
//! acquisition live outside this crate; the engine consumes a [`gaze::GazeSource`]
//! and produces events on a [`trial::events::EventBus`].

pub mod config;
pub mod core;
pub mod gaze;
pub mod trial;
