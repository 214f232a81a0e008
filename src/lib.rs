//! vtrim - cut the A-B range of a video with ffmpeg
//!
//! Builds a single ffmpeg invocation from the current playback state:
//! output naming, a resolution cap, track maps, subtitle handling
//! (passthrough, overlay or burn-in with recovered fonts) and an audio
//! layout fix for libopus, then runs it and any post-trim hooks.

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod hooks;
pub mod host;
pub mod media;
pub mod tracks;
pub mod workflow;
