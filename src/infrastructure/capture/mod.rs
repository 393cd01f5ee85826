//! Capture
//!
//! The decoder subprocess lifecycle (spec.md §4.2): spawning/terminating
//! the ffmpeg-equivalent command, copying its stdout into the Frame Store,
//! tracking the observed capture rate, and the watchdog that supervises
//! all of it.

pub mod decoder;
pub mod rate;
pub mod watchdog;
