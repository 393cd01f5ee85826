//! Use Cases
//!
//! Application-specific business rules and orchestration.

pub mod process_frame;

pub use process_frame::*;
