//! Domain Entities
//!
//! Core business objects with identity and lifecycle.

mod camera;
mod detection;
mod face;

pub use camera::*;
pub use detection::*;
pub use face::*;
