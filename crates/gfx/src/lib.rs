//! Rendering-backend abstraction for the orbital visual client.
//!
//! The scene subsystem drives an opaque device through these traits: render
//! targets, scene begin/end, draw-item submission and 2D sketchpads. Backends
//! implement them over a real graphics API; tests implement them over a
//! recording mock.

pub mod device;
pub mod error;
pub mod sketchpad;
pub mod target;

pub use device::*;
pub use error::*;
pub use sketchpad::*;
pub use target::*;
