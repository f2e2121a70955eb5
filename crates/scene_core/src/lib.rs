//! Core types shared across the orbital visual client.
//!
//! This crate provides the foundation the scene subsystem is built on:
//! - Object handles and type tags
//! - The read-only host-simulation interface
//! - Client configuration and mode bitflags

pub mod config;
pub mod handle;
pub mod host;

pub use config::*;
pub use handle::*;
pub use host::*;

// Re-export commonly used math types
pub use glam::{DMat3, DVec3, Mat3, Mat4, Vec3, Vec4};
