//! Per-frame scene management and render orchestration.
//!
//! The scene sits between a read-only simulation host and an abstract
//! rendering backend. Each frame it refreshes the camera, maintains the set
//! of renderable visuals, selects local light sources, solves the near clip
//! plane and composes the full frame pass sequence.

pub mod camera;
pub mod clip;
pub mod compositor;
pub mod custom_cam;
pub mod error;
pub mod lights;
pub mod markers;
pub mod particles;
pub mod registry;
pub mod visual;

#[cfg(test)]
pub(crate) mod testutil;

pub use camera::Camera;
pub use compositor::{Scene, SecondaryPass};
pub use custom_cam::{CustomCamera, CustomCameraId, CustomCameraPool};
pub use error::SceneError;
pub use lights::LightSelector;
pub use particles::{ParticleStream, ParticleStreamSet};
pub use registry::VisualRegistry;
pub use visual::{OmitFlags, Visual, VisualBody};
