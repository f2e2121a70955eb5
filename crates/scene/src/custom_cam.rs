//! Vessel-mounted custom cameras.
//!
//! Each camera renders the external scene from a point fixed in a vessel's
//! frame into a caller-supplied render target. At most one camera view is
//! regenerated per frame, round-robin over the registration order.

use gfx::{Device, GfxError, TargetId};
use glam::{DMat3, DVec3};
use scene_core::ObjectId;
use slotmap::{new_key_type, SlotMap};

use crate::compositor::SecondaryPass;

new_key_type! {
    pub struct CustomCameraId;
}

#[derive(Debug, Clone)]
pub struct CustomCamera {
    pub vessel: ObjectId,
    /// Camera position in the vessel frame [m].
    pub position: DVec3,
    /// Camera orientation in the vessel frame.
    pub rotation: DMat3,
    /// Half vertical field of view [rad].
    pub aperture: f64,
    pub target: TargetId,
    /// Pass groups rendered into this camera's view.
    pub pass_flags: SecondaryPass,
    pub active: bool,
    /// Sticky error code; a non-zero camera is skipped until reconfigured.
    pub error: i32,
}

#[derive(Default)]
pub struct CustomCameraPool {
    cams: SlotMap<CustomCameraId, CustomCamera>,
    order: Vec<CustomCameraId>,
    cursor: usize,
}

impl CustomCameraPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: CustomCameraId) -> Option<&CustomCamera> {
        self.cams.get(id)
    }

    /// Register a camera, or reconfigure `existing` in place. The target
    /// surface must be renderable and carry a depth buffer.
    pub fn setup(
        &mut self,
        device: &dyn Device,
        existing: Option<CustomCameraId>,
        cam: CustomCamera,
    ) -> Result<CustomCameraId, GfxError> {
        if !device.is_render_target(cam.target) {
            return Err(GfxError::TargetCreation(
                "custom camera surface is not a render target".into(),
            ));
        }
        if device.depth_stencil_of(cam.target).is_none() {
            return Err(GfxError::TargetCreation(
                "custom camera surface has no depth buffer".into(),
            ));
        }
        if let Some(id) = existing {
            if let Some(slot) = self.cams.get_mut(id) {
                *slot = cam;
                return Ok(id);
            }
        }
        let id = self.cams.insert(cam);
        self.order.push(id);
        Ok(id)
    }

    pub fn set_active(&mut self, id: CustomCameraId, active: bool) {
        if let Some(c) = self.cams.get_mut(id) {
            c.active = active;
        }
    }

    /// Remove a camera; returns its sticky error code (zero when the camera
    /// was healthy or unknown).
    pub fn delete(&mut self, id: CustomCameraId) -> i32 {
        let error = self.cams.remove(id).map(|c| c.error).unwrap_or(0);
        self.order.retain(|&o| o != id);
        error
    }

    /// Record a sticky error on a camera; cleared by reconfiguring it.
    pub fn set_error(&mut self, id: CustomCameraId, code: i32) {
        if let Some(c) = self.cams.get_mut(id) {
            c.error = code;
        }
    }

    pub fn delete_all(&mut self) {
        self.cams.clear();
        self.order.clear();
        self.cursor = 0;
    }

    /// Next active camera mounted on `vessel`, advancing the round-robin
    /// cursor. Returns `None` when the remainder of the cycle has no match;
    /// the next call restarts from the top.
    pub fn next_for_vessel(&mut self, vessel: ObjectId) -> Option<CustomCameraId> {
        if self.order.is_empty() {
            return None;
        }
        if self.cursor >= self.order.len() {
            self.cursor = 0;
        }
        while self.cursor < self.order.len() {
            let id = self.order[self.cursor];
            self.cursor += 1;
            if let Some(c) = self.cams.get(id) {
                if c.active && c.error == 0 && c.vessel == vessel {
                    return Some(id);
                }
            }
        }
        None
    }
}
