//! The visual registry: stable-handle storage for per-object visuals with
//! round-robin activation checks.
//!
//! Records live in an arena keyed by generational indices; a parallel
//! insertion-order list drives deterministic iteration and an id map gives
//! O(1) host-handle lookup.

use std::collections::HashMap;

use glam::Vec3;
use gfx::Device;
use scene_core::{ObjectId, SimHost};
use slotmap::{new_key_type, SlotMap};

use crate::camera::Camera;
use crate::error::SceneError;
use crate::visual::{Visual, VisualBody};

new_key_type! {
    pub struct VisKey;
}

/// Apparent radius above which an inactive visual activates [px].
const ACTIVATE_APPRAD: f64 = 2.0;
/// Apparent radius below which an active visual deactivates [px].
const DEACTIVATE_APPRAD: f64 = 1.0;

#[derive(Default)]
pub struct VisualRegistry {
    arena: SlotMap<VisKey, Visual>,
    order: Vec<VisKey>,
    by_id: HashMap<ObjectId, VisKey>,
    /// Round-robin cursor over host object indices.
    cursor: usize,
    first_sweep_done: bool,
}

impl VisualRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Visual> {
        self.by_id.get(&id).and_then(|&k| self.arena.get(k))
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Visual> {
        self.by_id.get(&id).and_then(|&k| self.arena.get_mut(k))
    }

    /// Visuals in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Visual> {
        self.order.iter().filter_map(|&k| self.arena.get(k))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Visual> {
        // order and arena are kept consistent; every ordered key resolves
        self.arena.values_mut()
    }

    /// Look up a visual, creating and backend-registering it on first sight.
    pub fn find_or_create(
        &mut self,
        device: &mut dyn Device,
        host: &dyn SimHost,
        id: ObjectId,
    ) -> Result<&mut Visual, SceneError> {
        if let Some(&k) = self.by_id.get(&id) {
            // get_mut above would borrow-conflict with the insert path
            return Ok(&mut self.arena[k]);
        }
        let Some(kind) = host.object_kind(id) else {
            return Err(SceneError::BackendDesync {
                id,
                source: gfx::GfxError::RegisterVisual(id),
            });
        };
        device
            .register_visual(id)
            .map_err(|source| SceneError::BackendDesync { id, source })?;
        let mut vis = Visual::new(id, kind);
        vis.size = host.size(id);
        let k = self.arena.insert(vis);
        self.order.push(k);
        self.by_id.insert(id, k);
        log::debug!("visual created for {}", host.object_name(id));
        Ok(&mut self.arena[k])
    }

    /// Drop a visual and release its backend binding.
    pub fn remove(&mut self, device: &mut dyn Device, id: ObjectId) -> Result<(), SceneError> {
        let Some(k) = self.by_id.remove(&id) else {
            return Ok(());
        };
        self.arena.remove(k);
        self.order.retain(|&o| o != k);
        device
            .unregister_visual(id)
            .map_err(|source| SceneError::BackendDesync { id, source })
    }

    /// Drop visuals whose host object no longer exists.
    pub fn sweep_removed(
        &mut self,
        device: &mut dyn Device,
        host: &dyn SimHost,
    ) -> Result<(), SceneError> {
        let stale: Vec<ObjectId> = self
            .iter()
            .map(|v| v.id)
            .filter(|&id| host.object_kind(id).is_none())
            .collect();
        for id in stale {
            log::debug!("visual dropped for vanished object {:?}", id);
            self.remove(device, id)?;
        }
        Ok(())
    }

    /// Refresh camera-relative state of every visual. Cheap; runs each frame
    /// for all records.
    pub fn refresh(&mut self, host: &dyn SimHost, camera: &Camera) {
        for vis in self.arena.values_mut() {
            vis.cpos = host.global_pos(vis.id) - camera.gpos();
            vis.cdist = vis.cpos.length();
            vis.size = host.size(vis.id);
            vis.apprad = camera.apparent_radius(vis.size, vis.cdist);
            let rad = vis.size.max(1.0) as f32;
            vis.in_view = camera.is_visible(vis.cpos.as_vec3(), rad);
        }
    }

    /// Run activation checks: the first sweep covers every host object, later
    /// frames advance a round-robin cursor by `checks_per_frame` objects.
    pub fn check_visibility(
        &mut self,
        device: &mut dyn Device,
        host: &dyn SimHost,
        camera: &Camera,
        checks_per_frame: usize,
    ) -> Result<(), SceneError> {
        let n = host.object_count();
        if n == 0 {
            return Ok(());
        }
        let checks = if self.first_sweep_done { checks_per_frame.clamp(1, n) } else { n };
        for _ in 0..checks {
            let idx = self.cursor % n;
            self.cursor = (self.cursor + 1) % n;
            if let Some(id) = host.object_by_index(idx) {
                self.check_one(device, host, camera, id)?;
            }
        }
        self.first_sweep_done = true;
        Ok(())
    }

    fn check_one(
        &mut self,
        device: &mut dyn Device,
        host: &dyn SimHost,
        camera: &Camera,
        id: ObjectId,
    ) -> Result<(), SceneError> {
        let gpos = host.global_pos(id);
        let size = host.size(id);
        let cdist = (gpos - camera.gpos()).length();
        let apprad = camera.apparent_radius(size, cdist);
        let vis = self.find_or_create(device, host, id)?;
        if vis.body == VisualBody::Star {
            vis.active = true; // the light source must always render
        } else if vis.active {
            if apprad < DEACTIVATE_APPRAD {
                vis.active = false;
            }
        } else if apprad > ACTIVATE_APPRAD {
            vis.active = true;
        }
        Ok(())
    }

    /// Visuals currently inside the camera frustum, insertion order.
    pub fn in_view(&self) -> impl Iterator<Item = &Visual> {
        self.iter().filter(|v| v.in_view)
    }

    /// Frustum-test helper for a visual against a camera other than the one
    /// it was refreshed with.
    pub fn visible_with(vis: &Visual, camera: &Camera, cam_gpos_delta: Vec3) -> bool {
        camera.is_visible(vis.cpos.as_vec3() - cam_gpos_delta, vis.size.max(1.0) as f32)
    }
}
