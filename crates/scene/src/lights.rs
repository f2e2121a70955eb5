//! Per-frame selection of the strongest local light sources.
//!
//! The backend supports a fixed number of simultaneous lights; each frame the
//! selector keeps the nearest emitters and evicts the farthest member when a
//! closer candidate arrives.

use gfx::RenderLight;
use glam::DVec3;
use scene_core::LightEmitter;

/// Hard cap on the light set, independent of what the backend reports.
pub const MAX_SCENE_LIGHTS: usize = 8;

/// An emitter admitted to the frame's light set. Position and direction have
/// been transformed to the global frame, camera-relative.
#[derive(Debug, Clone)]
pub struct SceneLight {
    pub emitter: LightEmitter,
    pub position: DVec3,
    pub direction: DVec3,
    /// Squared camera distance, the eviction key.
    pub dist2: f64,
}

pub struct LightSelector {
    capacity: usize,
    lights: Vec<SceneLight>,
    farthest: usize,
    farthest_d2: f64,
}

impl LightSelector {
    /// `device_max` is the backend's simultaneous-light limit.
    pub fn new(device_max: usize) -> Self {
        let capacity = device_max.min(MAX_SCENE_LIGHTS);
        Self { capacity, lights: Vec::with_capacity(capacity), farthest: 0, farthest_d2: 0.0 }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.lights.clear();
        self.farthest = 0;
        self.farthest_d2 = 0.0;
    }

    /// Offer one emitter for this frame's set. Inactive and zero-intensity
    /// emitters are rejected outright; otherwise the nearest `capacity`
    /// offers win.
    pub fn offer(&mut self, emitter: &LightEmitter, position: DVec3, direction: DVec3) {
        if !emitter.active || emitter.intensity <= 0.0 || self.capacity == 0 {
            return;
        }
        let dist2 = position.length_squared();
        if self.lights.len() < self.capacity {
            if dist2 > self.farthest_d2 || self.lights.is_empty() {
                self.farthest = self.lights.len();
                self.farthest_d2 = dist2;
            }
            self.lights.push(SceneLight { emitter: emitter.clone(), position, direction, dist2 });
        } else if dist2 < self.farthest_d2 {
            self.lights[self.farthest] =
                SceneLight { emitter: emitter.clone(), position, direction, dist2 };
            self.rescan_farthest();
        }
    }

    fn rescan_farthest(&mut self) {
        self.farthest = 0;
        self.farthest_d2 = 0.0;
        for (i, l) in self.lights.iter().enumerate() {
            if l.dist2 > self.farthest_d2 {
                self.farthest = i;
                self.farthest_d2 = l.dist2;
            }
        }
    }

    pub fn lights(&self) -> &[SceneLight] {
        &self.lights
    }

    /// Member of the current set by index.
    pub fn get(&self, index: usize) -> Option<&SceneLight> {
        self.lights.get(index)
    }

    /// The selected set in the backend's submission format.
    pub fn render_lights(&self) -> Vec<RenderLight> {
        self.lights
            .iter()
            .map(|l| RenderLight {
                kind: l.emitter.kind,
                position: l.position.as_vec3(),
                direction: l.direction.as_vec3(),
                color: l.emitter.color.as_vec3(),
                attenuation: l.emitter.attenuation.map(|a| a as f32),
                range: l.emitter.range as f32,
                cone: (l.emitter.cone.0 as f32, l.emitter.cone.1 as f32),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}
