//! Near clip plane solver.
//!
//! The near plane is pushed as far out as the nearest visible geometry
//! allows, limited from above by the terrain directly below the camera and
//! from below by an altitude-dependent floor.

use glam::DVec3;
use scene_core::NearClipPolicy;

/// Far plane fallback when no visual contributes a far bound [m].
pub const DEFAULT_FARPOINT: f32 = 20e4;

/// Surface limit and far plane used when no constraint applies [m].
const ZSURF_MAX: f32 = 1000.0;

/// Merged distance bounds of the visible geometry.
#[derive(Debug, Clone, Copy)]
pub struct DepthBounds {
    /// Nearest bounding-sphere entry distance [m].
    pub nearpoint: f32,
    /// Farthest bounding-sphere exit distance [m].
    pub farpoint: f32,
    /// Nearest centre distance [m].
    pub neardist: f32,
}

impl Default for DepthBounds {
    fn default() -> Self {
        Self { nearpoint: 10e3, farpoint: 0.0, neardist: 10e3 }
    }
}

impl DepthBounds {
    pub fn merge(&mut self, near: f32, far: f32, dist: f32) {
        self.nearpoint = self.nearpoint.min(near);
        self.farpoint = self.farpoint.max(far);
        self.neardist = self.neardist.min(dist);
    }

    /// Far bound with the fallback applied.
    pub fn far(&self) -> f32 {
        if self.farpoint == 0.0 {
            DEFAULT_FARPOINT
        } else {
            self.farpoint
        }
    }
}

/// Near plane candidate from the merged geometry bounds. Active particle
/// effects pull it in to keep their soft edges from clipping.
pub fn depth_bound(bounds: &DepthBounds, particles_active: bool) -> f32 {
    let mut z = bounds.nearpoint.max(0.0) * 0.75;
    if particles_active {
        z = z.min(bounds.neardist.max(0.0) * 0.5);
    }
    z
}

/// Upper near-plane limit from the terrain below the camera.
///
/// Only binds below 10 km of surface altitude; the limit is the slant
/// distance to the surface at the frustum's diagonal edge, capped at 1 km.
pub fn surface_near_limit(
    cam_pos: DVec3,
    cam_dir: DVec3,
    proxy_pos: DVec3,
    proxy_size: f64,
    target_elevation: f64,
    apsq: f64,
) -> f32 {
    let g = apsq.atan();
    let rel = cam_pos - proxy_pos;
    let r = rel.length();
    if r == 0.0 {
        return ZSURF_MAX;
    }
    let t = (rel / r).dot(cam_dir).clamp(-1.0, 1.0);
    let a = std::f64::consts::PI - t.acos();
    let h = r - (proxy_size + target_elevation);
    if h >= 10e3 {
        return ZSURF_MAX;
    }
    let d = (a - g).max(0.0);
    let zsurf = (h * g.cos() / d.cos()) as f32;
    if zsurf > ZSURF_MAX || zsurf < 0.0 {
        ZSURF_MAX
    } else {
        zsurf
    }
}

/// Final near plane: geometry bound, capped by the surface limit, floored by
/// the altitude- and view-mode-dependent minimum.
pub fn compute_near_clip(
    zsurf: f32,
    bounds: &DepthBounds,
    particles_active: bool,
    camera_altitude: f64,
    internal: bool,
    policy: NearClipPolicy,
) -> f32 {
    let zmin = if internal {
        policy.internal_floor()
    } else if camera_altitude > 10e3 {
        0.1
    } else {
        1.0
    };
    depth_bound(bounds, particles_active).min(zsurf).max(zmin)
}
