//! Camera state: view/projection matrices, frustum tests, picking and
//! screen-space projection, plus a save/restore stack for nested render
//! passes.

use glam::{DMat3, DVec3, Mat4, Vec3, Vec4};
use scene_core::{ObjectId, SimHost};

/// Everything that defines the camera for one pass. Saved wholesale on the
/// camera stack so a pop restores the exact pre-push state.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    /// Global camera position [m].
    pub gpos: DVec3,
    /// Global view direction (unit).
    pub gdir: DVec3,
    /// Rotation global -> view.
    pub grot: DMat3,
    /// Half vertical field of view [rad].
    pub aperture: f64,
    /// Viewport aspect, height / width.
    pub aspect: f64,
    pub width: u32,
    pub height: u32,
    pub view: Mat4,
    pub proj: Mat4,
    pub nearplane: f32,
    pub farplane: f32,
    /// Frustum extent factors at unit depth (vertical/horizontal) and the
    /// matching sphere-radius scale factors.
    pub vh: f32,
    pub vw: f32,
    pub vhf: f32,
    pub vwf: f32,
    /// Tangent of the half diagonal field of view.
    pub apsq: f64,
    pub internal: bool,
    pub target: Option<ObjectId>,
    pub proxy: Option<ObjectId>,
}

/// Camera with a LIFO snapshot stack.
pub struct Camera {
    st: CameraState,
    stack: Vec<CameraState>,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut cam = Self {
            st: CameraState {
                gpos: DVec3::ZERO,
                gdir: DVec3::Z,
                grot: DMat3::IDENTITY,
                aperture: 0.0,
                aspect: height as f64 / width.max(1) as f64,
                width,
                height,
                view: Mat4::IDENTITY,
                proj: Mat4::IDENTITY,
                nearplane: 1.0,
                farplane: 2e4,
                vh: 0.0,
                vw: 0.0,
                vhf: 0.0,
                vwf: 0.0,
                apsq: 0.0,
                internal: false,
                target: None,
                proxy: None,
            },
            stack: Vec::new(),
        };
        cam.set_aperture(std::f64::consts::FRAC_PI_8);
        cam
    }

    pub fn state(&self) -> &CameraState {
        &self.st
    }

    pub fn gpos(&self) -> DVec3 {
        self.st.gpos
    }

    pub fn gdir(&self) -> DVec3 {
        self.st.gdir
    }

    pub fn grot(&self) -> DMat3 {
        self.st.grot
    }

    pub fn aperture(&self) -> f64 {
        self.st.aperture
    }

    pub fn apsq(&self) -> f64 {
        self.st.apsq
    }

    pub fn nearplane(&self) -> f32 {
        self.st.nearplane
    }

    pub fn farplane(&self) -> f32 {
        self.st.farplane
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.st.width, self.st.height)
    }

    pub fn is_internal(&self) -> bool {
        self.st.internal
    }

    pub fn target(&self) -> Option<ObjectId> {
        self.st.target
    }

    pub fn proxy_body(&self) -> Option<ObjectId> {
        self.st.proxy
    }

    pub fn view(&self) -> Mat4 {
        self.st.view
    }

    pub fn proj(&self) -> Mat4 {
        self.st.proj
    }

    pub fn view_proj(&self) -> Mat4 {
        self.st.proj * self.st.view
    }

    /// Resize the viewport, keeping the current aperture.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.st.width = width;
        self.st.height = height;
        self.st.aspect = height as f64 / width.max(1) as f64;
        let ap = self.st.aperture;
        self.st.aperture = 0.0; // force a projection rebuild
        self.set_aperture(ap);
    }

    /// Set the half vertical field of view and rebuild the projection.
    pub fn set_aperture(&mut self, aperture: f64) {
        if aperture == self.st.aperture {
            return;
        }
        self.st.aperture = aperture;
        let tanap = aperture.tan();
        let aspect = self.st.aspect;

        self.st.vh = tanap as f32;
        self.st.vw = (tanap / aspect) as f32;
        self.st.vhf = (1.0 / aperture.cos()) as f32;
        self.st.vwf = self.st.vhf / aspect as f32;
        self.st.apsq = tanap * (1.0 / (aspect * aspect) + 1.0).sqrt();

        let sx = (aspect / tanap) as f32;
        let sy = (1.0 / tanap) as f32;
        let (n, f) = (self.st.nearplane, self.st.farplane);
        let q = f / (f - n);
        self.st.proj = Mat4::from_cols(
            Vec4::new(sx, 0.0, 0.0, 0.0),
            Vec4::new(0.0, sy, 0.0, 0.0),
            Vec4::new(0.0, 0.0, q, 1.0),
            Vec4::new(0.0, 0.0, -n * q, 0.0),
        );
    }

    /// Move the near/far planes without touching the field of view.
    pub fn set_frustum_limits(&mut self, nearplane: f32, farplane: f32) {
        self.st.nearplane = nearplane;
        self.st.farplane = farplane;
        let q = farplane / (farplane - nearplane);
        self.st.proj.z_axis.z = q;
        self.st.proj.w_axis.z = -nearplane * q;
    }

    /// Refresh position, orientation and aperture from the host.
    pub fn update_from_host(&mut self, host: &dyn SimHost) {
        self.st.gpos = host.camera_global_pos();
        self.st.gdir = host.camera_global_dir();
        self.st.grot = host.camera_rotation();
        self.st.internal = host.camera_internal();
        self.st.target = host.camera_target();
        self.st.proxy = host.camera_proxy_body();
        self.set_aperture(host.camera_aperture());
        self.st.view = Mat4::from_mat3(self.st.grot.as_mat3());
    }

    /// Point the camera at an arbitrary pose, for secondary views.
    pub fn set_custom_view(&mut self, gpos: DVec3, dir: DVec3, up: DVec3, aperture: f64) {
        let z = dir.normalize_or_zero();
        let x = up.cross(z).normalize_or_zero();
        let y = z.cross(x);
        self.st.gpos = gpos;
        self.st.gdir = z;
        self.st.grot = DMat3::from_cols(x, y, z).transpose();
        self.set_aperture(aperture);
        self.st.view = Mat4::from_mat3(self.st.grot.as_mat3());
    }

    /// Save the full camera state; restored bit-for-bit by [`Camera::pop`].
    pub fn push(&mut self) {
        self.stack.push(self.st.clone());
    }

    /// Restore the most recently pushed state.
    pub fn pop(&mut self) {
        match self.stack.pop() {
            Some(st) => self.st = st,
            None => log::warn!("camera pop without a matching push"),
        }
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Conservative sphere-vs-frustum test. `center` is camera-relative in
    /// the global frame.
    pub fn is_visible(&self, center: Vec3, radius: f32) -> bool {
        let c = self.st.grot.as_mat3() * center;
        if c.z < -radius {
            return false;
        }
        let z = c.z.abs();
        if c.y.abs() - radius * self.st.vhf > self.st.vh * z {
            return false;
        }
        if c.x.abs() - radius * self.st.vwf > self.st.vw * z {
            return false;
        }
        true
    }

    /// Global-frame unit direction through a viewport pixel.
    pub fn picking_ray(&self, x_px: f64, y_px: f64) -> DVec3 {
        let x = 2.0 * x_px / self.st.width.max(1) as f64 - 1.0;
        let y = 2.0 * y_px / self.st.height.max(1) as f64 - 1.0;
        let dir = DVec3::new(x * self.st.vw as f64, -y * self.st.vh as f64, 1.0).normalize();
        self.st.grot.transpose() * dir
    }

    /// Project a global-frame direction onto the viewport. `None` when the
    /// direction points behind the camera or outside the view cone.
    pub fn direction_to_viewport(&self, dir: DVec3) -> Option<(f32, f32)> {
        let v = self.st.grot * dir;
        if v.z <= 0.0 {
            return None;
        }
        let nx = v.x / (v.z * self.st.vw as f64);
        let ny = v.y / (v.z * self.st.vh as f64);
        if nx.abs() > 1.0 || ny.abs() > 1.0 {
            return None;
        }
        let px = (nx as f32 + 1.0) * 0.5 * self.st.width as f32;
        let py = (1.0 - ny as f32) * 0.5 * self.st.height as f32;
        Some((px, py))
    }

    /// Project a camera-relative world point to pixel coordinates.
    pub fn world_to_screen(&self, pos: DVec3) -> Option<(f32, f32)> {
        let d = pos.length();
        if d == 0.0 {
            return None;
        }
        self.direction_to_viewport(pos / d)
    }

    /// Projection matrix with substituted near/far planes; the camera state
    /// is left untouched.
    pub fn adjusted_projection(&self, nearplane: f32, farplane: f32) -> Mat4 {
        let mut proj = self.st.proj;
        let q = farplane / (farplane - nearplane);
        proj.z_axis.z = q;
        proj.w_axis.z = -nearplane * q;
        proj
    }

    /// Smallest depth difference a 24-bit z-buffer resolves at `dist` metres
    /// with the current frustum limits.
    pub fn depth_resolution(&self, dist: f64) -> f64 {
        let n = f64::from(self.st.nearplane);
        let f = f64::from(self.st.farplane);
        if n <= 0.0 || f <= n {
            return f64::MAX;
        }
        let q = f / (f - n);
        let eps = 1.0 / f64::from(1u32 << 24);
        (eps * dist * dist / (n * q)).abs()
    }

    /// On-screen radius in pixels of a sphere of `size` metres at `dist`
    /// metres.
    pub fn apparent_radius(&self, size: f64, dist: f64) -> f64 {
        if dist <= 0.0 {
            return f64::MAX;
        }
        size * self.st.height as f64 / (dist * self.st.aperture.tan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam() -> Camera {
        let mut c = Camera::new(800, 600);
        c.set_aperture(30f64.to_radians());
        c
    }

    #[test]
    fn push_pop_restores_exact_state() {
        let mut c = cam();
        c.push();
        let saved = c.state().clone();
        c.set_custom_view(DVec3::new(1.0, 2.0, 3.0), DVec3::X, DVec3::Y, 0.5);
        c.set_frustum_limits(0.1, 100.0);
        assert_ne!(*c.state(), saved);
        c.pop();
        assert_eq!(*c.state(), saved);
        assert_eq!(c.stack_depth(), 0);
    }

    #[test]
    fn frustum_limits_only_touch_depth_terms() {
        let mut c = cam();
        let before = c.proj();
        c.set_frustum_limits(5.0, 5e4);
        let after = c.proj();
        assert_eq!(before.x_axis, after.x_axis);
        assert_eq!(before.y_axis, after.y_axis);
        let q = 5e4 / (5e4 - 5.0);
        assert!((after.z_axis.z - q).abs() < 1e-6);
        assert!((after.w_axis.z + 5.0 * q).abs() < 1e-3);
    }

    #[test]
    fn sphere_on_axis_is_visible() {
        let c = cam();
        assert!(c.is_visible(Vec3::new(0.0, 0.0, 100.0), 1.0));
        assert!(!c.is_visible(Vec3::new(0.0, 0.0, -100.0), 1.0));
    }

    #[test]
    fn sphere_behind_but_overlapping_origin_is_visible() {
        let c = cam();
        // centre just behind the camera, radius reaches past it
        assert!(c.is_visible(Vec3::new(0.0, 0.0, -1.0), 5.0));
    }

    #[test]
    fn off_axis_sphere_culled_outside_cone() {
        let c = cam();
        let tanap = (30f64.to_radians()).tan() as f32;
        let inside = Vec3::new(0.0, tanap * 100.0 * 0.9, 100.0);
        let outside = Vec3::new(0.0, tanap * 100.0 * 3.0, 100.0);
        assert!(c.is_visible(inside, 0.1));
        assert!(!c.is_visible(outside, 0.1));
    }

    #[test]
    fn picking_ray_through_centre_is_view_dir() {
        let c = cam();
        let dir = c.picking_ray(400.0, 300.0);
        assert!((dir - DVec3::Z).length() < 1e-9);
    }

    #[test]
    fn centre_direction_projects_to_viewport_centre() {
        let c = cam();
        let (x, y) = c.direction_to_viewport(DVec3::Z).unwrap();
        assert!((x - 400.0).abs() < 1e-3);
        assert!((y - 300.0).abs() < 1e-3);
        assert!(c.direction_to_viewport(-DVec3::Z).is_none());
    }

    #[test]
    fn adjusted_projection_leaves_state_untouched() {
        let c = cam();
        let before = c.proj();
        let adj = c.adjusted_projection(0.5, 2e6);
        assert_eq!(c.proj(), before);
        assert_eq!(adj.x_axis, before.x_axis);
        let q = 2e6 / (2e6 - 0.5);
        assert!((f64::from(adj.z_axis.z) - q).abs() < 1e-6);
    }

    #[test]
    fn depth_resolution_grows_with_distance() {
        let mut c = cam();
        c.set_frustum_limits(1.0, 1e8);
        let near = c.depth_resolution(100.0);
        let far = c.depth_resolution(10_000.0);
        assert!(near > 0.0);
        assert!(far > near * 1e3);
    }

    #[test]
    fn apparent_radius_formula() {
        let c = cam();
        let r = c.apparent_radius(1000.0, 100_000.0);
        let expect = 1000.0 * 600.0 / (100_000.0 * (30f64.to_radians()).tan());
        assert!((r - expect).abs() < 1e-9);
    }
}
