//! The frame compositor: orchestrates the full render pass sequence for the
//! main view, secondary views (custom cameras, environment maps) and the
//! overlay layers.

use bitflags::bitflags;
use celestial::{celestial_to_ecliptic, CelestialSphere};
use gfx::{
    ClearFlags, Device, DrawItem, FontId, GridFrame, LineSetKind, PadId, PostProcessPass,
    SunVisualState, TargetId, TargetStack, TextAlignH, TextAlignV,
};
use glam::{DVec3, Mat4, Vec2, Vec4};
use scene_core::{
    ClientConfig, CoordAxesFlags, EnvMapMode, ForceVectorFlags, LightVisibility, ObjectId,
    ObjectKind, PlanetariumFlags, PostProcessMode, SimHost,
};

use crate::camera::Camera;
use crate::clip::{self, DepthBounds};
use crate::custom_cam::{CustomCamera, CustomCameraId, CustomCameraPool};
use crate::error::SceneError;
use crate::lights::LightSelector;
use crate::markers::{self, palette_color, LABEL_DISTLIMIT};
use crate::particles::{ParticleStream, ParticleStreamSet};
use crate::registry::VisualRegistry;
use crate::visual::{OmitFlags, VisualBody};

/// Distance-sorted planet list capacity; excess bodies are silently dropped.
const MAX_PLANETS: usize = 512;

/// Apparent radius above which a vessel gets environment-map updates [px].
const ENVMAP_APPRAD: f64 = 8.0;

/// Far plane for the main scene passes [m].
const MAIN_FARPLANE: f32 = 1e8;

bitflags! {
    /// Pass selection for secondary scene renders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SecondaryPass: u32 {
        const PLANETS   = 0x01;
        const VESSELS   = 0x02;
        const EXHAUST   = 0x04;
        const BEACONS   = 0x08;
        const PARTICLES = 0x10;
    }
}

/// Which auxiliary view gets regenerated after the main frame.
const TURN_CUSTOMCAM: u32 = 0;
const TURN_ENVMAP: u32 = 1;
const TURN_LAST: u32 = 1;

pub struct Scene {
    cfg: ClientConfig,
    camera: Camera,
    registry: VisualRegistry,
    lights: LightSelector,
    particles: ParticleStreamSet,
    custom_cams: CustomCameraPool,
    celestial: CelestialSphere,
    targets: TargetStack,

    sky_color: DVec3,
    /// Star dimming level derived from the sky colour, 0..=255.
    bg_level: u32,
    /// Unit direction from the camera towards the central star.
    sun_dir: DVec3,
    /// Celestial bodies sorted farthest first, rendered without z-buffer.
    planet_list: Vec<(ObjectId, f64)>,
    focus: Option<ObjectId>,
    offscreen: Option<TargetId>,
    turn: u32,
    /// Round-robin cursor over vessels for environment-map regeneration.
    env_cursor: usize,
    frame_id: u64,
    debug_queue: Vec<String>,
}

impl Scene {
    pub fn new(device: &mut dyn Device, cfg: ClientConfig, celestial: CelestialSphere) -> Self {
        let (w, h) = device.surface_size(device.back_buffer());
        device.upload_stars(&celestial.star_vertices());
        device.upload_constellation_lines(celestial.constellation_lines());

        let max_lights = if cfg.local_lights { device.max_lights() } else { 0 };

        Self {
            camera: Camera::new(w, h),
            registry: VisualRegistry::new(),
            lights: LightSelector::new(max_lights),
            particles: ParticleStreamSet::new(),
            custom_cams: CustomCameraPool::new(),
            celestial,
            targets: TargetStack::new(),
            sky_color: DVec3::ZERO,
            bg_level: 0,
            sun_dir: DVec3::Z,
            planet_list: Vec::new(),
            focus: None,
            offscreen: None,
            turn: 0,
            env_cursor: 0,
            frame_id: 0,
            cfg,
            debug_queue: Vec::new(),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn registry(&self) -> &VisualRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    pub fn sky_color(&self) -> DVec3 {
        self.sky_color
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn planet_list(&self) -> &[(ObjectId, f64)] {
        &self.planet_list
    }

    pub fn add_particle_stream(&mut self, stream: Box<dyn ParticleStream>) {
        self.particles.add(stream);
    }

    pub fn setup_custom_camera(
        &mut self,
        device: &dyn Device,
        existing: Option<CustomCameraId>,
        cam: CustomCamera,
    ) -> Result<CustomCameraId, gfx::GfxError> {
        self.custom_cams.setup(device, existing, cam)
    }

    pub fn custom_camera_on_off(&mut self, id: CustomCameraId, active: bool) {
        self.custom_cams.set_active(id, active);
    }

    /// Remove a custom camera, reporting its sticky error code.
    pub fn delete_custom_camera(&mut self, id: CustomCameraId) -> i32 {
        self.custom_cams.delete(id)
    }

    pub fn delete_all_custom_cameras(&mut self) {
        self.custom_cams.delete_all();
    }

    /// Queue one line for the debug overlay of the next frame.
    pub fn push_debug_line(&mut self, line: String) {
        self.debug_queue.push(line);
    }

    /// Global-frame picking ray through a viewport pixel.
    pub fn picking_ray(&self, x_px: f64, y_px: f64) -> (DVec3, DVec3) {
        (self.camera.gpos(), self.camera.picking_ray(x_px, y_px))
    }

    // --- per-frame state refresh -------------------------------------------

    /// Refresh camera, visuals, sun, sky colour, light set and the sorted
    /// planet list. Must run once before each [`Scene::render_main_frame`].
    pub fn update(
        &mut self,
        device: &mut dyn Device,
        host: &dyn SimHost,
        dt: f64,
    ) -> Result<(), SceneError> {
        self.frame_id += 1;

        self.camera.update_from_host(host);
        self.registry.sweep_removed(device, host)?;
        self.registry
            .check_visibility(device, host, &self.camera, self.cfg.visibility_checks_per_frame)?;
        self.registry.refresh(host, &self.camera);

        self.focus = host.focus_object();

        if let Some(sun) = host.central_star() {
            let rel = host.global_pos(sun) - self.camera.gpos();
            self.sun_dir = rel.normalize_or_zero();
        }

        self.sky_color = self.compute_sky_color(host);
        let lvl = (self.sky_color.x + self.sky_color.y + self.sky_color.z) * 255.0;
        self.bg_level = ((lvl as u32) / 2).min(255);
        self.celestial.set_sky_color(self.sky_color);

        self.select_external_lights(host);
        self.build_planet_list();
        self.particles.update(dt);

        Ok(())
    }

    /// Sky colour at the camera: proxy atmosphere colour scaled by local
    /// density and the sun's elevation.
    fn compute_sky_color(&self, host: &dyn SimHost) -> DVec3 {
        let Some(proxy) = self.camera.proxy_body() else {
            return DVec3::ZERO;
        };
        let Some(atm) = host.atm_constants(proxy) else {
            return DVec3::ZERO;
        };
        let rel = self.camera.gpos() - host.global_pos(proxy);
        let cdist = rel.length();
        if cdist >= atm.rad_limit || cdist == 0.0 {
            return DVec3::ZERO;
        }
        let Some(prm) = host.atm_params(proxy, cdist) else {
            return DVec3::ZERO;
        };
        let density = (prm.rho / atm.rho0).clamp(0.0, 1.0);
        // twilight ramp on the sun elevation seen from the camera
        let elev = (rel / cdist).dot(self.sun_dir);
        let daylight = ((elev + 0.2) / 0.4).clamp(0.0, 1.0);
        (atm.color0 * density * daylight).clamp(DVec3::ZERO, DVec3::ONE)
    }

    fn select_external_lights(&mut self, host: &dyn SimHost) {
        self.lights.clear();
        let cam = self.camera.gpos();
        for vis in self.registry.iter() {
            if !vis.active || vis.body != VisualBody::Vessel {
                continue;
            }
            let Some(vessel) = host.vessel(vis.id) else {
                continue;
            };
            let rot = vessel.rotation_matrix();
            for em in vessel.light_emitters() {
                if em.visibility.contains(LightVisibility::EXTERNAL) {
                    let pos = vessel.local_to_global(em.position) - cam;
                    self.lights.offer(em, pos, rot * em.direction);
                }
            }
        }
    }

    fn select_cockpit_lights(&mut self, host: &dyn SimHost) {
        self.lights.clear();
        let Some(focus) = self.focus else {
            return;
        };
        let Some(vessel) = host.vessel(focus) else {
            return;
        };
        let cam = self.camera.gpos();
        let rot = vessel.rotation_matrix();
        for em in vessel.light_emitters() {
            if em.visibility.contains(LightVisibility::COCKPIT) {
                let pos = vessel.local_to_global(em.position) - cam;
                self.lights.offer(em, pos, rot * em.direction);
            }
        }
    }

    fn build_planet_list(&mut self) {
        self.planet_list.clear();
        for vis in self.registry.iter() {
            if self.planet_list.len() >= MAX_PLANETS {
                break;
            }
            if vis.apprad < 0.01 && vis.body != VisualBody::Star {
                continue;
            }
            if vis.is_celestial() {
                self.planet_list.push((vis.id, vis.cdist));
            }
        }
        // no z-buffer for this pass; paint farthest first
        self.planet_list.sort_by(|a, b| b.1.total_cmp(&a.1));
    }

    // --- near clip ---------------------------------------------------------

    fn geometry_bounds(&self, host: &dyn SimHost) -> DepthBounds {
        let mut bounds = DepthBounds::default();
        let internal = self.camera.is_internal();
        let focus_has_ext = self
            .focus
            .and_then(|f| host.vessel(f))
            .map(|v| v.has_external_pass())
            .unwrap_or(false);

        for vis in self.registry.iter() {
            if vis.apprad <= 0.01 || !vis.active {
                continue;
            }
            match vis.body {
                VisualBody::Planet | VisualBody::Star | VisualBody::Base => {}
                VisualBody::Vessel => {
                    if !vis.in_view {
                        continue;
                    }
                    // the cockpit pass covers the focus vessel unless it has
                    // external geometry too
                    if internal && Some(vis.id) == self.focus && !focus_has_ext {
                        continue;
                    }
                }
            }
            let near = (vis.cdist - vis.size).max(0.0) as f32;
            let far = (vis.cdist + vis.size) as f32;
            bounds.merge(near, far, vis.cdist as f32);
        }
        bounds
    }

    fn solve_near_clip(&self, host: &dyn SimHost) -> f32 {
        let zsurf = match (self.camera.proxy_body(), self.camera.target()) {
            (Some(proxy), Some(target)) => {
                let elevation =
                    host.vessel(target).map(|v| v.surface_elevation()).unwrap_or(0.0);
                clip::surface_near_limit(
                    self.camera.gpos(),
                    self.camera.gdir(),
                    host.global_pos(proxy),
                    host.size(proxy),
                    elevation,
                    self.camera.apsq(),
                )
            }
            _ => 1000.0,
        };

        let altitude = self.camera_altitude(host);
        clip::compute_near_clip(
            zsurf,
            &self.geometry_bounds(host),
            self.particles.active_count() > 0,
            altitude,
            self.camera.is_internal(),
            self.cfg.near_clip,
        )
    }

    fn camera_altitude(&self, host: &dyn SimHost) -> f64 {
        match self.camera.proxy_body() {
            Some(proxy) => {
                (self.camera.gpos() - host.global_pos(proxy)).length() - host.size(proxy)
            }
            None => f64::MAX,
        }
    }

    fn target_ground_altitude(&self, host: &dyn SimHost) -> f64 {
        self.camera
            .target()
            .and_then(|t| host.vessel(t))
            .map(|v| v.altitude() - v.surface_elevation())
            .unwrap_or_else(|| self.camera_altitude(host))
    }

    // --- main frame --------------------------------------------------------

    /// Compose the full main frame. A refused scene begin drops the frame
    /// silently; backend desyncs surface as errors.
    pub fn render_main_frame(
        &mut self,
        device: &mut dyn Device,
        host: &dyn SimHost,
    ) -> Result<(), SceneError> {
        // target acquire: offscreen buffer only for the blur chain
        let target = match self.cfg.post_process {
            PostProcessMode::LightBlur => {
                if self.offscreen.is_none() {
                    let (w, h) = self.camera.viewport();
                    match device.create_offscreen_target(w, h) {
                        Ok(t) => self.offscreen = Some(t),
                        Err(e) => {
                            log::error!("offscreen target creation failed: {e}");
                            self.cfg.post_process = PostProcessMode::None;
                        }
                    }
                }
                self.offscreen.unwrap_or_else(|| device.back_buffer())
            }
            _ => device.back_buffer(),
        };
        let depth = device.depth_stencil_of(target);
        device.set_render_target(Some(target), depth);

        device.clear(ClearFlags::all_surfaces(), [0.0, 0.0, 0.0, 1.0]);
        if device.begin_scene().is_err() {
            log::warn!("scene begin refused; dropping frame {}", self.frame_id);
            return Ok(());
        }

        if self.cfg.local_lights {
            device.set_local_lights(&self.lights.render_lights());
        }

        let znear_vessels = self.solve_near_clip(host);

        // at altitude the terrain pass can use a distant near plane and give
        // the depth buffer back to the vessel pass afterwards
        let clear_z_between =
            self.target_ground_altitude(host) > 10e3 && !self.camera.is_internal();

        if clear_z_between {
            self.camera.set_frustum_limits(1e3, MAIN_FARPLANE);
        } else {
            self.camera.set_frustum_limits(znear_vessels, MAIN_FARPLANE);
        }
        device.set_view_proj(self.camera.view_proj());

        // sky sphere with star dimming
        device.draw(DrawItem::SkyBackground { dim_level: self.bg_level });

        self.render_planetarium_lines(device, host);

        device.draw(DrawItem::Stars { count: self.celestial.visible_star_count(self.bg_level) });

        self.render_celestial_markers(device, host);
        self.render_planets(device, host);

        // vessel exterior pass
        if clear_z_between {
            device.clear(ClearFlags::DEPTH, [0.0; 4]);
            self.camera.set_frustum_limits(znear_vessels, MAIN_FARPLANE);
            device.set_view_proj(self.camera.view_proj());
        }
        self.render_ground_shadows(device, host);
        self.render_vessels(device, host);

        // vessel attachments and particle effects
        for vis in self.registry.iter() {
            if vis.active && vis.in_view && vis.body == VisualBody::Vessel {
                device.draw(DrawItem::Exhaust { id: vis.id });
            }
        }
        for vis in self.registry.iter() {
            if vis.active {
                device.draw(DrawItem::Beacons { id: vis.id });
            }
        }
        for vis in self.registry.iter() {
            if vis.active {
                device.draw(DrawItem::GrapplePoints { id: vis.id });
            }
        }
        for idx in self.particles.active_indices() {
            device.draw(DrawItem::ParticleStream { index: idx });
        }
        self.render_axes(device);

        self.render_cockpit(device, host);

        device.end_scene();

        self.run_post_process(device, host, target);
        self.render_hud(device);

        self.render_auxiliary_views(device, host)?;
        self.render_debug_overlay(device, host);

        Ok(())
    }

    fn render_planetarium_lines(&mut self, device: &mut dyn Device, host: &dyn SimHost) {
        let pln = self.cfg.planetarium;
        if !pln.contains(PlanetariumFlags::ENABLE) {
            return;
        }
        let brt = 1.0
            - ((self.sky_color.x + self.sky_color.y + self.sky_color.z) / 3.0).min(1.0) as f32;
        let vp = self.camera.view_proj();

        if pln.contains(PlanetariumFlags::ECL_GRID) {
            device.draw(DrawItem::LineSet {
                kind: LineSetKind::Grid {
                    frame: GridFrame::Ecliptic,
                    omit_equator: pln.contains(PlanetariumFlags::ECLIPTIC),
                },
                color: Vec4::new(0.0, 0.0, 0.4 * brt, 1.0),
                transform: vp,
            });
        }
        if pln.contains(PlanetariumFlags::ECLIPTIC) {
            device.draw(DrawItem::LineSet {
                kind: LineSetKind::GreatCircle { frame: GridFrame::Ecliptic },
                color: Vec4::new(0.0, 0.0, 0.8 * brt, 1.0),
                transform: vp,
            });
        }
        if pln.intersects(PlanetariumFlags::CEL_GRID | PlanetariumFlags::CEL_EQUATOR) {
            let rot = celestial_to_ecliptic(host.ecliptic_obliquity());
            let cel = vp * Mat4::from_mat3(rot.as_mat3());
            if pln.contains(PlanetariumFlags::CEL_GRID) {
                device.draw(DrawItem::LineSet {
                    kind: LineSetKind::Grid {
                        frame: GridFrame::Celestial,
                        omit_equator: pln.contains(PlanetariumFlags::CEL_EQUATOR),
                    },
                    color: Vec4::new(0.35 * brt, 0.0, 0.35 * brt, 1.0),
                    transform: cel,
                });
            }
            if pln.contains(PlanetariumFlags::CEL_EQUATOR) {
                device.draw(DrawItem::LineSet {
                    kind: LineSetKind::GreatCircle { frame: GridFrame::Celestial },
                    color: Vec4::new(0.7 * brt, 0.0, 0.7 * brt, 1.0),
                    transform: cel,
                });
            }
        }
        if pln.contains(PlanetariumFlags::CONST_LINES) {
            device.draw(DrawItem::LineSet {
                kind: LineSetKind::ConstellationLines,
                color: Vec4::new(0.4 * brt, 0.3 * brt, 0.2 * brt, 1.0),
                transform: vp,
            });
        }
    }

    fn render_celestial_markers(&mut self, device: &mut dyn Device, host: &dyn SimHost) {
        let pln = self.cfg.planetarium;
        if !pln.contains(PlanetariumFlags::ENABLE) {
            return;
        }
        let (_, h) = self.camera.viewport();
        let camera = &self.camera;
        let cel = &self.celestial;
        let pad = device.pad(PadId::Labels);
        pad.set_font(FontId::Label);
        pad.set_text_align(TextAlignH::Center, TextAlignV::Bottom);

        if pln.contains(PlanetariumFlags::CONST_LABELS) {
            let col = cel.text_color_adjusted(rgb(palette_color(5)));
            pad.set_text_color(col);
            let long = pln.contains(PlanetariumFlags::CONST_FULL_NAMES);
            for spec in cel.labels().iter().chain(host.constellation_markers()) {
                let label = if long { spec.label[0].as_str() } else { spec.label[1].as_str() };
                markers::render_direction_marker(pad, camera, spec.pos, None, ["", label], 0, 0);
            }
        }

        if pln.contains(PlanetariumFlags::CELESTIAL_MARKERS) {
            for list in host.celestial_markers() {
                if !list.active {
                    continue;
                }
                let size = (h as f64 / 80.0 * list.size + 0.5) as i32;
                let col = cel.text_color_adjusted(rgb(palette_color(list.colour)));
                pad.set_text_color(col);
                pad.set_pen_color(col);
                for spec in &list.markers {
                    markers::render_direction_marker(
                        pad,
                        camera,
                        spec.pos,
                        Some(list.shape),
                        [spec.label[0].as_str(), spec.label[1].as_str()],
                        size,
                        size,
                    );
                }
            }
        }
        pad.flush();
    }

    /// Painter-sorted celestial body pass with the marker overlays.
    fn render_planets(&mut self, device: &mut dyn Device, host: &dyn SimHost) {
        let pln = self.cfg.planetarium;
        let (_, h) = self.camera.viewport();
        let tanap = self.camera.aperture().tan();

        for i in 0..self.planet_list.len() {
            let (id, dist) = self.planet_list[i];
            let active = self.registry.get(id).map(|v| v.active).unwrap_or(false);
            if active {
                device.draw(DrawItem::Planet { id });
            } else {
                device.draw(DrawItem::PlanetDot { id });
            }
            if !pln.contains(PlanetariumFlags::ENABLE) {
                continue;
            }

            if pln.contains(PlanetariumFlags::OBJECT_MARKERS) {
                let name = host.object_name(id);
                let col = self.celestial.text_color_adjusted(rgb(palette_color(0)));
                let camera = &self.camera;
                let pad = device.pad(PadId::Labels);
                pad.set_text_color(col);
                pad.set_pen_color(col);
                markers::render_object_marker(
                    pad,
                    camera,
                    host.global_pos(id),
                    None,
                    [name.as_str(), ""],
                    0,
                    (h / 80) as i32,
                );
            }

            let is_planet = host.object_kind(id) == Some(ObjectKind::Planet);
            if active && is_planet && pln.contains(PlanetariumFlags::SURFACE_MARKERS) {
                self.render_surface_markers(device, host, id, dist, tanap);
            }
            if is_planet && pln.contains(PlanetariumFlags::BASE_MARKERS) {
                self.render_base_markers(device, host, id, tanap);
            }
        }
        device.pad(PadId::Labels).flush();
    }

    /// Vessel and particle-stream shadows projected onto the proxy planet.
    /// Shadows only reach the ground from the low-altitude band.
    fn render_ground_shadows(&mut self, device: &mut dyn Device, host: &dyn SimHost) {
        let Some(planet) = self.camera.proxy_body() else {
            return;
        };
        let mut any = false;
        for vis in self.registry.iter() {
            if vis.body != VisualBody::Vessel || !vis.active || !vis.in_view {
                continue;
            }
            let Some(vessel) = host.vessel(vis.id) else {
                continue;
            };
            if vessel.altitude() < 10e3 {
                device.draw(DrawItem::GroundShadow { planet, vessel: vis.id });
                any = true;
            }
        }
        if any && self.particles.active_count() > 0 {
            device.draw(DrawItem::ParticleShadows { planet });
        }
    }

    fn render_surface_markers(
        &self,
        device: &mut dyn Device,
        host: &dyn SimHost,
        planet: ObjectId,
        dist: f64,
        tanap: f64,
    ) {
        let apprad = host.size(planet) / (dist * tanap);
        let prot = host.rotation_matrix(planet);
        let ppos = host.global_pos(planet);
        let cpos = prot.transpose() * (self.camera.gpos() - ppos);
        let (_, h) = self.camera.viewport();
        let camera = &self.camera;
        let cel = &self.celestial;

        for list in host.surface_markers(planet) {
            if !list.active || apprad * list.dist_factor <= LABEL_DISTLIMIT {
                continue;
            }
            let size = (h as f64 / 80.0 * list.size + 0.5) as i32;
            let col = cel.text_color_adjusted(rgb(palette_color(list.colour)));
            let pad = device.pad(PadId::Labels);
            pad.set_text_color(col);
            pad.set_pen_color(col);
            for spec in &list.markers {
                // surface point on the camera-facing hemisphere only
                if spec.pos.dot(cpos - spec.pos) >= 0.0 {
                    let gpos = prot * spec.pos + ppos;
                    markers::render_object_marker(
                        pad,
                        camera,
                        gpos,
                        Some(list.shape),
                        [spec.label[0].as_str(), spec.label[1].as_str()],
                        size,
                        size,
                    );
                }
            }
        }
    }

    fn render_base_markers(
        &self,
        device: &mut dyn Device,
        host: &dyn SimHost,
        planet: ObjectId,
        tanap: f64,
    ) {
        let prot = host.rotation_matrix(planet);
        let ppos = host.global_pos(planet);
        let cpos = prot.transpose() * (self.camera.gpos() - ppos);
        let (_, h) = self.camera.viewport();
        let size = (h / 80) as i32;
        let camera = &self.camera;
        let col = self.celestial.text_color_adjusted(rgb(palette_color(0)));
        let pad = device.pad(PadId::Labels);
        pad.set_text_color(col);
        pad.set_pen_color(col);

        for i in 0..host.base_count(planet) {
            let Some(base) = host.base_by_index(planet, i) else {
                continue;
            };
            let bpos = prot.transpose() * (host.global_pos(base) - ppos);
            let bdist = (cpos - bpos).length();
            if bdist == 0.0 {
                continue;
            }
            // bases become labelled at a fixed reference size
            let apprad = 8000e3 / (bdist * tanap);
            if bpos.dot(cpos - bpos) >= 0.0 && apprad > LABEL_DISTLIMIT {
                let name = host.object_name(base);
                let gpos = prot * bpos + ppos;
                markers::render_object_marker(
                    pad,
                    camera,
                    gpos,
                    None,
                    [name.as_str(), ""],
                    0,
                    size,
                );
            }
        }
    }

    fn render_vessels(&mut self, device: &mut dyn Device, host: &dyn SimHost) {
        let pln = self.cfg.planetarium;
        let (_, h) = self.camera.viewport();
        let show_markers = pln.contains(PlanetariumFlags::ENABLE)
            && pln.contains(PlanetariumFlags::VESSEL_MARKERS);

        for vis in self.registry.iter() {
            if !vis.active || !vis.in_view || vis.body != VisualBody::Vessel {
                continue;
            }
            device.draw(DrawItem::Vessel { id: vis.id });
            if show_markers {
                let name = host.object_name(vis.id);
                let gpos = host.global_pos(vis.id);
                let camera = &self.camera;
                let col = self.celestial.text_color_adjusted(rgb(palette_color(0)));
                let pad = device.pad(PadId::Labels);
                pad.set_text_color(col);
                markers::render_object_marker(
                    pad,
                    camera,
                    gpos,
                    None,
                    [name.as_str(), ""],
                    0,
                    (h / 80) as i32,
                );
            }
        }
        if show_markers {
            device.pad(PadId::Labels).flush();
        }
    }

    fn render_axes(&mut self, device: &mut dyn Device) {
        let forces = self.cfg.force_vectors;
        let axes = self.cfg.coord_axes;
        if !forces.contains(ForceVectorFlags::ENABLE) && !axes.contains(CoordAxesFlags::ENABLE) {
            return;
        }
        let pad = device.pad(PadId::Labels);
        pad.set_font(FontId::Axis);
        pad.set_text_align(TextAlignH::Left, TextAlignV::Top);
        device.clear(ClearFlags::DEPTH, [0.0; 4]);
        let internal = self.camera.is_internal();
        for vis in self.registry.iter() {
            if !vis.active || !vis.in_view {
                continue;
            }
            if internal && Some(vis.id) == self.focus {
                continue;
            }
            device.draw(DrawItem::Axes { id: vis.id, forces, axes });
        }
    }

    /// Cockpit interior pass with its own light set and depth range.
    fn render_cockpit(&mut self, device: &mut dyn Device, host: &dyn SimHost) {
        if !self.camera.is_internal() {
            return;
        }
        let Some(focus) = self.focus else {
            return;
        };
        if self.cfg.local_lights {
            self.select_cockpit_lights(host);
            device.set_local_lights(&self.lights.render_lights());
        }
        device.clear(ClearFlags::DEPTH, [0.0; 4]);
        let znear = self.cfg.cockpit_near_plane.clamp(0.01, 1.0) as f32;
        let zfar = (host.size(focus) * 2.0) as f32;
        self.camera.set_frustum_limits(znear, zfar.max(znear * 2.0));
        device.set_view_proj(self.camera.view_proj());
        device.draw(DrawItem::VesselInterior { id: focus });
    }

    fn run_post_process(&mut self, device: &mut dyn Device, host: &dyn SimHost, target: TargetId) {
        let pass = match self.cfg.post_process {
            PostProcessMode::None => return,
            PostProcessMode::LightBlur => PostProcessPass::LightBlur { source: target },
            PostProcessMode::LensFlare => {
                PostProcessPass::LensFlare { sun: self.sun_screen_state(host) }
            }
        };
        if let Err(e) = device.run_post_process(pass) {
            log::error!("post process failed: {e}");
        }
    }

    /// Screen-space state of the central star for the lens-flare composite.
    fn sun_screen_state(&self, host: &dyn SimHost) -> SunVisualState {
        let dist = host
            .central_star()
            .map(|s| (host.global_pos(s) - self.camera.gpos()).length())
            .unwrap_or(150e9);
        let screen = self.camera.direction_to_viewport(self.sun_dir);
        let (w, h) = self.camera.viewport();
        let pos = screen
            .map(|(x, y)| {
                Vec2::new(x / w.max(1) as f32 - 0.5, 0.5 - y / h.max(1) as f32)
            })
            .unwrap_or(Vec2::ZERO);
        SunVisualState {
            visible: screen.is_some(),
            screen_pos: pos,
            color: Vec4::ONE,
            brightness: 1.0,
            size: (dist / 150e9) as f32,
            cockpit: self.camera.is_internal(),
        }
    }

    fn render_hud(&mut self, device: &mut dyn Device) {
        let back = device.back_buffer();
        let depth = device.depth_stencil_of(back);
        device.set_render_target(Some(back), depth);
        if device.begin_scene().is_err() {
            return;
        }
        let pad = device.pad(PadId::Overlay);
        pad.set_font(FontId::Label);
        pad.flush();
        device.end_scene();
    }

    /// One auxiliary view per frame: custom camera and environment map turns
    /// alternate, skipping whichever is disabled.
    fn render_auxiliary_views(
        &mut self,
        device: &mut dyn Device,
        host: &dyn SimHost,
    ) -> Result<(), SceneError> {
        // skip over disabled turns so an enabled mode runs every frame
        for _ in 0..=TURN_LAST {
            if self.turn > TURN_LAST {
                self.turn = 0;
            }
            let enabled = match self.turn {
                TURN_CUSTOMCAM => self.cfg.custom_cameras,
                // the scene is static while paused; existing maps stay valid
                _ => self.cfg.env_map_mode != EnvMapMode::Disabled && !host.is_paused(),
            };
            if enabled {
                break;
            }
            self.turn += 1;
        }
        if self.turn > TURN_LAST {
            return Ok(()); // nothing enabled
        }

        match self.turn {
            TURN_CUSTOMCAM => {
                if let Some(focus) = self.focus {
                    if let Some(id) = self.custom_cams.next_for_vessel(focus) {
                        self.render_custom_camera_view(device, host, id)?;
                    }
                }
            }
            TURN_ENVMAP => self.render_env_map_turn(device, host)?,
            _ => {}
        }
        self.turn += 1;
        Ok(())
    }

    /// Render one custom camera into its target surface.
    pub fn render_custom_camera_view(
        &mut self,
        device: &mut dyn Device,
        host: &dyn SimHost,
        id: CustomCameraId,
    ) -> Result<(), SceneError> {
        let Some(cam) = self.custom_cams.get(id).cloned() else {
            return Ok(());
        };
        if cam.error != 0 {
            return Ok(());
        }
        // the target may have lost its depth buffer since setup
        let Some(depth) = device.depth_stencil_of(cam.target) else {
            log::warn!("custom camera target lost its depth buffer; camera disabled");
            self.custom_cams.set_error(id, -2);
            return Ok(());
        };
        let Some(vessel) = host.vessel(cam.vessel) else {
            return Ok(());
        };
        let gpos = vessel.local_to_global(cam.position);
        let grot = vessel.rotation_matrix() * cam.rotation;
        let dir = grot * DVec3::Z;
        let up = grot * DVec3::Y;

        self.clear_omit_flags();
        self.camera.push();
        self.camera.set_custom_view(gpos, dir, up, cam.aperture);
        self.camera.set_frustum_limits(0.1, 2e7);

        self.targets.push(device, Some(cam.target), Some(depth));
        let result = self.render_secondary(device, cam.pass_flags);
        self.targets.restore(device);
        self.camera.pop();
        result
    }

    /// Regenerate environment-map faces for the next eligible vessel.
    fn render_env_map_turn(
        &mut self,
        device: &mut dyn Device,
        host: &dyn SimHost,
    ) -> Result<(), SceneError> {
        let mut flags = SecondaryPass::PLANETS;
        if self.cfg.env_map_mode == EnvMapMode::Full {
            flags |= SecondaryPass::VESSELS;
        }
        let faces_per_turn = self.cfg.env_map_faces.clamp(1, 6);

        let ids: Vec<ObjectId> = self.registry.iter().map(|v| v.id).collect();
        if ids.is_empty() {
            return Ok(());
        }
        if self.env_cursor >= ids.len() {
            self.env_cursor = 0;
        }

        while self.env_cursor < ids.len() {
            let id = ids[self.env_cursor];
            let eligible = self
                .registry
                .get(id)
                .map(|v| v.body == VisualBody::Vessel && v.apprad > ENVMAP_APPRAD)
                .unwrap_or(false);
            if !eligible {
                self.env_cursor += 1;
                continue;
            }
            let done = self.render_env_faces(device, host, id, flags, faces_per_turn)?;
            if done {
                self.env_cursor += 1;
            }
            return Ok(());
        }
        self.env_cursor = 0;
        Ok(())
    }

    /// Render up to `count` cube faces for one vessel; true when the cube
    /// completed and the cursor may advance.
    fn render_env_faces(
        &mut self,
        device: &mut dyn Device,
        host: &dyn SimHost,
        vessel: ObjectId,
        flags: SecondaryPass,
        count: u32,
    ) -> Result<bool, SceneError> {
        let gpos = host.global_pos(vessel);
        let start = self.registry.get(vessel).map(|v| v.env_face).unwrap_or(0);
        let mut face = start;

        for _ in 0..count {
            let Some(target) = device.env_face_target(vessel, face) else {
                return Ok(true); // backend has no env-map support
            };
            let (dir, up) = cube_face_axes(face);

            self.clear_omit_flags();
            if let Some(vis) = self.registry.get_mut(vessel) {
                vis.omit = OmitFlags::BODY | OmitFlags::ATTACHMENTS;
            }
            self.camera.push();
            self.camera.set_custom_view(gpos, dir, up, std::f64::consts::FRAC_PI_4);
            self.camera.set_frustum_limits(0.1, 2e7);

            let depth = device.depth_stencil_of(target);
            self.targets.push(device, Some(target), depth);
            let result = self.render_secondary(device, flags);
            self.targets.restore(device);
            self.camera.pop();
            result?;

            face = (face + 1) % 6;
            if face == start {
                break;
            }
        }

        if let Some(vis) = self.registry.get_mut(vessel) {
            vis.env_face = face;
        }
        self.clear_omit_flags();
        Ok(face == start || face == 0)
    }

    fn clear_omit_flags(&mut self) {
        for vis in self.registry.iter_mut() {
            vis.omit = OmitFlags::empty();
        }
    }

    /// Mark a visual for exclusion from subsequent secondary renders.
    pub fn set_omit(&mut self, id: ObjectId, omit: OmitFlags) {
        if let Some(vis) = self.registry.get_mut(id) {
            vis.omit = omit;
        }
    }

    /// Reduced pass sequence used by custom cameras and environment maps.
    /// The current camera state applies; a refused begin drops the view.
    pub fn render_secondary(
        &mut self,
        device: &mut dyn Device,
        flags: SecondaryPass,
    ) -> Result<(), SceneError> {
        device.clear(ClearFlags::all_surfaces(), [0.0, 0.0, 0.0, 1.0]);
        if device.begin_scene().is_err() {
            log::warn!("secondary scene begin refused");
            return Ok(());
        }
        device.set_view_proj(self.camera.view_proj());

        if flags.contains(SecondaryPass::PLANETS) {
            for i in 0..self.planet_list.len() {
                let (id, _) = self.planet_list[i];
                let active = self.registry.get(id).map(|v| v.active).unwrap_or(false);
                if active {
                    device.draw(DrawItem::Planet { id });
                } else {
                    device.draw(DrawItem::PlanetDot { id });
                }
            }
        }
        if flags.contains(SecondaryPass::VESSELS) {
            for vis in self.registry.iter() {
                if vis.active
                    && vis.in_view
                    && vis.body == VisualBody::Vessel
                    && !vis.omit.contains(OmitFlags::BODY)
                {
                    device.draw(DrawItem::Vessel { id: vis.id });
                }
            }
        }
        if flags.contains(SecondaryPass::EXHAUST) {
            for vis in self.registry.iter() {
                if vis.active
                    && vis.in_view
                    && vis.body == VisualBody::Vessel
                    && !vis.omit.contains(OmitFlags::ATTACHMENTS)
                {
                    device.draw(DrawItem::Exhaust { id: vis.id });
                }
            }
        }
        if flags.contains(SecondaryPass::BEACONS) {
            for vis in self.registry.iter() {
                if vis.active && !vis.omit.contains(OmitFlags::ATTACHMENTS) {
                    device.draw(DrawItem::Beacons { id: vis.id });
                }
            }
        }
        if flags.contains(SecondaryPass::PARTICLES) {
            for idx in self.particles.active_indices() {
                device.draw(DrawItem::ParticleStream { index: idx });
            }
        }
        device.end_scene();
        Ok(())
    }

    fn render_debug_overlay(&mut self, device: &mut dyn Device, host: &dyn SimHost) {
        let host_line = host.debug_string();
        if host_line.is_empty() && self.debug_queue.is_empty() {
            return;
        }
        if device.begin_scene().is_err() {
            self.debug_queue.clear();
            return;
        }
        let (_, h) = self.camera.viewport();
        let line_h = self.cfg.debug_line_height.max(1) as i32;
        let pad = device.pad(PadId::Debug);
        pad.set_font(FontId::Debug);
        pad.set_text_align(TextAlignH::Left, TextAlignV::Bottom);
        pad.set_text_color(0xFFFFFF);
        pad.set_pen_color(0x000000);

        // each line sits on a background box sized to its text
        let mut y = h as i32 - 2;
        if !host_line.is_empty() {
            let w = pad.text_width(&host_line) as i32;
            pad.rectangle(2, y - line_h, 6 + w, y + 2);
            pad.text(4, y, &host_line);
            y -= line_h;
        }
        for line in self.debug_queue.drain(..).rev() {
            let w = pad.text_width(&line) as i32;
            pad.rectangle(2, y - line_h, 6 + w, y + 2);
            pad.text(4, y, &line);
            y -= line_h;
        }
        pad.flush();
        device.end_scene();
    }
}

/// View direction and up vector of one cube-map face.
fn cube_face_axes(face: u32) -> (DVec3, DVec3) {
    match face % 6 {
        0 => (DVec3::X, DVec3::Y),
        1 => (-DVec3::X, DVec3::Y),
        2 => (DVec3::Y, -DVec3::Z),
        3 => (-DVec3::Y, DVec3::Z),
        4 => (DVec3::Z, DVec3::Y),
        _ => (-DVec3::Z, DVec3::Y),
    }
}

fn rgb(c: u32) -> Vec4 {
    Vec4::new(
        ((c >> 16) & 0xff) as f32 / 255.0,
        ((c >> 8) & 0xff) as f32 / 255.0,
        (c & 0xff) as f32 / 255.0,
        1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Event, MockHost, MockVessel, RecordingDevice};
    use glam::DMat3;
    use scene_core::{LightEmitter, LightKind, StarRenderParams};

    fn sphere() -> CelestialSphere {
        CelestialSphere::from_records(&[], &[], &[], &[], &StarRenderParams::default())
    }

    fn scene_with(dev: &mut RecordingDevice, cfg: ClientConfig) -> Scene {
        Scene::new(dev, cfg, sphere())
    }

    fn ship() -> MockVessel {
        MockVessel::default()
    }

    fn emitter(visibility: LightVisibility) -> LightEmitter {
        LightEmitter {
            kind: LightKind::Point,
            active: true,
            intensity: 1.0,
            visibility,
            position: DVec3::ZERO,
            direction: DVec3::Z,
            color: DVec3::ONE,
            attenuation: [1.0, 0.0, 0.0],
            range: 100.0,
            cone: (0.0, 0.0),
        }
    }

    fn position_of(draws: &[&DrawItem], pred: impl Fn(&DrawItem) -> bool) -> usize {
        draws.iter().position(|d| pred(d)).expect("draw item missing")
    }

    #[test]
    fn main_frame_pass_order() {
        let mut host = MockHost::solar_system(3);
        let vid = host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, ship());
        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());

        scene.update(&mut dev, &host, 0.1).unwrap();
        dev.events.clear();
        scene.render_main_frame(&mut dev, &host).unwrap();

        let draws = dev.draws();
        let sky = position_of(&draws, |d| matches!(d, DrawItem::SkyBackground { .. }));
        let stars = position_of(&draws, |d| matches!(d, DrawItem::Stars { .. }));
        let planet = position_of(&draws, |d| matches!(d, DrawItem::Planet { .. }));
        let vessel = position_of(&draws, |d| matches!(d, DrawItem::Vessel { id } if *id == vid));
        let exhaust = position_of(&draws, |d| matches!(d, DrawItem::Exhaust { id } if *id == vid));
        assert!(sky < stars && stars < planet && planet < vessel && vessel < exhaust);

        // the farthest body paints first
        let sun = host.object_by_index(0).unwrap();
        assert!(matches!(draws[planet], DrawItem::Planet { id } if *id == sun));

        // at altitude the depth buffer is cleared between terrain and vessels
        let depth_clears = dev
            .events
            .iter()
            .filter(|e| matches!(e, Event::Clear(f) if *f == ClearFlags::DEPTH))
            .count();
        assert_eq!(depth_clears, 1);
    }

    #[test]
    fn refused_begin_drops_the_frame() {
        let host = MockHost::solar_system(3);
        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());
        scene.update(&mut dev, &host, 0.1).unwrap();

        dev.events.clear();
        dev.fail_begin = true;
        scene.render_main_frame(&mut dev, &host).unwrap();
        assert!(dev.draws().is_empty());
        assert!(!dev.events.iter().any(|e| matches!(e, Event::EndScene)));
    }

    #[test]
    fn no_mid_frame_depth_clear_near_the_ground() {
        let mut host = MockHost::solar_system(2);
        let mut vessel = ship();
        vessel.altitude = 100.0;
        let vid = host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, vessel);
        host.focus = Some(vid);

        let mut dev = RecordingDevice::new();
        let mut cfg = ClientConfig::default();
        cfg.custom_cameras = false;
        let mut scene = scene_with(&mut dev, cfg);
        scene.update(&mut dev, &host, 0.1).unwrap();
        dev.events.clear();
        scene.render_main_frame(&mut dev, &host).unwrap();

        let clears = dev.events.iter().filter(|e| matches!(e, Event::Clear(_))).count();
        assert_eq!(clears, 1); // only the frame clear
    }

    #[test]
    fn ground_shadows_only_near_the_surface() {
        let mut host = MockHost::solar_system(2);
        let mut vessel = ship();
        vessel.altitude = 100.0;
        let vid = host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, vessel);
        host.focus = Some(vid);

        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());
        scene.update(&mut dev, &host, 0.1).unwrap();
        dev.events.clear();
        scene.render_main_frame(&mut dev, &host).unwrap();

        let planet = host.object_by_index(1).unwrap();
        let draws = dev.draws();
        let shadow = position_of(&draws, |d| {
            matches!(d, DrawItem::GroundShadow { planet: p, vessel: v } if *p == planet && *v == vid)
        });
        let vessel_draw =
            position_of(&draws, |d| matches!(d, DrawItem::Vessel { id } if *id == vid));
        assert!(shadow < vessel_draw);

        // the same vessel at orbital altitude casts none
        let mut host = MockHost::solar_system(2);
        host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, ship());
        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());
        scene.update(&mut dev, &host, 0.1).unwrap();
        scene.render_main_frame(&mut dev, &host).unwrap();
        assert!(!dev.draws().iter().any(|d| matches!(d, DrawItem::GroundShadow { .. })));
    }

    #[test]
    fn post_process_modes_invoke_the_chain() {
        let host = MockHost::solar_system(2);
        let mut dev = RecordingDevice::new();
        let mut cfg = ClientConfig::default();
        cfg.post_process = PostProcessMode::LightBlur;
        let mut scene = scene_with(&mut dev, cfg);
        scene.update(&mut dev, &host, 0.1).unwrap();
        dev.events.clear();
        scene.render_main_frame(&mut dev, &host).unwrap();

        // scene went to an offscreen target, then the blur ran
        assert!(matches!(dev.events[0], Event::SetTarget(Some(t), _) if t != dev.back_buffer()));
        assert!(dev.events.iter().any(|e| matches!(e, Event::PostProcess("light_blur"))));
        // HUD returns to the swap target
        let back = dev.back_buffer();
        assert!(dev
            .events
            .iter()
            .any(|e| matches!(e, Event::SetTarget(Some(t), _) if *t == back)));

        let mut dev = RecordingDevice::new();
        let mut cfg = ClientConfig::default();
        cfg.post_process = PostProcessMode::LensFlare;
        let mut scene = scene_with(&mut dev, cfg);
        scene.update(&mut dev, &host, 0.1).unwrap();
        scene.render_main_frame(&mut dev, &host).unwrap();
        assert!(dev.events.iter().any(|e| matches!(e, Event::PostProcess("lens_flare"))));
    }

    #[test]
    fn planetarium_lines_at_full_brightness() {
        let host = MockHost::solar_system(2);
        let mut dev = RecordingDevice::new();
        let mut cfg = ClientConfig::default();
        cfg.planetarium = PlanetariumFlags::ENABLE
            | PlanetariumFlags::ECL_GRID
            | PlanetariumFlags::ECLIPTIC
            | PlanetariumFlags::CONST_LINES;
        let mut scene = scene_with(&mut dev, cfg);
        scene.update(&mut dev, &host, 0.1).unwrap();
        scene.render_main_frame(&mut dev, &host).unwrap();

        let draws = dev.draws();
        assert!(draws.iter().any(|d| matches!(d,
            DrawItem::LineSet {
                kind: LineSetKind::Grid { frame: GridFrame::Ecliptic, omit_equator: true },
                color,
                ..
            } if (color.z - 0.4).abs() < 1e-6)));
        assert!(draws.iter().any(|d| matches!(d,
            DrawItem::LineSet {
                kind: LineSetKind::GreatCircle { frame: GridFrame::Ecliptic },
                color,
                ..
            } if (color.z - 0.8).abs() < 1e-6)));
        assert!(draws.iter().any(|d| matches!(d,
            DrawItem::LineSet { kind: LineSetKind::ConstellationLines, color, .. }
                if (color.x - 0.4).abs() < 1e-6 && (color.y - 0.3).abs() < 1e-6)));
    }

    #[test]
    fn env_map_faces_advance_round_robin() {
        let mut host = MockHost::solar_system(2);
        let vid = host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, ship());

        let mut dev = RecordingDevice::new();
        dev.env_maps = true;
        let mut cfg = ClientConfig::default();
        cfg.custom_cameras = false;
        cfg.env_map_mode = EnvMapMode::Planets;
        cfg.env_map_faces = 2;
        let mut scene = scene_with(&mut dev, cfg);

        scene.update(&mut dev, &host, 0.1).unwrap();
        scene.render_main_frame(&mut dev, &host).unwrap();

        let base = 1000 + vid.0 as u32 * 8;
        for face in 0..2 {
            let t = TargetId(base + face);
            assert!(dev
                .events
                .iter()
                .any(|e| matches!(e, Event::SetTarget(Some(x), _) if *x == t)));
        }
        assert_eq!(scene.registry().get(vid).unwrap().env_face, 2);

        dev.events.clear();
        scene.update(&mut dev, &host, 0.1).unwrap();
        scene.render_main_frame(&mut dev, &host).unwrap();
        let t = TargetId(base + 2);
        assert!(dev
            .events
            .iter()
            .any(|e| matches!(e, Event::SetTarget(Some(x), _) if *x == t)));
        assert_eq!(scene.registry().get(vid).unwrap().env_face, 4);
    }

    #[test]
    fn custom_camera_view_renders_and_restores() {
        let mut host = MockHost::solar_system(2);
        let vid = host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, ship());
        host.focus = Some(vid);

        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());
        let cam = CustomCamera {
            vessel: vid,
            position: DVec3::new(0.0, 2.0, 10.0),
            rotation: DMat3::IDENTITY,
            aperture: 0.5,
            target: TargetId(7),
            pass_flags: SecondaryPass::all(),
            active: true,
            error: 0,
        };
        scene.setup_custom_camera(&dev, None, cam).unwrap();

        scene.update(&mut dev, &host, 0.1).unwrap();
        dev.events.clear();
        scene.render_main_frame(&mut dev, &host).unwrap();

        assert!(dev
            .events
            .iter()
            .any(|e| matches!(e, Event::SetTarget(Some(TargetId(7)), Some(TargetId(1))))));
        // camera and target bindings fully restored
        assert_eq!(scene.camera().stack_depth(), 0);
        assert!((scene.camera().aperture() - host.cam_aperture).abs() < 1e-12);
        assert_eq!(dev.render_target().0, Some(dev.back_buffer()));
    }

    #[test]
    fn secondary_pass_flags_and_omit() {
        let mut host = MockHost::solar_system(2);
        let vid = host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, ship());
        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());
        scene.update(&mut dev, &host, 0.1).unwrap();

        scene.set_omit(vid, OmitFlags::BODY);
        dev.events.clear();
        scene.render_secondary(&mut dev, SecondaryPass::all()).unwrap();
        let draws = dev.draws();
        assert!(!draws.iter().any(|d| matches!(d, DrawItem::Vessel { id } if *id == vid)));
        assert!(draws.iter().any(|d| matches!(d, DrawItem::Exhaust { id } if *id == vid)));
        assert!(draws.iter().any(|d| matches!(d, DrawItem::Planet { .. })));

        dev.events.clear();
        scene.render_secondary(&mut dev, SecondaryPass::PLANETS).unwrap();
        let draws = dev.draws();
        assert!(draws.iter().all(|d| matches!(d, DrawItem::Planet { .. } | DrawItem::PlanetDot { .. })));
        assert!(!draws.is_empty());
    }

    #[test]
    fn cockpit_pass_swaps_the_light_set() {
        let mut host = MockHost::solar_system(2);
        let mut vessel = ship();
        vessel.emitters =
            vec![emitter(LightVisibility::EXTERNAL), emitter(LightVisibility::COCKPIT)];
        let vid = host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, vessel);
        host.focus = Some(vid);
        host.internal = true;

        let mut dev = RecordingDevice::new();
        let mut cfg = ClientConfig::default();
        cfg.custom_cameras = false;
        let mut scene = scene_with(&mut dev, cfg);
        scene.update(&mut dev, &host, 0.1).unwrap();
        dev.events.clear();
        scene.render_main_frame(&mut dev, &host).unwrap();

        let light_sets: Vec<usize> = dev
            .events
            .iter()
            .filter_map(|e| match e {
                Event::SetLights(n) => Some(*n),
                _ => None,
            })
            .collect();
        // external set for the exterior passes, cockpit set for the interior
        assert_eq!(light_sets, vec![1, 1]);
        assert!(dev
            .draws()
            .iter()
            .any(|d| matches!(d, DrawItem::VesselInterior { id } if *id == vid)));
    }

    #[test]
    fn debug_overlay_runs_its_own_scene() {
        let mut host = MockHost::solar_system(2);
        host.debug = "alt 100m".into();
        let mut dev = RecordingDevice::new();
        let mut cfg = ClientConfig::default();
        cfg.custom_cameras = false;
        let mut scene = scene_with(&mut dev, cfg);
        scene.push_debug_line("frame marker".into());

        scene.update(&mut dev, &host, 0.1).unwrap();
        dev.events.clear();
        scene.render_main_frame(&mut dev, &host).unwrap();
        let begins = dev.events.iter().filter(|e| matches!(e, Event::BeginScene)).count();
        assert_eq!(begins, 3); // main, HUD, debug

        // queue drained; without host text the overlay is skipped entirely
        host.debug.clear();
        scene.update(&mut dev, &host, 0.1).unwrap();
        dev.events.clear();
        scene.render_main_frame(&mut dev, &host).unwrap();
        let begins = dev.events.iter().filter(|e| matches!(e, Event::BeginScene)).count();
        assert_eq!(begins, 2);
    }

    #[test]
    fn sky_colour_inside_a_sunlit_atmosphere() {
        let mut host = MockHost::solar_system(2);
        let planet = host.object_by_index(1).unwrap();
        host.proxy = Some(planet);
        // camera low in the atmosphere on the day side
        host.cam_pos = host.global_pos(planet) + DVec3::new(0.0, 0.0, 6.4e6);

        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());
        scene.update(&mut dev, &host, 0.1).unwrap();

        let sky = scene.sky_color();
        assert!((sky - DVec3::new(0.5, 0.7, 1.0)).length() < 1e-9);

        // in vacuum the sky stays black
        host.cam_pos = host.global_pos(planet) + DVec3::new(0.0, 0.0, 1e7);
        scene.update(&mut dev, &host, 0.1).unwrap();
        assert_eq!(scene.sky_color(), DVec3::ZERO);
    }

    #[test]
    fn planet_list_capped_and_sorted() {
        let host = MockHost::solar_system(6);
        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());
        scene.update(&mut dev, &host, 0.1).unwrap();

        let list = scene.planet_list();
        assert_eq!(list.len(), 6);
        for w in list.windows(2) {
            assert!(w[0].1 >= w[1].1);
        }
    }

    fn rig_cam(vessel: ObjectId, target: TargetId, pass_flags: SecondaryPass) -> CustomCamera {
        CustomCamera {
            vessel,
            position: DVec3::new(0.0, 2.0, 10.0),
            rotation: DMat3::IDENTITY,
            aperture: 0.5,
            target,
            pass_flags,
            active: true,
            error: 0,
        }
    }

    #[test]
    fn custom_camera_without_depth_is_skipped_with_sticky_error() {
        let mut host = MockHost::solar_system(2);
        let vid = host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, ship());
        host.focus = Some(vid);

        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());
        let id = scene
            .setup_custom_camera(&dev, None, rig_cam(vid, TargetId(7), SecondaryPass::all()))
            .unwrap();
        scene.update(&mut dev, &host, 0.1).unwrap();

        // depth buffer vanishes between setup and render
        dev.no_depth_for = Some(TargetId(7));
        dev.events.clear();
        scene.render_custom_camera_view(&mut dev, &host, id).unwrap();
        assert!(dev.events.is_empty());

        // the error sticks; later turns skip the camera without probing it
        dev.no_depth_for = None;
        scene.render_custom_camera_view(&mut dev, &host, id).unwrap();
        assert!(dev.events.is_empty());

        assert_eq!(scene.delete_custom_camera(id), -2);
    }

    #[test]
    fn custom_camera_honours_its_pass_flags() {
        let mut host = MockHost::solar_system(2);
        let vid = host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, ship());
        host.focus = Some(vid);

        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());
        let id = scene
            .setup_custom_camera(&dev, None, rig_cam(vid, TargetId(7), SecondaryPass::PLANETS))
            .unwrap();
        scene.update(&mut dev, &host, 0.1).unwrap();

        dev.events.clear();
        scene.render_custom_camera_view(&mut dev, &host, id).unwrap();
        let draws = dev.draws();
        assert!(!draws.is_empty());
        assert!(draws
            .iter()
            .all(|d| matches!(d, DrawItem::Planet { .. } | DrawItem::PlanetDot { .. })));
    }

    #[test]
    fn sky_colour_is_clamped_per_channel() {
        let mut host = MockHost::solar_system(2);
        let planet = host.object_by_index(1).unwrap();
        host.proxy = Some(planet);
        host.atm_color0 = DVec3::new(3.0, 3.0, 3.0);
        host.cam_pos = host.global_pos(planet) + DVec3::new(0.0, 0.0, 6.4e6);

        let mut dev = RecordingDevice::new();
        let mut scene = scene_with(&mut dev, ClientConfig::default());
        scene.update(&mut dev, &host, 0.1).unwrap();

        assert!((scene.sky_color() - DVec3::ONE).length() < 1e-12);
    }

    #[test]
    fn debug_lines_get_background_boxes() {
        let mut host = MockHost::solar_system(2);
        host.debug = "alt 100m".into();
        let mut dev = RecordingDevice::new();
        let mut cfg = ClientConfig::default();
        cfg.custom_cameras = false;
        let mut scene = scene_with(&mut dev, cfg);
        scene.push_debug_line("frame marker".into());

        scene.update(&mut dev, &host, 0.1).unwrap();
        scene.render_main_frame(&mut dev, &host).unwrap();
        assert_eq!(dev.pad.texts, 2);
        assert_eq!(dev.pad.rects, 2);
    }

    #[test]
    fn paused_sim_skips_env_map_regeneration() {
        let mut host = MockHost::solar_system(2);
        let vid = host.add_vessel("ship", DVec3::new(0.0, 0.0, 500.0), 10.0, ship());
        host.paused = true;

        let mut dev = RecordingDevice::new();
        dev.env_maps = true;
        let mut cfg = ClientConfig::default();
        cfg.custom_cameras = false;
        cfg.env_map_mode = EnvMapMode::Planets;
        let mut scene = scene_with(&mut dev, cfg);

        scene.update(&mut dev, &host, 0.1).unwrap();
        scene.render_main_frame(&mut dev, &host).unwrap();
        assert_eq!(scene.registry().get(vid).unwrap().env_face, 0);

        host.paused = false;
        scene.update(&mut dev, &host, 0.1).unwrap();
        scene.render_main_frame(&mut dev, &host).unwrap();
        assert_eq!(scene.registry().get(vid).unwrap().env_face, 1);
    }
}
