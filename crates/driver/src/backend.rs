//! Headless rendering backend: tallies every request the scene makes and
//! renders nothing.

use std::collections::HashMap;

use gfx::{
    ClearFlags, Device, DrawItem, FontId, GfxError, PadId, PostProcessPass, RenderLight,
    Sketchpad, StarVertex, TargetId, TextAlignH, TextAlignV,
};
use glam::{Mat4, Vec3};
use scene_core::ObjectId;

pub struct HeadlessDevice {
    width: u32,
    height: u32,
    bound: (Option<TargetId>, Option<TargetId>),
    next_target: u32,
    stars_uploaded: usize,
    begins: u64,
    clears: u64,
    light_sets: u64,
    post_passes: u64,
    draw_tally: HashMap<&'static str, u64>,
    pad: TallyPad,
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bound: (Some(TargetId(0)), Some(TargetId(1))),
            next_target: 8,
            stars_uploaded: 0,
            begins: 0,
            clears: 0,
            light_sets: 0,
            post_passes: 0,
            draw_tally: HashMap::new(),
            pad: TallyPad::default(),
        }
    }

    fn tally(&mut self, kind: &'static str) {
        *self.draw_tally.entry(kind).or_insert(0) += 1;
    }

    pub fn log_summary(&self) {
        log::info!(
            "device totals: {} scene begins, {} clears, {} light sets, {} post passes",
            self.begins,
            self.clears,
            self.light_sets,
            self.post_passes
        );
        log::info!(
            "overlay totals: {} text runs, {} shape primitives",
            self.pad.texts,
            self.pad.shapes
        );
        let mut kinds: Vec<(&&str, &u64)> = self.draw_tally.iter().collect();
        kinds.sort();
        for (kind, count) in kinds {
            log::info!("  draw {kind}: {count}");
        }
    }
}

impl Device for HeadlessDevice {
    fn begin_scene(&mut self) -> Result<(), GfxError> {
        self.begins += 1;
        Ok(())
    }

    fn end_scene(&mut self) {}

    fn clear(&mut self, _flags: ClearFlags, _color: [f32; 4]) {
        self.clears += 1;
    }

    fn back_buffer(&self) -> TargetId {
        TargetId(0)
    }

    fn render_target(&self) -> (Option<TargetId>, Option<TargetId>) {
        self.bound
    }

    fn set_render_target(&mut self, color: Option<TargetId>, depth: Option<TargetId>) {
        self.bound = (color, depth);
    }

    fn create_offscreen_target(&mut self, width: u32, height: u32) -> Result<TargetId, GfxError> {
        self.next_target += 1;
        log::debug!("offscreen target {} created ({width}x{height})", self.next_target);
        Ok(TargetId(self.next_target))
    }

    fn surface_size(&self, _target: TargetId) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_render_target(&self, _target: TargetId) -> bool {
        true
    }

    fn depth_stencil_of(&self, _target: TargetId) -> Option<TargetId> {
        Some(TargetId(1))
    }

    fn env_face_target(&mut self, vessel: ObjectId, face: u32) -> Option<TargetId> {
        Some(TargetId(0x8000_0000 | ((vessel.0 as u32) << 3) | face))
    }

    fn max_lights(&self) -> usize {
        8
    }

    fn register_visual(&mut self, id: ObjectId) -> Result<(), GfxError> {
        log::debug!("visual registered for {id:?}");
        Ok(())
    }

    fn unregister_visual(&mut self, id: ObjectId) -> Result<(), GfxError> {
        log::debug!("visual unregistered for {id:?}");
        Ok(())
    }

    fn upload_stars(&mut self, stars: &[StarVertex]) {
        self.stars_uploaded = stars.len();
        log::info!("{} star vertices uploaded", stars.len());
    }

    fn upload_constellation_lines(&mut self, verts: &[Vec3]) {
        log::info!("{} constellation line vertices uploaded", verts.len());
    }

    fn set_view_proj(&mut self, _view_proj: Mat4) {}

    fn set_local_lights(&mut self, lights: &[RenderLight]) {
        if !lights.is_empty() {
            self.light_sets += 1;
        }
    }

    fn draw(&mut self, item: DrawItem) {
        let kind = match item {
            DrawItem::SkyBackground { .. } => "sky",
            DrawItem::Stars { .. } => "stars",
            DrawItem::LineSet { .. } => "line_set",
            DrawItem::Planet { .. } => "planet",
            DrawItem::PlanetDot { .. } => "planet_dot",
            DrawItem::Vessel { .. } => "vessel",
            DrawItem::VesselInterior { .. } => "vessel_interior",
            DrawItem::Exhaust { .. } => "exhaust",
            DrawItem::Beacons { .. } => "beacons",
            DrawItem::GrapplePoints { .. } => "grapple_points",
            DrawItem::GroundShadow { .. } => "ground_shadow",
            DrawItem::ParticleShadows { .. } => "particle_shadows",
            DrawItem::Axes { .. } => "axes",
            DrawItem::ParticleStream { .. } => "particle_stream",
        };
        self.tally(kind);
    }

    fn run_post_process(&mut self, _pass: PostProcessPass) -> Result<(), GfxError> {
        self.post_passes += 1;
        Ok(())
    }

    fn pad(&mut self, _id: PadId) -> &mut dyn Sketchpad {
        &mut self.pad
    }
}

/// Sketchpad that counts primitives instead of drawing them.
#[derive(Default)]
struct TallyPad {
    texts: u64,
    shapes: u64,
}

impl Sketchpad for TallyPad {
    fn set_font(&mut self, _font: FontId) {}
    fn set_text_align(&mut self, _horizontal: TextAlignH, _vertical: TextAlignV) {}
    fn set_text_color(&mut self, _color: u32) {}
    fn set_pen_color(&mut self, _color: u32) {}
    fn rectangle(&mut self, _x1: i32, _y1: i32, _x2: i32, _y2: i32) {
        self.shapes += 1;
    }
    fn ellipse(&mut self, _x1: i32, _y1: i32, _x2: i32, _y2: i32) {
        self.shapes += 1;
    }
    fn move_to(&mut self, _x: i32, _y: i32) {}
    fn line_to(&mut self, _x: i32, _y: i32) {
        self.shapes += 1;
    }
    fn text(&mut self, _x: i32, _y: i32, _text: &str) {
        self.texts += 1;
    }
    fn text_width(&self, text: &str) -> u32 {
        text.len() as u32 * 8
    }
    fn flush(&mut self) {}
}
