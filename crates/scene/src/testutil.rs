//! Shared mocks for unit tests: a scriptable host and a recording device.

use std::collections::HashMap;

use glam::{DMat3, DVec3, Mat4, Vec3};
use gfx::{
    ClearFlags, Device, DrawItem, FontId, GfxError, PadId, PostProcessPass, RenderLight, Sketchpad,
    StarVertex, TargetId, TextAlignH, TextAlignV,
};
use scene_core::{
    AtmConstants, AtmParams, LightEmitter, MarkerList, MarkerSpec, ObjectId, ObjectKind, SimHost,
    VesselApi,
};

/// Everything the device was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BeginScene,
    EndScene,
    Clear(ClearFlags),
    SetTarget(Option<TargetId>, Option<TargetId>),
    Draw(DrawItem),
    SetLights(usize),
    PostProcess(&'static str),
    RegisterVisual(ObjectId),
    UnregisterVisual(ObjectId),
}

/// Sketchpad that tallies primitives instead of drawing them.
#[derive(Default)]
pub struct CountingPad {
    pub texts: usize,
    pub rects: usize,
}

impl Sketchpad for CountingPad {
    fn set_font(&mut self, _font: FontId) {}
    fn set_text_align(&mut self, _horizontal: TextAlignH, _vertical: TextAlignV) {}
    fn set_text_color(&mut self, _color: u32) {}
    fn set_pen_color(&mut self, _color: u32) {}
    fn rectangle(&mut self, _x1: i32, _y1: i32, _x2: i32, _y2: i32) {
        self.rects += 1;
    }
    fn ellipse(&mut self, _x1: i32, _y1: i32, _x2: i32, _y2: i32) {}
    fn move_to(&mut self, _x: i32, _y: i32) {}
    fn line_to(&mut self, _x: i32, _y: i32) {}
    fn text(&mut self, _x: i32, _y: i32, _text: &str) {
        self.texts += 1;
    }
    fn text_width(&self, text: &str) -> u32 {
        text.len() as u32 * 8
    }
    fn flush(&mut self) {}
}

pub struct RecordingDevice {
    pub events: Vec<Event>,
    pub fail_begin: bool,
    pub max_lights: usize,
    pub env_maps: bool,
    /// Target that pretends to have lost its depth buffer.
    pub no_depth_for: Option<TargetId>,
    pub pad: CountingPad,
    target: (Option<TargetId>, Option<TargetId>),
    next_target: u32,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            fail_begin: false,
            max_lights: 8,
            env_maps: false,
            no_depth_for: None,
            pad: CountingPad::default(),
            target: (Some(TargetId(0)), Some(TargetId(1))),
            next_target: 100,
        }
    }

    pub fn draws(&self) -> Vec<&DrawItem> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Draw(item) => Some(item),
                _ => None,
            })
            .collect()
    }
}

impl Device for RecordingDevice {
    fn begin_scene(&mut self) -> Result<(), GfxError> {
        if self.fail_begin {
            return Err(GfxError::BeginSceneFailed);
        }
        self.events.push(Event::BeginScene);
        Ok(())
    }
    fn end_scene(&mut self) {
        self.events.push(Event::EndScene);
    }
    fn clear(&mut self, flags: ClearFlags, _color: [f32; 4]) {
        self.events.push(Event::Clear(flags));
    }
    fn back_buffer(&self) -> TargetId {
        TargetId(0)
    }
    fn render_target(&self) -> (Option<TargetId>, Option<TargetId>) {
        self.target
    }
    fn set_render_target(&mut self, color: Option<TargetId>, depth: Option<TargetId>) {
        self.target = (color, depth);
        self.events.push(Event::SetTarget(color, depth));
    }
    fn create_offscreen_target(&mut self, _w: u32, _h: u32) -> Result<TargetId, GfxError> {
        self.next_target += 1;
        Ok(TargetId(self.next_target))
    }
    fn surface_size(&self, _target: TargetId) -> (u32, u32) {
        (800, 600)
    }
    fn is_render_target(&self, target: TargetId) -> bool {
        target.0 != u32::MAX
    }
    fn depth_stencil_of(&self, target: TargetId) -> Option<TargetId> {
        if self.no_depth_for == Some(target) {
            return None;
        }
        Some(TargetId(1))
    }
    fn env_face_target(&mut self, vessel: ObjectId, face: u32) -> Option<TargetId> {
        self.env_maps.then(|| TargetId(1000 + vessel.0 as u32 * 8 + face))
    }
    fn max_lights(&self) -> usize {
        self.max_lights
    }
    fn register_visual(&mut self, id: ObjectId) -> Result<(), GfxError> {
        self.events.push(Event::RegisterVisual(id));
        Ok(())
    }
    fn unregister_visual(&mut self, id: ObjectId) -> Result<(), GfxError> {
        self.events.push(Event::UnregisterVisual(id));
        Ok(())
    }
    fn upload_stars(&mut self, _stars: &[StarVertex]) {}
    fn upload_constellation_lines(&mut self, _verts: &[Vec3]) {}
    fn set_view_proj(&mut self, _view_proj: Mat4) {}
    fn set_local_lights(&mut self, lights: &[RenderLight]) {
        self.events.push(Event::SetLights(lights.len()));
    }
    fn draw(&mut self, item: DrawItem) {
        self.events.push(Event::Draw(item));
    }
    fn run_post_process(&mut self, pass: PostProcessPass) -> Result<(), GfxError> {
        self.events.push(Event::PostProcess(match pass {
            PostProcessPass::LightBlur { .. } => "light_blur",
            PostProcessPass::LensFlare { .. } => "lens_flare",
        }));
        Ok(())
    }
    fn pad(&mut self, _id: PadId) -> &mut dyn Sketchpad {
        &mut self.pad
    }
}

pub struct MockVessel {
    pub altitude: f64,
    pub elevation: f64,
    pub rot: DMat3,
    pub gpos: DVec3,
    pub external_pass: bool,
    pub emitters: Vec<LightEmitter>,
}

impl Default for MockVessel {
    fn default() -> Self {
        Self {
            altitude: 1e5,
            elevation: 0.0,
            rot: DMat3::IDENTITY,
            gpos: DVec3::ZERO,
            external_pass: false,
            emitters: Vec::new(),
        }
    }
}

impl VesselApi for MockVessel {
    fn altitude(&self) -> f64 {
        self.altitude
    }
    fn surface_elevation(&self) -> f64 {
        self.elevation
    }
    fn rotation_matrix(&self) -> DMat3 {
        self.rot
    }
    fn local_to_global(&self, local: DVec3) -> DVec3 {
        self.gpos + self.rot * local
    }
    fn has_external_pass(&self) -> bool {
        self.external_pass
    }
    fn light_emitters(&self) -> &[LightEmitter] {
        &self.emitters
    }
}

struct Obj {
    id: ObjectId,
    kind: ObjectKind,
    name: String,
    pos: DVec3,
    size: f64,
}

/// Scriptable host simulation.
pub struct MockHost {
    objects: Vec<Obj>,
    vessels: HashMap<ObjectId, MockVessel>,
    pub cam_pos: DVec3,
    pub cam_dir: DVec3,
    pub cam_rot: DMat3,
    pub cam_aperture: f64,
    pub internal: bool,
    pub focus: Option<ObjectId>,
    pub proxy: Option<ObjectId>,
    pub paused: bool,
    pub atm_color0: DVec3,
    pub debug: String,
    pub surface_marker_lists: Vec<MarkerList>,
    pub celestial_marker_lists: Vec<MarkerList>,
    next_id: u64,
}

impl MockHost {
    pub fn empty() -> Self {
        Self {
            objects: Vec::new(),
            vessels: HashMap::new(),
            cam_pos: DVec3::ZERO,
            cam_dir: DVec3::Z,
            cam_rot: DMat3::IDENTITY,
            cam_aperture: 20f64.to_radians(),
            internal: false,
            focus: None,
            proxy: None,
            paused: false,
            atm_color0: DVec3::new(0.5, 0.7, 1.0),
            debug: String::new(),
            surface_marker_lists: Vec::new(),
            celestial_marker_lists: Vec::new(),
            next_id: 1,
        }
    }

    /// One planet at 10 000 km down the view axis.
    pub fn single_planet() -> Self {
        let mut host = Self::empty();
        host.add_object(ObjectKind::Planet, "planet", DVec3::new(0.0, 0.0, 1e7), 6.371e6);
        host
    }

    /// A star at index 0 plus `n - 1` planets along the view axis.
    pub fn solar_system(n: usize) -> Self {
        let mut host = Self::empty();
        host.add_object(ObjectKind::Star, "sun", DVec3::new(0.0, 0.0, 1.5e11), 6.96e8);
        for i in 1..n {
            host.add_object(
                ObjectKind::Planet,
                &format!("planet{i}"),
                DVec3::new(0.0, 0.0, 1e7 * (i as f64 + 1.0)),
                6.371e6,
            );
        }
        host.proxy = host.object_by_index(1).or_else(|| host.object_by_index(0));
        host
    }

    pub fn add_object(&mut self, kind: ObjectKind, name: &str, pos: DVec3, size: f64) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(Obj { id, kind, name: name.into(), pos, size });
        id
    }

    pub fn add_vessel(&mut self, name: &str, pos: DVec3, size: f64, vessel: MockVessel) -> ObjectId {
        let id = self.add_object(ObjectKind::Vessel, name, pos, size);
        let mut vessel = vessel;
        vessel.gpos = pos;
        self.vessels.insert(id, vessel);
        id
    }

    pub fn vessel_mut(&mut self, id: ObjectId) -> &mut MockVessel {
        self.vessels.get_mut(&id).unwrap()
    }

    pub fn set_pos(&mut self, id: ObjectId, pos: DVec3) {
        if let Some(o) = self.objects.iter_mut().find(|o| o.id == id) {
            o.pos = pos;
        }
        if let Some(v) = self.vessels.get_mut(&id) {
            v.gpos = pos;
        }
    }

    pub fn set_kind(&mut self, id: ObjectId, kind: ObjectKind) {
        if let Some(o) = self.objects.iter_mut().find(|o| o.id == id) {
            o.kind = kind;
        }
    }

    pub fn remove_object(&mut self, id: ObjectId) {
        self.objects.retain(|o| o.id != id);
        self.vessels.remove(&id);
    }

    fn obj(&self, id: ObjectId) -> Option<&Obj> {
        self.objects.iter().find(|o| o.id == id)
    }
}

impl SimHost for MockHost {
    fn object_count(&self) -> usize {
        self.objects.len()
    }
    fn object_by_index(&self, index: usize) -> Option<ObjectId> {
        self.objects.get(index).map(|o| o.id)
    }
    fn object_kind(&self, id: ObjectId) -> Option<ObjectKind> {
        self.obj(id).map(|o| o.kind)
    }
    fn object_name(&self, id: ObjectId) -> String {
        self.obj(id).map(|o| o.name.clone()).unwrap_or_default()
    }
    fn global_pos(&self, id: ObjectId) -> DVec3 {
        self.obj(id).map(|o| o.pos).unwrap_or(DVec3::ZERO)
    }
    fn size(&self, id: ObjectId) -> f64 {
        self.obj(id).map(|o| o.size).unwrap_or(0.0)
    }
    fn rotation_matrix(&self, _id: ObjectId) -> DMat3 {
        DMat3::IDENTITY
    }
    fn camera_target(&self) -> Option<ObjectId> {
        self.focus
    }
    fn camera_proxy_body(&self) -> Option<ObjectId> {
        self.proxy
    }
    fn camera_global_pos(&self) -> DVec3 {
        self.cam_pos
    }
    fn camera_global_dir(&self) -> DVec3 {
        self.cam_dir
    }
    fn camera_rotation(&self) -> DMat3 {
        self.cam_rot
    }
    fn camera_aperture(&self) -> f64 {
        self.cam_aperture
    }
    fn camera_internal(&self) -> bool {
        self.internal
    }
    fn focus_object(&self) -> Option<ObjectId> {
        self.focus
    }
    fn is_paused(&self) -> bool {
        self.paused
    }
    fn vessel(&self, id: ObjectId) -> Option<&dyn VesselApi> {
        self.vessels.get(&id).map(|v| v as &dyn VesselApi)
    }
    fn atm_constants(&self, id: ObjectId) -> Option<AtmConstants> {
        let o = self.obj(id)?;
        (o.kind == ObjectKind::Planet).then(|| AtmConstants {
            rad_limit: o.size * 1.02,
            rho0: 1.225,
            p0: 101_325.0,
            color0: self.atm_color0,
        })
    }
    fn atm_params(&self, id: ObjectId, dist: f64) -> Option<AtmParams> {
        let c = self.atm_constants(id)?;
        (dist < c.rad_limit).then_some(AtmParams { rho: c.rho0 })
    }
    fn base_count(&self, _planet: ObjectId) -> usize {
        0
    }
    fn base_by_index(&self, _planet: ObjectId, _index: usize) -> Option<ObjectId> {
        None
    }
    fn surface_markers(&self, _planet: ObjectId) -> &[MarkerList] {
        &self.surface_marker_lists
    }
    fn celestial_markers(&self) -> &[MarkerList] {
        &self.celestial_marker_lists
    }
    fn constellation_markers(&self) -> &[MarkerSpec] {
        &[]
    }
    fn debug_string(&self) -> String {
        self.debug.clone()
    }
}
