//! The device trait: everything the scene asks of a rendering backend.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};
use scene_core::{CoordAxesFlags, ForceVectorFlags, LightKind, ObjectId};

use crate::error::GfxError;
use crate::sketchpad::{PadId, Sketchpad};
use crate::target::TargetId;

bitflags! {
    /// Surfaces affected by a clear call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        const TARGET  = 0x1;
        const DEPTH   = 0x2;
        const STENCIL = 0x4;
    }
}

impl ClearFlags {
    pub fn all_surfaces() -> Self {
        ClearFlags::TARGET | ClearFlags::DEPTH | ClearFlags::STENCIL
    }
}

/// One background star, position on the unit sphere.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct StarVertex {
    pub pos: [f32; 3],
    pub color: [f32; 3],
}

/// Reference frame of a celestial line set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFrame {
    Ecliptic,
    Celestial,
}

/// Celestial-sphere line geometry selectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSetKind {
    /// Longitude/latitude grid; the equator circle may be omitted when it is
    /// drawn separately at full brightness.
    Grid { frame: GridFrame, omit_equator: bool },
    /// The frame's equatorial great circle.
    GreatCircle { frame: GridFrame },
    ConstellationLines,
}

/// One member of the frame's local light set, camera-relative global frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderLight {
    pub kind: LightKind,
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    /// Attenuation coefficients (constant, linear, quadratic).
    pub attenuation: [f32; 3],
    pub range: f32,
    /// Spotlight cone angles (inner, outer) [rad].
    pub cone: (f32, f32),
}

/// Screen-space state of the sun, input to the lens-flare composite.
#[derive(Debug, Clone, Copy)]
pub struct SunVisualState {
    pub visible: bool,
    /// Normalised screen position (centre-origin).
    pub screen_pos: Vec2,
    pub color: Vec4,
    pub brightness: f32,
    /// Apparent size factor.
    pub size: f32,
    /// Whether the camera is in cockpit view (changes ghosting layout).
    pub cockpit: bool,
}

/// Post-processing chain invocation, writing into the swap target.
#[derive(Debug, Clone, Copy)]
pub enum PostProcessPass {
    /// Bright-light blur composite reading the offscreen scene target.
    LightBlur { source: TargetId },
    /// Lens flare composite over the swap target.
    LensFlare { sun: SunVisualState },
}

/// One draw submission. The backend resolves object ids to the meshes and
/// shading state it registered for them.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    /// Background sphere image, depth test off, winding reversed.
    /// `dim_level` suppresses stars darker than the sky (0..=255).
    SkyBackground { dim_level: u32 },
    /// The `count` brightest records of the uploaded star table.
    Stars { count: usize },
    LineSet { kind: LineSetKind, color: Vec4, transform: Mat4 },
    Planet { id: ObjectId },
    /// Point approximation of an inactive planet/star.
    PlanetDot { id: ObjectId },
    Vessel { id: ObjectId },
    /// Internal (cockpit) geometry of the focus vessel.
    VesselInterior { id: ObjectId },
    Exhaust { id: ObjectId },
    Beacons { id: ObjectId },
    GrapplePoints { id: ObjectId },
    /// Vessel shadow projected onto the planet surface.
    GroundShadow { planet: ObjectId, vessel: ObjectId },
    /// Shadows of the active particle streams on the planet surface.
    ParticleShadows { planet: ObjectId },
    Axes { id: ObjectId, forces: ForceVectorFlags, axes: CoordAxesFlags },
    ParticleStream { index: usize },
}

/// Backend device driven by the frame compositor.
///
/// All failure modes that matter to the scene are expressed here: a refused
/// begin drops the frame, a failed visual (un)registration poisons the
/// object's host/backend binding.
pub trait Device {
    // --- frame lifecycle ----------------------------------------------------
    fn begin_scene(&mut self) -> Result<(), GfxError>;
    fn end_scene(&mut self);
    fn clear(&mut self, flags: ClearFlags, color: [f32; 4]);

    // --- render targets -----------------------------------------------------
    /// The swap-chain target presented to the screen.
    fn back_buffer(&self) -> TargetId;
    fn render_target(&self) -> (Option<TargetId>, Option<TargetId>);
    fn set_render_target(&mut self, color: Option<TargetId>, depth: Option<TargetId>);
    fn create_offscreen_target(&mut self, width: u32, height: u32)
        -> Result<TargetId, GfxError>;
    fn surface_size(&self, target: TargetId) -> (u32, u32);
    /// Whether a surface supports being bound as a render destination.
    fn is_render_target(&self, target: TargetId) -> bool;
    /// The depth-stencil surface paired with a colour surface, if any.
    fn depth_stencil_of(&self, target: TargetId) -> Option<TargetId>;
    /// Render target for one face of a vessel's environment map, allocated on
    /// first use. `None` when the backend has no env-map support.
    fn env_face_target(&mut self, vessel: ObjectId, face: u32) -> Option<TargetId>;

    // --- capabilities -------------------------------------------------------
    /// Hardware limit on simultaneously active local lights.
    fn max_lights(&self) -> usize;

    // --- visual binding -----------------------------------------------------
    fn register_visual(&mut self, id: ObjectId) -> Result<(), GfxError>;
    fn unregister_visual(&mut self, id: ObjectId) -> Result<(), GfxError>;

    // --- static data --------------------------------------------------------
    fn upload_stars(&mut self, stars: &[StarVertex]);
    fn upload_constellation_lines(&mut self, verts: &[Vec3]);

    // --- per-pass state -----------------------------------------------------
    fn set_view_proj(&mut self, view_proj: Mat4);
    /// Replace the active local light set for the following draws.
    fn set_local_lights(&mut self, lights: &[RenderLight]);

    // --- submission ---------------------------------------------------------
    fn draw(&mut self, item: DrawItem);
    fn run_post_process(&mut self, pass: PostProcessPass) -> Result<(), GfxError>;

    // --- 2D overlay ---------------------------------------------------------
    /// Pooled sketchpad instance. The three ids map to fixed contexts created
    /// lazily by the backend.
    fn pad(&mut self, id: PadId) -> &mut dyn Sketchpad;
}
