//! Client configuration and render-mode bitflags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Planetarium overlay mode selection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PlanetariumFlags: u32 {
        const ENABLE            = 0x0001;
        const ECL_GRID          = 0x0002;
        const ECLIPTIC          = 0x0004;
        const CEL_GRID          = 0x0008;
        const CEL_EQUATOR       = 0x0010;
        const CONST_LINES       = 0x0020;
        const CONST_LABELS      = 0x0040;
        /// Use full constellation names instead of abbreviations.
        const CONST_FULL_NAMES  = 0x0080;
        const CELESTIAL_MARKERS = 0x0100;
        const OBJECT_MARKERS    = 0x0200;
        const SURFACE_MARKERS   = 0x0400;
        const BASE_MARKERS      = 0x0800;
        const VESSEL_MARKERS    = 0x1000;
    }
}

bitflags! {
    /// Body force vector overlay selection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ForceVectorFlags: u32 {
        const ENABLE = 0x01;
        const WEIGHT = 0x02;
        const THRUST = 0x04;
        const LIFT   = 0x08;
        const DRAG   = 0x10;
        const TOTAL  = 0x20;
    }
}

bitflags! {
    /// Coordinate axis overlay selection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CoordAxesFlags: u32 {
        const ENABLE   = 0x01;
        const VESSEL   = 0x02;
        const BASE     = 0x04;
        const NEGATIVE = 0x08;
    }
}

/// Post-processing chain executed after the main scene pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PostProcessMode {
    #[default]
    None,
    /// Multi-pass bright-light blur composite.
    LightBlur,
    /// Lens flare composite driven by the sun's screen-space state.
    LensFlare,
}

/// Environment-map generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnvMapMode {
    #[default]
    Disabled,
    /// Planet reflections only.
    Planets,
    /// Planets and nearby vessels.
    Full,
}

/// Near-plane floor used for the external camera when close to the ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NearClipPolicy {
    /// Floor at 1.0 m; safe for large depth ranges.
    #[default]
    Conservative,
    /// Floor at 0.1 m; tighter but less depth headroom.
    Tight,
}

impl NearClipPolicy {
    pub fn internal_floor(self) -> f32 {
        match self {
            NearClipPolicy::Conservative => 1.0,
            NearClipPolicy::Tight => 0.1,
        }
    }
}

/// Star brightness mapping parameters for the background star field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StarRenderParams {
    /// Apparent magnitude rendered at full brightness.
    pub mag_hi: f64,
    /// Faintest apparent magnitude rendered at all.
    pub mag_lo: f64,
    /// Brightness assigned to stars at `mag_lo`.
    pub brt_min: f64,
    /// Logarithmic (true) or linear (false) magnitude-to-brightness mapping.
    pub map_log: bool,
}

impl Default for StarRenderParams {
    fn default() -> Self {
        Self { mag_hi: 0.0, mag_lo: 6.5, brt_min: 0.01, map_log: true }
    }
}

/// Configuration parameters consumed from the host at scene creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Ambient light level, 0..=255.
    pub ambient_level: u32,
    /// Enable the dynamic local light set.
    pub local_lights: bool,
    pub planetarium: PlanetariumFlags,
    pub force_vectors: ForceVectorFlags,
    pub coord_axes: CoordAxesFlags,
    pub post_process: PostProcessMode,
    /// Enable custom (vessel-mounted) camera views.
    pub custom_cameras: bool,
    pub env_map_mode: EnvMapMode,
    /// Environment-map faces rendered per generation step, 1..=6.
    pub env_map_faces: u32,
    pub near_clip: NearClipPolicy,
    /// Near plane for the cockpit interior pass [m]; clamped to [0.01, 1.0].
    pub cockpit_near_plane: f64,
    /// Registry visibility checks performed per frame after the initial full
    /// sweep. Bounds activation staleness at object_count / this value frames.
    pub visibility_checks_per_frame: usize,
    pub stars: StarRenderParams,
    /// Line height of the debug overlay text [px].
    pub debug_line_height: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ambient_level: 10,
            local_lights: true,
            planetarium: PlanetariumFlags::empty(),
            force_vectors: ForceVectorFlags::empty(),
            coord_axes: CoordAxesFlags::empty(),
            post_process: PostProcessMode::None,
            custom_cameras: true,
            env_map_mode: EnvMapMode::Disabled,
            env_map_faces: 1,
            near_clip: NearClipPolicy::Conservative,
            cockpit_near_plane: 0.1,
            visibility_checks_per_frame: 1,
            stars: StarRenderParams::default(),
            debug_line_height: 18,
        }
    }
}
