//! Read-only interface to the host simulation.
//!
//! The scene never owns simulation state. Everything it knows about the
//! simulated universe (object positions, vessel state, camera placement,
//! atmospheres) is queried through these traits once per use, per frame.

use bitflags::bitflags;
use glam::{DMat3, DVec3};

use crate::handle::{ObjectId, ObjectKind};

/// Atmosphere constants of a planetary body (time-invariant).
#[derive(Debug, Clone, Copy)]
pub struct AtmConstants {
    /// Distance from the body centre beyond which the atmosphere is ignored [m].
    pub rad_limit: f64,
    /// Sea-level atmospheric density [kg/m^3].
    pub rho0: f64,
    /// Sea-level pressure [Pa].
    pub p0: f64,
    /// Sky colour at full daylight intensity (RGB, 0..1).
    pub color0: DVec3,
}

/// Atmosphere parameters sampled at a given distance from the body centre.
#[derive(Debug, Clone, Copy)]
pub struct AtmParams {
    /// Local atmospheric density [kg/m^3].
    pub rho: f64,
}

bitflags! {
    /// Where a vessel light emitter is visible from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LightVisibility: u32 {
        const EXTERNAL = 0x1;
        const COCKPIT  = 0x2;
    }
}

/// Kind of a local light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Spot,
}

/// Descriptor of one vessel-attached light emitter, in vessel-local frame.
#[derive(Debug, Clone)]
pub struct LightEmitter {
    pub kind: LightKind,
    pub active: bool,
    /// Emitter intensity; zero-intensity emitters never enter the light set.
    pub intensity: f64,
    pub visibility: LightVisibility,
    /// Position in the vessel-local frame [m].
    pub position: DVec3,
    /// Direction in the vessel-local frame (spotlights).
    pub direction: DVec3,
    /// Diffuse colour (RGB, 0..1).
    pub color: DVec3,
    /// Attenuation coefficients (constant, linear, quadratic).
    pub attenuation: [f64; 3],
    /// Maximum range [m].
    pub range: f64,
    /// Spotlight cone angles (inner, outer) [rad]; ignored for point lights.
    pub cone: (f64, f64),
}

/// Per-vessel state queried from the host.
pub trait VesselApi {
    /// Altitude above the mean surface [m].
    fn altitude(&self) -> f64;
    /// Terrain elevation under the vessel relative to the mean surface [m].
    fn surface_elevation(&self) -> f64;
    /// Vessel rotation matrix (local -> global).
    fn rotation_matrix(&self) -> DMat3;
    /// Transform a vessel-local point to a global position.
    fn local_to_global(&self, local: DVec3) -> DVec3;
    /// Whether the vessel mesh has geometry rendered in external passes while
    /// the camera is inside its cockpit.
    fn has_external_pass(&self) -> bool;
    /// Light emitters attached to this vessel.
    fn light_emitters(&self) -> &[LightEmitter];
}

/// Shape of a 2D marker drawn by the overlay passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Box,
    Circle,
    Diamond,
    Delta,
    Nabla,
    Crosshair,
    RotatedCrosshair,
}

/// One labelled marker position. Positions are either global directions
/// (celestial markers) or planet-local surface points (surface markers).
#[derive(Debug, Clone)]
pub struct MarkerSpec {
    pub pos: DVec3,
    /// Long and short label variants.
    pub label: [String; 2],
}

/// A host-provided list of markers sharing colour, shape and scale.
#[derive(Debug, Clone)]
pub struct MarkerList {
    pub active: bool,
    /// Colour index into the scene's label palette.
    pub colour: usize,
    pub shape: MarkerShape,
    /// Size factor relative to the default marker size.
    pub size: f64,
    /// Apparent-radius multiplier gating label visibility with distance.
    pub dist_factor: f64,
    pub markers: Vec<MarkerSpec>,
}

/// Read-only view of the host simulation, queried per frame.
///
/// Lookup helpers return `None`/neutral values instead of failing; the scene
/// treats a missing object as "nothing to render" and moves on.
pub trait SimHost {
    // --- object enumeration -------------------------------------------------
    fn object_count(&self) -> usize;
    fn object_by_index(&self, index: usize) -> Option<ObjectId>;
    fn object_kind(&self, id: ObjectId) -> Option<ObjectKind>;
    fn object_name(&self, id: ObjectId) -> String;
    /// Global position [m]. Zero vector if the object is unknown.
    fn global_pos(&self, id: ObjectId) -> DVec3;
    /// Mean radius [m]. Zero if the object is unknown.
    fn size(&self, id: ObjectId) -> f64;
    /// Rotation matrix (local -> global). Identity if unknown.
    fn rotation_matrix(&self, id: ObjectId) -> DMat3;

    /// The central star, by convention the body at index 0.
    fn central_star(&self) -> Option<ObjectId> {
        self.object_by_index(0)
    }

    // --- camera -------------------------------------------------------------
    fn camera_target(&self) -> Option<ObjectId>;
    /// Nearest significant celestial body to the camera.
    fn camera_proxy_body(&self) -> Option<ObjectId>;
    fn camera_global_pos(&self) -> DVec3;
    fn camera_global_dir(&self) -> DVec3;
    /// Camera rotation matrix (global -> view).
    fn camera_rotation(&self) -> DMat3;
    /// Half of the vertical field of view [rad].
    fn camera_aperture(&self) -> f64;
    /// Whether the camera is in internal (cockpit) view.
    fn camera_internal(&self) -> bool;

    // --- simulation state ---------------------------------------------------
    fn focus_object(&self) -> Option<ObjectId>;
    fn is_paused(&self) -> bool;
    fn vessel(&self, id: ObjectId) -> Option<&dyn VesselApi>;

    // --- planetary data -----------------------------------------------------
    fn atm_constants(&self, id: ObjectId) -> Option<AtmConstants>;
    /// Atmosphere parameters at `dist` metres from the body centre.
    fn atm_params(&self, id: ObjectId, dist: f64) -> Option<AtmParams>;
    fn base_count(&self, planet: ObjectId) -> usize;
    fn base_by_index(&self, planet: ObjectId, index: usize) -> Option<ObjectId>;
    /// Obliquity and precession angle of the reference body for the celestial
    /// grid, when the host can provide them.
    fn ecliptic_obliquity(&self) -> Option<(f64, f64)> {
        None
    }

    // --- overlay data -------------------------------------------------------
    /// Surface marker lists of a planet (positions in planet-local frame).
    fn surface_markers(&self, _planet: ObjectId) -> &[MarkerList] {
        &[]
    }
    /// Celestial marker lists (positions are global directions).
    fn celestial_markers(&self) -> &[MarkerList] {
        &[]
    }
    /// Constellation label markers (positions are global directions).
    fn constellation_markers(&self) -> &[MarkerSpec] {
        &[]
    }
    /// Host debug line for the debug overlay; empty when nothing to show.
    fn debug_string(&self) -> String {
        String::new()
    }
}
