//! Per-object visual records.

use bitflags::bitflags;
use glam::DVec3;
use scene_core::{ObjectId, ObjectKind};

bitflags! {
    /// Exclusions applied to a visual during secondary-scene passes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OmitFlags: u32 {
        /// Skip this visual itself.
        const BODY = 0x1;
        /// Skip attachments (exhaust, beacons) of this visual.
        const ATTACHMENTS = 0x2;
    }
}

/// Body-specific render state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualBody {
    Star,
    Planet,
    Vessel,
    Base,
}

impl VisualBody {
    pub fn from_kind(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Star => VisualBody::Star,
            ObjectKind::Planet => VisualBody::Planet,
            ObjectKind::Vessel => VisualBody::Vessel,
            ObjectKind::Base => VisualBody::Base,
        }
    }
}

/// One entry of the visual registry. The record exists for every known host
/// object; `active` tracks whether the object is large enough on screen to
/// render as full geometry.
#[derive(Debug, Clone)]
pub struct Visual {
    pub id: ObjectId,
    pub body: VisualBody,
    /// Set when the apparent radius crossed the activation threshold; cleared
    /// when it falls below the deactivation threshold. Stars stay active.
    pub active: bool,
    /// Camera frustum test result from the last refresh.
    pub in_view: bool,
    /// Camera-relative global-frame position [m].
    pub cpos: DVec3,
    /// Camera distance [m].
    pub cdist: f64,
    /// Mean radius [m].
    pub size: f64,
    /// Apparent on-screen radius [px].
    pub apprad: f64,
    pub omit: OmitFlags,
    /// Next environment-map face to regenerate, 0..6.
    pub env_face: u32,
}

impl Visual {
    pub fn new(id: ObjectId, kind: ObjectKind) -> Self {
        let body = VisualBody::from_kind(kind);
        Self {
            id,
            body,
            active: body == VisualBody::Star,
            in_view: false,
            cpos: DVec3::ZERO,
            cdist: 0.0,
            size: 0.0,
            apprad: 0.0,
            omit: OmitFlags::empty(),
            env_face: 0,
        }
    }

    pub fn is_celestial(&self) -> bool {
        matches!(self.body, VisualBody::Star | VisualBody::Planet)
    }
}
