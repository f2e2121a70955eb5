//! Opaque handles and type tags for simulation objects.

use serde::{Deserialize, Serialize};

/// Handle to a simulated object owned by the host.
///
/// The scene never interprets the value; it only uses it as a stable key and to
/// query the host for per-object state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// Type tag of a simulated object, resolved once when its visual is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Central star (always force-active in the registry).
    Star,
    /// Planet or moon. Surface bases hang off their parent planet.
    Planet,
    /// Spacecraft with a vessel interface.
    Vessel,
    /// Surface base. Gets its own registry record when the host enumerates
    /// it; drawn with its parent planet's pass, outside the sorted
    /// background list.
    Base,
}

impl ObjectKind {
    /// Objects that participate in the distance-sorted background pass.
    pub fn is_celestial(self) -> bool {
        matches!(self, ObjectKind::Star | ObjectKind::Planet)
    }
}
