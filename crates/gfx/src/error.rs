//! Backend error types.

use scene_core::ObjectId;
use thiserror::Error;

/// Errors surfaced by a rendering backend.
#[derive(Debug, Error)]
pub enum GfxError {
    /// The device refused to begin a scene (lost device, mid-reset). The
    /// caller drops the frame and tries again next time.
    #[error("device refused to begin scene")]
    BeginSceneFailed,

    #[error("render target creation failed: {0}")]
    TargetCreation(String),

    /// Registering a visual with the backend failed. The visual/host binding
    /// is inconsistent afterwards; there is no defined recovery for the
    /// affected object.
    #[error("backend visual registration failed for {0:?}")]
    RegisterVisual(ObjectId),

    /// Unregistering a visual with the backend failed. Same severity as
    /// registration failure.
    #[error("backend visual unregistration failed for {0:?}")]
    UnregisterVisual(ObjectId),

    #[error("post-processing pass failed: {0}")]
    PostProcess(String),
}
