//! Scene-level error type.

use gfx::GfxError;
use scene_core::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    /// The backend refused to create or release a visual binding; the host
    /// and backend views of this object no longer agree.
    #[error("backend visual binding out of sync for object {id:?}")]
    BackendDesync {
        id: ObjectId,
        #[source]
        source: GfxError,
    },
}
