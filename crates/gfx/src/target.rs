//! Render target handles and the LIFO save/restore discipline.

use crate::device::Device;

/// Opaque handle to a colour or depth surface owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

/// Saved render-target bindings, restored in LIFO order.
///
/// Callers must restore in the reverse order of their saves; an unbalanced
/// stack leaves the device bound to a stale target for every following frame.
#[derive(Debug, Default)]
pub struct TargetStack {
    saved: Vec<(Option<TargetId>, Option<TargetId>)>,
}

impl TargetStack {
    pub fn new() -> Self {
        Self { saved: Vec::new() }
    }

    /// Save the current bindings and bind `color`/`depth`.
    pub fn push(
        &mut self,
        dev: &mut dyn Device,
        color: Option<TargetId>,
        depth: Option<TargetId>,
    ) {
        self.saved.push(dev.render_target());
        dev.set_render_target(color, depth);
    }

    /// Restore the most recently saved bindings.
    pub fn restore(&mut self, dev: &mut dyn Device) {
        if let Some((color, depth)) = self.saved.pop() {
            dev.set_render_target(color, depth);
        } else {
            log::warn!("render target restore without a matching save");
        }
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}
