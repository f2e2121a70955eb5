//! 2D marker rendering over the scene: object and direction markers with
//! their label pair.

use gfx::Sketchpad;
use glam::DVec3;
use scene_core::MarkerShape;

use crate::camera::Camera;

/// Apparent-radius limit below which surface and base labels are dropped.
pub const LABEL_DISTLIMIT: f64 = 0.6;

/// Label/pen colours by marker list colour index, 0xRRGGBB.
pub const LABEL_PALETTE: [u32; 6] =
    [0x00FFFF, 0xFFFF00, 0x4040FF, 0xFF00FF, 0x40FF40, 0xFF8080];

pub fn palette_color(index: usize) -> u32 {
    LABEL_PALETTE[index % LABEL_PALETTE.len()]
}

/// Draw one marker glyph centred at (x, y).
pub fn draw_marker(pad: &mut dyn Sketchpad, x: i32, y: i32, shape: MarkerShape, scale: i32) {
    match shape {
        MarkerShape::Box => pad.rectangle(x - scale, y - scale, x + scale + 1, y + scale + 1),
        MarkerShape::Circle => pad.ellipse(x - scale, y - scale, x + scale + 1, y + scale + 1),
        MarkerShape::Diamond => {
            pad.move_to(x, y - scale);
            pad.line_to(x + scale, y);
            pad.line_to(x, y + scale);
            pad.line_to(x - scale, y);
            pad.line_to(x, y - scale);
        }
        MarkerShape::Delta => {
            let w = (scale as f64 * 1.1547) as i32; // equilateral half-width
            pad.move_to(x, y - scale);
            pad.line_to(x + w, y + scale);
            pad.line_to(x - w, y + scale);
            pad.line_to(x, y - scale);
        }
        MarkerShape::Nabla => {
            let w = (scale as f64 * 1.1547) as i32;
            pad.move_to(x, y + scale);
            pad.line_to(x + w, y - scale);
            pad.line_to(x - w, y - scale);
            pad.line_to(x, y + scale);
        }
        MarkerShape::Crosshair => {
            let inner = scale / 4;
            pad.move_to(x, y - scale);
            pad.line_to(x, y - inner);
            pad.move_to(x, y + scale);
            pad.line_to(x, y + inner);
            pad.move_to(x - scale, y);
            pad.line_to(x - inner, y);
            pad.move_to(x + scale, y);
            pad.line_to(x + inner, y);
        }
        MarkerShape::RotatedCrosshair => {
            let inner = scale / 4;
            pad.move_to(x - scale, y - scale);
            pad.line_to(x - inner, y - inner);
            pad.move_to(x - scale, y + scale);
            pad.line_to(x - inner, y + inner);
            pad.move_to(x + scale, y - scale);
            pad.line_to(x + inner, y - inner);
            pad.move_to(x + scale, y + scale);
            pad.line_to(x + inner, y + inner);
        }
    }
}

/// Marker at a global-frame direction (celestial markers, constellation
/// labels). Nothing is drawn when the direction is behind the camera or off
/// screen.
pub fn render_direction_marker(
    pad: &mut dyn Sketchpad,
    camera: &Camera,
    dir: DVec3,
    shape: Option<MarkerShape>,
    labels: [&str; 2],
    scale: i32,
    label_height: i32,
) {
    let Some((xf, yf)) = camera.direction_to_viewport(dir) else {
        return;
    };
    let (x, y) = (xf as i32, yf as i32);
    if let Some(shape) = shape {
        draw_marker(pad, x, y, shape, scale);
    }
    if !labels[0].is_empty() {
        pad.text(x, y - scale, labels[0]);
    }
    if !labels[1].is_empty() {
        pad.text(x, y + scale + label_height, labels[1]);
    }
}

/// Marker at a global position (object, surface and base markers).
pub fn render_object_marker(
    pad: &mut dyn Sketchpad,
    camera: &Camera,
    gpos: DVec3,
    shape: Option<MarkerShape>,
    labels: [&str; 2],
    scale: i32,
    label_height: i32,
) {
    let dp = gpos - camera.gpos();
    let len = dp.length();
    if len == 0.0 {
        return;
    }
    render_direction_marker(pad, camera, dp / len, shape, labels, scale, label_height);
}
