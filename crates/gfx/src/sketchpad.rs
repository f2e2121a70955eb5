//! 2D drawing-context abstraction for labels, HUD overlay and debug text.

/// The three pooled sketchpad instances a backend provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadId {
    /// Planetarium labels and markers, drawn over the scene target.
    Labels,
    /// 2D HUD overlay, drawn onto the swap target directly.
    Overlay,
    /// Debug text at the bottom of the screen.
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontId {
    Label,
    Axis,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlignH {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlignV {
    Top,
    Bottom,
}

/// Immediate-mode 2D drawing primitives. Colours are 0xRRGGBB.
pub trait Sketchpad {
    fn set_font(&mut self, font: FontId);
    fn set_text_align(&mut self, horizontal: TextAlignH, vertical: TextAlignV);
    fn set_text_color(&mut self, color: u32);
    fn set_pen_color(&mut self, color: u32);
    fn rectangle(&mut self, x1: i32, y1: i32, x2: i32, y2: i32);
    fn ellipse(&mut self, x1: i32, y1: i32, x2: i32, y2: i32);
    fn move_to(&mut self, x: i32, y: i32);
    fn line_to(&mut self, x: i32, y: i32);
    fn text(&mut self, x: i32, y: i32, text: &str);
    fn text_width(&self, text: &str) -> u32;
    /// Flush pending drawing to the bound surface.
    fn flush(&mut self);
}

/// Sketchpad that discards everything; for tests and headless drivers.
pub struct NullSketchpad;

impl Sketchpad for NullSketchpad {
    fn set_font(&mut self, _font: FontId) {}
    fn set_text_align(&mut self, _horizontal: TextAlignH, _vertical: TextAlignV) {}
    fn set_text_color(&mut self, _color: u32) {}
    fn set_pen_color(&mut self, _color: u32) {}
    fn rectangle(&mut self, _x1: i32, _y1: i32, _x2: i32, _y2: i32) {}
    fn ellipse(&mut self, _x1: i32, _y1: i32, _x2: i32, _y2: i32) {}
    fn move_to(&mut self, _x: i32, _y: i32) {}
    fn line_to(&mut self, _x: i32, _y: i32) {}
    fn text(&mut self, _x: i32, _y: i32, _text: &str) {}
    fn text_width(&self, text: &str) -> u32 {
        text.len() as u32 * 8
    }
    fn flush(&mut self) {}
}
