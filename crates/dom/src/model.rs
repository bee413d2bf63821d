use serde::{Deserialize, Serialize};

/// Opaque handle to a live element inside one page context.
///
/// Node ids never leave the page context; the coordinator side only ever
/// sees the registry's generation-tagged tokens.
pub type NodeId = u64;

/// Layout geometry of an element in page coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Current viewport geometry and scroll offset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Viewport {
    /// Whether a page-coordinate rect intersects the visible viewport box.
    pub fn intersects(&self, rect: &LayoutRect) -> bool {
        rect.x + rect.width > self.scroll_x
            && rect.x < self.scroll_x + self.width
            && rect.y + rect.height > self.scroll_y
            && rect.y < self.scroll_y + self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

/// Low-level events the executor dispatches against live elements.
///
/// The paired keydown/keypress/input/keyup sequence per typed character
/// matters for sites that gate form state on real input events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomEvent {
    KeyDown { key: String },
    KeyPress { key: String },
    KeyUp { key: String },
    Input,
    Change,
    Focus,
    Submit,
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomEvent::KeyDown { .. } => "keydown",
            DomEvent::KeyPress { .. } => "keypress",
            DomEvent::KeyUp { .. } => "keyup",
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::Focus => "focus",
            DomEvent::Submit => "submit",
        }
    }
}
