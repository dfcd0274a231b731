//! Canvas cursor modes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pointer cursor shown over the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CursorMode {
    #[default]
    Default,
    /// Canvas is being panned
    Panning,
    /// A drill point is being dragged
    Dragging,
    /// Hole placement mode
    Crosshair,
    /// Hovering a drill point
    Pointer,
    /// Pan available
    Grab,
    /// Interaction blocked (read-only pattern)
    NotAllowed,
}

impl CursorMode {
    /// CSS cursor name
    pub fn css_name(&self) -> &'static str {
        match self {
            CursorMode::Default => "default",
            CursorMode::Panning => "grabbing",
            CursorMode::Dragging => "move",
            CursorMode::Crosshair => "crosshair",
            CursorMode::Pointer => "pointer",
            CursorMode::Grab => "grab",
            CursorMode::NotAllowed => "not-allowed",
        }
    }

    /// Cursor for an idle canvas given the current UI flags.
    pub fn for_idle(is_read_only: bool, is_hole_placement_mode: bool) -> Self {
        if is_read_only {
            CursorMode::NotAllowed
        } else if is_hole_placement_mode {
            CursorMode::Crosshair
        } else {
            CursorMode::Grab
        }
    }
}

impl fmt::Display for CursorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_name())
    }
}
