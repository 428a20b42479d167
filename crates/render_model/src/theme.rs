//! Theme object passed into the frame pass
//!
//! All ambient colors live here rather than in global state; drawers resolve
//! against the theme at draw time.

use scene_model::Color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub canvas_background: Color,
    pub selection: Color,
    pub handle_fill: Color,
    pub container_outline: Color,
    pub container_fill: Color,
    pub font_family: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            canvas_background: Color::WHITE,
            selection: Color::BLUE,
            handle_fill: Color::WHITE,
            container_outline: Color::GRAY,
            container_fill: Color::rgba(0, 0, 0, 8),
            font_family: "sans-serif".to_string(),
        }
    }
}
