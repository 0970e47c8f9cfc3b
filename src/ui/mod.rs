//! Terminal UI: rendering and keyboard input per screen.

pub mod input;
pub mod render;
pub mod styles;
