//! # Particle Life Renderer
//!
//! Draws every body as a camera-facing billboard.

pub mod camera;
pub mod renderer;

pub use camera::*;
pub use renderer::*;
