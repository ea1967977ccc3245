//! # Particle Life Model
//!
//! CPU-side model for the particle life simulation: user-facing settings,
//! their option tables, and the initial body state uploaded to the GPU.

pub mod bodies;
pub mod constants;
pub mod settings;

pub use bodies::*;
pub use constants::*;
pub use settings::*;
