//! # Particle Life Simulation
//!
//! GPU compute side of the simulation: buffers, the compute pipeline and the
//! double-buffered step dispatch.

pub mod buffers;
pub mod shader;
pub mod simulation;

pub use buffers::*;
pub use shader::*;
pub use simulation::*;
