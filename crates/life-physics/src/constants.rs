//! Option tables and seeding constants
//!
//! The option tables are the choices offered by the control panel dropdowns.

/// Body counts offered by the control panel
pub const BODY_COUNT_OPTIONS: &[u32] = &[1024, 2048, 4096, 8192, 16384, 32768, 65536];

/// Compute workgroup sizes offered by the control panel
pub const WORKGROUP_SIZE_OPTIONS: &[u32] = &[64, 128, 256];

/// Type counts offered by the control panel
pub const TYPE_COUNT_OPTIONS: &[u32] = &[2, 4, 8, 16, 32, 64, 128, 256];

pub const DEFAULT_BODY_COUNT: u32 = 4096;
pub const DEFAULT_WORKGROUP_SIZE: u32 = 64;
pub const DEFAULT_TYPE_COUNT: u32 = 8;

/// Largest workgroup a compute pipeline is built with.
/// Matches the WebGPU default `maxComputeInvocationsPerWorkgroup`.
pub const MAX_WORKGROUP_SIZE: u32 = 256;

/// Largest body count the simulation accepts.
/// One position buffer (16 bytes per body) then fills the WebGPU default
/// `maxStorageBufferBindingSize` of 128 MiB exactly.
pub const MAX_BODY_COUNT: u32 = 1 << 23;

/// WebGPU default `maxComputeWorkgroupsPerDimension`
pub const MAX_WORKGROUPS_PER_DIMENSION: u32 = 65535;

/// Upper bound on distinct body types (the attraction matrix is T x T)
pub const MAX_TYPE_COUNT: u32 = 256;

/// Attraction coefficients are drawn uniformly from `[-ATTRACTION_RANGE, ATTRACTION_RANGE)`
pub const ATTRACTION_RANGE: f32 = 100.0;

/// Billboard size written into the `w` lane of every seeded position
pub const BODY_SIZE: f32 = 1.0;
