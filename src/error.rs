use life_physics::SettingsError;
use life_simulation::SimulationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to acquire GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats for this adapter")]
    NoSurfaceFormat,
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}
