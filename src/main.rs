//! Particle Life
//!
//! GPU n-body simulation where bodies of different types attract or repel each
//! other according to a random attraction matrix.

mod cli;
mod error;
mod fps;
mod gui;

use clap::Parser;
use cli::Args;
use error::AppError;
use fps::FpsCounter;
use gui::{Gui, UiAction, UiState};
use life_physics::{BodySeed, PowerPreference, SettingsChange, SimulationSettings};
use life_renderer::{BillboardRenderer, BodyDrawData, Camera, CameraMove};
use life_simulation::LifeSimulation;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

fn wgpu_power_preference(preference: PowerPreference) -> wgpu::PowerPreference {
    match preference {
        PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
    }
}

/// Dolly direction held after a key event. Any release stops the camera.
fn held_move_after(code: KeyCode, state: ElementState) -> Option<CameraMove> {
    match (state, code) {
        (ElementState::Pressed, KeyCode::ArrowUp) => Some(CameraMove::Forward),
        (ElementState::Pressed, KeyCode::ArrowDown) => Some(CameraMove::Backward),
        _ => None,
    }
}

/// Presses are swallowed while egui has keyboard focus, releases never are
fn key_reaches_simulation(state: ElementState, gui_wants_keyboard: bool) -> bool {
    state == ElementState::Released || !gui_wants_keyboard
}

struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    simulation: LifeSimulation,
    renderer: BillboardRenderer,
    camera: Camera,

    gui: Gui,
    ui_state: UiState,

    rng: StdRng,
    fps: FpsCounter,
    // Arrow key currently held, applied once per frame
    held_move: Option<CameraMove>,
}

impl GpuState {
    async fn new(
        window: Arc<Window>,
        settings: SimulationSettings,
        particle_size: f32,
        mut rng: StdRng,
        vsync: bool,
    ) -> Result<Self, AppError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu_power_preference(settings.power_preference),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!(
            "✓ Using GPU: {} ({})",
            adapter.get_info().name,
            settings.power_preference
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(AppError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let seed = BodySeed::generate(&mut rng, settings.body_count, settings.type_count);
        let simulation = LifeSimulation::new(&device, &seed, settings.workgroup_size)?;
        log::info!("✓ Simulation initialized");

        let renderer = BillboardRenderer::new(&device, config.format);
        log::info!("✓ Renderer initialized");

        let camera = Camera::new(config.width, config.height);

        let gui = Gui::new(&device, config.format, &window);
        let ui_state = UiState::new(settings, particle_size);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            simulation,
            renderer,
            camera,
            gui,
            ui_state,
            rng,
            fps: FpsCounter::default(),
            held_move: None,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.camera.resize(new_size.width, new_size.height);
        }
    }

    /// Reseed every body from the current settings and rebuild the compute pipeline.
    fn reset(&mut self) {
        let settings = self.ui_state.settings;
        self.camera.reset_eye();

        if let Err(e) = settings.validate() {
            log::error!("Reset rejected, keeping the previous simulation: {e}");
            self.sync_settings_with_simulation();
            return;
        }

        let seed = BodySeed::generate(&mut self.rng, settings.body_count, settings.type_count);
        match LifeSimulation::new(&self.device, &seed, settings.workgroup_size) {
            Ok(simulation) => {
                self.simulation = simulation;
                log::info!(
                    "✓ Reset: {} bodies, {} types, workgroup size {}",
                    settings.body_count,
                    settings.type_count,
                    settings.workgroup_size
                );
            }
            Err(e) => {
                log::error!("Reset failed, keeping the previous simulation: {e}");
                self.sync_settings_with_simulation();
            }
        }

        self.ui_state.paused = false;
    }

    fn rebuild_pipelines(&mut self) {
        let workgroup_size = self.ui_state.settings.workgroup_size;
        if let Err(e) = self.simulation.rebuild_pipeline(workgroup_size) {
            log::error!("Pipeline rebuild failed: {e}");
            self.sync_settings_with_simulation();
        }
    }

    /// Point the control panel back at what is actually running
    fn sync_settings_with_simulation(&mut self) {
        let settings = &mut self.ui_state.settings;
        settings.body_count = self.simulation.body_count();
        settings.type_count = self.simulation.type_count();
        settings.workgroup_size = self.simulation.workgroup_size();
    }

    /// Apply queued control actions.
    ///
    /// Returns the settings to rebuild with when the device itself must be replaced.
    fn apply_actions(&mut self) -> Option<SimulationSettings> {
        let mut recreate = None;

        for action in self.ui_state.take_actions() {
            log::debug!("applying {:?}", action);
            match action {
                UiAction::TogglePause => self.ui_state.paused = !self.ui_state.paused,
                UiAction::Reset | UiAction::Apply(SettingsChange::Reset) => self.reset(),
                UiAction::Apply(SettingsChange::RebuildPipelines) => self.rebuild_pipelines(),
                UiAction::Apply(SettingsChange::RecreateDevice) => {
                    recreate = Some(self.ui_state.settings);
                }
            }
        }

        recreate
    }

    fn handle_key(&mut self, code: KeyCode, state: ElementState, repeat: bool) {
        self.held_move = held_move_after(code, state);

        if state == ElementState::Pressed && !repeat {
            match code {
                KeyCode::Space => self.ui_state.push_action(UiAction::TogglePause),
                KeyCode::KeyR => self.ui_state.push_action(UiAction::Reset),
                _ => {}
            }
        }
    }

    fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        if let Some(fps) = self.fps.tick(Instant::now()) {
            self.ui_state.fps = fps;
        }

        if let Some(direction) = self.held_move {
            self.camera.dolly(direction);
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        if !self.ui_state.paused {
            self.simulation.encode_step(&mut encoder);
        }

        self.renderer.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            (self.config.width, self.config.height),
            &self.camera,
            self.ui_state.particle_size,
            &BodyDrawData {
                positions: self.simulation.current_positions(),
                types: self.simulation.types_buffer(),
                body_count: self.simulation.body_count(),
                type_count: self.simulation.type_count(),
            },
        );

        self.gui.render(
            &self.device,
            &self.queue,
            &mut encoder,
            window,
            &view,
            &mut self.ui_state,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,

    initial_settings: SimulationSettings,
    particle_size: f32,
    vsync: bool,
    rng: Option<StdRng>,

    // Set when the app has to stop because of an unrecoverable error
    fatal: Option<AppError>,
}

impl App {
    fn new(args: &Args) -> Self {
        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            window: None,
            gpu_state: None,
            initial_settings: args.settings(),
            particle_size: args.particle_size,
            vsync: !args.no_vsync,
            rng: Some(rng),
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        log::error!("{error}");
        self.fatal = Some(error);
        event_loop.exit();
    }

    /// Drop the current device and acquire a new one with `settings`
    fn recreate_gpu_state(&mut self, event_loop: &ActiveEventLoop, settings: SimulationSettings) {
        let (Some(window), Some(old)) = (self.window.clone(), self.gpu_state.take()) else {
            return;
        };

        log::info!(
            "Recreating device with power preference {}",
            settings.power_preference
        );

        let particle_size = old.ui_state.particle_size;
        let rng = old.rng;
        // The old surface must be gone before the window gets a new one
        drop(old.surface);

        match pollster::block_on(GpuState::new(
            window,
            settings,
            particle_size,
            rng,
            self.vsync,
        )) {
            Ok(state) => self.gpu_state = Some(state),
            Err(e) => self.fail(event_loop, e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes().with_title("Particle Life");
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };
        self.window = Some(window.clone());

        let Some(rng) = self.rng.take() else {
            return;
        };

        match pollster::block_on(GpuState::new(
            window,
            self.initial_settings,
            self.particle_size,
            rng,
            self.vsync,
        )) {
            Ok(state) => self.gpu_state = Some(state),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        if let Some(gpu_state) = &mut self.gpu_state {
            gpu_state.gui.handle_event(&window, &event);
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),

            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    if key_reaches_simulation(state, gpu_state.gui.wants_keyboard_input()) {
                        gpu_state.handle_key(code, state, repeat);
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                let mut recreate = None;

                if let Some(gpu_state) = &mut self.gpu_state {
                    match gpu_state.render(&window) {
                        Ok(()) => {
                            window.set_title(&format!(
                                "Particle Life - {:.0} FPS - {} bodies",
                                gpu_state.ui_state.fps,
                                gpu_state.simulation.body_count()
                            ));
                        }
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            gpu_state.resize(window.inner_size())
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("Surface out of memory");
                            event_loop.exit();
                        }
                        Err(e) => log::warn!("Render error: {:?}", e),
                    }

                    recreate = gpu_state.apply_actions();
                }

                if let Some(settings) = recreate {
                    self.recreate_gpu_state(event_loop, settings);
                }
            }

            _ => {}
        }

        window.request_redraw();
    }
}

fn run(args: Args) -> Result<(), AppError> {
    args.settings().validate()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(&args);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn main() -> ExitCode {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Starting particle life simulation...");

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
