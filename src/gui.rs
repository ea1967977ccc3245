use egui::Context;
use egui_wgpu::Renderer;
use egui_winit::State;
use life_physics::{
    PowerPreference, SettingsChange, SimulationSettings, BODY_COUNT_OPTIONS, TYPE_COUNT_OPTIONS,
    WORKGROUP_SIZE_OPTIONS,
};
use wgpu::{Device, TextureFormat};
use winit::{event::WindowEvent, window::Window};

/// Requests raised by the control panel, applied after the frame is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    TogglePause,
    Reset,
    Apply(SettingsChange),
}

pub struct UiState {
    pub fps: f32,
    pub paused: bool,
    pub particle_size: f32,
    /// Settings the running simulation was built with
    pub settings: SimulationSettings,
    actions: Vec<UiAction>,
}

impl UiState {
    pub fn new(settings: SimulationSettings, particle_size: f32) -> Self {
        Self {
            fps: 0.0,
            paused: false,
            particle_size,
            settings,
            actions: Vec::new(),
        }
    }

    pub fn push_action(&mut self, action: UiAction) {
        self.actions.push(action);
    }

    pub fn take_actions(&mut self) -> Vec<UiAction> {
        std::mem::take(&mut self.actions)
    }

    /// Adopt edited settings, queueing whatever rebuild they need.
    pub fn edit_settings(&mut self, edited: SimulationSettings) {
        if let Some(change) = edited.change_from(&self.settings) {
            log::debug!("settings edited ({:?}): {:?}", change, edited);
            self.settings = edited;
            self.actions.push(UiAction::Apply(change));
        }
    }
}

pub struct Gui {
    context: Context,
    state: State,
    renderer: Renderer,
}

impl Gui {
    pub fn new(device: &Device, output_color_format: TextureFormat, window: &Window) -> Self {
        let context = Context::default();
        let id = context.viewport_id();

        let state = State::new(
            context.clone(),
            id,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(device.limits().max_texture_dimension_2d as usize),
        );

        let renderer = Renderer::new(
            device,
            output_color_format,
            egui_wgpu::RendererOptions::default(),
        );

        Self {
            context,
            state,
            renderer,
        }
    }

    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.state.on_window_event(window, event);
        response.consumed
    }

    pub fn wants_keyboard_input(&self) -> bool {
        self.context.wants_keyboard_input()
    }

    pub fn render(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &Window,
        view: &wgpu::TextureView,
        ui_state: &mut UiState,
    ) {
        let raw_input = self.state.take_egui_input(window);

        let full_output = self.context.run(raw_input, |ctx| {
            Self::ui(ctx, ui_state);
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let clipped_primitives = self
            .context
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let size = window.inner_size();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        let mut render_pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();

        self.renderer
            .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        drop(render_pass);

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }

    fn ui(ctx: &Context, state: &mut UiState) {
        egui::Window::new("Particle Life")
            .anchor(egui::Align2::LEFT_TOP, [10.0, 10.0])
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                ui.label(format!("{:.1} FPS", state.fps));
                ui.separator();

                ui.horizontal(|ui| {
                    let pause_label = if state.paused { "Unpause" } else { "Pause" };
                    if ui.button(pause_label).clicked() {
                        state.push_action(UiAction::TogglePause);
                    }
                    if ui.button("Reset").clicked() {
                        state.push_action(UiAction::Reset);
                    }
                });

                ui.separator();
                ui.heading("Simulation");

                let mut edited = state.settings;
                option_combo(ui, "Bodies", &mut edited.body_count, BODY_COUNT_OPTIONS);
                option_combo(ui, "Types", &mut edited.type_count, TYPE_COUNT_OPTIONS);
                option_combo(
                    ui,
                    "Workgroup Size",
                    &mut edited.workgroup_size,
                    WORKGROUP_SIZE_OPTIONS,
                );
                egui::ComboBox::from_label("Power Preference")
                    .selected_text(edited.power_preference.to_string())
                    .show_ui(ui, |ui| {
                        for pref in PowerPreference::ALL {
                            ui.selectable_value(
                                &mut edited.power_preference,
                                pref,
                                pref.to_string(),
                            );
                        }
                    });
                state.edit_settings(edited);

                ui.separator();
                ui.heading("Rendering");
                ui.add(
                    egui::Slider::new(&mut state.particle_size, 0.001..=0.05)
                        .text("Particle Size")
                        .logarithmic(true),
                );

                ui.separator();
                ui.label("Space: pause   R: reset   Up/Down: move camera");
            });
    }
}

fn option_combo(ui: &mut egui::Ui, label: &str, value: &mut u32, options: &[u32]) {
    egui::ComboBox::from_label(label)
        .selected_text(value.to_string())
        .show_ui(ui, |ui| {
            for &option in options {
                ui.selectable_value(&mut *value, option, option.to_string());
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_settings_queue_nothing() {
        let mut state = UiState::new(SimulationSettings::default(), 0.01);
        state.edit_settings(SimulationSettings::default());
        assert!(state.take_actions().is_empty());
    }

    #[test]
    fn test_edits_queue_matching_action() {
        let base = SimulationSettings::default();
        let mut state = UiState::new(base, 0.01);

        state.edit_settings(SimulationSettings {
            workgroup_size: 256,
            ..base
        });
        state.push_action(UiAction::TogglePause);
        state.edit_settings(SimulationSettings {
            workgroup_size: 256,
            power_preference: PowerPreference::LowPower,
            ..base
        });

        assert_eq!(
            state.take_actions(),
            vec![
                UiAction::Apply(SettingsChange::RebuildPipelines),
                UiAction::TogglePause,
                UiAction::Apply(SettingsChange::RecreateDevice),
            ]
        );
        assert_eq!(state.settings.workgroup_size, 256);
        assert_eq!(state.settings.power_preference, PowerPreference::LowPower);
        assert!(state.take_actions().is_empty());
    }
}
