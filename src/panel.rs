//! Debug panel drawn with egui on top of the presented frame.

use egui::{Context, DragValue, Ui, ViewportId};
use egui_wgpu::{Renderer as EguiRenderer, ScreenDescriptor};
use egui_winit::State as EguiWinitState;
use glam::Vec3;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::config::Features;
use crate::state::ProgramState;
use crate::time::FrameTime;

pub struct DebugPanel {
    context: Context,
    winit_state: EguiWinitState,
    renderer: EguiRenderer,
}

impl DebugPanel {
    /// `target_format` is the non-sRGB format of the view the panel is drawn into.
    pub fn new(window: &Window, device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let context = Context::default();
        let winit_state = EguiWinitState::new(
            context.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );
        let renderer = EguiRenderer::new(device, target_format, None, 1);
        Self {
            context,
            winit_state,
            renderer,
        }
    }

    /// Feeds a window event to egui. Returns true if egui used it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    /// Builds the panel, applies its edits to `state` and records drawing
    /// onto `target`. The returned command buffers must be submitted before
    /// `encoder`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        window: &Window,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
        state: &mut ProgramState,
        features: &Features,
        time: FrameTime,
    ) -> Vec<wgpu::CommandBuffer> {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, |ctx| {
            egui::Window::new("Scene").show(ctx, |ui| scene_controls(ui, state, features));
            egui::Window::new("Camera info").show(ctx, |ui| camera_info(ui, state, time));
        });
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .context
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen = ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let command_buffers = self
            .renderer
            .update_buffers(device, queue, encoder, &paint_jobs, &screen);

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("panel pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.renderer.render(&mut pass, &paint_jobs, &screen);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
        command_buffers
    }
}

fn drag_vec3(ui: &mut Ui, label: &str, value: &mut Vec3, speed: f32) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(DragValue::new(&mut value.x).speed(speed).prefix("x "));
        ui.add(DragValue::new(&mut value.y).speed(speed).prefix("y "));
        ui.add(DragValue::new(&mut value.z).speed(speed).prefix("z "));
    });
}

fn color_vec3(ui: &mut Ui, label: &str, value: &mut Vec3) {
    ui.horizontal(|ui| {
        let mut rgb = value.to_array();
        if ui.color_edit_button_rgb(&mut rgb).changed() {
            *value = Vec3::from(rgb);
        }
        ui.label(label);
    });
}

fn scene_controls(ui: &mut Ui, state: &mut ProgramState, features: &Features) {
    color_vec3(ui, "Background", &mut state.clear_color);

    ui.separator();
    drag_vec3(ui, "Room position", &mut state.room_position, 0.05);
    ui.horizontal(|ui| {
        ui.label("Room scale");
        ui.add(DragValue::new(&mut state.room_scale).speed(0.05));
    });
    state.room_scale = state.room_scale.max(0.01);

    ui.separator();
    ui.label("Point light");
    let light = &mut state.point_light;
    drag_vec3(ui, "Position", &mut light.position, 0.05);
    color_vec3(ui, "Ambient", &mut light.ambient);
    color_vec3(ui, "Diffuse", &mut light.diffuse);
    color_vec3(ui, "Specular", &mut light.specular);
    ui.horizontal(|ui| {
        ui.add(DragValue::new(&mut light.constant).speed(0.05).prefix("constant "));
        ui.add(DragValue::new(&mut light.linear).speed(0.005).prefix("linear "));
        ui.add(DragValue::new(&mut light.quadratic).speed(0.001).prefix("quadratic "));
    });
    light.constant = light.constant.max(0.0);
    light.linear = light.linear.max(0.0);
    light.quadratic = light.quadratic.max(0.0);
    let distance = light.position.distance(state.camera.position);
    ui.label(format!(
        "Attenuation at camera ({distance:.2}): {:.3}",
        light.attenuation(distance)
    ));

    if features.spotlight || features.blur {
        ui.separator();
    }
    if features.spotlight {
        ui.checkbox(&mut state.spot_light_enabled, "Spotlight (L / N)");
    }
    if features.blur {
        ui.checkbox(&mut state.blur_enabled, "Blur (B / U)");
    }

    if features.painting {
        ui.separator();
        ui.label("Painting");
        ui.horizontal(|ui| {
            ui.add(
                DragValue::new(&mut state.painting_offset.y)
                    .speed(0.01)
                    .prefix("vertical "),
            );
            ui.add(
                DragValue::new(&mut state.painting_offset.x)
                    .speed(0.01)
                    .prefix("horizontal "),
            );
        });
    }
}

fn camera_info(ui: &mut Ui, state: &mut ProgramState, time: FrameTime) {
    let camera = &state.camera;
    ui.label(format!(
        "Position: ({:.2}, {:.2}, {:.2})",
        camera.position.x, camera.position.y, camera.position.z
    ));
    ui.label(format!(
        "Front: ({:.2}, {:.2}, {:.2})",
        camera.front.x, camera.front.y, camera.front.z
    ));
    ui.label(format!(
        "Yaw {:.1}, pitch {:.1}, zoom {:.1}",
        camera.yaw, camera.pitch, camera.zoom
    ));
    ui.label(format!("Frame {} ({:.0} fps)", time.frame_index, time.fps));
    ui.checkbox(&mut state.camera_mouse_enabled, "Camera mouse update");
}
