// Window, GPU setup and the frame loop

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::{DeviceEvent, ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window, WindowBuilder},
};

use crate::config::{Features, ViewerConfig};
use crate::error::{ViewerError, ViewerResult};
use crate::geometry::{self, LampVertex, ModelVertex, LAMP_INDICES};
use crate::input::InputState;
use crate::model::{self, GpuModel, Material};
use crate::panel::DebugPanel;
use crate::postprocess::{PostProcess, DEPTH_FORMAT, SCENE_FORMAT};
use crate::scene::{self, Drawable, Scene};
use crate::shader;
use crate::state::ProgramState;
use crate::texture::{self, Texture};
use crate::time::FrameClock;
use crate::uniforms::{FrameUniforms, ObjectUniforms};

/// Scroll distance of one wheel notch for pixel-precise devices.
const PIXELS_PER_LINE: f32 = 20.0;

/// What the loop does after a failed surface acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceErrorAction {
    Reconfigured,
    SkipFrame,
    Fatal,
}

fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if config.width > 0 && config.height > 0 {
                surface.configure(device, config);
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
    }
}

fn choose_surface_format(caps: &wgpu::SurfaceCapabilities) -> Option<wgpu::TextureFormat> {
    caps.formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first().copied())
}

/// Extra view formats the surface is configured with. egui blends in gamma
/// space, so it draws through a non-sRGB view of an sRGB surface.
fn surface_view_formats(format: wgpu::TextureFormat) -> Vec<wgpu::TextureFormat> {
    let linear = format.remove_srgb_suffix();
    if linear == format {
        Vec::new()
    } else {
        vec![linear]
    }
}

/// Uniform buffer and bind group of one scene object.
struct ObjectSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct LampMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

/// Depth-tested pipeline drawing into the offscreen scene target.
fn scene_pipeline(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    module: &wgpu::ShaderModule,
    vertex_layout: wgpu::VertexBufferLayout<'_>,
    samples: u32,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: "vs_main",
            buffers: &[vertex_layout],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: SCENE_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // the room is seen from inside and models are not consistently wound
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: samples,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

pub struct Renderer {
    window: Arc<Window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    panel_format: wgpu::TextureFormat,
    lit_pipeline: wgpu::RenderPipeline,
    lamp_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_slots: Vec<ObjectSlot>,
    models: HashMap<&'static str, GpuModel>,
    painting: Option<GpuModel>,
    lamp: LampMesh,
    scene: Scene,
    post: PostProcess,
    panel: Option<DebugPanel>,
    input: InputState,
    clock: FrameClock,
    features: Features,
}

impl Renderer {
    pub async fn new(event_loop: &EventLoop<()>, config: &ViewerConfig) -> ViewerResult<Self> {
        let (width, height) = config.window_size;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("Tea room")
                .with_inner_size(LogicalSize::new(width, height))
                .build(event_loop)?,
        );

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ViewerError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("using {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("viewer device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = choose_surface_format(&caps).ok_or(ViewerError::NoSurfaceFormat)?;
        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: surface_view_formats(surface_format),
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let samples = if config.msaa_samples > 1
            && !adapter
                .get_texture_format_features(SCENE_FORMAT)
                .flags
                .sample_count_supported(config.msaa_samples)
        {
            log::warn!("{}x MSAA is not supported, rendering without it", config.msaa_samples);
            1
        } else {
            config.msaa_samples
        };

        let post = PostProcess::new(
            &device,
            surface_format,
            surface_config.width,
            surface_config.height,
            samples,
        )?;

        let frame_layout = uniform_layout(&device, "frame bind group layout");
        let object_layout = uniform_layout(&device, "object bind group layout");
        let material_layout = model::material_bind_group_layout(&device);

        let lit_module = shader::LIT.create_module(&device)?;
        let lamp_module = shader::LAMP.create_module(&device)?;
        let lit_pipeline = scene_pipeline(
            &device,
            "lit pipeline",
            &[&frame_layout, &object_layout, &material_layout],
            &lit_module,
            ModelVertex::layout(),
            samples,
        );
        let lamp_pipeline = scene_pipeline(
            &device,
            "lamp pipeline",
            &[&frame_layout, &object_layout],
            &lamp_module,
            LampVertex::layout(),
            samples,
        );

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group =
            uniform_bind_group(&device, &frame_layout, &frame_buffer, "frame bind group");

        let scene = Scene::tea_room(&config.features);
        let object_slots = scene
            .objects
            .iter()
            .map(|object| {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(object.name),
                    size: std::mem::size_of::<ObjectUniforms>() as wgpu::BufferAddress,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = uniform_bind_group(&device, &object_layout, &buffer, object.name);
                ObjectSlot { buffer, bind_group }
            })
            .collect();

        let sampler = texture::material_sampler(&device);
        let mut models = HashMap::new();
        let keys = scene.model_keys();
        for &(key, relative) in scene::MODEL_ASSETS.iter().filter(|(key, _)| keys.contains(key)) {
            let model = GpuModel::load(
                &device,
                &queue,
                &material_layout,
                &sampler,
                &config.asset(relative),
            )?;
            models.insert(key, model);
        }

        let painting = config.features.painting.then(|| {
            let diffuse = Texture::load_or(
                &device,
                &queue,
                &config.asset(scene::PAINTING_DIFFUSE),
                [255, 255, 255, 255],
            );
            let specular = Texture::load_or(
                &device,
                &queue,
                &config.asset(scene::PAINTING_SPECULAR),
                [0, 0, 0, 255],
            );
            let material = Material::new(
                &device,
                &material_layout,
                &sampler,
                "painting",
                &diffuse,
                &specular,
            );
            GpuModel::from_vertices(&device, "painting", &geometry::painting_vertices(), material)
        });

        let lamp = LampMesh {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lamp vertices"),
                contents: bytemuck::cast_slice(&geometry::lamp_vertices()),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lamp indices"),
                contents: bytemuck::cast_slice(&LAMP_INDICES),
                usage: wgpu::BufferUsages::INDEX,
            }),
        };

        let panel_format = surface_format.remove_srgb_suffix();
        let panel = config
            .features
            .debug_panel
            .then(|| DebugPanel::new(&window, &device, panel_format));

        log::info!(
            "scene ready: {} objects, {} models, {}x MSAA",
            scene.objects.len(),
            models.len(),
            samples
        );

        Ok(Self {
            window,
            device,
            queue,
            surface,
            surface_config,
            panel_format,
            lit_pipeline,
            lamp_pipeline,
            frame_buffer,
            frame_bind_group,
            object_slots,
            models,
            painting,
            lamp,
            scene,
            post,
            panel,
            input: InputState::new(),
            clock: FrameClock::new(),
            features: config.features,
        })
    }

    /// Runs the event loop until the window closes or Escape is pressed.
    pub fn run(mut self, event_loop: EventLoop<()>, state: &mut ProgramState) -> ViewerResult<()> {
        let mut outcome = Ok(());
        self.update_cursor(state);
        self.clock.reset();

        event_loop.run(|event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                    let consumed = match &mut self.panel {
                        Some(panel) if state.ui_visible => {
                            panel.on_window_event(&self.window, &event)
                        }
                        _ => false,
                    };

                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::Resized(size) => self.resize(size),
                        WindowEvent::Focused(false) => self.input.release_all(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    physical_key: PhysicalKey::Code(code),
                                    state: key_state,
                                    ..
                                },
                            ..
                        } => {
                            let pressed = key_state == ElementState::Pressed;
                            // releases always go through so no key sticks
                            if !pressed || !consumed {
                                self.input.key_event(code, pressed);
                            }
                        }
                        WindowEvent::MouseWheel { delta, .. } if !consumed => {
                            let lines = match delta {
                                MouseScrollDelta::LineDelta(_, y) => y,
                                MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                            };
                            self.input.scroll(lines);
                        }
                        WindowEvent::RedrawRequested => match self.frame(state) {
                            Ok(true) => {}
                            Ok(false) => target.exit(),
                            Err(e) => {
                                outcome = Err(e);
                                target.exit();
                            }
                        },
                        _ => {}
                    }
                }
                Event::DeviceEvent {
                    event: DeviceEvent::MouseMotion { delta },
                    ..
                } => self.input.mouse_motion(delta.0, delta.1),
                Event::AboutToWait => self.window.request_redraw(),
                _ => {}
            }
        })?;

        outcome
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.post.resize(&self.device, size.width, size.height);
    }

    /// Captures the cursor for mouse look, or frees it while the panel is up.
    fn update_cursor(&self, state: &ProgramState) {
        let capture = !state.ui_visible;
        let grab = if capture {
            self.window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Locked))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(e) = grab {
            log::warn!("cursor grab: {e}");
        }
        self.window.set_cursor_visible(!capture);
    }

    fn aspect_ratio(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }

    /// Advances and draws one frame. Returns `Ok(false)` when the viewer
    /// should close.
    fn frame(&mut self, state: &mut ProgramState) -> ViewerResult<bool> {
        let time = self.clock.tick();
        let actions = self.input.apply(state, &self.features, time.dt);
        if actions.exit {
            return Ok(false);
        }
        if actions.panel_toggled {
            self.update_cursor(state);
        }
        state.clamp_to_bounds();
        state.attach_spot_light_to_camera();

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(err) => {
                log::debug!("surface unavailable: {err}");
                return match map_surface_error(&self.surface, &self.device, &self.surface_config, err) {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(true),
                    SurfaceErrorAction::Fatal => Err(ViewerError::SurfaceOutOfMemory),
                };
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameUniforms::new(state, self.aspect_ratio())),
        );
        for (object, slot) in self.scene.objects.iter().zip(&self.object_slots) {
            let uniforms = ObjectUniforms::new(object.world_matrix(state), object.shininess);
            self.queue
                .write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&uniforms));
        }
        self.post
            .write_uniforms(&self.queue, self.features.blur && state.blur_enabled);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        let c = state.clear_color;
        let clear = wgpu::Color {
            r: c.x as f64,
            g: c.y as f64,
            b: c.z as f64,
            a: 1.0,
        };
        self.draw_scene(&mut encoder, clear);
        self.post.draw_screen(&mut encoder, &view);

        let mut command_buffers = Vec::new();
        if state.ui_visible {
            if let Some(panel) = &mut self.panel {
                let panel_view = output.texture.create_view(&wgpu::TextureViewDescriptor {
                    format: Some(self.panel_format),
                    ..Default::default()
                });
                command_buffers = panel.draw(
                    &self.window,
                    &self.device,
                    &self.queue,
                    &mut encoder,
                    &panel_view,
                    [self.surface_config.width, self.surface_config.height],
                    state,
                    &self.features,
                    time,
                );
            }
        }

        command_buffers.push(encoder.finish());
        self.queue.submit(command_buffers);
        output.present();
        Ok(true)
    }

    fn draw_scene(&self, encoder: &mut wgpu::CommandEncoder, clear: wgpu::Color) {
        let mut pass = self.post.begin_scene_pass(encoder, clear);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);

        for (object, slot) in self.scene.objects.iter().zip(&self.object_slots) {
            let model = match object.drawable {
                Drawable::Model(key) => self.models.get(key),
                Drawable::Painting => self.painting.as_ref(),
                Drawable::Lamp => {
                    pass.set_pipeline(&self.lamp_pipeline);
                    pass.set_bind_group(1, &slot.bind_group, &[]);
                    pass.set_vertex_buffer(0, self.lamp.vertex_buffer.slice(..));
                    pass.set_index_buffer(self.lamp.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..LAMP_INDICES.len() as u32, 0, 0..1);
                    continue;
                }
            };
            if let Some(model) = model {
                pass.set_pipeline(&self.lit_pipeline);
                pass.set_bind_group(1, &slot.bind_group, &[]);
                model.draw(&mut pass);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_format_prefers_srgb() {
        let caps = wgpu::SurfaceCapabilities {
            formats: vec![
                wgpu::TextureFormat::Bgra8Unorm,
                wgpu::TextureFormat::Bgra8UnormSrgb,
            ],
            ..Default::default()
        };
        assert_eq!(
            choose_surface_format(&caps),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );

        let caps = wgpu::SurfaceCapabilities {
            formats: vec![wgpu::TextureFormat::Rgba16Float],
            ..Default::default()
        };
        assert_eq!(choose_surface_format(&caps), Some(wgpu::TextureFormat::Rgba16Float));

        assert_eq!(choose_surface_format(&wgpu::SurfaceCapabilities::default()), None);
    }

    #[test]
    fn panel_gets_a_linear_view_of_srgb_surfaces() {
        assert_eq!(
            surface_view_formats(wgpu::TextureFormat::Bgra8UnormSrgb),
            vec![wgpu::TextureFormat::Bgra8Unorm]
        );
        assert!(surface_view_formats(wgpu::TextureFormat::Rgba16Float).is_empty());
    }
}
