//! Windowed render backend using winit and wgpu.
//!
//! The engine owns the frame loop, so the winit event loop is pumped (not
//! run): each [`poll_events`](RenderBackend::poll_events) drains pending
//! events without blocking. Winit only allows window creation inside
//! `ApplicationHandler::resumed`, so [`WindowBackend::new`] pumps until the
//! window and GPU state exist.
//!
//! Sprites are drawn as textured quads, batched by texture in submission
//! order; overlay lines go through a second `LineList` pipeline on top. Draw
//! calls only queue vertices; everything is uploaded and submitted in
//! [`present`](RenderBackend::present).
//!
//! This module is feature-gated behind `renderer`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use super::{GraphicsError, RenderBackend, Sprite, Texture, TextureId};
use crate::config::EngineConfig;
use crate::input::{Key, KeyboardState};
use crate::physics::DebugLine;
use crate::vector2::Vector2;

/// Maximum sprites drawn per frame.
const MAX_SPRITES: usize = 4096;
const VERTICES_PER_QUAD: usize = 6;
const MAX_SPRITE_VERTICES: usize = MAX_SPRITES * VERTICES_PER_QUAD;

/// Maximum overlay line segments per frame.
const MAX_LINES: usize = 8192;
const MAX_LINE_VERTICES: usize = MAX_LINES * 2;

/// Pumps allowed for the platform to deliver `resumed`.
const STARTUP_PUMPS: usize = 64;

fn backend_error(err: impl std::fmt::Display) -> GraphicsError {
    GraphicsError::Backend(err.to_string())
}

// ---------------------------------------------------------------------------
// Vertices
// ---------------------------------------------------------------------------

/// A sprite vertex: world position in pixels plus texture coordinate.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
struct SpriteVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

impl SpriteVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// An overlay line vertex with RGBA color.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
struct LineVertex {
    position: [f32; 2],
    color: [f32; 4],
}

impl LineVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

fn to_f32(v: Vector2) -> [f32; 2] {
    [v.x as f32, v.y as f32]
}

// ---------------------------------------------------------------------------
// View2D
// ---------------------------------------------------------------------------

/// Screen-sized view onto the world, y pointing down.
#[derive(Debug, Clone, PartialEq)]
struct View2D {
    width: f32,
    height: f32,
    x: f32,
    y: f32,
}

impl View2D {
    /// Column-major orthographic matrix mapping the visible rectangle to clip
    /// space, with world `y` growing downwards.
    fn orthographic_matrix(&self) -> [f32; 16] {
        let left = self.x - self.width / 2.0;
        let right = self.x + self.width / 2.0;
        let top = self.y - self.height / 2.0;
        let bottom = self.y + self.height / 2.0;

        let sx = 2.0 / (right - left);
        let sy = 2.0 / (top - bottom);
        let tx = -(right + left) / (right - left);
        let ty = -(top + bottom) / (top - bottom);

        [
            sx, 0.0, 0.0, 0.0, // column 0
            0.0, sy, 0.0, 0.0, // column 1
            0.0, 0.0, 1.0, 0.0, // column 2
            tx, ty, 0.0, 1.0, // column 3
        ]
    }
}

// ---------------------------------------------------------------------------
// Gpu
// ---------------------------------------------------------------------------

/// Consecutive sprites sharing a texture.
struct Batch {
    texture: usize,
    start: u32,
    count: u32,
}

/// Window, surface and pipelines. Created in `resumed`.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    sprite_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    view_buffer: wgpu::Buffer,
    view_bind_group: wgpu::BindGroup,
    sprite_buffer: wgpu::Buffer,
    line_buffer: wgpu::Buffer,
    /// Indexed by `TextureId`.
    textures: Vec<wgpu::BindGroup>,
    /// `None` until the view is first moved: the default view shows
    /// `(0, 0)..size`.
    view_center: Option<Vector2>,
    sprite_vertices: Vec<SpriteVertex>,
    batches: Vec<Batch>,
    line_vertices: Vec<LineVertex>,
}

impl Gpu {
    async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, GraphicsError> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone()).map_err(backend_error)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| GraphicsError::Backend("no suitable GPU adapter found".to_owned()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("sable_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(backend_error)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .ok_or_else(|| GraphicsError::Backend("surface reports no formats".to_owned()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
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

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sable_shaders"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders.wgsl").into()),
        });

        // Group 0: view matrix.
        let view = View2D {
            width: width as f32,
            height: height as f32,
            x: width as f32 / 2.0,
            y: height as f32 / 2.0,
        };
        let view_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("view_uniform"),
            contents: bytemuck::cast_slice(&view.orthographic_matrix()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let view_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("view_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("view_bind_group"),
            layout: &view_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_buffer.as_entire_binding(),
            }],
        });

        // Group 1: sprite texture + sampler.
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprite_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let sprite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite_pipeline_layout"),
            bind_group_layouts: &[&view_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("line_pipeline_layout"),
            bind_group_layouts: &[&view_layout],
            push_constant_ranges: &[],
        });

        let sprite_pipeline = create_pipeline(
            &device,
            &shader,
            &sprite_layout,
            config.format,
            PipelineKind::Sprite,
        );
        let line_pipeline = create_pipeline(
            &device,
            &shader,
            &line_layout,
            config.format,
            PipelineKind::Line,
        );

        let sprite_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprite_vertex_buffer"),
            size: (MAX_SPRITE_VERTICES * std::mem::size_of::<SpriteVertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let line_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("line_vertex_buffer"),
            size: (MAX_LINE_VERTICES * std::mem::size_of::<LineVertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            sprite_pipeline,
            line_pipeline,
            texture_layout,
            sampler,
            view_buffer,
            view_bind_group,
            sprite_buffer,
            line_buffer,
            textures: Vec::new(),
            view_center: None,
            sprite_vertices: Vec::new(),
            batches: Vec::new(),
            line_vertices: Vec::new(),
        })
    }

    fn load_texture(&mut self, path: &Path) -> Result<Texture, GraphicsError> {
        let rgba = image::open(path)
            .map_err(|source| GraphicsError::Texture {
                path: path.to_owned(),
                source,
            })?
            .to_rgba8();
        let (width, height) = rgba.dimensions();

        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: path.to_str(),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite_texture_bind_group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let id = TextureId(self.textures.len() as u32);
        self.textures.push(bind_group);
        Ok(Texture {
            id,
            size: Vector2::new(f64::from(width), f64::from(height)),
        })
    }

    fn begin_frame(&mut self) {
        self.sprite_vertices.clear();
        self.batches.clear();
        self.line_vertices.clear();
    }

    fn queue_sprite(&mut self, sprite: &Sprite) {
        if self.sprite_vertices.len() >= MAX_SPRITE_VERTICES {
            return;
        }
        let texture = sprite.texture.id.0 as usize;
        let [tl, tr, br, bl] = sprite.corners().map(to_f32);
        let start = self.sprite_vertices.len() as u32;
        self.sprite_vertices.extend_from_slice(&[
            SpriteVertex { position: tl, uv: [0.0, 0.0] },
            SpriteVertex { position: tr, uv: [1.0, 0.0] },
            SpriteVertex { position: br, uv: [1.0, 1.0] },
            SpriteVertex { position: tl, uv: [0.0, 0.0] },
            SpriteVertex { position: br, uv: [1.0, 1.0] },
            SpriteVertex { position: bl, uv: [0.0, 1.0] },
        ]);
        match self.batches.last_mut() {
            Some(batch) if batch.texture == texture => batch.count += VERTICES_PER_QUAD as u32,
            _ => self.batches.push(Batch {
                texture,
                start,
                count: VERTICES_PER_QUAD as u32,
            }),
        }
    }

    fn queue_lines(&mut self, lines: &[DebugLine]) {
        let room = (MAX_LINE_VERTICES - self.line_vertices.len()) / 2;
        for line in lines.iter().take(room) {
            self.line_vertices.push(LineVertex {
                position: to_f32(line.start),
                color: line.color,
            });
            self.line_vertices.push(LineVertex {
                position: to_f32(line.end),
                color: line.color,
            });
        }
    }

    fn view(&self) -> View2D {
        let width = self.config.width as f32;
        let height = self.config.height as f32;
        let [x, y] = match self.view_center {
            Some(center) => to_f32(center),
            None => [width / 2.0, height / 2.0],
        };
        View2D {
            width,
            height,
            x,
            y,
        }
    }

    fn present(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.queue.write_buffer(
            &self.view_buffer,
            0,
            bytemuck::cast_slice(&self.view().orthographic_matrix()),
        );
        if !self.sprite_vertices.is_empty() {
            self.queue
                .write_buffer(&self.sprite_buffer, 0, bytemuck::cast_slice(&self.sprite_vertices));
        }
        if !self.line_vertices.is_empty() {
            self.queue
                .write_buffer(&self.line_buffer, 0, bytemuck::cast_slice(&self.line_vertices));
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sable_frame_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sable_frame_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &self.view_bind_group, &[]);

            pass.set_pipeline(&self.sprite_pipeline);
            pass.set_vertex_buffer(0, self.sprite_buffer.slice(..));
            for batch in &self.batches {
                let Some(texture) = self.textures.get(batch.texture) else {
                    continue;
                };
                pass.set_bind_group(1, texture, &[]);
                pass.draw(batch.start..batch.start + batch.count, 0..1);
            }

            if !self.line_vertices.is_empty() {
                pass.set_pipeline(&self.line_pipeline);
                pass.set_vertex_buffer(0, self.line_buffer.slice(..));
                pass.draw(0..self.line_vertices.len() as u32, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.config.width = size.width;
            self.config.height = size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }
}

enum PipelineKind {
    Sprite,
    Line,
}

fn create_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    kind: PipelineKind,
) -> wgpu::RenderPipeline {
    let (label, vs, fs, buffer, topology) = match kind {
        PipelineKind::Sprite => (
            "sprite_pipeline",
            "vs_sprite",
            "fs_sprite",
            SpriteVertex::desc(),
            wgpu::PrimitiveTopology::TriangleList,
        ),
        PipelineKind::Line => (
            "line_pipeline",
            "vs_line",
            "fs_line",
            LineVertex::desc(),
            wgpu::PrimitiveTopology::LineList,
        ),
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vs),
            buffers: &[buffer],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

// ---------------------------------------------------------------------------
// Event handling
// ---------------------------------------------------------------------------

struct WindowSettings {
    title: String,
    position: Vector2,
    size: Vector2,
    fullscreen: bool,
    vsync: bool,
}

struct App {
    settings: WindowSettings,
    gpu: Option<Gpu>,
    keyboard: KeyboardState,
    closed: bool,
    init_error: Option<GraphicsError>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() || self.init_error.is_some() {
            return;
        }
        let settings = &self.settings;
        let mut attributes = WindowAttributes::default()
            .with_title(settings.title.clone())
            .with_position(PhysicalPosition::new(settings.position.x, settings.position.y))
            .with_inner_size(PhysicalSize::new(settings.size.x, settings.size.y));
        if settings.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let result = event_loop
            .create_window(attributes)
            .map_err(backend_error)
            .and_then(|window| pollster::block_on(Gpu::new(Arc::new(window), settings.vsync)));
        match result {
            Ok(gpu) => {
                let size = gpu.window.inner_size();
                tracing::info!(
                    width = size.width,
                    height = size.height,
                    vsync = settings.vsync,
                    "window created"
                );
                self.gpu = Some(gpu);
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to create window");
                self.init_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("window close requested");
                self.closed = true;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size);
                }
            }
            WindowEvent::Focused(false) => self.keyboard = KeyboardState::new(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = map_key(code) {
                        self.keyboard.set(key, event.state == ElementState::Pressed);
                    }
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// WindowBackend
// ---------------------------------------------------------------------------

/// Render backend drawing into an OS window.
pub struct WindowBackend {
    event_loop: EventLoop<()>,
    app: App,
}

impl WindowBackend {
    /// Open the window described by `config` and set up the GPU.
    pub fn new(config: &EngineConfig) -> Result<Self, GraphicsError> {
        let mut event_loop = EventLoop::new().map_err(backend_error)?;
        event_loop.set_control_flow(ControlFlow::Poll);
        let mut app = App {
            settings: WindowSettings {
                title: config.title.clone(),
                position: config.window_position,
                size: config.window_size,
                fullscreen: config.fullscreen,
                vsync: config.vsync,
            },
            gpu: None,
            keyboard: KeyboardState::new(),
            closed: false,
            init_error: None,
        };

        for _ in 0..STARTUP_PUMPS {
            let status = event_loop.pump_app_events(Some(Duration::from_millis(1)), &mut app);
            if app.gpu.is_some() || app.init_error.is_some() || matches!(status, PumpStatus::Exit(_)) {
                break;
            }
        }
        if let Some(err) = app.init_error.take() {
            return Err(err);
        }
        if app.gpu.is_none() {
            return Err(GraphicsError::Backend("window was never created".to_owned()));
        }
        Ok(Self { event_loop, app })
    }
}

impl RenderBackend for WindowBackend {
    fn poll_events(&mut self) -> bool {
        if self.app.closed {
            return false;
        }
        if let PumpStatus::Exit(_) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.app)
        {
            self.app.closed = true;
        }
        !self.app.closed
    }

    fn keyboard(&self) -> KeyboardState {
        self.app.keyboard
    }

    fn vsync(&self) -> bool {
        self.app.settings.vsync
    }

    fn load_texture(&mut self, path: &Path) -> Result<Texture, GraphicsError> {
        match self.app.gpu.as_mut() {
            Some(gpu) => gpu.load_texture(path),
            None => Err(GraphicsError::Backend("no window".to_owned())),
        }
    }

    fn begin_frame(&mut self) {
        if let Some(gpu) = self.app.gpu.as_mut() {
            gpu.begin_frame();
        }
    }

    fn set_view_center(&mut self, center: Vector2) {
        if let Some(gpu) = self.app.gpu.as_mut() {
            gpu.view_center = Some(center);
        }
    }

    fn draw_sprite(&mut self, sprite: &Sprite) {
        if let Some(gpu) = self.app.gpu.as_mut() {
            gpu.queue_sprite(sprite);
        }
    }

    fn draw_lines(&mut self, lines: &[DebugLine]) {
        if let Some(gpu) = self.app.gpu.as_mut() {
            gpu.queue_lines(lines);
        }
    }

    fn present(&mut self) {
        let Some(gpu) = self.app.gpu.as_mut() else {
            return;
        };
        match gpu.present() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = gpu.window.inner_size();
                gpu.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("GPU out of memory -- closing window");
                self.app.closed = true;
            }
            Err(e) => tracing::warn!(error = %e, "surface error during present"),
        }
    }

    fn set_title(&mut self, title: &str) {
        if let Some(gpu) = self.app.gpu.as_ref() {
            gpu.window.set_title(title);
        }
    }
}

// ---------------------------------------------------------------------------
// Key mapping
// ---------------------------------------------------------------------------

fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyA => Key::A,
        KeyCode::KeyB => Key::B,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,
        KeyCode::Digit0 => Key::Num0,
        KeyCode::Digit1 => Key::Num1,
        KeyCode::Digit2 => Key::Num2,
        KeyCode::Digit3 => Key::Num3,
        KeyCode::Digit4 => Key::Num4,
        KeyCode::Digit5 => Key::Num5,
        KeyCode::Digit6 => Key::Num6,
        KeyCode::Digit7 => Key::Num7,
        KeyCode::Digit8 => Key::Num8,
        KeyCode::Digit9 => Key::Num9,
        KeyCode::Escape => Key::Escape,
        KeyCode::ControlLeft => Key::LControl,
        KeyCode::ShiftLeft => Key::LShift,
        KeyCode::AltLeft => Key::LAlt,
        KeyCode::SuperLeft => Key::LSystem,
        KeyCode::ControlRight => Key::RControl,
        KeyCode::ShiftRight => Key::RShift,
        KeyCode::AltRight => Key::RAlt,
        KeyCode::SuperRight => Key::RSystem,
        KeyCode::ContextMenu => Key::Menu,
        KeyCode::BracketLeft => Key::LBracket,
        KeyCode::BracketRight => Key::RBracket,
        KeyCode::Semicolon => Key::Semicolon,
        KeyCode::Comma => Key::Comma,
        KeyCode::Period => Key::Period,
        KeyCode::Quote => Key::Quote,
        KeyCode::Slash => Key::Slash,
        KeyCode::Backslash => Key::Backslash,
        KeyCode::Backquote => Key::Tilde,
        KeyCode::Equal => Key::Equal,
        KeyCode::Minus => Key::Dash,
        KeyCode::Space => Key::Space,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Return,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Tab => Key::Tab,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::End => Key::End,
        KeyCode::Home => Key::Home,
        KeyCode::Insert => Key::Insert,
        KeyCode::Delete => Key::Delete,
        KeyCode::NumpadAdd => Key::Add,
        KeyCode::NumpadSubtract => Key::Subtract,
        KeyCode::NumpadMultiply => Key::Multiply,
        KeyCode::NumpadDivide => Key::Divide,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::Numpad0 => Key::Numpad0,
        KeyCode::Numpad1 => Key::Numpad1,
        KeyCode::Numpad2 => Key::Numpad2,
        KeyCode::Numpad3 => Key::Numpad3,
        KeyCode::Numpad4 => Key::Numpad4,
        KeyCode::Numpad5 => Key::Numpad5,
        KeyCode::Numpad6 => Key::Numpad6,
        KeyCode::Numpad7 => Key::Numpad7,
        KeyCode::Numpad8 => Key::Numpad8,
        KeyCode::Numpad9 => Key::Numpad9,
        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        KeyCode::F6 => Key::F6,
        KeyCode::F7 => Key::F7,
        KeyCode::F8 => Key::F8,
        KeyCode::F9 => Key::F9,
        KeyCode::F10 => Key::F10,
        KeyCode::F11 => Key::F11,
        KeyCode::F12 => Key::F12,
        KeyCode::F13 => Key::F13,
        KeyCode::F14 => Key::F14,
        KeyCode::F15 => Key::F15,
        KeyCode::Pause => Key::Pause,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: &[f32; 16], x: f32, y: f32) -> (f32, f32) {
        (m[0] * x + m[4] * y + m[12], m[1] * x + m[5] * y + m[13])
    }

    #[test]
    fn view_maps_screen_corners_to_clip_space() {
        let view = View2D {
            width: 800.0,
            height: 600.0,
            x: 400.0,
            y: 300.0,
        };
        let m = view.orthographic_matrix();
        assert_eq!(apply(&m, 0.0, 0.0), (-1.0, 1.0), "top-left");
        assert_eq!(apply(&m, 800.0, 600.0), (1.0, -1.0), "bottom-right");
        assert_eq!(apply(&m, 400.0, 300.0), (0.0, 0.0), "center");
    }

    #[test]
    fn key_mapping_covers_letters_and_specials() {
        assert_eq!(map_key(KeyCode::KeyA), Some(Key::A));
        assert_eq!(map_key(KeyCode::Space), Some(Key::Space));
        assert_eq!(map_key(KeyCode::F1), Some(Key::F1));
        assert_eq!(map_key(KeyCode::Backquote), Some(Key::Tilde));
        assert_eq!(map_key(KeyCode::CapsLock), None);
    }
}
