pub mod camera;
pub mod catalog;
pub mod controls;
pub mod gpu;
pub mod picking;
pub mod star;

use camera::Camera;
use glam::{Vec3, Vec4};
use gpu::GpuContext;
use star::StarInstance;
use wgpu::util::DeviceExt;

/// Instance buffer capacity; stars beyond this are never rendered.
pub const MAX_STAR_COUNT: usize = 50_000;
const INSTANCE_BUFFER_SIZE: u64 = (std::mem::size_of::<StarInstance>() * MAX_STAR_COUNT) as u64;
const MAX_CONSTELLATION_COUNT: usize = 256;
const LINE_VERTEX_SIZE: u64 = 6 * 4; // 3 position + 3 color floats
const LINE_BUFFER_SIZE: u64 = LINE_VERTEX_SIZE * 2 * MAX_CONSTELLATION_COUNT as u64;
const CONSTELLATION_COLOR: [f32; 3] = [0.0, 1.0, 0.0];

// Deep space black.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

pub const DEFAULT_WINDOW_WIDTH: u32 = 1280;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 720;

/// The prefix of `instances` that fits the instance buffer. Hover and click
/// picking must search this slice, not the full list, so only stars that
/// are actually drawn can be picked.
pub fn renderable_stars(instances: &[StarInstance]) -> &[StarInstance] {
    &instances[..instances.len().min(MAX_STAR_COUNT)]
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
    camera_right: [f32; 4],
    camera_up: [f32; 4],
}

impl GlobalsUniform {
    fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_right: Vec4::from((camera.right_axis(), 0.0)).to_array(),
            camera_up: Vec4::from((camera.up_axis(), 0.0)).to_array(),
        }
    }
}

pub struct Renderer {
    surface: Option<wgpu::Surface<'static>>,
    config: wgpu::SurfaceConfiguration,
    star_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,

    instance_buffer: wgpu::Buffer,
    star_count: u32,

    line_buffer: wgpu::Buffer,
    line_vertex_count: u32,
    constellations: Vec<(Vec3, Vec3)>,

    globals_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    camera: Camera,

    // Offscreen capture resources (PNG export / headless rendering)
    capture_texture: Option<wgpu::Texture>,
    capture_view: Option<wgpu::TextureView>,
    staging_buffer: Option<wgpu::Buffer>,
    bytes_per_row: u32,
}

impl Renderer {
    /// Create a renderer targeting `window`, or an offscreen-only renderer
    /// when `window` is `None` (capture is forced on in that case).
    pub async fn new(
        window: Option<&winit::window::Window>,
        gpu: &GpuContext,
        size: winit::dpi::PhysicalSize<u32>,
        enable_capture: bool,
    ) -> anyhow::Result<Self> {
        let surface = match window {
            Some(window) => {
                let surface = unsafe {
                    let surface = gpu
                        .instance
                        .create_surface_unsafe(wgpu::SurfaceTargetUnsafe::from_window(window)?)?;
                    std::mem::transmute::<wgpu::Surface<'_>, wgpu::Surface<'static>>(surface)
                };
                Some(surface)
            }
            None => None,
        };

        let format = match &surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&gpu.adapter);
                caps.formats
                    .iter()
                    .find(|f| f.is_srgb())
                    .copied()
                    .unwrap_or(caps.formats[0])
            }
            None => wgpu::TextureFormat::Bgra8UnormSrgb,
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        if let Some(surface) = &surface {
            surface.configure(&gpu.device, &config);
        }

        // The starfield scene defaults: fov 70, generous far plane, camera
        // pulled back along +Z.
        let mut camera =
            Camera::perspective(70.0, config.width as f32 / config.height as f32, 0.1, 10000.0);
        camera.position = Vec3::new(0.0, 0.0, 1000.0);
        camera.look_at(Vec3::ZERO);

        let globals_buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals Buffer"),
            contents: bytemuck::cast_slice(&[GlobalsUniform::from_camera(&camera)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let instance_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Star Instance Buffer"),
            size: INSTANCE_BUFFER_SIZE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let line_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Constellation Line Buffer"),
            size: LINE_BUFFER_SIZE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout =
            gpu.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Globals Bind Group Layout"),
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

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let star_shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Star Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/star.wgsl").into()),
        });
        let line_shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/line.wgsl").into()),
        });

        let star_pipeline =
            Self::create_star_pipeline(gpu, &star_shader, &bind_group_layout, config.format);
        let line_pipeline =
            Self::create_line_pipeline(gpu, &line_shader, &bind_group_layout, config.format);

        let capture = enable_capture || window.is_none();
        let (capture_texture, capture_view, staging_buffer, bytes_per_row) = if capture {
            let (texture, view, buffer, bytes_per_row) = Self::create_capture_resources(gpu, &config);
            (Some(texture), Some(view), Some(buffer), bytes_per_row)
        } else {
            (None, None, None, 0)
        };

        Ok(Self {
            surface,
            config,
            star_pipeline,
            line_pipeline,
            instance_buffer,
            star_count: 0,
            line_buffer,
            line_vertex_count: 0,
            constellations: Vec::new(),
            globals_buffer,
            bind_group,
            camera,
            capture_texture,
            capture_view,
            staging_buffer,
            bytes_per_row,
        })
    }

    /// Upload star instances. Instances beyond the buffer capacity are
    /// dropped with a warning.
    pub fn set_stars(&mut self, gpu: &GpuContext, instances: &[StarInstance]) {
        if instances.len() > MAX_STAR_COUNT {
            log::warn!(
                "catalog has {} stars, truncating to {}",
                instances.len(),
                MAX_STAR_COUNT
            );
        }
        let instances = renderable_stars(instances);
        self.star_count = instances.len() as u32;
        if !instances.is_empty() {
            gpu.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
        }
    }

    /// Add a constellation line between two world positions.
    pub fn add_constellation(&mut self, gpu: &GpuContext, a: Vec3, b: Vec3) {
        if self.constellations.len() >= MAX_CONSTELLATION_COUNT {
            log::warn!("constellation limit reached, ignoring new line");
            return;
        }
        self.constellations.push((a, b));
        self.upload_constellations(gpu);
    }

    /// Remove every constellation line.
    pub fn clear_constellations(&mut self) {
        self.constellations.clear();
        self.line_vertex_count = 0;
    }

    pub fn constellation_count(&self) -> usize {
        self.constellations.len()
    }

    fn upload_constellations(&mut self, gpu: &GpuContext) {
        let mut vertices = Vec::with_capacity(self.constellations.len() * 12);
        for (a, b) in &self.constellations {
            for p in [a, b] {
                vertices.extend_from_slice(&p.to_array());
                vertices.extend_from_slice(&CONSTELLATION_COLOR);
            }
        }
        self.line_vertex_count = (self.constellations.len() * 2) as u32;
        if !vertices.is_empty() {
            gpu.queue
                .write_buffer(&self.line_buffer, 0, bytemuck::cast_slice(&vertices));
        }
    }

    /// Render to the window surface (and the capture texture when present).
    pub fn render(&self, gpu: &GpuContext) -> Result<(), wgpu::SurfaceError> {
        let Some(surface) = &self.surface else {
            self.render_to_texture(gpu);
            return Ok(());
        };
        let output = surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.update_globals(gpu);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        if let Some(capture_view) = &self.capture_view {
            self.encode_render_pass(&mut encoder, capture_view);
        }
        self.encode_render_pass(&mut encoder, &surface_view);

        let submission_index = gpu.queue.submit(Some(encoder.finish()));
        if self.capture_texture.is_some() {
            gpu.device
                .poll(wgpu::MaintainBase::WaitForSubmissionIndex(submission_index));
        }
        output.present();
        Ok(())
    }

    /// Render only to the capture texture (headless mode).
    pub fn render_to_texture(&self, gpu: &GpuContext) {
        let Some(capture_view) = &self.capture_view else {
            return;
        };
        self.update_globals(gpu);
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Offscreen Encoder"),
            });
        self.encode_render_pass(&mut encoder, capture_view);
        let submission_index = gpu.queue.submit(Some(encoder.finish()));
        gpu.device
            .poll(wgpu::MaintainBase::WaitForSubmissionIndex(submission_index));
    }

    /// Read back the last frame rendered to the capture texture as tightly
    /// packed pixels in the surface format (BGRA on most platforms).
    pub fn capture_frame(&self, gpu: &GpuContext) -> Option<Vec<u8>> {
        let capture_texture = self.capture_texture.as_ref()?;
        let staging_buffer = self.staging_buffer.as_ref()?;

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Capture Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: capture_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: staging_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(self.bytes_per_row),
                    rows_per_image: Some(self.config.height),
                },
            },
            wgpu::Extent3d {
                width: self.config.width,
                height: self.config.height,
                depth_or_array_layers: 1,
            },
        );
        let copy_submission = gpu.queue.submit(Some(encoder.finish()));
        gpu.device
            .poll(wgpu::MaintainBase::WaitForSubmissionIndex(copy_submission));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        gpu.device.poll(wgpu::MaintainBase::Wait);
        pollster::block_on(rx).ok()?.ok()?;

        let data = buffer_slice.get_mapped_range();
        let unpadded_bytes_per_row = self.config.width * 4;
        let mut frame_data =
            Vec::with_capacity((self.config.width * self.config.height * 4) as usize);
        for y in 0..self.config.height {
            let row_start = (y * self.bytes_per_row) as usize;
            let row_end = row_start + unpadded_bytes_per_row as usize;
            frame_data.extend_from_slice(&data[row_start..row_end]);
        }
        drop(data);
        staging_buffer.unmap();

        Some(frame_data)
    }

    pub fn resize(&mut self, gpu: &GpuContext, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            if let Some(surface) = &self.surface {
                surface.configure(&gpu.device, &self.config);
            }
            if self.capture_texture.is_some() {
                let (texture, view, buffer, bytes_per_row) =
                    Self::create_capture_resources(gpu, &self.config);
                self.capture_texture = Some(texture);
                self.capture_view = Some(view);
                self.staging_buffer = Some(buffer);
                self.bytes_per_row = bytes_per_row;
            }
            self.camera
                .set_aspect(self.config.width as f32 / self.config.height as f32);
            self.update_globals(gpu);
        }
    }

    fn create_capture_resources(
        gpu: &GpuContext,
        config: &wgpu::SurfaceConfiguration,
    ) -> (wgpu::Texture, wgpu::TextureView, wgpu::Buffer, u32) {
        let unpadded_bytes_per_row = config.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = ((unpadded_bytes_per_row + align - 1) / align) * align;

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let buffer_size = padded_bytes_per_row as u64 * config.height as u64;
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Staging Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        (texture, view, buffer, padded_bytes_per_row)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    fn update_globals(&self, gpu: &GpuContext) {
        let globals = GlobalsUniform::from_camera(&self.camera);
        gpu.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&[globals]));
    }

    fn create_star_pipeline(
        gpu: &GpuContext,
        shader: &wgpu::ShaderModule,
        bind_group_layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Star Pipeline Layout"),
                bind_group_layouts: &[bind_group_layout],
                push_constant_ranges: &[],
            });

        gpu.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Star Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: "vs_main",
                    buffers: &[Self::instance_buffer_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
    }

    fn create_line_pipeline(
        gpu: &GpuContext,
        shader: &wgpu::ShaderModule,
        bind_group_layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Line Pipeline Layout"),
                bind_group_layouts: &[bind_group_layout],
                push_constant_ranges: &[],
            });

        gpu.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Line Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: "vs_main",
                    buffers: &[Self::line_buffer_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::LineList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
    }

    fn instance_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StarInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // center
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // radius
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32,
                },
                // color
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }

    fn line_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: LINE_VERTEX_SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }

    fn encode_render_pass(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Starfield Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if self.star_count > 0 {
            render_pass.set_pipeline(&self.star_pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
            render_pass.draw(0..6, 0..self.star_count);
        }

        if self.line_vertex_count > 0 {
            render_pass.set_pipeline(&self.line_pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.line_buffer.slice(..));
            render_pass.draw(0..self.line_vertex_count, 0..1);
        }
    }
}
