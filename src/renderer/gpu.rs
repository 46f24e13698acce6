use anyhow::{Context, bail};
use wgpu::util::DeviceExt;

use crate::image::RasterImage;
use crate::renderer::camera::{Camera, CameraUniform, ModelUniform};
use crate::surface::Surface;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.016,
    g: 0.02,
    b: 0.031,
    a: 1.0,
};

pub const FLOOR_Y: f32 = -2.2;
const FLOOR_EXTENT: f32 = 8.0;
const FLOOR_DIVISIONS: u32 = 16;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    tint: [f32; 3],
    _padding: f32,
}

/// One indexed draw range with its own material bind group. The cube carries
/// six of these so side faces can be tinted darker than the front.
pub struct FaceGroupDraw {
    pub index_start: u32,
    pub index_count: u32,
    pub bind_group: wgpu::BindGroup,
    tint_buffer: wgpu::Buffer,
}

/// GPU mirror of one surface generation: geometry buffers plus the image
/// texture. Created on install, explicitly destroyed on dispose so stale
/// generations never outlive their CPU counterpart.
pub struct SurfaceResources {
    position_buffer: wgpu::Buffer,
    normal_buffer: wgpu::Buffer,
    uv_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    vertex_count: u32,
    texture: wgpu::Texture,
    groups: Vec<FaceGroupDraw>,
}

impl SurfaceResources {
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// Tightly packed RGBA8 copy of one rendered frame.
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub struct GpuState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,

    pipeline_mesh: wgpu::RenderPipeline,
    pipeline_grid: wgpu::RenderPipeline,

    camera_buffer: wgpu::Buffer,
    model_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    grid_vertex_buffer: wgpu::Buffer,
    grid_vertex_count: u32,

    depth_texture: wgpu::TextureView,
}

fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: 12,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

fn normal_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: 12,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

fn uv_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: 8,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        }],
    }
}

impl GpuState {
    pub async fn new(window: std::sync::Arc<winit::window::Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .unwrap();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .unwrap();

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let model_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Buffer"),
            size: std::mem::size_of::<ModelUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: model_buffer.as_entire_binding(),
                },
            ],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Surface Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&scene_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let pipeline_mesh = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Render Pipeline"),
            layout: Some(&mesh_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_mesh"),
                buffers: &[position_layout(), normal_layout(), uv_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_mesh"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let grid_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Grid Pipeline Layout"),
            bind_group_layouts: &[&scene_layout],
            push_constant_ranges: &[],
        });

        let pipeline_grid = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Grid Render Pipeline"),
            layout: Some(&grid_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_grid"),
                buffers: &[position_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_grid"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let grid_vertices = floor_grid_vertices(FLOOR_EXTENT, FLOOR_DIVISIONS, FLOOR_Y);
        let grid_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Floor Grid Buffer"),
            contents: bytemuck::cast_slice(&grid_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let grid_vertex_count = (grid_vertices.len() / 3) as u32;

        let depth_texture = Self::create_depth_texture(&device, config.width, config.height);

        Self {
            surface,
            device,
            queue,
            config,
            size,
            pipeline_mesh,
            pipeline_grid,
            camera_buffer,
            model_buffer,
            scene_bind_group,
            material_layout,
            sampler,
            grid_vertex_buffer,
            grid_vertex_count,
            depth_texture,
        }
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture =
                Self::create_depth_texture(&self.device, new_size.width, new_size.height);
        }
    }

    pub fn update_camera(&self, camera: &Camera) {
        let uniform = CameraUniform::from_camera(camera);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn update_model(&self, model: glam::Mat4) {
        let uniform = ModelUniform::from_matrix(model);
        self.queue
            .write_buffer(&self.model_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    /// Uploads one surface generation: geometry buffers, the image texture and
    /// a material bind group per face group.
    pub fn install_surface(&self, surface: &Surface, image: &RasterImage) -> SurfaceResources {
        let mesh = &surface.mesh;

        let position_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Position Buffer"),
            contents: bytemuck::cast_slice(&mesh.positions),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let normal_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Normal Buffer"),
            contents: bytemuck::cast_slice(&mesh.normals),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let uv_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface UV Buffer"),
            contents: bytemuck::cast_slice(&mesh.uvs),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Surface Texture"),
            size: wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
        );

        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let groups = surface
            .face_groups
            .iter()
            .map(|group| {
                let tint = MaterialUniform {
                    tint: group.tint,
                    _padding: 0.0,
                };
                let tint_buffer =
                    self.device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("Material Tint Buffer"),
                            contents: bytemuck::cast_slice(&[tint]),
                            usage: wgpu::BufferUsages::UNIFORM,
                        });

                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Material Bind Group"),
                    layout: &self.material_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&texture_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: tint_buffer.as_entire_binding(),
                        },
                    ],
                });

                FaceGroupDraw {
                    index_start: group.index_start,
                    index_count: group.index_count,
                    bind_group,
                    tint_buffer,
                }
            })
            .collect();

        SurfaceResources {
            position_buffer,
            normal_buffer,
            uv_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            vertex_count: mesh.vertex_count() as u32,
            texture,
            groups,
        }
    }

    /// Releases the GPU side of a retired generation. Destruction is explicit
    /// so the memory comes back before the next rebuild allocates.
    pub fn dispose_surface(&self, resources: SurfaceResources) {
        resources.position_buffer.destroy();
        resources.normal_buffer.destroy();
        resources.uv_buffer.destroy();
        resources.index_buffer.destroy();
        for group in &resources.groups {
            group.tint_buffer.destroy();
        }
        resources.texture.destroy();
        log::debug!(
            "released surface resources ({} vertices)",
            resources.vertex_count
        );
    }

    /// Re-uploads positions and normals after in-place displacement. The
    /// buffers were sized for this topology, so the write always fits.
    pub fn update_geometry(&self, resources: &SurfaceResources, surface: &Surface) {
        self.queue.write_buffer(
            &resources.position_buffer,
            0,
            bytemuck::cast_slice(&surface.mesh.positions),
        );
        self.queue.write_buffer(
            &resources.normal_buffer,
            0,
            bytemuck::cast_slice(&surface.mesh.normals),
        );
    }

    pub fn render_scene(
        &self,
        view: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
        resources: Option<&SurfaceResources>,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline_grid);
        render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.grid_vertex_buffer.slice(..));
        render_pass.draw(0..self.grid_vertex_count, 0..1);

        if let Some(resources) = resources {
            render_pass.set_pipeline(&self.pipeline_mesh);
            render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
            render_pass.set_vertex_buffer(0, resources.position_buffer.slice(..));
            render_pass.set_vertex_buffer(1, resources.normal_buffer.slice(..));
            render_pass.set_vertex_buffer(2, resources.uv_buffer.slice(..));
            render_pass.set_index_buffer(
                resources.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            for group in &resources.groups {
                render_pass.set_bind_group(1, &group.bind_group, &[]);
                render_pass.draw_indexed(
                    group.index_start..group.index_start + group.index_count,
                    0,
                    0..1,
                );
            }
        }
    }

    pub fn render(&self, view: &wgpu::TextureView, encoder: &mut wgpu::CommandEncoder, resources: Option<&SurfaceResources>) {
        self.render_scene(view, &self.depth_texture, encoder, resources);
    }

    /// Renders the scene into an offscreen target and reads the pixels back.
    /// Blocks on the map; export is an explicit user action, not per-frame.
    pub fn capture_frame(
        &self,
        resources: Option<&SurfaceResources>,
    ) -> anyhow::Result<CapturedFrame> {
        let width = self.config.width;
        let height = self.config.height;

        let target = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let padded_bpr = aligned_bytes_per_row(width);
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Readback Buffer"),
            size: padded_bpr as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Capture Encoder"),
            });

        self.render_scene(&target_view, &self.depth_texture, &mut encoder, resources);

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bpr),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .context("map callback dropped")?
            .context("mapping capture buffer failed")?;

        let padded = slice.get_mapped_range().to_vec();
        readback.unmap();
        target.destroy();

        let mut pixels = depad_rows(&padded, width, height, padded_bpr);
        match self.config.format {
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {}
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
                swap_red_blue(&mut pixels);
            }
            other => bail!("unsupported capture format {other:?}"),
        }

        Ok(CapturedFrame {
            width,
            height,
            pixels,
        })
    }
}

/// Row stride rounded up to the copy alignment wgpu requires for
/// texture-to-buffer transfers.
pub fn aligned_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn depad_rows(padded: &[u8], width: u32, height: u32, padded_bpr: u32) -> Vec<u8> {
    let row_bytes = (width * 4) as usize;
    let mut out = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * padded_bpr as usize;
        out.extend_from_slice(&padded[start..start + row_bytes]);
    }
    out
}

fn swap_red_blue(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

/// Line segments for the floor grid under the surface, lying in the y = `y`
/// plane.
pub fn floor_grid_vertices(extent: f32, divisions: u32, y: f32) -> Vec<f32> {
    let mut vertices = Vec::with_capacity(((divisions + 1) * 4 * 3) as usize);
    let step = extent * 2.0 / divisions as f32;

    for i in 0..=divisions {
        let pos = -extent + i as f32 * step;
        vertices.extend_from_slice(&[pos, y, -extent, pos, y, extent]);
        vertices.extend_from_slice(&[-extent, y, pos, extent, y, pos]);
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_row_is_aligned_and_sufficient() {
        for width in [1, 63, 64, 100, 255, 256, 1600] {
            let bpr = aligned_bytes_per_row(width);
            assert_eq!(bpr % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
            assert!(bpr >= width * 4);
            assert!(bpr - width * 4 < wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        }
    }

    #[test]
    fn depad_strips_row_padding() {
        // 2x2 image, rows padded to 12 bytes instead of 8.
        let padded = vec![
            1, 2, 3, 4, 5, 6, 7, 8, 0, 0, 0, 0, //
            9, 10, 11, 12, 13, 14, 15, 16, 0, 0, 0, 0,
        ];
        let tight = depad_rows(&padded, 2, 2, 12);
        assert_eq!(
            tight,
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]
        );
    }

    #[test]
    fn bgra_swizzle_swaps_channels_in_place() {
        let mut pixels = vec![10, 20, 30, 255, 40, 50, 60, 128];
        swap_red_blue(&mut pixels);
        assert_eq!(pixels, vec![30, 20, 10, 255, 60, 50, 40, 128]);
    }

    #[test]
    fn floor_grid_lies_in_one_plane() {
        let vertices = floor_grid_vertices(8.0, 16, FLOOR_Y);

        assert_eq!(vertices.len() % 6, 0);
        for vertex in vertices.chunks(3) {
            assert_eq!(vertex[1], FLOOR_Y);
            assert!(vertex[0].abs() <= 8.0);
            assert!(vertex[2].abs() <= 8.0);
        }
    }
}
