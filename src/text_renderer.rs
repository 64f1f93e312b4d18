use crate::buffer::{BufferObject, BufferSink};
use crate::config::TextConfig;
use crate::shaper::GlyphVertex;
use crate::style::TextStyle;
use crate::text_cache::TextShapeCache;
use crate::texture::{AtlasTexture, AtlasUploader};
use bytemuck::{Pod, Zeroable};
use ultraviolet::Vec2;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct TextUniforms {
    mvp: [[f32; 4]; 4],
    atlas_size: [f32; 2],
    depth: f32,
    _pad: f32,
}

/// Maps y-up pixel coordinates with the origin at the bottom-left corner to clip space.
fn orthographic_projection(width: f32, height: f32) -> [[f32; 4]; 4] {
    [
        [2.0 / width, 0.0, 0.0, 0.0],
        [0.0, 2.0 / height, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [-1.0, -1.0, 0.0, 1.0],
    ]
}

const GLYPH_ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x2, // uv
    2 => Float32x4, // color
    3 => Float32,   // shift
    4 => Float32,   // gamma
];

fn glyph_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GlyphVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &GLYPH_ATTRS,
    }
}

const SHADER: &str = r#"
struct Uniforms {
    mvp: mat4x4<f32>,
    atlas_size: vec2<f32>,
    depth: f32,
    _pad: f32,
};

@group(0) @binding(0)
var<uniform> u: Uniforms;

@group(1) @binding(0)
var atlas: texture_2d<f32>;

@group(1) @binding(1)
var samp: sampler;

struct VsIn {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) color: vec4<f32>,
    @location(3) shift: f32,
    @location(4) gamma: f32,
};

struct VsOut {
    @builtin(position) clip_pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) shift: f32,
    @location(3) gamma: f32,
};

@vertex
fn vs_main(in: VsIn) -> VsOut {
    var out: VsOut;
    out.clip_pos = u.mvp * vec4<f32>(in.position, 1.0);
    out.uv = in.uv;
    out.color = in.color;
    out.shift = in.shift;
    out.gamma = in.gamma;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    var coverage: vec3<f32>;
    if (u.depth < 2.0) {
        coverage = vec3<f32>(textureSample(atlas, samp, in.uv).r);
    } else {
        // Subpixel texels: move the sample by the fractional pen position.
        let du = in.shift / (3.0 * u.atlas_size.x);
        coverage = textureSample(atlas, samp, in.uv - vec2<f32>(du, 0.0)).rgb;
    }
    let g = max(in.gamma, 0.01);
    coverage = pow(coverage, vec3<f32>(1.0 / g));
    let rgb = in.color.rgb * coverage * in.color.a;
    let a = max(coverage.r, max(coverage.g, coverage.b)) * in.color.a;
    return vec4<f32>(rgb, a);
}
"#;

/// GPU buffer that grows to the next power of two when a create outgrows it.
struct GpuBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    buffer: Option<wgpu::Buffer>,
    capacity: u64,
}

impl GpuBuffer {
    fn new(label: &'static str, usage: wgpu::BufferUsages) -> Self {
        Self {
            label,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            buffer: None,
            capacity: 0,
        }
    }

    fn reserve(&mut self, device: &wgpu::Device, size: u64) -> &wgpu::Buffer {
        if self.buffer.is_none() || size > self.capacity {
            self.capacity = size.max(wgpu::COPY_BUFFER_ALIGNMENT).next_power_of_two();
            log::debug!("{}: allocating {} bytes", self.label, self.capacity);
            if let Some(old) = self.buffer.take() {
                old.destroy();
            }
        }
        self.buffer.get_or_insert_with(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: self.capacity,
                usage: self.usage,
                mapped_at_creation: false,
            })
        })
    }
}

/// Pushes buffer object commits into a [`GpuBuffer`].
struct WgpuBufferSink<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    target: &'a mut GpuBuffer,
}

impl BufferSink for WgpuBufferSink<'_> {
    fn create(&mut self, bytes: &[u8]) {
        let buffer = self.target.reserve(self.device, bytes.len() as u64);
        if !bytes.is_empty() {
            self.queue.write_buffer(buffer, 0, bytes);
        }
    }

    fn update(&mut self, offset: u64, bytes: &[u8]) {
        let end = offset + bytes.len() as u64;
        if end > self.target.capacity {
            log::warn!(
                "{}: update past capacity ({} > {}), dropped",
                self.target.label,
                end,
                self.target.capacity
            );
            return;
        }
        if let Some(buffer) = &self.target.buffer {
            self.queue.write_buffer(buffer, offset, bytes);
        }
    }
}

/// Draws cached, shaped text with one indexed draw per frame.
///
/// Frame protocol: `begin_frame`, any number of `queue_text`, `draw` inside a
/// render pass, then `end_frame`.
pub struct TextRenderer {
    pipeline: wgpu::RenderPipeline,

    uniform_buffer: wgpu::Buffer,
    uniform_bg: wgpu::BindGroup,

    atlas_texture: AtlasTexture,
    atlas_bg: wgpu::BindGroup,

    cache: TextShapeCache,

    vertices: BufferObject<GlyphVertex>,
    indices: BufferObject<u32>,
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,

    last_screen_size: [u32; 2],
}

impl TextRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        config: &TextConfig,
    ) -> anyhow::Result<Self> {
        Self::with_cache(device, surface_format, TextShapeCache::new(config))
    }

    /// Renderer over an existing cache; the atlas texture matches the cache's atlas.
    pub fn with_cache(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        cache: TextShapeCache,
    ) -> anyhow::Result<Self> {
        let atlas = cache.fonts().atlas();
        let atlas_texture = AtlasTexture::new(device, atlas.width(), atlas.height(), atlas.depth())?;

        let uniforms = TextUniforms {
            mvp: orthographic_projection(1.0, 1.0),
            atlas_size: [atlas.width() as f32, atlas.height() as f32],
            depth: atlas.depth() as f32,
            _pad: 0.0,
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("text_uniform_buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("text_uniform_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<TextUniforms>() as u64),
                },
                count: None,
            }],
        });

        let uniform_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("text_uniform_bg"),
            layout: &uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("text_atlas_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let atlas_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("text_atlas_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
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

        let atlas_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("text_atlas_bg"),
            layout: &atlas_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&atlas_sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("text_shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("text_pipeline_layout"),
            bind_group_layouts: &[&uniform_bgl, &atlas_bgl],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("text_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[glyph_vertex_layout()],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview_mask: None,
            cache: None,
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bg,
            atlas_texture,
            atlas_bg,
            cache,
            vertices: BufferObject::new(),
            indices: BufferObject::new(),
            vertex_buffer: GpuBuffer::new("text_vertex_buffer", wgpu::BufferUsages::VERTEX),
            index_buffer: GpuBuffer::new("text_index_buffer", wgpu::BufferUsages::INDEX),
            last_screen_size: [0, 0],
        })
    }

    pub fn begin_frame(&mut self, screen_w: u32, screen_h: u32, queue: &wgpu::Queue) {
        if self.last_screen_size == [screen_w, screen_h] {
            return;
        }
        let u = TextUniforms {
            mvp: orthographic_projection(screen_w.max(1) as f32, screen_h.max(1) as f32),
            atlas_size: [self.atlas_texture.width as f32, self.atlas_texture.height as f32],
            depth: self.atlas_texture.depth as f32,
            _pad: 0.0,
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&u));
        self.last_screen_size = [screen_w, screen_h];
    }

    /// Adds `text` with its first baseline starting at `position` (y-up pixels).
    ///
    /// Whole-pixel positions keep decoration edges on texel boundaries.
    pub fn queue_text(&mut self, style: &TextStyle, text: &str, position: Vec2) -> anyhow::Result<()> {
        let shaped = self.cache.get(style, text)?;
        let buffer = shaped.buffer();
        if buffer.is_empty() {
            return Ok(());
        }

        let base = self.vertices.len() as u32;
        let moved: Vec<GlyphVertex> = buffer
            .vertices()
            .iter()
            .map(|v| {
                let mut v = *v;
                v.position[0] += position.x;
                v.position[1] += position.y;
                v
            })
            .collect();
        let rebased: Vec<u32> = buffer.indices().iter().map(|i| i + base).collect();
        self.vertices.append(&moved);
        self.indices.append(&rebased);
        Ok(())
    }

    /// Uploads the atlas and the frame batch, then draws it.
    pub fn draw(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>) {
        self.cache.fonts_mut().atlas_mut().commit(&mut AtlasUploader {
            texture: &self.atlas_texture,
            queue,
        });
        self.vertices.commit(&mut WgpuBufferSink {
            device,
            queue,
            target: &mut self.vertex_buffer,
        });
        self.indices.commit(&mut WgpuBufferSink {
            device,
            queue,
            target: &mut self.index_buffer,
        });

        let index_count = self.indices.len() as u32;
        let (Some(vb), Some(ib)) = (&self.vertex_buffer.buffer, &self.index_buffer.buffer) else {
            return;
        };
        if index_count == 0 {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bg, &[]);
        pass.set_bind_group(1, &self.atlas_bg, &[]);
        pass.set_vertex_buffer(0, vb.slice(..));
        pass.set_index_buffer(ib.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..index_count, 0, 0..1);
    }

    /// Drops the frame batch and ages the shape cache by one frame.
    pub fn end_frame(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.cache.advance_frame();
    }

    pub fn cache(&self) -> &TextShapeCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut TextShapeCache {
        &mut self.cache
    }
}
