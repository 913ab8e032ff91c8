//! GPU implementation of the warp composite (`gpu` feature).
//!
//! The captured CPU target is uploaded as a texture and presented through the
//! embedded two-stage warp program: a fullscreen triangle and a fragment
//! stage applying the same horizontal compression and trapezoid inset as
//! [`crate::warp_cpu`]. The WGSL source is an immutable constant; the
//! compiled pipeline is owned by the compositor for its lifetime.

use crate::{
    core::{Canvas, FrameRgba},
    error::{CinecrawlError, CinecrawlResult},
};

pub const WARP_SHADER_WGSL: &str = r#"
struct VsOut {
  @builtin(position) pos: vec4<f32>,
  @location(0) uv: vec2<f32>,
};

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> VsOut {
  var p = array<vec2<f32>, 3>(
    vec2<f32>(-1.0, -1.0),
    vec2<f32>( 3.0, -1.0),
    vec2<f32>(-1.0,  3.0),
  );
  let pos = p[vi];
  var o: VsOut;
  o.pos = vec4<f32>(pos, 0.0, 1.0);
  o.uv = vec2<f32>((pos.x + 1.0) * 0.5, 1.0 - (pos.y + 1.0) * 0.5);
  return o;
}

@group(0) @binding(0) var t_src: texture_2d<f32>;
@group(0) @binding(1) var s_src: sampler;
// x: top inset in pixels, y: warp flag, z: canvas width, w: canvas height
@group(0) @binding(2) var<uniform> params: vec4<f32>;

@fragment
fn fs(in: VsOut) -> @location(0) vec4<f32> {
  if (params.y < 0.5) {
    let c = textureSampleLevel(t_src, s_src, in.uv, 0.0);
    return vec4<f32>(c.rgb, 1.0);
  }

  // v runs 0 at the bottom of the screen to 1 at the top.
  let v = 1.0 - in.uv.y;
  let inset = (params.x * v) / params.z;
  let span = 1.0 - 2.0 * inset;
  if (span <= 0.0) {
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
  }
  let q = (in.uv.x - inset) / span;
  if (q < 0.0 || q > 1.0) {
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
  }

  let scale = 1.0 + v * (0.3 - 1.0);
  let x = clamp((q - 0.5) / scale + 0.5, 0.0, 1.0);
  let c = textureSampleLevel(t_src, s_src, vec2<f32>(x, in.uv.y), 0.0);
  return vec4<f32>(c.rgb, 1.0);
}
"#;

pub struct GpuWarpCompositor {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params: wgpu::Buffer,
    src_texture: wgpu::Texture,
    src_view: wgpu::TextureView,
    target_texture: wgpu::Texture,
    target_view: wgpu::TextureView,
    readback: wgpu::Buffer,
    readback_bytes_per_row: u32,
    canvas: Canvas,
}

impl GpuWarpCompositor {
    pub fn new(canvas: Canvas) -> CinecrawlResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(CinecrawlError::resource(
                "gpu target dimensions must be > 0",
            ));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                CinecrawlError::resource("no gpu adapter available")
            }
            other => CinecrawlError::resource(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| CinecrawlError::resource(format!("wgpu request_device failed: {e:?}")))?;

        let texture_desc = |label, usage| wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: canvas.width,
                height: canvas.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage,
            view_formats: &[],
        };

        let src_texture = device.create_texture(&texture_desc(
            "cinecrawl_capture",
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        ));
        let src_view = src_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let target_texture = device.create_texture(&texture_desc(
            "cinecrawl_screen",
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        ));
        let target_view = target_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("cinecrawl_warp_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cinecrawl_warp_params"),
            size: 16,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cinecrawl_warp_bgl"),
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(std::num::NonZeroU64::new(16).unwrap()),
                    },
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("cinecrawl_warp_shader"),
            source: wgpu::ShaderSource::Wgsl(WARP_SHADER_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("cinecrawl_warp_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("cinecrawl_warp_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let bytes_per_row_unpadded = canvas
            .width
            .checked_mul(4)
            .ok_or_else(|| CinecrawlError::resource("gpu target width overflow"))?;
        let readback_bytes_per_row =
            align_to(bytes_per_row_unpadded, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let buffer_size = (readback_bytes_per_row as u64)
            .checked_mul(canvas.height as u64)
            .ok_or_else(|| CinecrawlError::resource("readback buffer size overflow"))?;
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cinecrawl_readback"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            sampler,
            params,
            src_texture,
            src_view,
            target_texture,
            target_view,
            readback,
            readback_bytes_per_row,
            canvas,
        })
    }

    /// Present a captured premultiplied RGBA8 frame through the warp program.
    pub fn composite(
        &self,
        src_rgba8_premul: &[u8],
        warp: bool,
        top_inset_px: f32,
    ) -> CinecrawlResult<FrameRgba> {
        let expected_len = (self.canvas.width as usize) * (self.canvas.height as usize) * 4;
        if src_rgba8_premul.len() != expected_len {
            return Err(CinecrawlError::render(
                "gpu composite expects src matching width*height*4",
            ));
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.src_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            src_rgba8_premul,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.canvas.width * 4),
                rows_per_image: Some(self.canvas.height),
            },
            wgpu::Extent3d {
                width: self.canvas.width,
                height: self.canvas.height,
                depth_or_array_layers: 1,
            },
        );

        let mut params = [0u8; 16];
        params[0..4].copy_from_slice(&top_inset_px.to_le_bytes());
        params[4..8].copy_from_slice(&(if warp { 1.0f32 } else { 0.0 }).to_le_bytes());
        params[8..12].copy_from_slice(&(self.canvas.width as f32).to_le_bytes());
        params[12..16].copy_from_slice(&(self.canvas.height as f32).to_le_bytes());
        self.queue.write_buffer(&self.params, 0, &params);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cinecrawl_warp_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.src_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cinecrawl_warp_encoder"),
            });

        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("cinecrawl_warp_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_pipeline(&self.pipeline);
            rp.set_bind_group(0, &bind_group, &[]);
            rp.draw(0..3, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.readback_bytes_per_row),
                    rows_per_image: Some(self.canvas.height),
                },
            },
            wgpu::Extent3d {
                width: self.canvas.width,
                height: self.canvas.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| CinecrawlError::render(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| CinecrawlError::render("readback channel closed"))?
            .map_err(|e| CinecrawlError::render(format!("readback map failed: {e:?}")))?;

        let mapped = buffer_slice.get_mapped_range();
        let row_bytes = (self.canvas.width as usize) * 4;
        let padded_row_bytes = self.readback_bytes_per_row as usize;
        let mut out = Vec::with_capacity(row_bytes * self.canvas.height as usize);
        for row in 0..self.canvas.height as usize {
            let start = row * padded_row_bytes;
            out.extend_from_slice(&mapped[start..start + row_bytes]);
        }
        drop(mapped);
        self.readback.unmap();

        Ok(FrameRgba {
            width: self.canvas.width,
            height: self.canvas.height,
            data: out,
        })
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}
