use std::time::{Duration, Instant};

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::backend::{FrameStatus, GraphicsBackend};
use crate::compile;
use crate::error::RendererError;
use crate::grid::BYTES_PER_TEXEL;
use crate::types::{DeltaUniform, GpuPowerPreference, GridSize};

use super::context::GpuContext;
use super::pipeline::{Pipelines, GENERATION_FORMAT, QUAD_VERTICES};

/// A generation texture on the device together with the bind group that
/// samples it.
#[derive(Debug)]
pub struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    size: GridSize,
}

struct OpenFrame {
    surface: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

struct FrameStats {
    last_update: Instant,
    frames_since_update: u32,
    total_frames: u64,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frames_since_update: 0,
            total_frames: 0,
        }
    }

    fn record(&mut self) {
        self.frames_since_update += 1;
        self.total_frames += 1;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames_since_update as f32 / elapsed.as_secs_f32();
            debug!(fps = fps.round(), frames = self.total_frames, "frame stats");
            self.frames_since_update = 0;
            self.last_update = now;
        }
    }
}

/// wgpu implementation of [`GraphicsBackend`] presenting to a window
/// surface.
pub struct GpuBackend {
    context: GpuContext,
    pipelines: Pipelines,
    sampler: wgpu::Sampler,
    vertex_buffer: wgpu::Buffer,
    delta_buffer: wgpu::Buffer,
    delta_bind_group: wgpu::BindGroup,
    frame: Option<OpenFrame>,
    stats: FrameStats,
}

impl GpuBackend {
    /// Creates the device, compiles both programs and builds the shared
    /// resources. Any failure here is reported once and nothing runs.
    pub fn new<T>(
        target: &T,
        size: GridSize,
        power: GpuPowerPreference,
    ) -> Result<Self, RendererError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let compute_program = compile::compute_program()?;
        let render_program = compile::render_program()?;

        let context = GpuContext::new(target, size, power).map_err(RendererError::Init)?;
        let device = &context.device;

        let pipelines = Pipelines::new(
            device,
            context.surface_format,
            &compute_program,
            &render_program,
        )?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("generation sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let delta_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("delta uniform"),
            contents: bytemuck::bytes_of(&size.delta()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let delta_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("delta bind group"),
            layout: &pipelines.delta_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: delta_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            context,
            pipelines,
            sampler,
            vertex_buffer,
            delta_buffer,
            delta_bind_group,
            frame: None,
            stats: FrameStats::new(),
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.context.adapter.name
    }

    fn check_size(&self, size: GridSize) -> Result<(), RendererError> {
        let max = self.context.max_dimension;
        if size.width() > max || size.height() > max {
            return Err(RendererError::TextureTooLarge { size, max });
        }
        Ok(())
    }

    fn allocate(&self, size: GridSize) -> GpuTexture {
        let device = &self.context.device;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("generation texture"),
            size: wgpu::Extent3d {
                width: size.width(),
                height: size.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: GENERATION_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("generation bind group"),
            layout: &self.pipelines.texture_layout,
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
        GpuTexture {
            texture,
            view,
            bind_group,
            size,
        }
    }

    fn draw_quad(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        pipeline: &wgpu::RenderPipeline,
        bind_groups: &[&wgpu::BindGroup],
        label: &str,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        for (index, bind_group) in bind_groups.iter().enumerate() {
            pass.set_bind_group(index as u32, *bind_group, &[]);
        }
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}

impl GraphicsBackend for GpuBackend {
    type Texture = GpuTexture;

    fn create_texture(&mut self, size: GridSize) -> Result<GpuTexture, RendererError> {
        self.check_size(size)?;
        Ok(self.allocate(size))
    }

    fn upload(
        &mut self,
        texture: &mut GpuTexture,
        size: GridSize,
        texels: &[u8],
    ) -> Result<(), RendererError> {
        let expected = size.texel_count() * BYTES_PER_TEXEL;
        if texels.len() != expected {
            return Err(RendererError::UploadSize {
                size,
                expected,
                actual: texels.len(),
            });
        }
        if texture.size != size {
            self.check_size(size)?;
            texture.texture.destroy();
            *texture = self.allocate(size);
        }

        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width() * BYTES_PER_TEXEL as u32),
                rows_per_image: Some(size.height()),
            },
            wgpu::Extent3d {
                width: size.width(),
                height: size.height(),
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn set_viewport(&mut self, size: GridSize) -> Result<(), RendererError> {
        self.check_size(size)?;
        self.context.resize(size);
        Ok(())
    }

    fn set_delta(&mut self, delta: DeltaUniform) -> Result<(), RendererError> {
        self.context
            .queue
            .write_buffer(&self.delta_buffer, 0, bytemuck::bytes_of(&delta));
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<FrameStatus, RendererError> {
        let surface = match self.context.surface.get_current_texture() {
            Ok(surface) => surface,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Timeout) => {
                warn!("surface unavailable; reconfiguring and skipping frame");
                self.context.reconfigure();
                return Ok(FrameStatus::Skip);
            }
            Err(err) => return Err(RendererError::ContextLost(err.to_string())),
        };

        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("generation step"),
        });
        self.frame = Some(OpenFrame {
            surface,
            view,
            encoder,
        });
        Ok(FrameStatus::Ready)
    }

    fn compute_pass(
        &mut self,
        target: &mut GpuTexture,
        source: &GpuTexture,
    ) -> Result<(), RendererError> {
        let mut frame = self
            .frame
            .take()
            .ok_or(RendererError::NoFrame("compute_pass"))?;
        self.draw_quad(
            &mut frame.encoder,
            &target.view,
            &self.pipelines.compute,
            &[&source.bind_group, &self.delta_bind_group],
            "compute pass",
        );
        self.frame = Some(frame);
        Ok(())
    }

    fn render_pass(&mut self, source: &GpuTexture) -> Result<(), RendererError> {
        let mut frame = self
            .frame
            .take()
            .ok_or(RendererError::NoFrame("render_pass"))?;
        self.draw_quad(
            &mut frame.encoder,
            &frame.view,
            &self.pipelines.render,
            &[&source.bind_group],
            "render pass",
        );
        self.frame = Some(frame);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RendererError> {
        let frame = self
            .frame
            .take()
            .ok_or(RendererError::NoFrame("end_frame"))?;

        self.context.queue.submit(Some(frame.encoder.finish()));
        let device = &self.context.device;
        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(error) = validation.or(out_of_memory) {
            return Err(RendererError::ContextLost(error.to_string()));
        }

        frame.surface.present();
        self.stats.record();
        Ok(())
    }
}
