//! Per-thread render contexts and the registry that owns them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

use log::debug;

use voxelwave_core::{FramePacket, ImageSlice, ImageSliceMut, Wave};

use crate::compute::{ComputeStage, GridUniforms};
use crate::engine::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::raster::{RasterStage, RasterUniforms, VoxelVertex};
use crate::textures;

/// How a render invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// The frame was rendered and written to the output buffer.
    Completed,
    /// The host requested cancellation; the output buffer is untouched.
    Aborted,
}

const WAVE_STRIDE: u64 = std::mem::size_of::<Wave>() as u64;
const VERTEX_STRIDE: u64 = std::mem::size_of::<VoxelVertex>() as u64;

/// GPU resources sized to one frame geometry; rebuilt when the frame size,
/// grid, or wave count outgrows them.
struct FrameResources {
    width: u32,
    height: u32,
    cell_capacity: u64,
    wave_capacity: u64,
    color_tex: wgpu::Texture,
    depth_tex: wgpu::Texture,
    target_tex: wgpu::Texture,
    target_view: wgpu::TextureView,
    depth_target_view: wgpu::TextureView,
    staging: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    wave_buffer: wgpu::Buffer,
    grid_uniforms: wgpu::Buffer,
    raster_uniforms: wgpu::Buffer,
}

impl FrameResources {
    fn new(device: &wgpu::Device, width: u32, height: u32, cells: u64, waves: u64) -> Self {
        let color_tex = textures::create_frame_texture(
            device,
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            "voxelwave color input",
        );
        let depth_tex = textures::create_frame_texture(
            device,
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            "voxelwave depth input",
        );
        let target_tex = textures::create_frame_texture(
            device,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            "voxelwave render target",
        );
        let target_view = target_tex.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("voxelwave depth target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_target_view = depth_target.create_view(&wgpu::TextureViewDescriptor::default());

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxelwave readback buffer"),
            size: u64::from(textures::aligned_bytes_per_row(width)) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let cell_capacity = cells.max(1);
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxelwave vertex buffer"),
            size: cell_capacity * VERTEX_STRIDE,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        // At least one wave slot so the bind group stays valid on wave-free
        // frames.
        let wave_capacity = waves.max(1);
        let wave_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxelwave wave buffer"),
            size: wave_capacity * WAVE_STRIDE,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let grid_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxelwave grid uniforms"),
            size: std::mem::size_of::<GridUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let raster_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voxelwave raster uniforms"),
            size: std::mem::size_of::<RasterUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            width,
            height,
            cell_capacity,
            wave_capacity,
            color_tex,
            depth_tex,
            target_tex,
            target_view,
            depth_target_view,
            staging,
            vertex_buffer,
            wave_buffer,
            grid_uniforms,
            raster_uniforms,
        }
    }

    fn fits(&self, width: u32, height: u32, cells: u64, waves: u64) -> bool {
        self.width == width
            && self.height == height
            && cells <= self.cell_capacity
            && waves.max(1) <= self.wave_capacity
    }
}

/// One thread's GPU state: device, pipelines, and lazily sized frame
/// resources.
pub struct RenderContext {
    gpu: GpuContext,
    compute: ComputeStage,
    raster: RasterStage,
    resources: Option<FrameResources>,
}

impl RenderContext {
    /// Acquires a headless device and builds both pipelines.
    pub fn new() -> RenderResult<Self> {
        let gpu = GpuContext::new_headless()?;
        let compute = ComputeStage::new(&gpu.device);
        let raster = RasterStage::new(&gpu.device);
        Ok(Self {
            gpu,
            compute,
            raster,
            resources: None,
        })
    }

    fn ensure_resources(&mut self, width: u32, height: u32, cells: u64, waves: u64) {
        let rebuild = match &self.resources {
            Some(r) => !r.fits(width, height, cells, waves),
            None => true,
        };
        if rebuild {
            debug!(
                "rebuilding frame resources: {width}x{height}, {cells} cells, {waves} wave slots"
            );
            self.resources = Some(FrameResources::new(
                &self.gpu.device,
                width,
                height,
                cells,
                waves,
            ));
        }
    }

    /// Renders one frame: upload, compute displacement, rasterize, read back.
    ///
    /// `abort` is polled between stages; once it returns true the frame is
    /// abandoned and `out` is left untouched.
    pub fn render_frame(
        &mut self,
        packet: &FramePacket,
        color: &ImageSlice<'_>,
        depth: &ImageSlice<'_>,
        out: &mut ImageSliceMut<'_>,
        abort: &mut dyn FnMut() -> bool,
    ) -> RenderResult<RenderStatus> {
        packet.validate()?;

        if color.width != out.width || color.height != out.height {
            return Err(RenderError::TargetMismatch(format!(
                "color input is {}x{} but output is {}x{}",
                color.width, color.height, out.width, out.height
            )));
        }
        if depth.width != color.width || depth.height != color.height {
            return Err(RenderError::TargetMismatch(format!(
                "depth input is {}x{} but color input is {}x{}",
                depth.width, depth.height, color.width, color.height
            )));
        }

        if abort() {
            return Ok(RenderStatus::Aborted);
        }

        let cells = u64::from(packet.grid.0) * u64::from(packet.grid.1);
        self.ensure_resources(
            color.width,
            color.height,
            cells,
            packet.waves.len() as u64,
        );
        let resources = self.resources.as_ref().ok_or_else(|| {
            RenderError::TargetMismatch("frame resources unavailable".to_string())
        })?;

        // Upload phase.
        textures::upload_image(&self.gpu.queue, &resources.color_tex, color);
        textures::upload_image(&self.gpu.queue, &resources.depth_tex, depth);
        if !packet.waves.is_empty() {
            self.gpu.queue.write_buffer(
                &resources.wave_buffer,
                0,
                bytemuck::cast_slice(&packet.waves),
            );
        }
        let uniforms = GridUniforms::from_packet(packet, color.width, color.height);
        self.gpu
            .queue
            .write_buffer(&resources.grid_uniforms, 0, bytemuck::bytes_of(&uniforms));
        let raster_uniforms = RasterUniforms::new(&packet.camera.projection);
        self.gpu.queue.write_buffer(
            &resources.raster_uniforms,
            0,
            bytemuck::bytes_of(&raster_uniforms),
        );

        if abort() {
            return Ok(RenderStatus::Aborted);
        }

        // Compute phase.
        let color_view = resources
            .color_tex
            .create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = resources
            .depth_tex
            .create_view(&wgpu::TextureViewDescriptor::default());
        let compute_bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("voxel compute bind group"),
            layout: &self.compute.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&depth_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: resources.grid_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: resources.wave_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: resources.vertex_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("voxel compute encoder"),
            });
        self.compute
            .dispatch(&mut encoder, &compute_bind_group, packet.grid);
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        if abort() {
            return Ok(RenderStatus::Aborted);
        }

        // Raster phase.
        let raster_bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("voxel raster bind group"),
            layout: &self.raster.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: resources.raster_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: resources.vertex_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("voxel raster encoder"),
            });
        self.raster.draw(
            &mut encoder,
            &resources.target_view,
            &resources.depth_target_view,
            &raster_bind_group,
            cells as u32,
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        if abort() {
            return Ok(RenderStatus::Aborted);
        }

        // Readback phase.
        textures::download_into(
            &self.gpu.device,
            &self.gpu.queue,
            &resources.target_tex,
            &resources.staging,
            out,
        )?;

        Ok(RenderStatus::Completed)
    }

    /// Name and backend of the adapter this context runs on.
    #[must_use]
    pub fn adapter_summary(&self) -> String {
        format!(
            "{} ({:?})",
            self.gpu.adapter_info.name, self.gpu.adapter_info.backend
        )
    }
}

/// Maps host threads to render contexts.
///
/// Render callbacks may arrive on several threads at once; each gets its own
/// device so command submission never interleaves across frames.
#[derive(Default)]
pub struct ContextRegistry {
    contexts: Mutex<HashMap<ThreadId, Arc<Mutex<RenderContext>>>>,
}

impl ContextRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the calling thread's context, creating it on first use.
    ///
    /// Device creation happens outside the registry lock so a slow adapter
    /// probe on one thread does not stall the others.
    pub fn get_or_create(&self) -> RenderResult<Arc<Mutex<RenderContext>>> {
        let thread_id = std::thread::current().id();

        if let Some(existing) = self
            .contexts
            .lock()
            .expect("context registry poisoned")
            .get(&thread_id)
        {
            return Ok(Arc::clone(existing));
        }

        let fresh = Arc::new(Mutex::new(RenderContext::new()?));
        let mut contexts = self.contexts.lock().expect("context registry poisoned");
        let entry = contexts
            .entry(thread_id)
            .or_insert_with(|| Arc::clone(&fresh));
        Ok(Arc::clone(entry))
    }

    /// Drops every context. Called at effect teardown.
    pub fn clear(&self) {
        self.contexts
            .lock()
            .expect("context registry poisoned")
            .clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts
            .lock()
            .expect("context registry poisoned")
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
