//! Displacement compute stage.

use voxelwave_core::FramePacket;

/// Uniforms for the compute pass.
///
/// Layout matches `GridUniforms` in `voxel_compute.wgsl` (64 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct GridUniforms {
    pub grid_size: [u32; 2],
    pub tex_size: [u32; 2],
    pub depth_range: [f32; 2],
    pub block_sizes: [f32; 2],
    pub fov: [f32; 2],
    pub wave_count: u32,
    pub colorize_waves: u32,
    pub color_cycle_radius: f32,
    pub _pad: [f32; 3],
}

impl GridUniforms {
    /// Builds the uniform block for one frame.
    #[must_use]
    pub fn from_packet(packet: &FramePacket, tex_width: u32, tex_height: u32) -> Self {
        Self {
            grid_size: [packet.grid.0, packet.grid.1],
            tex_size: [tex_width, tex_height],
            depth_range: [packet.min_depth, packet.max_depth],
            block_sizes: [packet.near_block_size, packet.far_block_size],
            fov: packet.camera.fov.to_array(),
            wave_count: packet.waves.len() as u32,
            colorize_waves: u32::from(packet.colorize_waves),
            color_cycle_radius: packet.color_cycle_radius,
            _pad: [0.0; 3],
        }
    }
}

/// The compute pipeline that turns grid cells into displaced voxel vertices.
pub struct ComputeStage {
    pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl ComputeStage {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("voxel compute shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/voxel_compute.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("voxel compute bind group layout"),
            entries: &[
                // Color input
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Depth input
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Grid uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Waves
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Output vertices
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("voxel compute pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("voxel compute pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
        }
    }

    /// Records the compute dispatch, one workgroup per 8x8 tile of grid cells.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        grid: (u32, u32),
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("voxel compute pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(grid.0.div_ceil(8), grid.1.div_ceil(8), 1);
    }
}
