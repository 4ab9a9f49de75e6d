//! Headless GPU device acquisition.

use log::info;

use crate::error::{RenderError, RenderResult};

/// A headless wgpu device and queue shared by one render context.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Acquires a device without any window surface.
    ///
    /// Fails with [`RenderError::AdapterCreationFailed`] on machines without
    /// a usable adapter, which callers (and tests) treat as "no GPU here".
    pub fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::AdapterCreationFailed)?;

        let adapter_info = adapter.get_info();
        info!(
            "using adapter '{}' ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("voxelwave device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }
}
