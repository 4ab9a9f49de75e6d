//! Texture upload and readback between host frame buffers and the GPU.
//!
//! Everything crosses the bus as RGBA32F. Uploads convert the host's pixel
//! format on the CPU first; readback unpads the aligned rows and converts
//! back into the host's buffer in place.

use voxelwave_core::{ImageSlice, ImageSliceMut};

use crate::error::{RenderError, RenderResult};

const BYTES_PER_PIXEL_F32: u32 = 16;

/// Bytes per row padded to wgpu's buffer-copy alignment.
pub(crate) fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * BYTES_PER_PIXEL_F32;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

/// Creates an RGBA32F texture of the given size and usage.
pub(crate) fn create_frame_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
    label: &str,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage,
        view_formats: &[],
    })
}

/// Converts a host image to RGBA32F and writes it into `texture`.
pub(crate) fn upload_image(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &ImageSlice<'_>) {
    let pixels = image.to_rgba_f32();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&pixels),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(image.width * BYTES_PER_PIXEL_F32),
            rows_per_image: Some(image.height),
        },
        wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        },
    );
}

/// Copies an RGBA32F texture into `out`, converting to the host's format.
///
/// Blocks until the copy has completed and the staging buffer is mapped.
pub(crate) fn download_into(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    staging: &wgpu::Buffer,
    out: &mut ImageSliceMut<'_>,
) -> RenderResult<()> {
    let width = out.width;
    let height = out.height;
    let bytes_per_row = aligned_bytes_per_row(width);

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback copy encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|_| RenderError::BufferMapFailed)?
        .map_err(|_| RenderError::BufferMapFailed)?;

    // Strip the row padding before handing the pixels to the converter.
    let data = buffer_slice.get_mapped_range();
    let row_floats = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_floats * height as usize);
    for row in 0..height {
        let start = (row * bytes_per_row) as usize;
        let end = start + row_floats * std::mem::size_of::<f32>();
        pixels.extend_from_slice(bytemuck::cast_slice(&data[start..end]));
    }
    drop(data);
    staging.unmap();

    out.write_rgba_f32(&pixels)?;
    Ok(())
}
