//! Pixel formats and strided CPU image views.
//!
//! Host frame buffers arrive as interleaved RGBA rows with an arbitrary row
//! stride. All three supported depths are converted to RGBA32F before upload
//! and back on readback.

use crate::error::{Result, VoxelWaveError};

/// The 16-bit channel value that represents full white.
///
/// Half-float style 16-bit hosts reserve headroom above white; the nominal
/// white point sits at 32768, not 65535, and over-range values up to
/// 65535/32768 of white survive the round trip.
pub const WHITE_16BIT: f32 = 32768.0;

/// Channel depth of an interleaved RGBA buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, white = 255.
    Rgba8,
    /// 16 bits per channel, white = 32768.
    Rgba16,
    /// 32-bit float per channel, white = 1.0.
    RgbaF32,
}

impl PixelFormat {
    /// Bytes per pixel (4 channels).
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgba16 => 8,
            PixelFormat::RgbaF32 => 16,
        }
    }
}

/// A read-only view over a host-owned RGBA frame buffer.
#[derive(Debug, Clone, Copy)]
pub struct ImageSlice<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes from the start of one row to the next; may exceed the packed
    /// row width.
    pub row_stride: usize,
    pub format: PixelFormat,
}

/// A mutable view over a host-owned RGBA frame buffer.
#[derive(Debug)]
pub struct ImageSliceMut<'a> {
    pub data: &'a mut [u8],
    pub width: u32,
    pub height: u32,
    pub row_stride: usize,
    pub format: PixelFormat,
}

fn validate_layout(
    len: usize,
    width: u32,
    height: u32,
    row_stride: usize,
    format: PixelFormat,
) -> Result<()> {
    let packed_row = width as usize * format.bytes_per_pixel();
    if row_stride < packed_row {
        return Err(VoxelWaveError::BadStride {
            stride: row_stride,
            row: packed_row,
        });
    }
    if height == 0 {
        return Ok(());
    }
    // The final row only needs the packed width, not the full stride.
    let expected = row_stride * (height as usize - 1) + packed_row;
    if len < expected {
        return Err(VoxelWaveError::BufferTooSmall {
            expected,
            actual: len,
        });
    }
    Ok(())
}

impl<'a> ImageSlice<'a> {
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        row_stride: usize,
        format: PixelFormat,
    ) -> Result<Self> {
        validate_layout(data.len(), width, height, row_stride, format)?;
        Ok(Self {
            data,
            width,
            height,
            row_stride,
            format,
        })
    }

    fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.row_stride;
        let packed = self.width as usize * self.format.bytes_per_pixel();
        &self.data[start..start + packed]
    }

    /// Converts the whole image to tightly packed RGBA32F, normalized so
    /// white is 1.0 in every source format.
    #[must_use]
    pub fn to_rgba_f32(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            let row = self.row(y);
            match self.format {
                PixelFormat::Rgba8 => {
                    for &byte in row {
                        out.push(f32::from(byte) / 255.0);
                    }
                }
                PixelFormat::Rgba16 => {
                    for chunk in row.chunks_exact(2) {
                        let v = u16::from_ne_bytes([chunk[0], chunk[1]]);
                        out.push(f32::from(v) / WHITE_16BIT);
                    }
                }
                PixelFormat::RgbaF32 => {
                    for chunk in row.chunks_exact(4) {
                        out.push(f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
                    }
                }
            }
        }
        out
    }
}

impl<'a> ImageSliceMut<'a> {
    pub fn new(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        row_stride: usize,
        format: PixelFormat,
    ) -> Result<Self> {
        validate_layout(data.len(), width, height, row_stride, format)?;
        Ok(Self {
            data,
            width,
            height,
            row_stride,
            format,
        })
    }

    /// Borrows an immutable view of the same buffer.
    #[must_use]
    pub fn as_slice(&self) -> ImageSlice<'_> {
        ImageSlice {
            data: self.data,
            width: self.width,
            height: self.height,
            row_stride: self.row_stride,
            format: self.format,
        }
    }

    /// Writes tightly packed RGBA32F pixels back into the buffer, clamping
    /// to each format's representable range.
    ///
    /// `pixels` must hold exactly `width * height * 4` floats.
    pub fn write_rgba_f32(&mut self, pixels: &[f32]) -> Result<()> {
        let expected = self.width as usize * self.height as usize * 4;
        if pixels.len() != expected {
            return Err(VoxelWaveError::BufferTooSmall {
                expected,
                actual: pixels.len(),
            });
        }
        let width = self.width as usize;
        for y in 0..self.height as usize {
            let src = &pixels[y * width * 4..(y + 1) * width * 4];
            let start = y * self.row_stride;
            let packed = width * self.format.bytes_per_pixel();
            let dst = &mut self.data[start..start + packed];
            match self.format {
                PixelFormat::Rgba8 => {
                    for (d, &v) in dst.iter_mut().zip(src) {
                        *d = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                    }
                }
                PixelFormat::Rgba16 => {
                    for (d, &v) in dst.chunks_exact_mut(2).zip(src) {
                        let q = (v.max(0.0) * WHITE_16BIT)
                            .round()
                            .min(f32::from(u16::MAX)) as u16;
                        d.copy_from_slice(&q.to_ne_bytes());
                    }
                }
                PixelFormat::RgbaF32 => {
                    for (d, &v) in dst.chunks_exact_mut(4).zip(src) {
                        d.copy_from_slice(&v.to_ne_bytes());
                    }
                }
            }
        }
        Ok(())
    }
}
