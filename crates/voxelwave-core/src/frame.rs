//! The pre-render product handed to the render phase.

use glam::Vec2;
use serde::Serialize;

use crate::camera::CameraTransform;
use crate::error::{Result, VoxelWaveError};
use crate::wave::Wave;

/// Everything the render phase needs, captured during pre-render.
///
/// The packet owns its data; once built, the render phase never talks to the
/// host's parameter store again.
#[derive(Debug, Clone)]
pub struct FramePacket {
    pub camera: CameraTransform,
    pub waves: Vec<Wave>,
    /// Camera-space depth mapped from black (`min_depth`) to white
    /// (`max_depth`) in the depth input.
    pub min_depth: f32,
    pub max_depth: f32,
    /// Voxel size at the near end of the depth range.
    pub near_block_size: f32,
    /// Voxel size at the far end of the depth range.
    pub far_block_size: f32,
    /// Block grid resolution.
    pub grid: (u32, u32),
    /// Debug tinting of blocks by the wave that last touched them.
    pub colorize_waves: bool,
    pub color_cycle_radius: f32,
}

/// Serialized form of the frame-varying packet fields.
///
/// The camera contributes both its fov (drives the compute-stage
/// unprojection) and the full projection matrix (carries near/far clipping
/// into the raster stage), so clip-plane animation invalidates the key even
/// when the wave list is unchanged.
#[derive(Serialize)]
struct PacketKey<'a> {
    waves: &'a [Wave],
    min_depth: f32,
    max_depth: f32,
    near_block_size: f32,
    far_block_size: f32,
    grid: (u32, u32),
    colorize_waves: bool,
    color_cycle_radius: f32,
    fov: [f32; 2],
    projection: [[f32; 4]; 4],
}

impl FramePacket {
    /// Validates the packet's scalar invariants.
    pub fn validate(&self) -> Result<()> {
        if self.min_depth >= self.max_depth {
            return Err(VoxelWaveError::EmptyDepthRange {
                min: self.min_depth,
                max: self.max_depth,
            });
        }
        if self.grid.0 == 0 || self.grid.1 == 0 {
            return Err(VoxelWaveError::InvalidGrid {
                x: self.grid.0,
                y: self.grid.1,
            });
        }
        Ok(())
    }

    /// A deterministic key over every packet field that affects the rendered
    /// output. Two packets with equal keys render identical frames, so hosts
    /// can use the key to skip redundant renders.
    pub fn cache_key(&self) -> Result<String> {
        let fov: Vec2 = self.camera.fov;
        let key = PacketKey {
            waves: &self.waves,
            min_depth: self.min_depth,
            max_depth: self.max_depth,
            near_block_size: self.near_block_size,
            far_block_size: self.far_block_size,
            grid: self.grid,
            colorize_waves: self.colorize_waves,
            color_cycle_radius: self.color_cycle_radius,
            fov: fov.to_array(),
            projection: self.camera.projection.to_cols_array_2d(),
        };
        Ok(serde_json::to_string(&key)?)
    }
}
