//! Depth-driven voxel wave effect.
//!
//! Turns a color image and a matching depth image into a grid of 3D voxels,
//! displaces them with expanding circular waves triggered by an on/off
//! emitter track, and rasterizes the result back into a 2D frame.
//!
//! The effect runs in two phases mirroring a plugin host's callbacks:
//! [`VoxelWaveEffect::prerender`] reads parameters and builds an owned
//! [`FramePacket`], and [`VoxelWaveEffect::render`] executes the GPU
//! pipeline for that packet on the calling thread's own device.

#![allow(clippy::missing_errors_doc)]

mod effect;

pub use effect::{EffectError, Result, VoxelWaveEffect};

pub use voxelwave_core::{
    extract_impulses, synthesize_waves, CameraRig, CameraTransform, EffectHost, EmitterSnapshot,
    FixtureHost, FramePacket, Impulse, ImageSlice, ImageSliceMut, KeyframeSample, ParamId,
    ParamLease, ParamValue, PixelFormat, VoxelWaveError, Wave, WaveSettings,
};
pub use voxelwave_render::{RenderError, RenderStatus};
