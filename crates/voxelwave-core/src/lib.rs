//! Core types and CPU-side math for the voxel wave effect.
//!
//! This crate is GPU-free: camera derivation, impulse extraction, wave
//! synthesis, pixel-format conversion, and the host parameter model all live
//! here so they can be tested without an adapter. The companion
//! `voxelwave-render` crate consumes these types to drive the compute and
//! raster pipelines.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod camera;
pub mod error;
pub mod frame;
pub mod impulse;
pub mod params;
pub mod pixel;
pub mod wave;

pub use camera::{CameraRig, CameraTransform};
pub use error::{Result, VoxelWaveError};
pub use frame::FramePacket;
pub use impulse::{extract_impulses, EmitterSnapshot, Impulse, KeyframeSample};
pub use params::{EffectHost, FixtureHost, ParamId, ParamLease, ParamValue};
pub use pixel::{ImageSlice, ImageSliceMut, PixelFormat, WHITE_16BIT};
pub use wave::{synthesize_waves, Wave, WaveSettings};
