//! Host parameter model with checkout/checkin leases.

use std::collections::HashMap;
use std::sync::atomic::{AtomicIsize, Ordering};

use glam::{Vec3, Vec4};

use crate::camera::CameraRig;
use crate::error::{Result, VoxelWaveError};
use crate::impulse::KeyframeSample;

/// Every parameter the effect reads from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    /// Boolean keyframe track driving impulse extraction.
    EmitterImpulse,
    /// 3D emitter position.
    EmitterPosition,
    MinDepth,
    MaxDepth,
    NearBlockSize,
    FarBlockSize,
    WaveBlockSizeMultiplier,
    WaveDisplacement,
    /// 3D direction displaced geometry travels in.
    WaveDisplacementDirection,
    WaveColor,
    WaveColorMix,
    WaveVelocity,
    WaveDecay,
    ColorizeWaves,
    ColorCycleRadius,
    NumBlocksX,
    NumBlocksY,
}

impl ParamId {
    /// Returns the display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ParamId::EmitterImpulse => "Emitter Impulse",
            ParamId::EmitterPosition => "Emitter Position",
            ParamId::MinDepth => "Min Depth",
            ParamId::MaxDepth => "Max Depth",
            ParamId::NearBlockSize => "Near Block Size",
            ParamId::FarBlockSize => "Far Block Size",
            ParamId::WaveBlockSizeMultiplier => "Wave Block Size Multiplier",
            ParamId::WaveDisplacement => "Wave Displacement",
            ParamId::WaveDisplacementDirection => "Wave Displacement Direction",
            ParamId::WaveColor => "Wave Color",
            ParamId::WaveColorMix => "Wave Color Mix",
            ParamId::WaveVelocity => "Wave Velocity",
            ParamId::WaveDecay => "Wave Decay",
            ParamId::ColorizeWaves => "Colorize Waves",
            ParamId::ColorCycleRadius => "Color Cycle Radius",
            ParamId::NumBlocksX => "Num Blocks X",
            ParamId::NumBlocksY => "Num Blocks Y",
        }
    }
}

/// A typed parameter value checked out from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f64),
    Bool(bool),
    Int(i64),
    Point3(Vec3),
    Color(Vec4),
}

impl ParamValue {
    pub fn as_f32(&self, id: ParamId) -> Result<f32> {
        match self {
            ParamValue::Float(v) => Ok(*v as f32),
            ParamValue::Int(v) => Ok(*v as f32),
            _ => Err(VoxelWaveError::ParamType {
                param: id.name(),
                expected: "float",
            }),
        }
    }

    pub fn as_bool(&self, id: ParamId) -> Result<bool> {
        match self {
            ParamValue::Bool(v) => Ok(*v),
            _ => Err(VoxelWaveError::ParamType {
                param: id.name(),
                expected: "bool",
            }),
        }
    }

    pub fn as_u32(&self, id: ParamId) -> Result<u32> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as u32),
            ParamValue::Float(v) if *v >= 0.0 => Ok(v.round() as u32),
            _ => Err(VoxelWaveError::ParamType {
                param: id.name(),
                expected: "non-negative integer",
            }),
        }
    }

    pub fn as_vec3(&self, id: ParamId) -> Result<Vec3> {
        match self {
            ParamValue::Point3(v) => Ok(*v),
            _ => Err(VoxelWaveError::ParamType {
                param: id.name(),
                expected: "3D point",
            }),
        }
    }

    pub fn as_color(&self, id: ParamId) -> Result<Vec4> {
        match self {
            ParamValue::Color(v) => Ok(*v),
            _ => Err(VoxelWaveError::ParamType {
                param: id.name(),
                expected: "color",
            }),
        }
    }
}

/// The host collaborator the effect reads its inputs from.
///
/// Parameters are only read during the pre-render phase; the render phase
/// consumes the packet the pre-render produced.
pub trait EffectHost {
    /// Checks a parameter value out at the given host time. Must be paired
    /// with exactly one [`EffectHost::checkin`], which [`ParamLease`]
    /// guarantees.
    fn checkout(&self, id: ParamId, time: f64) -> Result<ParamValue>;

    /// Releases a previously checked-out parameter.
    fn checkin(&self, id: ParamId);

    /// Returns the keyframe samples of a boolean track in time order.
    fn keyframes(&self, id: ParamId) -> Result<Vec<KeyframeSample>>;

    /// Queries camera state at a composition time.
    fn camera(&self, time: f64) -> Result<CameraRig>;

    /// Host time units per second.
    fn time_scale(&self) -> f64;

    /// The frame being rendered, in host time units.
    fn current_time(&self) -> f64;
}

/// RAII guard for a checked-out parameter; checks back in on drop, so the
/// release happens exactly once even on early-error paths.
pub struct ParamLease<'a> {
    host: &'a dyn EffectHost,
    id: ParamId,
    value: ParamValue,
}

impl<'a> ParamLease<'a> {
    /// Checks `id` out of `host` at `time`.
    pub fn checkout(host: &'a dyn EffectHost, id: ParamId, time: f64) -> Result<Self> {
        let value = host.checkout(id, time)?;
        Ok(Self { host, id, value })
    }

    #[must_use]
    pub fn value(&self) -> ParamValue {
        self.value
    }

    #[must_use]
    pub fn id(&self) -> ParamId {
        self.id
    }
}

impl Drop for ParamLease<'_> {
    fn drop(&mut self) {
        self.host.checkin(self.id);
    }
}

/// In-memory host used by tests and demos.
///
/// Parameters are piecewise-constant in time except the emitter track,
/// which is an explicit keyframe list.
pub struct FixtureHost {
    values: HashMap<ParamId, ParamValue>,
    pub impulse_track: Vec<KeyframeSample>,
    pub camera: CameraRig,
    pub time_scale: f64,
    pub current_time: f64,
    outstanding: AtomicIsize,
}

impl FixtureHost {
    /// A host with the effect's default parameter values and an empty track.
    #[must_use]
    pub fn new() -> Self {
        let mut values = HashMap::new();
        values.insert(ParamId::EmitterPosition, ParamValue::Point3(Vec3::ZERO));
        values.insert(ParamId::MinDepth, ParamValue::Float(100.0));
        values.insert(ParamId::MaxDepth, ParamValue::Float(1000.0));
        values.insert(ParamId::NearBlockSize, ParamValue::Float(10.0));
        values.insert(ParamId::FarBlockSize, ParamValue::Float(10.0));
        values.insert(ParamId::WaveBlockSizeMultiplier, ParamValue::Float(1.0));
        values.insert(ParamId::WaveDisplacement, ParamValue::Float(100.0));
        values.insert(
            ParamId::WaveDisplacementDirection,
            ParamValue::Point3(Vec3::Z),
        );
        values.insert(ParamId::WaveColor, ParamValue::Color(Vec4::ONE));
        values.insert(ParamId::WaveColorMix, ParamValue::Float(0.0));
        values.insert(ParamId::WaveVelocity, ParamValue::Float(100.0));
        values.insert(ParamId::WaveDecay, ParamValue::Float(0.95));
        values.insert(ParamId::ColorizeWaves, ParamValue::Bool(false));
        values.insert(ParamId::ColorCycleRadius, ParamValue::Float(0.0));
        values.insert(ParamId::NumBlocksX, ParamValue::Int(50));
        values.insert(ParamId::NumBlocksY, ParamValue::Int(50));
        Self {
            values,
            impulse_track: Vec::new(),
            camera: CameraRig::default(),
            time_scale: 1.0,
            current_time: 0.0,
            outstanding: AtomicIsize::new(0),
        }
    }

    /// Overrides one parameter value.
    pub fn set(&mut self, id: ParamId, value: ParamValue) {
        self.values.insert(id, value);
    }

    /// Checkouts minus checkins; zero once all leases have dropped.
    pub fn outstanding_checkouts(&self) -> isize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

impl Default for FixtureHost {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectHost for FixtureHost {
    fn checkout(&self, id: ParamId, _time: f64) -> Result<ParamValue> {
        let value = self
            .values
            .get(&id)
            .copied()
            .ok_or(VoxelWaveError::ParamMissing(id.name()))?;
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    fn checkin(&self, _id: ParamId) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    fn keyframes(&self, id: ParamId) -> Result<Vec<KeyframeSample>> {
        match id {
            ParamId::EmitterImpulse => Ok(self.impulse_track.clone()),
            _ => Err(VoxelWaveError::ParamMissing(id.name())),
        }
    }

    fn camera(&self, _time: f64) -> Result<CameraRig> {
        Ok(self.camera)
    }

    fn time_scale(&self) -> f64 {
        self.time_scale
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }
}
