//! The two-phase effect entry point.

use log::debug;

use voxelwave_core::{
    extract_impulses, synthesize_waves, CameraTransform, EffectHost, EmitterSnapshot, FramePacket,
    ImageSlice, ImageSliceMut, ParamId, ParamLease, VoxelWaveError, WaveSettings,
};
use voxelwave_render::{ContextRegistry, RenderError, RenderStatus};

/// Errors surfaced across the host boundary.
#[derive(thiserror::Error, Debug)]
pub enum EffectError {
    #[error(transparent)]
    Core(#[from] VoxelWaveError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T> = std::result::Result<T, EffectError>;

/// The voxel wave effect.
///
/// One instance serves the whole host process. [`VoxelWaveEffect::prerender`]
/// reads host parameters and produces a self-contained [`FramePacket`];
/// [`VoxelWaveEffect::render`] consumes the packet on whichever thread the
/// host calls back on, creating that thread's GPU context on first use.
#[derive(Default)]
pub struct VoxelWaveEffect {
    registry: ContextRegistry,
}

impl VoxelWaveEffect {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ContextRegistry::new(),
        }
    }

    /// Pre-render phase: checks out every parameter, extracts impulses from
    /// the emitter track, synthesizes this frame's waves, and packages the
    /// result. No GPU work happens here.
    pub fn prerender(&self, host: &dyn EffectHost) -> Result<FramePacket> {
        let now = host.current_time();
        let time_scale = host.time_scale();

        let rig = host.camera(now)?;
        let camera = CameraTransform::from_rig(&rig)?;

        let velocity = ParamLease::checkout(host, ParamId::WaveVelocity, now)?;
        let decay = ParamLease::checkout(host, ParamId::WaveDecay, now)?;
        let displacement = ParamLease::checkout(host, ParamId::WaveDisplacement, now)?;
        let color = ParamLease::checkout(host, ParamId::WaveColor, now)?;
        let color_mix = ParamLease::checkout(host, ParamId::WaveColorMix, now)?;
        let block_multiplier =
            ParamLease::checkout(host, ParamId::WaveBlockSizeMultiplier, now)?;
        let min_depth = ParamLease::checkout(host, ParamId::MinDepth, now)?;
        let max_depth = ParamLease::checkout(host, ParamId::MaxDepth, now)?;
        let near_block = ParamLease::checkout(host, ParamId::NearBlockSize, now)?;
        let far_block = ParamLease::checkout(host, ParamId::FarBlockSize, now)?;
        let colorize = ParamLease::checkout(host, ParamId::ColorizeWaves, now)?;
        let cycle_radius = ParamLease::checkout(host, ParamId::ColorCycleRadius, now)?;
        let blocks_x = ParamLease::checkout(host, ParamId::NumBlocksX, now)?;
        let blocks_y = ParamLease::checkout(host, ParamId::NumBlocksY, now)?;

        let settings = WaveSettings {
            velocity: velocity.value().as_f32(ParamId::WaveVelocity)?,
            decay: decay.value().as_f32(ParamId::WaveDecay)?,
            max_displacement: displacement.value().as_f32(ParamId::WaveDisplacement)?,
            color: color.value().as_color(ParamId::WaveColor)?,
            color_mix: color_mix.value().as_f32(ParamId::WaveColorMix)?,
            block_size_multiplier: block_multiplier
                .value()
                .as_f32(ParamId::WaveBlockSizeMultiplier)?,
        };

        // The emitter snapshot is frozen at each impulse's start time, so the
        // sampler checks position and direction out at that time, not at the
        // frame time.
        let samples = host.keyframes(ParamId::EmitterImpulse)?;
        let mut sample_error: Option<VoxelWaveError> = None;
        let impulses = extract_impulses(&samples, |time| {
            let snapshot = (|| -> voxelwave_core::Result<EmitterSnapshot> {
                let position = ParamLease::checkout(host, ParamId::EmitterPosition, time)?;
                let direction =
                    ParamLease::checkout(host, ParamId::WaveDisplacementDirection, time)?;
                Ok(EmitterSnapshot {
                    position: position.value().as_vec3(ParamId::EmitterPosition)?,
                    displacement_direction: direction
                        .value()
                        .as_vec3(ParamId::WaveDisplacementDirection)?,
                })
            })();
            match snapshot {
                Ok(s) => s,
                Err(e) => {
                    if sample_error.is_none() {
                        sample_error = Some(e);
                    }
                    EmitterSnapshot {
                        position: glam::Vec3::ZERO,
                        displacement_direction: glam::Vec3::ZERO,
                    }
                }
            }
        });
        if let Some(e) = sample_error {
            return Err(e.into());
        }

        let waves = synthesize_waves(&impulses, &settings, now, time_scale, &camera.wave_transform);
        debug!(
            "prerender at t={now}: {} impulses, {} active waves",
            impulses.len(),
            waves.len()
        );

        let packet = FramePacket {
            camera,
            waves,
            min_depth: min_depth.value().as_f32(ParamId::MinDepth)?,
            max_depth: max_depth.value().as_f32(ParamId::MaxDepth)?,
            near_block_size: near_block.value().as_f32(ParamId::NearBlockSize)?,
            far_block_size: far_block.value().as_f32(ParamId::FarBlockSize)?,
            grid: (
                blocks_x.value().as_u32(ParamId::NumBlocksX)?,
                blocks_y.value().as_u32(ParamId::NumBlocksY)?,
            ),
            colorize_waves: colorize.value().as_bool(ParamId::ColorizeWaves)?,
            color_cycle_radius: cycle_radius.value().as_f32(ParamId::ColorCycleRadius)?,
        };
        packet.validate()?;
        Ok(packet)
    }

    /// Render phase: runs the GPU pipeline for a packet produced by
    /// [`VoxelWaveEffect::prerender`] and writes the result into `out`.
    ///
    /// `abort` is polled between pipeline stages; an aborted frame returns
    /// [`RenderStatus::Aborted`] and leaves `out` untouched.
    pub fn render(
        &self,
        packet: &FramePacket,
        color: &ImageSlice<'_>,
        depth: &ImageSlice<'_>,
        out: &mut ImageSliceMut<'_>,
        abort: &mut dyn FnMut() -> bool,
    ) -> Result<RenderStatus> {
        let context = self.registry.get_or_create()?;
        let mut context = context.lock().expect("render context poisoned");
        Ok(context.render_frame(packet, color, depth, out, abort)?)
    }

    /// Releases every thread's GPU context. Called once when the host
    /// unloads the effect.
    pub fn teardown(&self) {
        self.registry.clear();
    }

    /// Number of live per-thread GPU contexts.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.registry.len()
    }
}
