//! Per-frame wave synthesis from the impulse list.

use glam::{Mat4, Vec3, Vec4};
use serde::Serialize;

use crate::impulse::Impulse;

fn mix(a: f32, b: f32, k: f32) -> f32 {
    a + (b - a) * k
}

/// Parameter snapshot shared by all waves of a frame.
#[derive(Debug, Clone, Copy)]
pub struct WaveSettings {
    /// Radial wavefront speed, world units per second.
    pub velocity: f32,
    /// Per-second amplitude decay base, normally in (0, 1].
    pub decay: f32,
    /// Peak displacement distance.
    pub max_displacement: f32,
    /// Wave tint color.
    pub color: Vec4,
    /// How strongly the wave color replaces the source color.
    pub color_mix: f32,
    /// Block-size scale at full amplitude.
    pub block_size_multiplier: f32,
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            velocity: 100.0,
            decay: 0.95,
            max_displacement: 100.0,
            color: Vec4::ONE,
            color_mix: 0.0,
            block_size_multiplier: 1.0,
        }
    }
}

/// A traveling annulus of influence, re-derived from scratch every frame.
///
/// Field order and padding match the GPU storage-buffer layout (80 bytes,
/// five vec4 slots); keep in sync with the `Wave` struct in
/// `voxel_compute.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize)]
#[allow(clippy::pub_underscore_fields)]
pub struct Wave {
    /// Emitter position in wave space (homogeneous).
    pub position: [f32; 4],
    /// xyz: displacement direction scaled by magnitude; w: magnitude.
    pub displacement: [f32; 4],
    pub color: [f32; 4],
    pub outer_radius: f32,
    pub inner_radius: f32,
    pub block_size_multiplier: f32,
    pub color_mix: f32,
    /// Seconds since the impulse began emitting.
    pub age: f32,
    #[serde(skip)]
    pub _pad: [f32; 3],
}

/// Evaluates every impulse at `now` (host time units) and returns the active
/// waves.
///
/// A wave is emitted only when the impulse has begun (`time_from_start > 0`);
/// waves whose annulus has left the relevant depth range are not culled here,
/// the compute stage's geometry math makes them irrelevant.
pub fn synthesize_waves(
    impulses: &[Impulse],
    settings: &WaveSettings,
    now: f64,
    time_scale: f64,
    wave_transform: &Mat4,
) -> Vec<Wave> {
    let mut waves = Vec::with_capacity(impulses.len());

    for impulse in impulses {
        if impulse.end <= impulse.start {
            continue;
        }

        let time_from_start = ((now - impulse.start) / time_scale) as f32;
        let time_from_end = ((now - impulse.end) / time_scale) as f32;
        if time_from_start <= 0.0 {
            continue;
        }

        let outer_radius = settings.velocity * time_from_start;
        let inner_radius = if time_from_end <= 0.0 {
            0.0
        } else {
            settings.velocity * time_from_end
        };

        let amplitude_at_end = settings.decay.powf(time_from_end);
        let amplitude_at_mid = settings
            .decay
            .powf(0.5 * (time_from_start + time_from_end));

        let block_size_multiplier = mix(1.0, settings.block_size_multiplier, amplitude_at_mid);
        let displacement_magnitude = amplitude_at_end * settings.max_displacement;
        let color_mix = amplitude_at_end * settings.color_mix;

        let position = *wave_transform * impulse.snapshot.position.extend(1.0);

        // Direction transforms as the difference of two transformed points,
        // which removes the translation component.
        let direction = impulse.snapshot.displacement_direction;
        let base = wave_transform.transform_point3(impulse.snapshot.position);
        let tip = wave_transform.transform_point3(impulse.snapshot.position + direction);
        let wave_direction = (tip - base).normalize_or_zero();

        waves.push(Wave {
            position: position.to_array(),
            displacement: (wave_direction * displacement_magnitude)
                .extend(displacement_magnitude)
                .to_array(),
            color: settings.color.to_array(),
            outer_radius,
            inner_radius,
            block_size_multiplier,
            color_mix,
            age: time_from_start,
            _pad: [0.0; 3],
        });
    }

    waves
}
