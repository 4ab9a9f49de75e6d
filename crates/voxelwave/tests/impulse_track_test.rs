//! CPU-side integration tests: host parameters through pre-render.
//!
//! These run entirely without a GPU; they exercise the parameter checkout
//! contract, impulse extraction, and packet construction end to end.

use glam::Vec3;
use voxelwave::*;

fn host_with_track(track: &[(f64, bool)], now: f64) -> FixtureHost {
    let mut host = FixtureHost::new();
    host.impulse_track = track
        .iter()
        .map(|&(time, emitting)| KeyframeSample { time, emitting })
        .collect();
    host.current_time = now;
    host
}

#[test]
fn two_bursts_make_two_waves() {
    // Two on/off bursts, both in the past at render time.
    let host = host_with_track(
        &[
            (0.0, true),
            (1.0, false),
            (3.0, true),
            (4.0, false),
            (5.0, false),
        ],
        6.0,
    );
    let effect = VoxelWaveEffect::new();
    let packet = effect.prerender(&host).unwrap();

    assert_eq!(packet.waves.len(), 2);
    // The older wave has traveled farther.
    assert!(packet.waves[0].outer_radius > packet.waves[1].outer_radius);
    assert_eq!(host.outstanding_checkouts(), 0);
}

#[test]
fn track_still_emitting_has_open_inner_edge() {
    let host = host_with_track(&[(0.0, true), (5.0, true)], 3.0);
    let effect = VoxelWaveEffect::new();
    let packet = effect.prerender(&host).unwrap();

    assert_eq!(packet.waves.len(), 1);
    assert_eq!(packet.waves[0].inner_radius, 0.0);
    assert!(packet.waves[0].outer_radius > 0.0);
}

#[test]
fn wave_count_is_a_pure_function_of_time() {
    let effect = VoxelWaveEffect::new();
    let track = [(0.0, true), (1.0, false), (2.0, false)];

    // Before the impulse begins: nothing.
    let before = effect.prerender(&host_with_track(&track, 0.0)).unwrap();
    assert!(before.waves.is_empty());

    // Long after: the wave still exists, just far away and faint.
    let after = effect.prerender(&host_with_track(&track, 500.0)).unwrap();
    assert_eq!(after.waves.len(), 1);
    assert!(after.waves[0].outer_radius > 49_000.0);
}

#[test]
fn cache_key_is_stable_for_identical_frames() {
    let effect = VoxelWaveEffect::new();
    let a = effect
        .prerender(&host_with_track(&[(0.0, true), (1.0, false)], 2.0))
        .unwrap();
    let b = effect
        .prerender(&host_with_track(&[(0.0, true), (1.0, false)], 2.0))
        .unwrap();
    assert_eq!(a.cache_key().unwrap(), b.cache_key().unwrap());
}

#[test]
fn cache_key_changes_as_waves_travel() {
    let effect = VoxelWaveEffect::new();
    let track = [(0.0, true), (1.0, false)];
    let a = effect.prerender(&host_with_track(&track, 2.0)).unwrap();
    let b = effect.prerender(&host_with_track(&track, 3.0)).unwrap();
    assert_ne!(a.cache_key().unwrap(), b.cache_key().unwrap());
}

#[test]
fn camera_placement_moves_waves_into_camera_space() {
    let mut host = host_with_track(&[(0.0, true), (1.0, false)], 2.0);
    host.set(
        ParamId::EmitterPosition,
        ParamValue::Point3(Vec3::new(0.0, 0.0, -500.0)),
    );
    host.camera.position = Vec3::new(0.0, 0.0, 100.0);

    let effect = VoxelWaveEffect::new();
    let packet = effect.prerender(&host).unwrap();

    // Camera at z=100 looking down -Z: the emitter sits 600 units in front.
    assert!((packet.waves[0].position[2] - (-600.0)).abs() < 1e-3);
}

#[test]
fn host_time_units_scale_wave_radii() {
    // 24 host units per second: a 24-unit-old wave is one second old.
    let mut host = host_with_track(&[(0.0, true), (24.0, false)], 48.0);
    host.time_scale = 24.0;
    let effect = VoxelWaveEffect::new();
    let packet = effect.prerender(&host).unwrap();

    assert!((packet.waves[0].outer_radius - 200.0).abs() < 1e-3);
    assert!((packet.waves[0].inner_radius - 100.0).abs() < 1e-3);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Radius evolution through the whole pre-render path: the wavefront
        // only moves outward, the trailing edge follows once emission stops,
        // and the default decay keeps displacement from growing.
        #[test]
        fn wave_radii_grow_with_frame_time(
            start in 0.0f64..10.0,
            duration in 0.1f64..10.0,
            gap in 0.1f64..50.0,
            delta in 0.1f64..50.0,
        ) {
            let effect = VoxelWaveEffect::new();
            let track = [(start, true), (start + duration, false)];

            let early = effect
                .prerender(&host_with_track(&track, start + duration + gap))
                .unwrap();
            let late = effect
                .prerender(&host_with_track(&track, start + duration + gap + delta))
                .unwrap();

            prop_assert_eq!(early.waves.len(), 1);
            prop_assert_eq!(late.waves.len(), 1);
            prop_assert!(late.waves[0].outer_radius > early.waves[0].outer_radius);
            prop_assert!(late.waves[0].inner_radius > early.waves[0].inner_radius);
            prop_assert!(
                late.waves[0].displacement[3] <= early.waves[0].displacement[3] + 1e-3
            );
        }
    }
}

#[test]
fn missing_parameter_is_reported_and_leases_balance() {
    struct NoGridHost(FixtureHost);
    impl EffectHost for NoGridHost {
        fn checkout(&self, id: ParamId, time: f64) -> voxelwave_core::Result<ParamValue> {
            if id == ParamId::NumBlocksX {
                return Err(VoxelWaveError::ParamMissing(id.name()));
            }
            self.0.checkout(id, time)
        }
        fn checkin(&self, id: ParamId) {
            self.0.checkin(id);
        }
        fn keyframes(&self, id: ParamId) -> voxelwave_core::Result<Vec<KeyframeSample>> {
            self.0.keyframes(id)
        }
        fn camera(&self, time: f64) -> voxelwave_core::Result<CameraRig> {
            self.0.camera(time)
        }
        fn time_scale(&self) -> f64 {
            self.0.time_scale()
        }
        fn current_time(&self) -> f64 {
            self.0.current_time()
        }
    }

    let host = NoGridHost(host_with_track(&[(0.0, true), (1.0, false)], 2.0));
    let effect = VoxelWaveEffect::new();
    let err = effect.prerender(&host).unwrap_err();
    assert!(err.to_string().contains("Num Blocks X"));
    assert_eq!(host.0.outstanding_checkouts(), 0);
}
