//! Headless GPU pipeline integration tests.
//!
//! These require a GPU adapter (real or software fallback). On machines
//! without one the first render fails with an adapter error and the
//! remaining checks are skipped.

use std::sync::Arc;

use glam::{Vec3, Vec4};
use voxelwave::*;

const SIZE: u32 = 64;
const GRID: u32 = 50;

/// A frame-sized RGBA32F buffer filled with one color.
fn solid_f32(color: [f32; 4]) -> Vec<u8> {
    let mut data = Vec::with_capacity((SIZE * SIZE) as usize * 16);
    for _ in 0..SIZE * SIZE {
        for c in color {
            data.extend_from_slice(&c.to_ne_bytes());
        }
    }
    data
}

fn f32_slice(data: &[u8]) -> ImageSlice<'_> {
    ImageSlice::new(data, SIZE, SIZE, (SIZE * 16) as usize, PixelFormat::RgbaF32).unwrap()
}

fn read_pixel(data: &[u8], x: u32, y: u32) -> [f32; 4] {
    let offset = ((y * SIZE + x) * 16) as usize;
    let mut px = [0.0f32; 4];
    for (i, channel) in px.iter_mut().enumerate() {
        let start = offset + i * 4;
        *channel = f32::from_ne_bytes(data[start..start + 4].try_into().unwrap());
    }
    px
}

/// A host whose camera puts every grid cell in view: 90 degree fov, flat
/// mid-gray depth, and blocks large enough to cover the frame.
fn pipeline_host(track: &[(f64, bool)], now: f64) -> FixtureHost {
    let mut host = FixtureHost::new();
    host.impulse_track = track
        .iter()
        .map(|&(time, emitting)| KeyframeSample { time, emitting })
        .collect();
    host.current_time = now;
    host.camera = CameraRig {
        focal_length: 960.0,
        image_plane_width: 1920.0,
        image_plane_height: 1920.0,
        near: 1.0,
        far: 10_000.0,
        ..CameraRig::default()
    };
    host.set(ParamId::NearBlockSize, ParamValue::Float(200.0));
    host.set(ParamId::FarBlockSize, ParamValue::Float(200.0));
    host.set(ParamId::NumBlocksX, ParamValue::Int(i64::from(GRID)));
    host.set(ParamId::NumBlocksY, ParamValue::Int(i64::from(GRID)));
    host
}

#[test]
fn gpu_pipeline_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
    let effect = Arc::new(VoxelWaveEffect::new());

    let color = solid_f32([1.0, 0.0, 0.0, 1.0]);
    let depth = solid_f32([0.5, 0.5, 0.5, 1.0]);

    // --- Wave-free frame: voxels carry the source color ---
    let packet = effect
        .prerender(&pipeline_host(&[], 0.0))
        .expect("prerender failed");
    let mut out = vec![0u8; (SIZE * SIZE * 16) as usize];
    {
        let mut out_slice =
            ImageSliceMut::new(&mut out, SIZE, SIZE, (SIZE * 16) as usize, PixelFormat::RgbaF32)
                .unwrap();
        match effect.render(
            &packet,
            &f32_slice(&color),
            &f32_slice(&depth),
            &mut out_slice,
            &mut || false,
        ) {
            Ok(status) => assert_eq!(status, RenderStatus::Completed),
            Err(e) => {
                eprintln!("Skipping GPU pipeline tests: no adapter available ({e})");
                return;
            }
        }
    }
    let center = read_pixel(&out, SIZE / 2, SIZE / 2);
    assert!(center[0] > 0.9, "center pixel should be red, got {center:?}");
    assert!(center[1] < 0.1);

    // --- Small blocks resolve to a regular projected grid with gaps ---
    {
        // 16x16 cells over 64px with a 90 degree fov: cell (i, j) unprojects
        // to depth 550 and lands centered on pixel coordinate (4i+2, 4j+2).
        // A 40-unit block spans +-(20/550)*32 = +-1.16px, so each cell
        // covers exactly the two pixel centers nearest its own center and
        // leaves the other two rows/columns of its 4px period empty.
        let mut host = pipeline_host(&[], 0.0);
        host.set(ParamId::NumBlocksX, ParamValue::Int(16));
        host.set(ParamId::NumBlocksY, ParamValue::Int(16));
        host.set(ParamId::NearBlockSize, ParamValue::Float(40.0));
        host.set(ParamId::FarBlockSize, ParamValue::Float(40.0));
        let packet = effect.prerender(&host).expect("prerender failed");

        let mut out = vec![0u8; (SIZE * SIZE * 16) as usize];
        let mut out_slice =
            ImageSliceMut::new(&mut out, SIZE, SIZE, (SIZE * 16) as usize, PixelFormat::RgbaF32)
                .unwrap();
        let status = effect
            .render(
                &packet,
                &f32_slice(&color),
                &f32_slice(&depth),
                &mut out_slice,
                &mut || false,
            )
            .expect("grid render failed");
        assert_eq!(status, RenderStatus::Completed);

        for &(i, j) in &[(3u32, 3u32), (8, 5), (12, 12)] {
            for (x, y) in [(4 * i + 1, 4 * j + 1), (4 * i + 2, 4 * j + 2)] {
                let hit = read_pixel(&out, x, y);
                assert!(
                    hit[0] > 0.9 && hit[3] > 0.9,
                    "cell ({i},{j}) should cover pixel ({x},{y}), got {hit:?}"
                );
            }
            let gap = read_pixel(&out, 4 * i, 4 * j);
            assert!(
                gap.iter().all(|&c| c == 0.0),
                "pixel ({},{}) lies between cells and must stay empty, got {gap:?}",
                4 * i,
                4 * j
            );
        }
    }

    // --- A full-mix wave tints every voxel it covers ---
    {
        // Flat depth 0.5 puts all voxels 550 units out. A still-emitting
        // track keeps the inner edge at 0, and the outer radius of 2000
        // covers the whole grid.
        let mut host = pipeline_host(&[(0.0, true), (2.0, true)], 2.0);
        host.set(ParamId::WaveVelocity, ParamValue::Float(1000.0));
        host.set(ParamId::WaveColorMix, ParamValue::Float(1.0));
        host.set(ParamId::WaveDecay, ParamValue::Float(1.0));
        host.set(ParamId::WaveDisplacement, ParamValue::Float(0.0));
        host.set(
            ParamId::WaveColor,
            ParamValue::Color(Vec4::new(0.0, 1.0, 0.0, 1.0)),
        );
        host.set(ParamId::EmitterPosition, ParamValue::Point3(Vec3::ZERO));

        let packet = effect.prerender(&host).expect("prerender failed");
        assert_eq!(packet.waves.len(), 1);
        assert!(packet.waves[0].outer_radius >= 2000.0);

        let mut out = vec![0u8; (SIZE * SIZE * 16) as usize];
        let mut out_slice =
            ImageSliceMut::new(&mut out, SIZE, SIZE, (SIZE * 16) as usize, PixelFormat::RgbaF32)
                .unwrap();
        let status = effect
            .render(
                &packet,
                &f32_slice(&color),
                &f32_slice(&depth),
                &mut out_slice,
                &mut || false,
            )
            .expect("render failed");
        assert_eq!(status, RenderStatus::Completed);

        let center = read_pixel(&out, SIZE / 2, SIZE / 2);
        assert!(center[1] > 0.9, "wave should tint voxels green, got {center:?}");
        assert!(center[0] < 0.1);
    }

    // --- 8-bit output round-trips through the float pipeline ---
    {
        let packet = effect.prerender(&pipeline_host(&[], 0.0)).unwrap();
        let color8: Vec<u8> = std::iter::repeat([255u8, 0, 0, 255])
            .take((SIZE * SIZE) as usize)
            .flatten()
            .collect();
        let depth8: Vec<u8> = std::iter::repeat([128u8, 128, 128, 255])
            .take((SIZE * SIZE) as usize)
            .flatten()
            .collect();
        let color_slice =
            ImageSlice::new(&color8, SIZE, SIZE, (SIZE * 4) as usize, PixelFormat::Rgba8).unwrap();
        let depth_slice =
            ImageSlice::new(&depth8, SIZE, SIZE, (SIZE * 4) as usize, PixelFormat::Rgba8).unwrap();

        let mut out8 = vec![0u8; (SIZE * SIZE * 4) as usize];
        let mut out_slice =
            ImageSliceMut::new(&mut out8, SIZE, SIZE, (SIZE * 4) as usize, PixelFormat::Rgba8)
                .unwrap();
        let status = effect
            .render(&packet, &color_slice, &depth_slice, &mut out_slice, &mut || false)
            .expect("8-bit render failed");
        assert_eq!(status, RenderStatus::Completed);

        let center = ((SIZE / 2 * SIZE + SIZE / 2) * 4) as usize;
        assert_eq!(out8[center], 255, "8-bit center pixel should be full red");
        assert_eq!(out8[center + 1], 0);
    }

    // --- Abort before any GPU work leaves the output untouched ---
    {
        let packet = effect.prerender(&pipeline_host(&[], 0.0)).unwrap();
        let mut out = vec![0u8; (SIZE * SIZE * 16) as usize];
        let mut out_slice =
            ImageSliceMut::new(&mut out, SIZE, SIZE, (SIZE * 16) as usize, PixelFormat::RgbaF32)
                .unwrap();
        let status = effect
            .render(
                &packet,
                &f32_slice(&color),
                &f32_slice(&depth),
                &mut out_slice,
                &mut || true,
            )
            .expect("abort path failed");
        assert_eq!(status, RenderStatus::Aborted);
        assert!(out.iter().all(|&b| b == 0), "aborted frame must not write output");
    }

    // --- Each render thread gets its own context ---
    {
        assert_eq!(effect.context_count(), 1);
        let effect2 = Arc::clone(&effect);
        let color2 = color.clone();
        let depth2 = depth.clone();
        let handle = std::thread::spawn(move || {
            let packet = effect2.prerender(&pipeline_host(&[], 0.0)).unwrap();
            let mut out = vec![0u8; (SIZE * SIZE * 16) as usize];
            let mut out_slice = ImageSliceMut::new(
                &mut out,
                SIZE,
                SIZE,
                (SIZE * 16) as usize,
                PixelFormat::RgbaF32,
            )
            .unwrap();
            effect2
                .render(
                    &packet,
                    &f32_slice(&color2),
                    &f32_slice(&depth2),
                    &mut out_slice,
                    &mut || false,
                )
                .expect("second-thread render failed");
        });
        handle.join().expect("render thread panicked");
        assert_eq!(effect.context_count(), 2);

        effect.teardown();
        assert_eq!(effect.context_count(), 0);
    }
}
