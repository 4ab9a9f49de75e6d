//! Camera geometry: projection and wave-space transforms.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::error::{Result, VoxelWaveError};

/// Raw camera state queried from the host at a composition time.
#[derive(Debug, Clone, Copy)]
pub struct CameraRig {
    /// Focal length in the host's world units.
    pub focal_length: f32,
    /// Image plane width in pixels.
    pub image_plane_width: f32,
    /// Image plane height in pixels.
    pub image_plane_height: f32,
    /// Camera position in world space.
    pub position: Vec3,
    /// Camera rotation, Euler angles per axis (radians).
    pub rotation: Vec3,
    /// Parent rig rotation applied before the camera's own rotation (radians).
    pub orientation: Vec3,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            focal_length: 50.0,
            image_plane_width: 1920.0,
            image_plane_height: 1080.0,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            orientation: Vec3::ZERO,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

/// Derived, immutable per-frame camera transform.
///
/// `wave_transform` maps world-space emitter coordinates into the
/// camera-local frame the depth buffer is interpreted in.
#[derive(Debug, Clone, Copy)]
pub struct CameraTransform {
    /// Field of view per axis (radians).
    pub fov: Vec2,
    /// Perspective projection matrix ([0,1] clip depth).
    pub projection: Mat4,
    /// Inverse of (rotation * orientation * translation).
    pub wave_transform: Mat4,
}

impl CameraTransform {
    /// Builds the per-frame transform from raw camera state.
    ///
    /// Non-positive focal length or near plane is a configuration error;
    /// downstream division would otherwise produce non-finite results.
    pub fn from_rig(rig: &CameraRig) -> Result<Self> {
        if rig.focal_length <= 0.0 {
            return Err(VoxelWaveError::InvalidFocalLength(rig.focal_length));
        }
        if rig.near <= 0.0 {
            return Err(VoxelWaveError::InvalidNearPlane(rig.near));
        }
        if rig.far <= rig.near {
            return Err(VoxelWaveError::InvalidClipRange {
                near: rig.near,
                far: rig.far,
            });
        }
        if rig.image_plane_width <= 0.0 || rig.image_plane_height <= 0.0 {
            return Err(VoxelWaveError::InvalidImagePlane {
                width: rig.image_plane_width,
                height: rig.image_plane_height,
            });
        }

        let fov = Vec2::new(
            2.0 * (0.5 * rig.image_plane_width).atan2(rig.focal_length),
            2.0 * (0.5 * rig.image_plane_height).atan2(rig.focal_length),
        );

        let projection = Self::frustum(fov, rig.near, rig.far);

        let rotation = Mat4::from_euler(
            glam::EulerRot::XYZ,
            rig.rotation.x,
            rig.rotation.y,
            rig.rotation.z,
        );
        let orientation = Mat4::from_euler(
            glam::EulerRot::XYZ,
            rig.orientation.x,
            rig.orientation.y,
            rig.orientation.z,
        );
        let translation = Mat4::from_translation(rig.position);
        let wave_transform = (rotation * orientation * translation).inverse();

        Ok(Self {
            fov,
            projection,
            wave_transform,
        })
    }

    /// Off-axis frustum from per-axis field of view.
    ///
    /// Right-handed, camera looking down -Z, clip depth in [0,1] as wgpu
    /// expects (camera-space z in [-near,-far] maps to [0,1]).
    fn frustum(fov: Vec2, near: f32, far: f32) -> Mat4 {
        let right = near * (0.5 * fov.x).tan();
        let top = near * (0.5 * fov.y).tan();

        Mat4::from_cols(
            Vec4::new(near / right, 0.0, 0.0, 0.0),
            Vec4::new(0.0, near / top, 0.0, 0.0),
            Vec4::new(0.0, 0.0, far / (near - far), -1.0),
            Vec4::new(0.0, 0.0, near * far / (near - far), 0.0),
        )
    }
}
