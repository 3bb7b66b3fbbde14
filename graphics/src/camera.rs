//! Camera description attached to every action.

use glam::{Mat4, Vec3, Vec4};

/// View and projection an action renders with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub view: Mat4,
    pub projection: Mat4,
    /// World-space eye position.
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Right-handed perspective camera looking from `position` at `target`.
    pub fn perspective(
        position: Vec3,
        target: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            view: Mat4::look_at_rh(position, target, Vec3::Y),
            projection: Mat4::perspective_rh(fov_y, aspect, near, far),
            position,
            near,
            far,
        }
    }

    /// Right-handed orthographic camera, as used for directional shadow maps.
    pub fn orthographic(
        position: Vec3,
        target: Vec3,
        half_extent: f32,
        near: f32,
        far: f32,
    ) -> Self {
        // Straight-down views need another up vector.
        let forward = (target - position).normalize_or_zero();
        let up = if forward.abs_diff_eq(Vec3::Y, 1e-4) || forward.abs_diff_eq(-Vec3::Y, 1e-4) {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Self {
            view: Mat4::look_at_rh(position, target, up),
            projection: Mat4::orthographic_rh(
                -half_extent,
                half_extent,
                -half_extent,
                half_extent,
                near,
                far,
            ),
            position,
            near,
            far,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// GPU layout of this camera.
    pub fn constants(&self) -> CameraConstants {
        CameraConstants {
            view: self.view,
            projection: self.projection,
            view_projection: self.view_projection(),
            position: self.position.extend(1.0),
            near_far: Vec4::new(self.near, self.far, 0.0, 0.0),
        }
    }
}

/// Camera constant buffer contents, bound at slot 0 of every draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraConstants {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub position: Vec4,
    /// `x` = near, `y` = far.
    pub near_far: Vec4,
}
