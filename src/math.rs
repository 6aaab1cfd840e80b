// Math utilities for the viewer

use glam::{Mat4, Quat, Vec3};

/// Translate · rotate · scale placement of an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::identity()
        }
    }

    /// Rotation about the world up axis, in degrees.
    pub fn with_yaw_degrees(mut self, degrees: f32) -> Self {
        self.rotation = Quat::from_rotation_y(degrees.to_radians());
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_uniform_scale(self, scale: f32) -> Self {
        self.with_scale(Vec3::splat(scale))
    }

    /// Generate transformation matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Matrix that transforms normals along with `model`.
pub fn normal_matrix(model: Mat4) -> Mat4 {
    model.inverse().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn matrix_applies_scale_then_rotation_then_translation() {
        let transform = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0))
            .with_yaw_degrees(90.0)
            .with_uniform_scale(2.0);
        let expected = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))
            * Mat4::from_rotation_y(90f32.to_radians())
            * Mat4::from_scale(Vec3::splat(2.0));

        let m = transform.matrix();
        for (a, b) in m.to_cols_array().iter().zip(expected.to_cols_array().iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }

        // +X, scaled to 2, turned onto -Z, then shifted
        let p = m.transform_point3(Vec3::X);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Transform::from_scale(Vec3::new(0.1, 1.0, 1.0)).matrix();
        let n = normal_matrix(model).transform_vector3(Vec3::X);
        assert_relative_eq!(n.normalize().x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(n.x, 10.0, epsilon = 1e-4);
    }
}
