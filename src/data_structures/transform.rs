//! World-space placement of an object.
//!
//! A [`Transform`] stores position, Euler rotation in degrees and a
//! non-uniform scale. It is the common base of everything that lives in the
//! world, most notably the [`Camera`](crate::camera::Camera).

use cgmath::{Angle, Deg, InnerSpace, Matrix4, Rad, Vector3};

/// Position, rotation (Euler angles in degrees) and scale of an object.
///
/// For the direction vectors `rotation.z` acts as yaw and `rotation.y` as
/// pitch; `rotation.x` only affects [`matrix`](Self::matrix).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transform: origin, no rotation, unit scale.
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Unit vector the object is looking along.
    pub fn forward(&self) -> Vector3<f32> {
        let (sin_yaw, cos_yaw) = Rad::from(Deg(self.rotation.z)).sin_cos();
        let (sin_pitch, cos_pitch) = Rad::from(Deg(self.rotation.y)).sin_cos();
        Vector3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize()
    }

    /// Unit vector pointing to the right of [`forward`](Self::forward), kept level with the world.
    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(Vector3::unit_y()).normalize()
    }

    /// Unit vector perpendicular to both `right` and `forward`.
    pub fn up(&self) -> Vector3<f32> {
        self.right().cross(self.forward()).normalize()
    }

    /// Model matrix composed as translate, scale, rotate X, rotate Y, rotate Z.
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
            * Matrix4::from_angle_x(Deg(self.rotation.x))
            * Matrix4::from_angle_y(Deg(self.rotation.y))
            * Matrix4::from_angle_z(Deg(self.rotation.z))
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Vector3<f32>) {
        self.rotation = rotation;
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
    }

    pub fn add_position(&mut self, position: Vector3<f32>) {
        self.position += position;
    }

    pub fn add_rotation(&mut self, rotation: Vector3<f32>) {
        self.rotation += rotation;
    }

    pub fn add_scale(&mut self, scale: Vector3<f32>) {
        self.scale += scale;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vector3<f32>> for Transform {
    fn from(position: Vector3<f32>) -> Self {
        Transform {
            position,
            ..Default::default()
        }
    }
}
