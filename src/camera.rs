//! Cameras producing view and projection matrices.
//!
//! The camera is a [`Transform`] with a field of view, clip planes and an
//! optional target to look at. Matrices are returned in wgpu clip space so
//! they can be fed straight into shader uniforms.

use cgmath::{Deg, EuclideanSpace, Matrix4, Point3, Vector2};

use crate::{data_structures::transform::Transform, error::ShaderError, pipelines::shader::Shader};

/// cgmath builds OpenGL style projections (depth in -1..1), wgpu expects 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Debug)]
pub struct Camera {
    pub transform: Transform,
    fov: f32,
    near: f32,
    far: f32,
    perspective: bool,
    target: Option<Point3<f32>>,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            transform: Transform::new(),
            fov: 90.0,
            near: 0.1,
            far: 1000.0,
            perspective: true,
            target: None,
        }
    }

    /// Field of view in degrees.
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
    }

    pub fn add_fov(&mut self, fov: f32) {
        self.fov += fov;
    }

    pub fn clip(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    pub fn set_clip(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    pub fn is_perspective(&self) -> bool {
        self.perspective
    }

    pub fn set_perspective(&mut self, perspective: bool) {
        self.perspective = perspective;
    }

    /// Lock the view onto a point. `None` looks along the transform's forward vector again.
    pub fn set_target(&mut self, target: Option<Point3<f32>>) {
        self.target = target;
    }

    pub fn target(&self) -> Option<Point3<f32>> {
        self.target
    }

    pub fn view(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.transform.position);
        let center = self
            .target
            .unwrap_or_else(|| eye + self.transform.forward());
        Matrix4::look_at_rh(eye, center, self.transform.up())
    }

    /// Projection for a viewport of `aspect.x` by `aspect.y` pixels.
    ///
    /// Orthographic cameras map `0..width` and `0..height` onto the screen.
    pub fn projection(&self, aspect: Vector2<f32>) -> Matrix4<f32> {
        let projection = if self.perspective {
            cgmath::perspective(Deg(self.fov), aspect.x / aspect.y, self.near, self.far)
        } else {
            cgmath::ortho(0.0, aspect.x, 0.0, aspect.y, self.near, self.far)
        };
        OPENGL_TO_WGPU_MATRIX * projection
    }

    /// Store the `view` and `projection` uniforms on `shader`.
    pub fn apply(&self, shader: &mut Shader, aspect: Vector2<f32>) -> Result<(), ShaderError> {
        shader.set_matrix4("view", self.view())?;
        shader.set_matrix4("projection", self.projection(aspect))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
