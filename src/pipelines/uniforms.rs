use std::collections::BTreeMap;

use cgmath::Matrix4;

use crate::{
    error::ShaderError,
    pipelines::reflect::{UniformField, UniformKind},
};

/// A value assigned to a named uniform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Mat4(Matrix4<f32>),
}

impl UniformValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            UniformValue::Bool(_) => "bool",
            UniformValue::Int(_) => "i32",
            UniformValue::Float(_) => "f32",
            UniformValue::Mat4(_) => "mat4x4<f32>",
        }
    }

    /// Whether the value can be written to a uniform of `kind`.
    /// Booleans are stored as 0 or 1 in integer uniforms.
    pub fn fits(&self, kind: UniformKind) -> bool {
        matches!(
            (self, kind),
            (UniformValue::Bool(_) | UniformValue::Int(_), UniformKind::Int | UniformKind::Uint)
                | (UniformValue::Float(_), UniformKind::Float)
                | (UniformValue::Mat4(_), UniformKind::Mat4)
        )
    }

    fn write(&self, out: &mut [u8]) {
        match *self {
            UniformValue::Bool(value) => out[..4].copy_from_slice(&(value as i32).to_ne_bytes()),
            UniformValue::Int(value) => out[..4].copy_from_slice(&value.to_ne_bytes()),
            UniformValue::Float(value) => out[..4].copy_from_slice(&value.to_ne_bytes()),
            UniformValue::Mat4(value) => {
                let columns: [[f32; 4]; 4] = value.into();
                out[..64].copy_from_slice(bytemuck::cast_slice(&columns));
            }
        }
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        UniformValue::Bool(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<Matrix4<f32>> for UniformValue {
    fn from(value: Matrix4<f32>) -> Self {
        UniformValue::Mat4(value)
    }
}

/// Uniform values for a single draw, applied on top of the values of the
/// shader's last [`update`](super::shader::Shader::update).
///
/// ```
/// use glwrap::{Uniforms, cgmath::{Matrix4, Vector3}};
///
/// let left = Uniforms::new()
///     .with("model", Matrix4::from_translation(Vector3::new(-1.0, 0.0, 0.0)))
///     .with("brightness", 0.5_f32);
/// assert!(left.get("model").is_some());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Uniforms {
    values: BTreeMap<String, UniformValue>,
}

impl Uniforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Check `value` against the declared kind of the uniform.
pub fn check(field: &UniformField, value: &UniformValue) -> Result<(), ShaderError> {
    if value.fits(field.kind) {
        Ok(())
    } else {
        Err(ShaderError::UniformKind {
            name: field.name.clone(),
            expected: field.kind.name(),
            actual: value.type_name(),
        })
    }
}

/// Lay out the current values in a byte block of `size` bytes.
/// Uniforms that were never set stay zero.
pub fn pack(
    fields: &[UniformField],
    size: u32,
    values: &BTreeMap<String, UniformValue>,
) -> Result<Vec<u8>, ShaderError> {
    let mut block = vec![0u8; size as usize];
    write_into(fields, &mut block, values)?;
    Ok(block)
}

/// Overwrite the members named in `values` inside an already packed block.
pub fn write_into(
    fields: &[UniformField],
    block: &mut [u8],
    values: &BTreeMap<String, UniformValue>,
) -> Result<(), ShaderError> {
    for field in fields {
        if let Some(value) = values.get(&field.name) {
            check(field, value)?;
            value.write(&mut block[field.offset as usize..]);
        }
    }
    Ok(())
}

/// Overwrite a packed block with per-draw `overrides`.
pub fn apply(fields: &[UniformField], block: &mut [u8], overrides: &Uniforms) -> Result<(), ShaderError> {
    write_into(fields, block, &overrides.values)
}
