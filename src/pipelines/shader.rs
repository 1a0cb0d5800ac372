//! Shader programs with named uniforms and texture slots.
//!
//! A [`Shader`] is a vertex and a fragment stage that passed compilation and
//! linking (see [`reflect`](super::reflect)). Uniform values and textures are
//! set by name and kept on the CPU until [`Shader::update`] uploads them.
//! Render pipelines are built lazily, one per vertex layout of the meshes
//! drawn with the shader.
//!
//! The uniform block lives in slot 0 of a buffer bound with a dynamic offset.
//! Draws that carry their own [`Uniforms`] get the slots after it, so one
//! shader can draw several objects per frame with different values.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    path::Path,
};

use cgmath::Matrix4;

use crate::{
    data_structures::{mesh::VertexSlot, texture::Texture2D},
    error::ShaderError,
    pipelines::{
        basic::{PipelineTargets, mk_render_pipeline},
        reflect::{self, Reflection},
        uniforms::{self, UniformValue, Uniforms},
    },
    resources,
};

const DEFAULT_SHADER: &str = include_str!("default_shader.wgsl");

type PipelineKey = (Vec<VertexSlot>, wgpu::TextureFormat);

struct UniformSlots {
    buffer: Option<wgpu::Buffer>,
    group: wgpu::BindGroup,
    capacity: u32,
}

pub struct Shader {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    reflection: Reflection,
    values: BTreeMap<String, UniformValue>,
    textures: BTreeMap<String, Texture2D>,
    uniforms_dirty: bool,
    textures_dirty: bool,
    uniform_block: Vec<u8>,
    uniform_stride: wgpu::BufferAddress,
    uniform_layout: wgpu::BindGroupLayout,
    uniform_slots: RefCell<UniformSlots>,
    texture_layout: wgpu::BindGroupLayout,
    texture_group: wgpu::BindGroup,
    pipeline_layout: wgpu::PipelineLayout,
    fallback: Texture2D,
    pipelines: RefCell<HashMap<PipelineKey, wgpu::RenderPipeline>>,
}

impl Shader {
    /// Compile and link a program. Both stages may come from the same source.
    pub fn from_source(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let vertex = reflect::compile("vertex", vertex_source)?;
        let fragment = reflect::compile("fragment", fragment_source)?;
        let reflection = reflect::link((&vertex.0, vertex.1), (&fragment.0, fragment.1))?;
        log::debug!(
            "{}: {} uniforms in {} bytes, {} textures",
            label,
            reflection.uniforms.len(),
            reflection.uniform_size,
            reflection.textures.len()
        );

        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} vertex", label)),
            source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} fragment", label)),
            source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
        });

        let visibility = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let uniform_entries: Vec<_> = (reflection.uniform_size > 0)
            .then_some(wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(reflection.uniform_size as u64),
                },
                count: None,
            })
            .into_iter()
            .collect();
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} uniform layout", label)),
            entries: &uniform_entries,
        });

        let texture_entries: Vec<_> = reflection
            .textures
            .iter()
            .flat_map(|slot| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: slot.binding,
                        visibility,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: slot.sampler_binding,
                        visibility,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} texture layout", label)),
            entries: &texture_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} pipeline layout", label)),
            bind_group_layouts: &[Some(&uniform_layout), Some(&texture_layout)],
            immediate_size: 0,
        });

        let uniform_stride = wgpu::util::align_to(
            reflection.uniform_size as wgpu::BufferAddress,
            device.limits().min_uniform_buffer_offset_alignment as wgpu::BufferAddress,
        );
        let uniform_slots = create_uniform_slots(
            device,
            label,
            &uniform_layout,
            reflection.uniform_size,
            uniform_stride,
            1,
        );

        let fallback = Texture2D::create_fallback(device, queue);
        let texture_group = create_texture_group(
            device,
            label,
            &texture_layout,
            &reflection,
            &BTreeMap::new(),
            &fallback,
        );

        let uniform_size = reflection.uniform_size as usize;
        Ok(Self {
            label: label.to_string(),
            vertex,
            fragment,
            reflection,
            values: BTreeMap::new(),
            textures: BTreeMap::new(),
            uniforms_dirty: true,
            textures_dirty: false,
            uniform_block: vec![0; uniform_size],
            uniform_stride,
            uniform_layout,
            uniform_slots: RefCell::new(uniform_slots),
            texture_layout,
            texture_group,
            pipeline_layout,
            fallback,
            pipelines: RefCell::new(HashMap::new()),
        })
    }

    /// Read both stages from disk and compile them.
    pub async fn from_files(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let (vertex_path, fragment_path) = (vertex_path.as_ref(), fragment_path.as_ref());
        let read = |path: &Path| {
            let path = path.to_path_buf();
            async move {
                resources::load_string(&path)
                    .await
                    .map_err(|source| ShaderError::Io { path, source })
            }
        };
        let (vertex_source, fragment_source) =
            futures::try_join!(read(vertex_path), read(fragment_path))?;
        let label = vertex_path.file_stem().unwrap_or_default().to_string_lossy();
        Self::from_source(device, queue, &label, &vertex_source, &fragment_source)
    }

    /// Flat grey geometry transformed by `model`, `view` and `projection`.
    pub fn default_shader(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self, ShaderError> {
        Self::from_source(device, queue, "default shader", DEFAULT_SHADER, DEFAULT_SHADER)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn reflection(&self) -> &Reflection {
        &self.reflection
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformValue::Bool(value))
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformValue::Int(value))
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformValue::Float(value))
    }

    pub fn set_matrix4(&mut self, name: &str, value: Matrix4<f32>) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformValue::Mat4(value))
    }

    /// Cache a uniform value for the next [`update`](Self::update).
    ///
    /// Names the program does not declare are ignored.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), ShaderError> {
        let Some(field) = self.reflection.uniform(name) else {
            log::debug!("{}: no uniform named `{}`", self.label, name);
            return Ok(());
        };
        uniforms::check(field, &value)?;
        if self.values.get(name) != Some(&value) {
            self.values.insert(name.to_string(), value);
            self.uniforms_dirty = true;
        }
        Ok(())
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    /// The texture assigned to slot `name`, unset slots sample a white texel.
    pub fn texture(&self, name: &str) -> Option<&Texture2D> {
        self.textures.get(name)
    }

    /// Assign a texture to the sampler slot `name`.
    pub fn set_texture(&mut self, name: &str, texture: &Texture2D) {
        if self.reflection.texture_unit(name).is_none() {
            log::debug!("{}: no texture named `{}`", self.label, name);
            return;
        }
        self.textures.insert(name.to_string(), texture.clone());
        self.textures_dirty = true;
    }

    /// Upload changed uniforms and rebind changed textures.
    pub fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<(), ShaderError> {
        if self.uniforms_dirty {
            self.uniform_block = uniforms::pack(
                &self.reflection.uniforms,
                self.reflection.uniform_size,
                &self.values,
            )?;
            if let Some(buffer) = &self.uniform_slots.borrow().buffer {
                queue.write_buffer(buffer, 0, &self.uniform_block);
            }
            self.uniforms_dirty = false;
        }
        if self.textures_dirty {
            self.texture_group = create_texture_group(
                device,
                &self.label,
                &self.texture_layout,
                &self.reflection,
                &self.textures,
                &self.fallback,
            );
            self.textures_dirty = false;
        }
        Ok(())
    }

    /// The pipeline for meshes with the given vertex slots, built on first use.
    ///
    /// Returns `None` when the mesh lacks an input the vertex stage reads.
    pub fn pipeline(
        &self,
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        slots: &[VertexSlot],
    ) -> Option<wgpu::RenderPipeline> {
        let missing: Vec<_> = self
            .reflection
            .vertex_inputs
            .iter()
            .filter(|location| !slots.iter().any(|slot| slot.location == **location))
            .collect();
        if !missing.is_empty() {
            log::warn!(
                "{}: mesh has no vertex data at locations {:?}",
                self.label,
                missing
            );
            return None;
        }

        let key = (slots.to_vec(), color_format);
        let mut pipelines = self.pipelines.borrow_mut();
        let pipeline = pipelines.entry(key).or_insert_with(|| {
            log::debug!("{}: building pipeline for {:?}", self.label, slots);
            mk_render_pipeline(
                device,
                &self.label,
                &self.pipeline_layout,
                &PipelineTargets {
                    color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    depth_format: Some(Texture2D::DEPTH_FORMAT),
                },
                slots,
                &self.vertex,
                &self.fragment,
            )
        });
        Some(pipeline.clone())
    }

    /// Write one uniform block per entry of `overrides` after slot 0 and
    /// return the dynamic offset of each, in order.
    ///
    /// Slots are reused every frame, so this is called once per shader per
    /// frame with every override drawn in it. The buffer grows to fit.
    pub fn stage(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        overrides: &[&Uniforms],
    ) -> Result<Vec<u32>, ShaderError> {
        let blocks = overrides
            .iter()
            .map(|values| self.override_block(values))
            .collect::<Result<Vec<_>, ShaderError>>()?;
        if self.reflection.uniform_size == 0 {
            return Ok(vec![0; blocks.len()]);
        }

        let needed = blocks.len() as u32 + 1;
        let mut slots = self.uniform_slots.borrow_mut();
        if slots.capacity < needed {
            let capacity = needed.next_power_of_two();
            log::debug!("{}: growing uniform slots to {}", self.label, capacity);
            *slots = create_uniform_slots(
                device,
                &self.label,
                &self.uniform_layout,
                self.reflection.uniform_size,
                self.uniform_stride,
                capacity,
            );
            if let Some(buffer) = &slots.buffer {
                queue.write_buffer(buffer, 0, &self.uniform_block);
            }
        }

        let mut offsets = Vec::with_capacity(blocks.len());
        if let Some(buffer) = &slots.buffer {
            for (i, block) in blocks.iter().enumerate() {
                let offset = self.uniform_stride * (i as wgpu::BufferAddress + 1);
                queue.write_buffer(buffer, offset, block);
                offsets.push(offset as u32);
            }
        }
        Ok(offsets)
    }

    fn override_block(&self, overrides: &Uniforms) -> Result<Vec<u8>, ShaderError> {
        let mut block = self.uniform_block.clone();
        uniforms::apply(&self.reflection.uniforms, &mut block, overrides)?;
        Ok(block)
    }

    /// Bind the uniform slot at `offset` (0 for the shader's own values) and the textures.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>, offset: u32) {
        let slots = self.uniform_slots.borrow();
        let dynamic = [offset];
        let offsets: &[u32] = match slots.buffer {
            Some(_) => &dynamic,
            None => &[],
        };
        render_pass.set_bind_group(0, &slots.group, offsets);
        render_pass.set_bind_group(1, &self.texture_group, &[]);
    }
}

fn create_uniform_slots(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    size: u32,
    stride: wgpu::BufferAddress,
    capacity: u32,
) -> UniformSlots {
    let buffer = (size > 0).then(|| {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} uniform buffer", label)),
            size: stride * capacity as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    });
    let entries: Vec<_> = buffer
        .iter()
        .map(|buffer| wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: wgpu::BufferSize::new(size as u64),
            }),
        })
        .collect();
    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{} uniform group", label)),
        layout,
        entries: &entries,
    });
    UniformSlots {
        buffer,
        group,
        capacity,
    }
}

fn create_texture_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    reflection: &Reflection,
    textures: &BTreeMap<String, Texture2D>,
    fallback: &Texture2D,
) -> wgpu::BindGroup {
    let entries: Vec<_> = reflection
        .textures
        .iter()
        .flat_map(|slot| {
            textures
                .get(&slot.name)
                .unwrap_or(fallback)
                .bind_entries(slot.binding, slot.sampler_binding)
        })
        .collect();
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{} texture group", label)),
        layout,
        entries: &entries,
    })
}
