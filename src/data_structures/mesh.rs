//! Meshes: one vertex buffer per attribute slot plus an index buffer.
//!
//! Each attribute lives in its own buffer at a numbered layout slot, the slot
//! doubles as the `@location` the vertex shader reads it from. Attributes with
//! a divisor advance once per instance instead of once per vertex.

use wgpu::util::DeviceExt;

use crate::error::MeshError;

/// Floats of one vertex attribute and the number of components per vertex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeData {
    pub data: Vec<f32>,
    pub size: u32,
}

impl AttributeData {
    pub fn new(data: Vec<f32>, size: u32) -> Self {
        Self { data, size }
    }

    /// A zero filled attribute for `vertices` vertices.
    pub fn zeroed(vertices: usize, size: u32) -> Self {
        Self {
            data: vec![0.0; vertices * size as usize],
            size,
        }
    }

    pub fn element_count(&self) -> usize {
        match self.size {
            0 => 0,
            size => self.data.len() / size as usize,
        }
    }
}

/// CPU side geometry of a single primitive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub attributes: Vec<AttributeData>,
    pub indices: Vec<u32>,
}

/// How often an attribute buffer is expected to change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once, recreated if written again.
    Static,
    /// Rewritten in place while the new data fits.
    Dynamic,
}

/// Shape of one occupied attribute slot, as the pipeline sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexSlot {
    pub location: u32,
    pub components: u32,
    pub per_instance: bool,
}

impl VertexSlot {
    pub fn format(&self) -> wgpu::VertexFormat {
        match self.components {
            1 => wgpu::VertexFormat::Float32,
            2 => wgpu::VertexFormat::Float32x2,
            3 => wgpu::VertexFormat::Float32x3,
            _ => wgpu::VertexFormat::Float32x4,
        }
    }

    pub fn stride(&self) -> wgpu::BufferAddress {
        (self.components as usize * std::mem::size_of::<f32>()) as wgpu::BufferAddress
    }
}

/// Owned vertex attributes so that [`wgpu::VertexBufferLayout`]s can borrow them.
pub struct VertexLayouts {
    slots: Vec<VertexSlot>,
    attributes: Vec<[wgpu::VertexAttribute; 1]>,
}

impl VertexLayouts {
    pub fn new(slots: &[VertexSlot]) -> Self {
        let attributes = slots
            .iter()
            .map(|slot| {
                [wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: slot.location,
                    format: slot.format(),
                }]
            })
            .collect();
        Self {
            slots: slots.to_vec(),
            attributes,
        }
    }

    /// One buffer layout per occupied slot, in slot order.
    pub fn layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.slots
            .iter()
            .zip(self.attributes.iter())
            .map(|(slot, attributes)| wgpu::VertexBufferLayout {
                array_stride: slot.stride(),
                step_mode: if slot.per_instance {
                    wgpu::VertexStepMode::Instance
                } else {
                    wgpu::VertexStepMode::Vertex
                },
                attributes,
            })
            .collect()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Upload {
    Create,
    Rewrite,
}

fn plan_upload(existing: Option<(u64, BufferUsage)>, bytes: u64, usage: BufferUsage) -> Upload {
    match existing {
        Some((capacity, BufferUsage::Dynamic))
            if usage == BufferUsage::Dynamic && bytes > 0 && bytes <= capacity =>
        {
            Upload::Rewrite
        }
        _ => Upload::Create,
    }
}

/// Indices stored as u16 whenever every index fits.
#[derive(Clone, Debug, PartialEq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Indices {
    pub fn len(&self) -> usize {
        match self {
            Indices::U16(indices) => indices.len(),
            Indices::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            Indices::U16(_) => wgpu::IndexFormat::Uint16,
            Indices::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Indices::U16(indices) => bytemuck::cast_slice(indices),
            Indices::U32(indices) => bytemuck::cast_slice(indices),
        }
    }
}

impl From<&[u32]> for Indices {
    fn from(indices: &[u32]) -> Self {
        if indices.iter().all(|&i| i <= u16::MAX as u32) {
            Indices::U16(indices.iter().map(|&i| i as u16).collect())
        } else {
            Indices::U32(indices.to_vec())
        }
    }
}

#[derive(Debug)]
struct AttributeBuffer {
    buffer: wgpu::Buffer,
    slot: VertexSlot,
    usage: BufferUsage,
    elements: u32,
}

/// A drawable set of attribute buffers with an optional index buffer.
#[derive(Debug, Default)]
pub struct Mesh {
    pub name: String,
    slots: Vec<Option<AttributeBuffer>>,
    index_buffer: Option<(wgpu::Buffer, wgpu::IndexFormat)>,
    index_count: u32,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Upload `data` to layout slot `layout`.
    ///
    /// `size` is the number of components per element (1..=4). A `divisor`
    /// above zero advances the attribute once per instance.
    pub fn set_attribute_data(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[f32],
        size: u32,
        layout: u32,
        divisor: u32,
        usage: BufferUsage,
    ) -> Result<(), MeshError> {
        if !(1..=4).contains(&size) {
            return Err(MeshError::AttributeSize { layout, size });
        }
        if data.len() % size as usize != 0 {
            return Err(MeshError::AttributeLength {
                layout,
                len: data.len(),
                size,
            });
        }
        let idx = layout as usize;
        if self.slots.len() <= idx {
            self.slots.resize_with(idx + 1, || None);
            log::debug!("{}: increased attribute slots to {}", self.name, self.slots.len());
        }

        let slot = VertexSlot {
            location: layout,
            components: size,
            per_instance: divisor > 0,
        };
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let existing = self.slots[idx]
            .as_ref()
            .map(|attribute| (attribute.buffer.size(), attribute.usage));

        let plan = plan_upload(existing, bytes.len() as u64, usage);
        match (plan, self.slots[idx].as_mut()) {
            (Upload::Rewrite, Some(attribute)) => {
                queue.write_buffer(&attribute.buffer, 0, bytes);
                attribute.slot = slot;
                attribute.elements = (data.len() / size as usize) as u32;
            }
            _ => {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} attribute {}", self.name, layout)),
                    contents: bytes,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });
                self.slots[idx] = Some(AttributeBuffer {
                    buffer,
                    slot,
                    usage,
                    elements: (data.len() / size as usize) as u32,
                });
            }
        }
        log::debug!("{}: wrote attribute {}", self.name, layout);
        Ok(())
    }

    pub fn set_index_data(&mut self, device: &wgpu::Device, indices: &[u32]) {
        let indices = Indices::from(indices);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", self.name)),
            contents: indices.bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.index_count = indices.len() as u32;
        self.index_buffer = Some((buffer, indices.format()));
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Number of elements last written to layout slot `layout`.
    pub fn attribute_count(&self, layout: u32) -> Option<u32> {
        self.attribute(layout).map(|attribute| attribute.elements)
    }

    /// Size in bytes of the buffer behind layout slot `layout`.
    pub fn attribute_capacity(&self, layout: u32) -> Option<wgpu::BufferAddress> {
        self.attribute(layout).map(|attribute| attribute.buffer.size())
    }

    fn attribute(&self, layout: u32) -> Option<&AttributeBuffer> {
        self.slots.get(layout as usize).and_then(Option::as_ref)
    }

    /// Occupied slots in slot order, this is the vertex input the pipeline is built for.
    pub fn vertex_slots(&self) -> Vec<VertexSlot> {
        self.slots
            .iter()
            .flatten()
            .map(|attribute| attribute.slot)
            .collect()
    }

    fn vertex_count(&self) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|attribute| !attribute.slot.per_instance)
            .map(|attribute| attribute.elements)
            .min()
            .unwrap_or(0)
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        self.draw_instanced(render_pass, 1);
    }

    /// Empty slots cannot be left unbound, every occupied slot is part of the
    /// pipeline's vertex input.
    fn is_drawable(&self, count: u32) -> bool {
        let empty_slot = self
            .slots
            .iter()
            .flatten()
            .any(|attribute| attribute.elements == 0 || attribute.buffer.size() == 0);
        let elements = match &self.index_buffer {
            Some(_) => self.index_count,
            None => self.vertex_count(),
        };
        count > 0 && elements > 0 && !empty_slot
    }

    pub fn draw_instanced(&self, render_pass: &mut wgpu::RenderPass<'_>, count: u32) {
        if !self.is_drawable(count) {
            log::debug!("{}: nothing to draw", self.name);
            return;
        }
        for (i, attribute) in self.slots.iter().flatten().enumerate() {
            render_pass.set_vertex_buffer(i as u32, attribute.buffer.slice(..));
        }
        match &self.index_buffer {
            Some((buffer, format)) => {
                render_pass.set_index_buffer(buffer.slice(..), *format);
                render_pass.draw_indexed(0..self.index_count, 0, 0..count);
            }
            None => render_pass.draw(0..self.vertex_count(), 0..count),
        }
    }
}
