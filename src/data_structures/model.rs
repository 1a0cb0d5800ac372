use crate::{
    data_structures::mesh::{BufferUsage, Mesh, MeshData},
    error::MeshError,
};

/// CPU side geometry of a whole glTF mesh, one [`MeshData`] per primitive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelData {
    pub meshes: Vec<MeshData>,
}

/// GPU meshes that are always drawn together.
#[derive(Debug, Default)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
}

impl Model {
    /// Upload every primitive of `data`. Attribute `j` of a primitive lands in layout slot `j`.
    pub fn from_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        data: &ModelData,
    ) -> Result<Self, MeshError> {
        log::debug!("{}: uploading {} meshes", name, data.meshes.len());
        let meshes = data
            .meshes
            .iter()
            .enumerate()
            .map(|(i, mesh_data)| {
                let mut mesh = Mesh::new(&format!("{}[{}]", name, i));
                mesh.set_index_data(device, &mesh_data.indices);
                for (layout, attribute) in mesh_data.attributes.iter().enumerate() {
                    mesh.set_attribute_data(
                        device,
                        queue,
                        &attribute.data,
                        attribute.size,
                        layout as u32,
                        0,
                        BufferUsage::Static,
                    )?;
                }
                Ok(mesh)
            })
            .collect::<Result<Vec<_>, MeshError>>()?;
        Ok(Self {
            name: name.to_string(),
            meshes,
        })
    }

    /// Write the same attribute into every mesh, typically per-instance data with `divisor` 1.
    pub fn set_model_attribute(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[f32],
        size: u32,
        layout: u32,
        divisor: u32,
        usage: BufferUsage,
    ) -> Result<(), MeshError> {
        for mesh in &mut self.meshes {
            mesh.set_attribute_data(device, queue, data, size, layout, divisor, usage)?;
        }
        Ok(())
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        for mesh in &self.meshes {
            mesh.draw(render_pass);
        }
    }

    pub fn draw_instanced(&self, render_pass: &mut wgpu::RenderPass<'_>, count: u32) {
        for mesh in &self.meshes {
            mesh.draw_instanced(render_pass, count);
        }
    }
}
