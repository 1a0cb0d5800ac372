#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
fn f_to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    use crate::common::test_utils::{headless, render_to_image};

    let (device, queue) = block_on(headless());
    let colour = wgpu::Color::WHITE;
    let image = render_to_image(&device, &queue, [32, 32], colour, &[]);

    let desired = image::Rgba([f_to_u8(colour.r), f_to_u8(colour.g), f_to_u8(colour.b), f_to_u8(colour.a)]);
    for pixel in image.pixels() {
        assert_eq!(*pixel, desired);
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_default_shader_grey() {
    use glwrap::{
        Instanced, Model, Shader,
        cgmath::{Matrix4, SquareMatrix},
        data_structures::{
            mesh::{AttributeData, MeshData},
            model::ModelData,
        },
    };

    use crate::common::test_utils::{headless, render_to_image};

    let (device, queue) = block_on(headless());

    // one triangle that covers the whole viewport
    let data = ModelData {
        meshes: vec![MeshData {
            attributes: vec![AttributeData::new(
                vec![-1.0, -1.0, 0.5, 3.0, -1.0, 0.5, -1.0, 3.0, 0.5],
                3,
            )],
            indices: vec![0, 1, 2],
        }],
    };
    let model = Model::from_data(&device, &queue, "cover", &data).unwrap();

    let mut shader = Shader::default_shader(&device, &queue).unwrap();
    for name in ["model", "view", "projection"] {
        shader.set_matrix4(name, Matrix4::identity()).unwrap();
    }
    shader.update(&device, &queue).unwrap();

    let image = render_to_image(
        &device,
        &queue,
        [16, 16],
        wgpu::Color::BLACK,
        &[Instanced::single(&model, &shader)],
    );
    for (x, y, pixel) in image.enumerate_pixels() {
        assert_eq!(*pixel, image::Rgba([204, 204, 204, 255]), "pixel mismatch at ({}, {})", x, y);
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_skip_meshes_without_required_inputs() {
    use glwrap::{
        Instanced, Model, Shader,
        data_structures::{
            mesh::{AttributeData, MeshData},
            model::ModelData,
        },
    };

    use crate::common::test_utils::{headless, render_to_image};

    let (device, queue) = block_on(headless());

    const SOURCE: &str = r#"
        @vertex
        fn vs_main(@location(0) position: vec3<f32>, @location(3) colour: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(position + colour * 0.0, 1.0);
        }

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 0.0, 0.0, 1.0);
        }
    "#;
    let shader = Shader::from_source(&device, &queue, "coloured", SOURCE, SOURCE).unwrap();
    let data = ModelData {
        meshes: vec![MeshData {
            attributes: vec![AttributeData::new(vec![0.0; 9], 3)],
            indices: vec![0, 1, 2],
        }],
    };
    let model = Model::from_data(&device, &queue, "positions only", &data).unwrap();

    let image = render_to_image(
        &device,
        &queue,
        [8, 8],
        wgpu::Color::BLACK,
        &[Instanced::single(&model, &shader)],
    );
    assert!(image.pixels().all(|pixel| *pixel == image::Rgba([0, 0, 0, 255])));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_keep_per_draw_uniforms_apart() {
    use glwrap::{
        Instanced, Model, Shader, Uniforms,
        cgmath::{Matrix4, SquareMatrix, Vector3},
        data_structures::{
            mesh::{AttributeData, MeshData},
            model::ModelData,
        },
    };

    use crate::common::test_utils::{headless, render_to_image};

    let (device, queue) = block_on(headless());

    // the left half of the viewport
    let data = ModelData {
        meshes: vec![MeshData {
            attributes: vec![AttributeData::new(
                vec![-1.0, -1.0, 0.5, 0.0, -1.0, 0.5, 0.0, 1.0, 0.5, -1.0, 1.0, 0.5],
                3,
            )],
            indices: vec![0, 1, 2, 0, 2, 3],
        }],
    };
    let model = Model::from_data(&device, &queue, "half", &data).unwrap();

    let mut shader = Shader::default_shader(&device, &queue).unwrap();
    shader
        .set_matrix4("model", Matrix4::from_translation(Vector3::new(10.0, 0.0, 0.0)))
        .unwrap();
    shader.set_matrix4("view", Matrix4::identity()).unwrap();
    shader.set_matrix4("projection", Matrix4::identity()).unwrap();
    shader.update(&device, &queue).unwrap();

    let left = Uniforms::new().with("model", Matrix4::identity());
    let right = Uniforms::new().with("model", Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)));
    let image = render_to_image(
        &device,
        &queue,
        [16, 16],
        wgpu::Color::BLACK,
        &[
            Instanced::single(&model, &shader).with_uniforms(&left),
            Instanced::single(&model, &shader).with_uniforms(&right),
        ],
    );
    for (x, y, pixel) in image.enumerate_pixels() {
        assert_eq!(*pixel, image::Rgba([204, 204, 204, 255]), "pixel mismatch at ({}, {})", x, y);
    }
}

#[cfg(feature = "integration-tests")]
fn block_on<F: std::future::Future>(future: F) -> F::Output {
    futures::executor::block_on(future)
}
