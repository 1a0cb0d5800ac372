//! Two triangles from one glTF file and a free-flying camera. The coloured
//! triangle is drawn a second time beside itself with its own `model` matrix.
//!
//! WASD moves, the mouse looks around, holding left shift moves faster and
//! escape quits.

use std::collections::BTreeMap;

use glwrap::{
    Camera, CursorMode, Engine, Instanced, KeyCode, Model, Render, Scene, Shader, Transform,
    Uniforms, WindowConfig,
    cgmath::{Matrix4, Vector3},
};

const ASSETS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets");

const WALK_SPEED: f32 = 1.0;
const RUN_SPEED: f32 = 10.0;
const MOUSE_SENSITIVITY: f32 = 0.1;

struct Triangles {
    camera: Camera,
    speed: f32,
    models: BTreeMap<String, Model>,
    coloured: Option<Shader>,
    grey: Option<Shader>,
    spin: Transform,
    twin: Uniforms,
}

impl Triangles {
    fn new() -> Self {
        let mut camera = Camera::new();
        camera.set_fov(90.0);
        camera.transform.set_rotation(Vector3::new(0.0, 0.0, -90.0));
        camera.transform.set_position(Vector3::new(0.0, 0.0, 3.0));
        Self {
            camera,
            speed: WALK_SPEED,
            models: BTreeMap::new(),
            coloured: None,
            grey: None,
            spin: Transform::new(),
            twin: Uniforms::new(),
        }
    }

    fn move_camera(&mut self, engine: &Engine, dt: f32) {
        let input = &engine.input;
        if input.is_key_pressed(KeyCode::ShiftLeft) {
            self.speed = RUN_SPEED;
        }
        if input.is_key_released(KeyCode::ShiftLeft) {
            self.speed = WALK_SPEED;
        }

        let step = self.speed * dt;
        let transform = &mut self.camera.transform;
        let (forward, right) = (transform.forward(), transform.right());
        if input.is_key_held(KeyCode::KeyW) {
            transform.add_position(forward * step);
        }
        if input.is_key_held(KeyCode::KeyS) {
            transform.add_position(-forward * step);
        }
        if input.is_key_held(KeyCode::KeyD) {
            transform.add_position(right * step);
        }
        if input.is_key_held(KeyCode::KeyA) {
            transform.add_position(-right * step);
        }

        let delta = input.mouse_delta();
        transform.add_rotation(Vector3::new(
            0.0,
            delta.y as f32 * MOUSE_SENSITIVITY,
            delta.x as f32 * MOUSE_SENSITIVITY,
        ));
        transform.rotation.y = transform.rotation.y.clamp(-89.0, 89.0);
    }
}

impl Scene for Triangles {
    fn on_init(&mut self, engine: &mut Engine) -> anyhow::Result<()> {
        engine.set_clear_colour(glwrap::wgpu::Color {
            r: 0.5,
            g: 0.5,
            b: 0.5,
            a: 1.0,
        });
        engine.set_cursor_mode(CursorMode::Disabled);

        for name in engine.load_gltf(format!("{}/Triangle.gltf", ASSETS))? {
            log::info!("Mesh: {}", name);
        }
        self.models = engine.load_models()?;

        let shader_path = format!("{}/colour.wgsl", ASSETS);
        let mut coloured = engine.load_shader(&shader_path, &shader_path)?;
        coloured.set_float("brightness", 1.0)?;
        coloured.set_bool("highlight", false)?;
        self.coloured = Some(coloured);
        self.grey = Some(engine.default_shader()?);
        Ok(())
    }

    fn on_update(&mut self, engine: &mut Engine, dt: f32) -> anyhow::Result<()> {
        if engine.input.is_key_pressed(KeyCode::Escape) {
            engine.request_close();
            return Ok(());
        }
        self.move_camera(engine, dt);
        self.spin.add_rotation(Vector3::new(0.0, 45.0 * dt, 0.0));

        let aspect = engine.camera_aspect();
        let highlight = engine.input.is_key_held(KeyCode::Space);
        if let Some(shader) = self.coloured.as_mut() {
            self.camera.apply(shader, aspect)?;
            shader.set_matrix4("model", self.spin.matrix())?;
            self.twin.set(
                "model",
                Matrix4::from_translation(Vector3::new(1.5, 0.0, 0.0)) * self.spin.matrix(),
            );
            shader.set_bool("highlight", highlight)?;
            engine.update_shader(shader)?;
        }
        if let Some(shader) = self.grey.as_mut() {
            self.camera.apply(shader, aspect)?;
            shader.set_matrix4("model", Transform::new().matrix())?;
            engine.update_shader(shader)?;
        }
        Ok(())
    }

    fn on_render(&self) -> Render<'_> {
        let mut draws = Vec::new();
        if let (Some(model), Some(shader)) = (self.models.get("Triangle.0"), &self.coloured) {
            draws.push(Instanced::single(model, shader));
            draws.push(Instanced::single(model, shader).with_uniforms(&self.twin));
        }
        if let (Some(model), Some(shader)) = (self.models.get("Triangle.001.0"), &self.grey) {
            draws.push(Instanced::single(model, shader));
        }
        draws.into()
    }
}

fn main() -> anyhow::Result<()> {
    glwrap::run(
        WindowConfig::new("Window", 1000, 1000),
        vec![Box::new(Triangles::new())],
    )
}
