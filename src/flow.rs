//! Engine object and application event loop.
//!
//! A [`Scene`] loads its resources in `on_init`, reacts to input and time in
//! `on_update` and describes what to draw in `on_render`. The [`Engine`] is
//! handed to the first two hooks and gives access to the GPU context, input,
//! the loaded glTF library and window controls.
//!
//! # Lifecycle
//!
//! Each frame the loop:
//! 1. Collects window and device events into the input state
//! 2. Ticks the frame clock and calls `on_update` on all scenes
//! 3. Flattens every scene's `on_render()` into one draw list
//! 4. Clears colour and depth, records the draws and presents
//! 5. Ends the input frame and requests the next redraw

use std::{collections::BTreeMap, future::Future, path::Path, sync::Arc};

use anyhow::Context as _;
use cgmath::Vector2;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::WindowId,
};

use crate::{
    context::Context,
    data_structures::{
        model::Model,
        texture::{Channels, FilterMode, Texture2D},
    },
    input::InputState,
    pipelines::shader::Shader,
    render::{Instanced, Render, draw_instances},
    resources::ModelLibrary,
    time::FrameClock,
    window::{CursorMode, WindowConfig, apply_cursor_mode},
};

/// A unit of application logic driven by the engine loop.
pub trait Scene {
    /// Called once after the window and GPU context exist. An error aborts [`run`].
    fn on_init(&mut self, _engine: &mut Engine) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called every frame with the seconds since the previous frame.
    fn on_update(&mut self, _engine: &mut Engine, _dt: f32) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_render(&self) -> Render<'_>;
}

/// Everything a scene can reach while the loop runs.
pub struct Engine {
    pub context: Context,
    pub input: InputState,
    pub library: ModelLibrary,
    clock: FrameClock,
    runtime: tokio::runtime::Handle,
    cursor: CursorMode,
    close_requested: bool,
}

impl Engine {
    fn new(context: Context, runtime: tokio::runtime::Handle, cursor: CursorMode) -> Self {
        apply_cursor_mode(&context.window, cursor);
        Self {
            context,
            input: InputState::new(),
            library: ModelLibrary::new(),
            clock: FrameClock::new(),
            runtime,
            cursor,
            close_requested: false,
        }
    }

    /// Drive a future to completion on the engine's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }

    /// Read a glTF file into the library, returns the names of the new models.
    pub fn load_gltf(&mut self, path: impl AsRef<Path>) -> anyhow::Result<Vec<String>> {
        let path = path.as_ref();
        let names = self
            .runtime
            .block_on(self.library.load_gltf(path))
            .with_context(|| format!("Unable to load {}", path.display()))?;
        Ok(names)
    }

    /// Upload one model of the library to the GPU.
    pub fn load_model(&self, name: &str) -> anyhow::Result<Model> {
        let data = self
            .library
            .model(name)
            .with_context(|| format!("No model named `{}` was loaded", name))?;
        Ok(Model::from_data(&self.context.device, &self.context.queue, name, data)?)
    }

    /// Upload every model of the library to the GPU.
    pub fn load_models(&self) -> anyhow::Result<BTreeMap<String, Model>> {
        self.library
            .models
            .keys()
            .map(|name| Ok((name.clone(), self.load_model(name)?)))
            .collect()
    }

    pub fn load_texture(
        &self,
        path: impl AsRef<Path>,
        flip: bool,
        filter: FilterMode,
        channels: Channels,
    ) -> anyhow::Result<Texture2D> {
        let path = path.as_ref();
        let texture = self
            .runtime
            .block_on(Texture2D::from_path(
                &self.context.device,
                &self.context.queue,
                path,
                flip,
                filter,
                channels,
            ))
            .with_context(|| format!("Texture {} not loaded", path.display()))?;
        Ok(texture)
    }

    pub fn load_shader(
        &self,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> anyhow::Result<Shader> {
        Ok(self.runtime.block_on(Shader::from_files(
            &self.context.device,
            &self.context.queue,
            vertex_path,
            fragment_path,
        ))?)
    }

    pub fn default_shader(&self) -> anyhow::Result<Shader> {
        Ok(Shader::default_shader(&self.context.device, &self.context.queue)?)
    }

    /// Upload the values set on `shader` since the last update.
    pub fn update_shader(&self, shader: &mut Shader) -> anyhow::Result<()> {
        Ok(shader.update(&self.context.device, &self.context.queue)?)
    }

    /// Surface size as the aspect camera projections expect.
    pub fn camera_aspect(&self) -> Vector2<f32> {
        self.context.size()
    }

    pub fn cursor_mode(&self) -> CursorMode {
        self.cursor
    }

    pub fn set_cursor_mode(&mut self, mode: CursorMode) {
        self.cursor = mode;
        apply_cursor_mode(&self.context.window, mode);
    }

    pub fn set_clear_colour(&mut self, colour: wgpu::Color) {
        self.context.clear_colour = colour;
    }

    pub fn set_title(&self, title: &str) {
        self.context.window.set_title(title);
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn is_close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn frame_count(&self) -> u64 {
        self.clock.frame_count()
    }

    fn render(&self, draws: &[Instanced<'_>]) -> RenderOutcome {
        let ctx = &self.context;
        let (output, suboptimal) = match ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output) => (output, false),
            wgpu::CurrentSurfaceTexture::Suboptimal(output) => (output, true),
            wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                return RenderOutcome::Skipped;
            }
            wgpu::CurrentSurfaceTexture::Outdated | wgpu::CurrentSurfaceTexture::Lost => {
                return RenderOutcome::Reconfigure;
            }
            wgpu::CurrentSurfaceTexture::Validation => {
                log::error!("Unable to acquire the next frame");
                return RenderOutcome::Skipped;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            draw_instances(
                &ctx.device,
                &ctx.queue,
                ctx.config.format,
                &mut render_pass,
                draws,
            );
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if suboptimal {
            RenderOutcome::Reconfigure
        } else {
            RenderOutcome::Presented
        }
    }
}

enum RenderOutcome {
    Presented,
    Skipped,
    Reconfigure,
}

struct App {
    config: WindowConfig,
    runtime: tokio::runtime::Runtime,
    engine: Option<Engine>,
    scenes: Vec<Box<dyn Scene>>,
    error: Option<anyhow::Error>,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = Arc::new(
            event_loop
                .create_window(self.config.attributes())
                .context("Unable to create the window")?,
        );
        let context = self
            .runtime
            .block_on(Context::new(window, self.config.clear_colour))?;
        let mut engine = Engine::new(context, self.runtime.handle().clone(), self.config.cursor);
        for (idx, scene) in self.scenes.iter_mut().enumerate() {
            scene
                .on_init(&mut engine)
                .with_context(|| format!("Scene {} failed to initialize", idx))?;
        }
        engine.context.window.request_redraw();
        self.engine = Some(engine);
        Ok(())
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let dt = engine.clock.tick(Instant::now());
        for (idx, scene) in self.scenes.iter_mut().enumerate() {
            if let Err(e) = scene.on_update(engine, dt) {
                log::error!("Scene {} failed to update: {:#}", idx, e);
            }
        }
        if engine.is_close_requested() {
            event_loop.exit();
            return;
        }

        let draws: Vec<_> = self
            .scenes
            .iter()
            .flat_map(|scene| scene.on_render().flatten())
            .collect();
        match engine.render(&draws) {
            RenderOutcome::Presented | RenderOutcome::Skipped => (),
            RenderOutcome::Reconfigure => {
                let size = engine.context.window.inner_size();
                engine.context.resize(size.width, size.height);
            }
        }
        engine.input.end_frame();
        engine.context.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            log::error!("{:#}", e);
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            engine.input.mouse_motion(dx, dy);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let WindowEvent::RedrawRequested = event {
            self.frame(event_loop);
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => engine.context.resize(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    engine.input.key_event(code, event.state, event.repeat);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                engine.input.mouse_button_event(button, state);
            }
            WindowEvent::CursorMoved { position, .. } => {
                engine.input.cursor_moved(position.x, position.y);
            }
            WindowEvent::Focused(false) => engine.input.release_all(),
            WindowEvent::Focused(true) => {
                // the grab is lost while unfocused on some platforms
                apply_cursor_mode(&engine.context.window, engine.cursor);
            }
            _ => (),
        }
    }
}

/// Open a window described by `config` and run `scenes` until it closes.
pub fn run(config: WindowConfig, scenes: Vec<Box<dyn Scene>>) -> anyhow::Result<()> {
    let _ = env_logger::try_init();

    let event_loop = EventLoop::new().context("Unable to create the event loop")?;
    let runtime = tokio::runtime::Runtime::new().context("Unable to start the async runtime")?;
    let mut app = App {
        config,
        runtime,
        engine: None,
        scenes,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
