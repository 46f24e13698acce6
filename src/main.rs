use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::Mat4;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod error;
mod export;
mod image;
mod lifecycle;
mod renderer;
mod surface;
mod ui;

use crate::image::{ImageLoader, LoadedImage};
use lifecycle::MeshLifecycle;
use renderer::{Camera, GpuState, SurfaceResources};
use surface::{DepthParams, SurfaceSpec};
use ui::{QUICK_ROTATE_STEP, QUICK_TILT_STEP, UiActions, UiState, apply_theme};

const ENTRY_DURATION: Duration = Duration::from_millis(300);
const TWEEN_DURATION: Duration = Duration::from_millis(300);
const ENTRY_START_SCALE: f32 = 0.6;
const MAX_TILT: f32 = 1.2;
const DRAG_SENSITIVITY: f32 = 0.005;

#[derive(Parser)]
#[command(name = "relief3d", about = "Turn a photo into a displaced 3D surface")]
struct Cli {
    /// Image to load on startup (png or jpeg)
    image: Option<PathBuf>,
}

fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

/// Short animation from one angle to another, used by the quick-rotate
/// buttons and keys.
struct Tween {
    from: f32,
    to: f32,
    started: Instant,
}

impl Tween {
    fn new(from: f32, to: f32) -> Self {
        Self {
            from,
            to,
            started: Instant::now(),
        }
    }

    fn sample(&self) -> (f32, bool) {
        let t = self.started.elapsed().as_secs_f32() / TWEEN_DURATION.as_secs_f32();
        let done = t >= 1.0;
        let value = self.from + (self.to - self.from) * ease_out_cubic(t);
        (value, done)
    }
}

/// Orientation and entry animation of the displayed surface. The camera is
/// fixed; all rotation happens here, in the model matrix.
struct MeshPose {
    yaw: f32,
    pitch: f32,
    yaw_tween: Option<Tween>,
    pitch_tween: Option<Tween>,
    entry_started: Option<Instant>,
}

impl MeshPose {
    fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            yaw_tween: None,
            pitch_tween: None,
            entry_started: None,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn begin_entry(&mut self) {
        self.entry_started = Some(Instant::now());
    }

    fn rotate_by(&mut self, delta: f32) {
        let target = self
            .yaw_tween
            .as_ref()
            .map(|t| t.to)
            .unwrap_or(self.yaw);
        self.yaw_tween = Some(Tween::new(self.yaw, target + delta));
    }

    fn tilt_by(&mut self, delta: f32) {
        let target = self
            .pitch_tween
            .as_ref()
            .map(|t| t.to)
            .unwrap_or(self.pitch);
        self.pitch_tween = Some(Tween::new(
            self.pitch,
            (target + delta).clamp(-MAX_TILT, MAX_TILT),
        ));
    }

    fn drag(&mut self, dx: f32, dy: f32) {
        self.yaw_tween = None;
        self.pitch_tween = None;
        self.yaw += dx * DRAG_SENSITIVITY;
        self.pitch = (self.pitch + dy * DRAG_SENSITIVITY).clamp(-MAX_TILT, MAX_TILT);
    }

    fn advance(&mut self, auto_rotate: bool, rotation_speed: f32) {
        if let Some(tween) = &self.yaw_tween {
            let (value, done) = tween.sample();
            self.yaw = value;
            if done {
                self.yaw_tween = None;
            }
        } else if auto_rotate {
            self.yaw += rotation_speed;
        }

        if let Some(tween) = &self.pitch_tween {
            let (value, done) = tween.sample();
            self.pitch = value;
            if done {
                self.pitch_tween = None;
            }
        }
    }

    fn entry_scale(&self) -> f32 {
        match &self.entry_started {
            Some(started) => {
                let t = started.elapsed().as_secs_f32() / ENTRY_DURATION.as_secs_f32();
                ENTRY_START_SCALE + (1.0 - ENTRY_START_SCALE) * ease_out_cubic(t)
            }
            None => 1.0,
        }
    }

    fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.yaw)
            * Mat4::from_rotation_x(self.pitch)
            * Mat4::from_scale(glam::Vec3::splat(self.entry_scale()))
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    camera: Camera,
    loader: ImageLoader,
    lifecycle: MeshLifecycle,
    gpu_surface: Option<SurfaceResources>,
    current_image: Option<LoadedImage>,
    ui_state: UiState,
    pose: MeshPose,

    dragging: bool,
    startup_image: Option<PathBuf>,
}

impl App {
    fn new(startup_image: Option<PathBuf>) -> Self {
        Self {
            window: None,
            gpu: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            camera: Camera::default(),
            loader: ImageLoader::new(),
            lifecycle: MeshLifecycle::new(),
            gpu_surface: None,
            current_image: None,
            ui_state: UiState::default(),
            pose: MeshPose::new(),

            dragging: false,
            startup_image,
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) {
        let gpu = pollster::block_on(GpuState::new(window.clone()));

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);

        if let Some(path) = self.startup_image.take() {
            self.ui_state.image_path = path.to_string_lossy().into_owned();
            self.ui_state.image_loading = true;
            self.loader.load(path);
        }
    }

    fn rebuild_surface(&mut self) {
        let spec = SurfaceSpec {
            shape: self.ui_state.selected_shape(),
            image_aspect: self
                .current_image
                .as_ref()
                .map(|loaded| loaded.image.aspect())
                .unwrap_or(1.0),
        };
        let depth = DepthParams {
            intensity: self.ui_state.depth_intensity,
        };
        let image = self.current_image.as_ref().map(|loaded| &loaded.image);

        match self.lifecycle.rebuild(spec, image, depth) {
            Ok(handle) => {
                log::debug!("surface handle generation {}", handle.generation());
                self.pose.begin_entry();
            }
            Err(err) => self.ui_state.report_error(err.to_string()),
        }
    }

    /// Mirrors lifecycle state changes into GPU resources: full reinstall on
    /// rebuild, geometry re-upload on in-place displacement.
    fn sync_gpu_surface(&mut self) {
        let Some(gpu) = &self.gpu else { return };

        if self.lifecycle.take_rebuilt() {
            if let Some(old) = self.gpu_surface.take() {
                gpu.dispose_surface(old);
            }
            if let Some(active) = self.lifecycle.active() {
                self.gpu_surface =
                    Some(gpu.install_surface(&active.surface, &active.texture.image));
            }
        } else if self.lifecycle.take_geometry_dirty() {
            if let (Some(resources), Some(active)) =
                (self.gpu_surface.as_ref(), self.lifecycle.active())
            {
                gpu.update_geometry(resources, &active.surface);
            }
        }
    }

    fn update(&mut self) {
        while let Some(result) = self.loader.try_recv_result() {
            self.ui_state.image_loading = false;
            match result {
                Ok(loaded) => {
                    self.current_image = Some(loaded);
                    self.rebuild_surface();
                }
                Err(err) => self.ui_state.report_error(err.to_string()),
            }
        }

        self.pose
            .advance(self.ui_state.auto_rotate, self.ui_state.rotation_speed);

        self.sync_gpu_surface();
    }

    fn handle_ui_actions(&mut self, actions: UiActions) {
        if let Some(path) = actions.load_image {
            self.ui_state.image_loading = true;
            self.loader.load(path);
        }

        if actions.clear_image {
            self.current_image = None;
            self.lifecycle.clear();
        }

        if actions.rebuild {
            self.rebuild_surface();
        }

        if let Some(intensity) = actions.depth_changed {
            self.lifecycle.set_depth_intensity(intensity);
        }

        if let Some(step) = actions.rotate_step {
            self.pose.rotate_by(step);
        }

        if let Some(step) = actions.tilt_step {
            self.pose.tilt_by(step);
        }

        if actions.reset_view {
            self.camera.reset();
            self.pose.reset();
        }

        if actions.export_frame {
            self.export_frame();
        }
    }

    fn export_frame(&mut self) {
        let Some(gpu) = &self.gpu else { return };

        let result = gpu
            .capture_frame(self.gpu_surface.as_ref())
            .and_then(|frame| {
                export::save_frame(&frame, std::path::Path::new(export::CAPTURE_FILE_NAME))
            });

        if let Err(err) = result {
            self.ui_state.report_error(format!("export failed: {err}"));
        }
    }

    fn render(&mut self) {
        let (Some(window), Some(egui_state)) = (&self.window, &mut self.egui_state) else {
            return;
        };

        let raw_input = egui_state.take_egui_input(window);

        let image_loaded = self.current_image.is_some();
        let surface_summary = self.lifecycle.active().map(|active| {
            format!(
                "{} | {} vertices",
                active.surface.spec.shape.label(),
                active.surface.mesh.vertex_count()
            )
        });

        let mut ui_actions = UiActions::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = ui::draw_side_panel(
                ctx,
                &mut self.ui_state,
                image_loaded,
                surface_summary.as_deref(),
            );
            ui::draw_error_overlay(ctx, &mut self.ui_state);
        });

        self.handle_ui_actions(ui_actions);
        self.sync_gpu_surface();

        let Some(gpu) = &mut self.gpu else { return };
        let Some(window) = &self.window else { return };
        let Some(egui_state) = &mut self.egui_state else {
            return;
        };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return;
        };

        egui_state.handle_platform_output(window, full_output.platform_output);

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.size);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                panic!("Out of GPU memory");
            }
            Err(wgpu::SurfaceError::Timeout) => {
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.update_camera(&self.camera);
        gpu.update_model(self.pose.model_matrix());

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        gpu.render(&view, &mut encoder, self.gpu_surface.as_ref());

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        window.request_redraw();
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool, shift: bool) {
        if !pressed {
            return;
        }

        match key {
            KeyCode::KeyR => {
                let step = if shift {
                    -QUICK_ROTATE_STEP
                } else {
                    QUICK_ROTATE_STEP
                };
                self.pose.rotate_by(step);
            }
            KeyCode::KeyT => {
                let step = if shift { -QUICK_TILT_STEP } else { QUICK_TILT_STEP };
                self.pose.tilt_by(step);
            }
            KeyCode::Space => {
                self.ui_state.auto_rotate = !self.ui_state.auto_rotate;
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window_attrs = Window::default_attributes()
            .with_title("Relief 3D")
            .with_inner_size(PhysicalSize::new(1440, 900));

        let window = Arc::new(event_loop.create_window(window_attrs).unwrap());
        self.init_gpu(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(egui_state) = &mut self.egui_state {
            if let Some(window) = &self.window {
                let response = egui_state.on_window_event(window, &event);
                if response.consumed {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.loader.stop();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                    self.camera
                        .set_aspect(size.width as f32, size.height as f32);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    let shift = self
                        .egui_ctx
                        .input(|input| input.modifiers.shift);
                    self.handle_key(key, event.state == ElementState::Pressed, shift);
                }
            }

            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.dragging = state == ElementState::Pressed;
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => y,
                    winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.camera.process_scroll(scroll);
            }

            WindowEvent::RedrawRequested => {
                self.update();
                self.render();
            }

            _ => {}
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: winit::event::DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.dragging {
                self.pose.drag(delta.0 as f32, delta.1 as f32);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(cli.image);
    event_loop.run_app(&mut app).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_out_cubic_hits_both_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5);
        // Clamped outside the unit range.
        assert_eq!(ease_out_cubic(2.0), 1.0);
    }

    #[test]
    fn tilt_is_clamped() {
        let mut pose = MeshPose::new();
        for _ in 0..100 {
            pose.tilt_by(QUICK_TILT_STEP);
        }
        let target = pose.pitch_tween.as_ref().unwrap().to;
        assert!(target <= MAX_TILT);

        pose.drag(0.0, 1e6);
        assert_eq!(pose.pitch, MAX_TILT);
    }

    #[test]
    fn drag_cancels_pending_tweens() {
        let mut pose = MeshPose::new();
        pose.rotate_by(QUICK_ROTATE_STEP);
        assert!(pose.yaw_tween.is_some());

        pose.drag(10.0, 0.0);
        assert!(pose.yaw_tween.is_none());
        assert!(pose.yaw > 0.0);
    }

    #[test]
    fn entry_scale_settles_at_one() {
        let mut pose = MeshPose::new();
        assert_eq!(pose.entry_scale(), 1.0);

        pose.begin_entry();
        pose.entry_started = Some(Instant::now() - ENTRY_DURATION * 4);
        assert!((pose.entry_scale() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn auto_rotation_yields_to_active_tween() {
        let mut pose = MeshPose::new();
        pose.rotate_by(QUICK_ROTATE_STEP);

        pose.advance(true, 0.5);
        // A tween is running, so the auto-rotate increment must not apply on
        // top of it.
        assert!(pose.yaw.abs() < QUICK_ROTATE_STEP.abs() + 1e-6);
    }
}
