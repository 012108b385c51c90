use std::sync::Arc;

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window as WinitWindow, WindowId},
};

use fire_viewer::cli::Cli;
use fire_viewer::config::ViewerConfig;
use fire_viewer::control_loop::ControlLoop;
use fire_viewer::controls::Controls;
use fire_viewer::frame::{FpsCounter, FrameClock};
use fire_viewer::gpu::WgpuContext;
use fire_viewer::texture::TextureLoader;
use fire_viewer::ui::Overlay;
use fire_viewer::window::Window;

struct Viewer {
    window: Window,
    gpu: WgpuContext,
    control_loop: ControlLoop,
    overlay: Option<Overlay>,
}

impl Viewer {
    fn new(window: Arc<WinitWindow>, config: &ViewerConfig) -> anyhow::Result<Self> {
        let mut gpu = pollster::block_on(WgpuContext::new(window.clone()))?;
        let mut control_loop = ControlLoop::new(&mut gpu, config)?;
        control_loop.attach_textures(TextureLoader::spawn(config.texture_assets()));

        let overlay = (!config.hide_ui).then(|| Overlay::new(&window, gpu.device(), gpu.surface_format()));

        Ok(Self {
            window: Window::new(window),
            gpu,
            control_loop,
            overlay,
        })
    }

    fn redraw(&mut self, controls: &mut Controls, fps: f32) {
        let Viewer {
            window,
            gpu,
            control_loop,
            overlay,
        } = self;

        let overlay_frame = overlay
            .as_mut()
            .map(|o| o.run(window.inner(), controls, fps, gpu.size()));

        match control_loop.tick(gpu, controls, &*window) {
            Ok(_) => {
                let result = gpu.present_with(|device, queue, encoder, view| {
                    if let (Some(overlay), Some(frame)) = (overlay.as_mut(), overlay_frame) {
                        overlay.paint(frame, device, queue, encoder, view);
                    }
                });
                if let Err(e) = result {
                    log::warn!("Frame dropped: {}", e);
                }
            }
            Err(e) => {
                log::error!("Frame failed: {}", e);
                gpu.discard_frame();
                if let (Some(overlay), Some(frame)) = (overlay.as_mut(), overlay_frame) {
                    overlay.discard(frame, gpu.device(), gpu.queue());
                }
            }
        }
    }

    fn shutdown(self) {
        let Viewer {
            mut gpu, control_loop, ..
        } = self;
        control_loop.shutdown(&mut gpu);
    }
}

struct App {
    config: ViewerConfig,
    controls: Controls,
    viewer: Option<Viewer>,
    clock: FrameClock,
    fps: FpsCounter,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            controls: config.controls.clone(),
            config,
            viewer: None,
            clock: FrameClock::new(),
            fps: FpsCounter::default(),
        }
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(viewer) = self.viewer.take() {
            viewer.shutdown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }

        let window = match event_loop.create_window(
            WinitWindow::default_attributes()
                .with_title(self.config.window.title.clone())
                .with_inner_size(winit::dpi::LogicalSize::new(
                    self.config.window.width,
                    self.config.window.height,
                )),
        ) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match Viewer::new(window, &self.config) {
            Ok(viewer) => {
                viewer.window.request_redraw();
                self.viewer = Some(viewer);
            }
            Err(e) => {
                log::error!("Failed to initialize viewer: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        // Let egui handle the event first
        if let Some(viewer) = &mut self.viewer {
            if let Some(overlay) = &mut viewer.overlay {
                if overlay.handle_event(viewer.window.inner(), &event) {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => self.exit(event_loop),
            WindowEvent::Resized(size) => {
                if let Some(viewer) = &mut self.viewer {
                    if let Err(e) = viewer.control_loop.resize(&mut viewer.gpu, size.width, size.height) {
                        log::warn!("Resize to {}x{} rejected: {}", size.width, size.height, e);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(frame) = self.clock.next() else {
                    return;
                };
                if let Some(fps) = self.fps.record(frame.delta) {
                    log::debug!("FPS: {:.1}", fps);
                }

                if let Some(viewer) = &mut self.viewer {
                    viewer.redraw(&mut self.controls, self.fps.fps());
                }
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = ViewerConfig::from_cli(&cli)?;

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);

    log::info!("Fire viewer - sliders in the overlay, Escape to quit");
    event_loop.run_app(&mut app)?;

    Ok(())
}
