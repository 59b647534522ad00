//! Triangle renderer entry point.
//!
//! Wires the winit event loop to the renderer: one redraw request per
//! `about_to_wait`, one rendered frame per `RedrawRequested`.

use anyhow::Result;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use tri_core::RenderConfig;
use tri_platform::Window;
use tri_render::Renderer;

struct App {
    config: RenderConfig,
    window: Option<Window>,
    renderer: Option<Renderer>,
}

impl App {
    fn new(config: RenderConfig) -> Self {
        Self {
            config,
            window: None,
            renderer: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let (width, height) = self.config.window_size();
            match Window::new(event_loop, width, height, &self.config.title) {
                Ok(window) => match Renderer::new(&window, &self.config) {
                    Ok(renderer) => {
                        info!("Initialization complete, entering main loop");
                        self.renderer = Some(renderer);
                        self.window = Some(window);
                    }
                    Err(e) => {
                        error!("Failed to create renderer: {:?}", e);
                        event_loop.exit();
                    }
                },
                Err(e) => {
                    error!("Failed to create window: {}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(ref mut renderer) = self.renderer {
                    renderer.handle_resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(ref mut renderer) = self.renderer
                    && let Err(e) = renderer.render_frame()
                {
                    error!("Render error: {:?}", e);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    tri_core::init_logging();

    let config = RenderConfig::from_env();
    info!(
        "Starting triangle renderer ({}x{}, validation: {})",
        config.width, config.height, config.validation
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
