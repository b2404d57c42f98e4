//! Winit application shell. The event loop owns the render thread; every
//! texture and draw operation runs inside it and nowhere else.

use std::sync::{Arc, Mutex};

use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoopProxy};
use winit::window::{Window, WindowId};

use crate::display::gpu::GpuDisplay;
use crate::display::scheduler::RenderWaker;
use crate::display::sink::TextureSink;
use crate::DisplayConfig;

/// Events injected into the render loop from other threads.
#[derive(Debug)]
pub enum PipelineEvent {
    FrameReady,
}

/// `RenderWaker` backed by the winit event loop. The scheduler coalesces
/// wakes on top, winit coalesces redraw requests underneath.
pub struct EventLoopWaker {
    proxy: Mutex<EventLoopProxy<PipelineEvent>>,
}

impl EventLoopWaker {
    pub fn new(proxy: EventLoopProxy<PipelineEvent>) -> Self {
        Self {
            proxy: Mutex::new(proxy),
        }
    }
}

impl RenderWaker for EventLoopWaker {
    fn wake(&self) {
        if let Ok(proxy) = self.proxy.lock() {
            // Send fails only once the loop has exited.
            let _ = proxy.send_event(PipelineEvent::FrameReady);
        }
    }
}

/// Full-screen frame viewer.
pub struct ViewerApp {
    config: DisplayConfig,
    sink: TextureSink,
    display: Option<GpuDisplay>,
}

impl ViewerApp {
    pub fn new(config: DisplayConfig, sink: TextureSink) -> Self {
        Self {
            config,
            sink,
            display: None,
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(display) = self.display.as_mut() else {
            return;
        };
        if let Err(e) = self.sink.consume_and_upload(display) {
            error!("render context failure: {e}");
            event_loop.exit();
            return;
        }
        if let Err(e) = self.sink.draw(display) {
            error!("render context failure: {e}");
            event_loop.exit();
        }
    }
}

impl ApplicationHandler<PipelineEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.display.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("edgeview")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };
        match pollster::block_on(GpuDisplay::new(window)) {
            Ok(display) => self.display = Some(display),
            Err(e) => {
                // An unusable GPU context is fatal to the whole viewer.
                error!("display init failed: {e}");
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: PipelineEvent) {
        match event {
            PipelineEvent::FrameReady => {
                if let Some(display) = &self.display {
                    display.window.request_redraw();
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(display) = self.display.as_mut() {
                    display.resize(size.width, size.height);
                    display.window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
