//! Edgeview: live frame pipeline with a synthetic YUV source and a wgpu
//! viewer.

use std::sync::Arc;

use color_eyre::Result;
use tracing::info;
use winit::event_loop::EventLoop;

use edgeview::capture::pool::FramePool;
use edgeview::capture::synthetic::SyntheticCamera;
use edgeview::convert::ColorConverter;
use edgeview::display::app::{EventLoopWaker, PipelineEvent, ViewerApp};
use edgeview::display::scheduler::RenderScheduler;
use edgeview::display::sink::TextureSink;
use edgeview::{pipeline, Config};

fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("edgeview=debug")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("edgeview launching");

    let config = Config::load()?;
    edgeview::CONFIG.store(Arc::new(config.clone()));

    // Render side: the winit loop owns this thread and the GPU context.
    let event_loop = EventLoop::<PipelineEvent>::with_user_event().build()?;
    let waker = Arc::new(EventLoopWaker::new(event_loop.create_proxy()));
    let scheduler = Arc::new(RenderScheduler::new(waker));
    let (sink, frame_sink) = TextureSink::new(scheduler.clone());

    // Processing side.
    let converter = ColorConverter::default();
    let processor = config.pipeline.processor.build();
    let (source, worker) = pipeline::start(converter, processor, frame_sink)?;

    // Capture side, driven by the tokio runtime on its own schedule.
    let runtime = tokio::runtime::Runtime::new()?;
    let pool = FramePool::new(config.capture.pool_size);
    let camera = SyntheticCamera::new(
        config.capture.width,
        config.capture.height,
        config.capture.fps,
        pool,
    );
    runtime.spawn(camera.run(source));

    let mut app = ViewerApp::new(config.display, sink);
    event_loop.run_app(&mut app)?;

    // Dropping the runtime cancels the capture task and with it the frame
    // source; the worker's wake channel disconnects and it exits.
    drop(runtime);
    worker.join();

    info!(draw_wakes = scheduler.wakes(), "edgeview shutting down");
    Ok(())
}
