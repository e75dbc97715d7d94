use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::bitmap::Image;
use crate::core::{DisplayContext, DitherPipeline, FrameLoop, GpuContext, SurfaceRenderer};
use crate::params::{Algorithm, DitherParameters, UniformUpdate};
use crate::session::{DitherSession, PendingExport};
use crate::shaders::ShaderRegistry;

const THRESHOLD_STEP: f32 = 0.05;

/// Map a number key to the algorithm it selects
pub fn algorithm_for_key(code: KeyCode) -> Option<Algorithm> {
    match code {
        KeyCode::Digit1 => Some(Algorithm::Bayer),
        KeyCode::Digit2 => Some(Algorithm::RandomNoise),
        KeyCode::Digit3 => Some(Algorithm::BlueNoise),
        KeyCode::Digit4 => Some(Algorithm::Halftone),
        _ => None,
    }
}

/// GPU objects that exist once the window is up
struct Preview {
    window: Arc<Window>,
    session: DitherSession,
    surface: SurfaceRenderer,
}

/// Interactive preview: the pipeline renders offscreen, the surface shows it
pub struct PreviewApp {
    image: Image,
    params: DitherParameters,
    shaders: ShaderRegistry,
    output_dir: PathBuf,
    preview: Option<Preview>,
    frame_loop: FrameLoop,
    pending_svg: Option<PendingExport>,
    failure: Option<anyhow::Error>,
}

impl PreviewApp {
    pub fn new(
        image: Image,
        params: DitherParameters,
        shaders: ShaderRegistry,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            image,
            params,
            shaders,
            output_dir,
            preview: None,
            frame_loop: FrameLoop::new(),
            pending_svg: None,
            failure: None,
        }
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<Preview> {
        let target = DisplayContext::fit(self.image.width(), self.image.height());
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title(format!("Dither Preview - {}", self.params.algorithm))
                        .with_inner_size(winit::dpi::PhysicalSize::new(target.width, target.height)),
                )
                .context("Failed to create window")?,
        );

        let (gpu, surface, adapter) = pollster::block_on(GpuContext::new_with_window(window.clone()))
            .context("Failed to initialize GPU")?;
        let gpu = Arc::new(gpu);

        let pipeline = DitherPipeline::with_context(gpu.clone(), self.shaders.clone());
        let mut session = DitherSession::new(pipeline);
        session
            .load_image(&self.image, &self.params)
            .context("Failed to initialize dithering pipeline")?;

        let size = window.inner_size();
        let surface = SurfaceRenderer::new(
            gpu,
            surface,
            &adapter,
            DisplayContext::new(size.width.max(1), size.height.max(1)),
        )
        .context("Failed to configure window surface")?;

        Ok(Preview {
            window,
            session,
            surface,
        })
    }

    fn handle_key(&mut self, code: KeyCode) {
        let Some(preview) = &mut self.preview else {
            return;
        };
        let session = &mut preview.session;

        let result = if let Some(algorithm) = algorithm_for_key(code) {
            session.swap_algorithm(algorithm).map(|()| {
                preview
                    .window
                    .set_title(&format!("Dither Preview - {}", algorithm));
            })
        } else {
            match code {
                KeyCode::ArrowUp | KeyCode::ArrowDown => {
                    let step = if code == KeyCode::ArrowUp {
                        THRESHOLD_STEP
                    } else {
                        -THRESHOLD_STEP
                    };
                    let threshold = session.pipeline().params().threshold + step;
                    session.update_uniform(UniformUpdate::Threshold(threshold))
                }
                KeyCode::KeyS => session.export_raster().and_then(|artifact| {
                    let path = artifact.write_to(&self.output_dir)?;
                    log::info!("Saved {}", path.display());
                    Ok(())
                }),
                KeyCode::KeyV => session.spawn_vector_export().map(|pending| {
                    self.pending_svg = Some(pending);
                }),
                _ => return,
            }
        };

        match result {
            // A failed swap or update keeps the previous frame; only the
            // frame loop halts on render errors
            Ok(()) => self.frame_loop.restart(),
            Err(e) => log::warn!("{:?} ignored: {}", code, e),
        }
        preview.window.request_redraw();
    }

    fn collect_svg(&mut self) {
        let finished = self
            .pending_svg
            .as_ref()
            .is_some_and(PendingExport::is_finished);
        if !finished {
            return;
        }
        if let Some(pending) = self.pending_svg.take() {
            self.save_svg(pending);
        }
    }

    fn save_svg(&self, pending: PendingExport) {
        let saved = pending
            .wait()
            .map_err(anyhow::Error::from)
            .and_then(|artifact| Ok(artifact.write_to(&self.output_dir)?));
        match saved {
            Ok(path) => log::info!("Saved {}", path.display()),
            Err(e) => log::error!("SVG export failed: {}", e),
        }
    }

    fn redraw(&mut self) {
        let Some(preview) = &mut self.preview else {
            return;
        };
        if self
            .frame_loop
            .tick(preview.session.frame_renderer())
            .is_none()
        {
            return;
        }
        let Some(view) = preview.session.pipeline().target_view() else {
            return;
        };

        match preview.surface.present(view) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = preview.window.inner_size();
                preview
                    .surface
                    .resize(DisplayContext::new(size.width, size.height));
            }
            Err(e) => log::warn!("Present failed: {}", e),
        }
    }
}

impl ApplicationHandler for PreviewApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.preview.is_some() {
            return;
        }
        match self.open(event_loop) {
            Ok(preview) => {
                log::info!("Preview open: 1-4 algorithm, Up/Down threshold, S png, V svg, Esc quit");
                self.preview = Some(preview);
            }
            Err(e) => {
                self.failure = Some(e);
                event_loop.exit();
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
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        ..
                    },
                ..
            } => self.handle_key(code),
            WindowEvent::Resized(size) => {
                if let Some(preview) = &mut self.preview {
                    preview
                        .surface
                        .resize(DisplayContext::new(size.width, size.height));
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.collect_svg();
        if let Some(preview) = &self.preview {
            preview.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(pending) = self.pending_svg.take() {
            self.save_svg(pending);
        }
        if let Some(mut preview) = self.preview.take() {
            if let Err(e) = preview.session.dispose() {
                log::warn!("Dispose failed: {}", e);
            }
        }
    }
}

/// Open the preview window and block until it is closed
pub fn run_preview(
    image: Image,
    params: DitherParameters,
    shaders: ShaderRegistry,
    output_dir: PathBuf,
) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = PreviewApp::new(image, params, shaders, output_dir);
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
