use std::thread::JoinHandle;

use crate::bitmap::Image;
use crate::core::{DitherPipeline, FrameRenderer};
use crate::error::PipelineError;
use crate::export::{self, ExportArtifact, ExportGate};
use crate::frame::PixelBuffer;
use crate::params::{Algorithm, DitherParameters, UniformUpdate};

type Result<T> = std::result::Result<T, PipelineError>;

/// A pipeline plus the gate that serializes its exports
///
/// Full re-initialization is refused while an export holds the gate, so a
/// snapshot is never taken from resources that are being torn down.
pub struct DitherSession {
    pipeline: DitherPipeline,
    gate: ExportGate,
}

impl DitherSession {
    pub fn new(pipeline: DitherPipeline) -> Self {
        Self {
            pipeline,
            gate: ExportGate::new(),
        }
    }

    pub fn pipeline(&self) -> &DitherPipeline {
        &self.pipeline
    }

    /// What a host frame loop drives; re-initialization stays behind the gate
    pub fn frame_renderer(&mut self) -> &mut dyn FrameRenderer {
        &mut self.pipeline
    }

    /// Render once and read the target back
    pub fn snapshot(&mut self) -> Result<PixelBuffer> {
        self.pipeline.read_pixels()
    }

    /// Shared handle to the busy flag
    pub fn export_gate(&self) -> &ExportGate {
        &self.gate
    }

    pub fn is_exporting(&self) -> bool {
        self.gate.is_busy()
    }

    /// Rebuild the pipeline around `image`; `Busy` while an export runs
    pub fn load_image(&mut self, image: &Image, params: &DitherParameters) -> Result<()> {
        if self.gate.is_busy() {
            log::warn!("Image load rejected: export in progress");
            return Err(PipelineError::Busy);
        }
        self.pipeline.initialize(image, params)
    }

    /// Swap the texture only, keeping the current program
    pub fn replace_image(&mut self, image: &Image) -> Result<()> {
        if self.gate.is_busy() {
            return Err(PipelineError::Busy);
        }
        self.pipeline.update_image(image)
    }

    /// Apply a uniform change and draw with it right away
    pub fn update_uniform(&mut self, update: UniformUpdate) -> Result<()> {
        self.pipeline.update_uniform(update)?;
        self.pipeline.render_frame()
    }

    pub fn swap_algorithm(&mut self, algorithm: Algorithm) -> Result<()> {
        self.pipeline.swap_algorithm(algorithm)?;
        self.pipeline.render_frame()
    }

    pub fn export_raster(&mut self) -> Result<ExportArtifact> {
        let _guard = self.gate.try_acquire()?;
        let snapshot = self.pipeline.read_pixels()?;
        export::export_raster(&snapshot)
    }

    pub fn export_vector(&mut self) -> Result<ExportArtifact> {
        let _guard = self.gate.try_acquire()?;
        let snapshot = self.pipeline.read_pixels()?;
        let params = self.pipeline.params();
        Ok(export::export_vector(
            &snapshot,
            &params.background_color,
            &params.foreground_color,
        ))
    }

    /// Snapshot now, vectorize on a worker thread
    ///
    /// The readback happens on the calling thread, which owns the GPU
    /// context. The gate stays held until the worker finishes.
    pub fn spawn_vector_export(&mut self) -> Result<PendingExport> {
        let guard = self.gate.try_acquire()?;
        let snapshot = self.pipeline.read_pixels()?;
        let background = self.pipeline.params().background_color.clone();
        let foreground = self.pipeline.params().foreground_color.clone();

        let handle = std::thread::Builder::new()
            .name("svg-export".into())
            .spawn(move || {
                let _guard = guard;
                export::export_vector(&snapshot, &background, &foreground)
            })?;
        Ok(PendingExport { handle })
    }

    pub fn dispose(&mut self) -> Result<()> {
        self.pipeline.dispose()
    }
}

/// Vector export running on a worker thread
pub struct PendingExport {
    handle: JoinHandle<ExportArtifact>,
}

impl PendingExport {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the artifact is ready
    pub fn wait(self) -> Result<ExportArtifact> {
        self.handle
            .join()
            .map_err(|_| PipelineError::Encode("vector export worker panicked".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::ShaderRegistry;

    fn session() -> DitherSession {
        DitherSession::new(DitherPipeline::new(ShaderRegistry::builtin()))
    }

    #[test]
    fn test_load_rejected_while_exporting() {
        let mut session = session();
        let _guard = session.export_gate().try_acquire().unwrap();

        let err = session
            .load_image(&Image::gradient(2, 2), &DitherParameters::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Busy));
        assert!(session.pipeline().context().is_none());
    }

    #[test]
    fn test_second_export_is_busy() {
        let mut session = session();
        let _guard = session.export_gate().try_acquire().unwrap();
        assert!(matches!(session.export_raster(), Err(PipelineError::Busy)));
        assert!(matches!(session.export_vector(), Err(PipelineError::Busy)));
        assert!(matches!(
            session.spawn_vector_export(),
            Err(PipelineError::Busy)
        ));
    }

    #[test]
    fn test_frame_renderer_reports_pipeline_state() {
        let mut session = session();
        assert!(matches!(
            session.frame_renderer().render_frame(),
            Err(PipelineError::NotInitialized)
        ));
        session.dispose().unwrap();
        assert!(matches!(
            session.frame_renderer().render_frame(),
            Err(PipelineError::Disposed)
        ));
        assert!(matches!(session.snapshot(), Err(PipelineError::Disposed)));
    }

    #[test]
    fn test_failed_export_releases_gate() {
        let mut session = session();
        assert!(matches!(
            session.export_raster(),
            Err(PipelineError::NotInitialized)
        ));
        assert!(!session.is_exporting());
    }
}
