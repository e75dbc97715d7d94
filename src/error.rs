use thiserror::Error;

/// Failures that leave the pipeline uninitialized (or, for a shader swap,
/// on its previous program)
#[derive(Debug, Error)]
pub enum RenderInitError {
    #[error("GPU context unavailable: {0}")]
    Context(String),

    #[error("{stage} shader failed to compile: {message}")]
    ShaderCompile { stage: String, message: String },

    #[error("texture upload failed: {0}")]
    TextureUpload(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Init(#[from] RenderInitError),

    #[error("pipeline has been disposed")]
    Disposed,

    #[error("pipeline is not initialized")]
    NotInitialized,

    #[error("pixel readback failed: {0}")]
    ExportReadback(String),

    #[error("an export is already in progress")]
    Busy,

    #[error("encode error: {0}")]
    Encode(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("invalid pixel buffer: expected {expected} bytes, got {actual}")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("invalid preset: {0}")]
    Preset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for errors raised while building GPU state
    pub fn is_init_error(&self) -> bool {
        matches!(self, PipelineError::Init(_))
    }
}
