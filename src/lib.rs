pub mod bitmap;
pub mod cli;
pub mod core;
pub mod error;
pub mod export;
pub mod frame;
pub mod math;
pub mod params;
pub mod session;
pub mod shaders;
pub mod types;
pub mod window;

pub use bitmap::Image;
pub use core::{DitherPipeline, GpuContext, PipelineState};
pub use error::{PipelineError, RenderInitError};
pub use export::{ExportArtifact, ExportGate};
pub use frame::PixelBuffer;
pub use params::{Algorithm, DitherParameters, UniformUpdate};
pub use session::{DitherSession, PendingExport};
pub use shaders::ShaderRegistry;
