pub mod compile;
pub mod display_context;
pub mod frame_loop;
pub mod gpu_context;
pub mod pipeline;
pub mod surface_renderer;
pub mod uniforms;

pub use display_context::{DisplayContext, MAX_WIDTH};
pub use frame_loop::{FrameInfo, FrameLoop, FrameRenderer};
pub use gpu_context::GpuContext;
pub use pipeline::{DitherPipeline, PipelineState, TARGET_FORMAT};
pub use surface_renderer::SurfaceRenderer;
pub use uniforms::Uniforms;
