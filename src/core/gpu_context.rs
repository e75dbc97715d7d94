use std::sync::Arc;
use wgpu::{Adapter, Buffer, Device, DeviceDescriptor, Instance, Limits, Queue, Surface};

use crate::error::{PipelineError, RenderInitError};

/// Device and queue shared by the pipeline and the preview surface
///
/// Cloning is cheap (Arc). All GPU work must stay on the thread that
/// drives the pipeline; exporters only ever see copied pixel buffers.
#[derive(Clone)]
pub struct GpuContext {
    device: Arc<Device>,
    queue: Arc<Queue>,
    limits: Limits,
}

impl GpuContext {
    /// Create a context without a surface (offscreen rendering and export)
    pub async fn new() -> Result<Self, RenderInitError> {
        let instance = Self::create_instance();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderInitError::Context(format!("no suitable adapter: {:?}", e)))?;

        Self::from_adapter(&adapter).await
    }

    /// Blocking variant of [`GpuContext::new`]
    pub fn new_blocking() -> Result<Self, RenderInitError> {
        pollster::block_on(Self::new())
    }

    /// Create a context compatible with a window surface
    ///
    /// The surface is created from the same instance as the device.
    pub async fn new_with_window(
        window: Arc<winit::window::Window>,
    ) -> Result<(Self, Surface<'static>, Adapter), RenderInitError> {
        let instance = Self::create_instance();
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderInitError::Context(format!("surface creation failed: {}", e)))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderInitError::Context(format!("no suitable adapter: {:?}", e)))?;

        let context = Self::from_adapter(&adapter).await?;
        Ok((context, surface, adapter))
    }

    /// Get reference to the device
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Get reference to the queue
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Largest 2D texture edge the device accepts
    pub fn max_texture_dimension(&self) -> u32 {
        self.limits.max_texture_dimension_2d
    }

    /// Map a `MAP_READ` buffer and copy its contents out
    ///
    /// Blocks the calling thread until the GPU has finished all submitted work.
    pub fn read_buffer_sync(&self, buffer: &Buffer) -> Result<Vec<u8>, PipelineError> {
        let buffer_slice = buffer.slice(..);

        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| PipelineError::ExportReadback(format!("device poll failed: {:?}", e)))?;

        match receiver.recv() {
            Ok(Ok(())) => {
                let data = buffer_slice.get_mapped_range();
                let result = data.to_vec();
                drop(data);
                buffer.unmap();
                Ok(result)
            }
            Ok(Err(e)) => Err(PipelineError::ExportReadback(format!(
                "buffer mapping failed: {:?}",
                e
            ))),
            Err(_) => Err(PipelineError::ExportReadback(
                "channel closed before receiving result".into(),
            )),
        }
    }

    fn create_instance() -> Instance {
        Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    async fn from_adapter(adapter: &Adapter) -> Result<Self, RenderInitError> {
        let info = adapter.get_info();
        log::info!("Using GPU adapter: {} ({:?})", info.name, info.backend);

        // Downlevel defaults keep GL and software adapters usable
        let limits = Limits {
            max_texture_dimension_2d: adapter.limits().max_texture_dimension_2d,
            ..Limits::downlevel_defaults()
        };

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Dither Device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits.clone(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| RenderInitError::Context(format!("failed to create device: {:?}", e)))?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            limits,
        })
    }
}
