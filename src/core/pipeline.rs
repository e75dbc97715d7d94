use std::sync::Arc;
use wgpu::util::DeviceExt;

use super::compile::{compile_module, scoped, FRAGMENT_ENTRY, VERTEX_ENTRY};
use super::display_context::DisplayContext;
use super::frame_loop::FrameRenderer;
use super::gpu_context::GpuContext;
use super::uniforms::Uniforms;

use crate::bitmap::Image;
use crate::error::{PipelineError, RenderInitError};
use crate::frame::PixelBuffer;
use crate::params::{Algorithm, DitherParameters, UniformUpdate};
use crate::shaders::ShaderRegistry;
use crate::types::{DitherUniforms, QuadVertex, QUAD_INDICES, QUAD_VERTICES};

type Result<T> = std::result::Result<T, PipelineError>;

/// Format of both the source texture and the render target
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Observable lifecycle of a [`DitherPipeline`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
    Disposed,
}

/// Uploaded source image
struct SourceTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    id: u64,
}

/// Every GPU object owned by a ready pipeline
///
/// The bind group (texture + sampler + uniforms) is built independently of
/// `program`, so swapping the fragment shader never touches the texture
/// binding.
struct GpuResources {
    target: DisplayContext,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    vertex_module: wgpu::ShaderModule,
    program: wgpu::RenderPipeline,
    source: SourceTexture,
    bind_group: wgpu::BindGroup,
    render_target: wgpu::Texture,
    render_view: wgpu::TextureView,
    staging_buffer: wgpu::Buffer,
}

impl GpuResources {
    /// Destroy textures and buffers now instead of waiting for the last handle
    fn release(self) {
        self.source.texture.destroy();
        self.render_target.destroy();
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.uniform_buffer.destroy();
        self.staging_buffer.destroy();
        log::debug!(
            "Released GPU resources ({}x{} target, texture #{})",
            self.target.width,
            self.target.height,
            self.source.id
        );
    }
}

enum Stage {
    Uninitialized,
    Ready(Box<GpuResources>),
    Disposed,
}

/// GPU dithering pipeline: one quad, one texture, one program
///
/// Lifecycle is `Uninitialized -> Ready -> Disposed`. A new image goes
/// through [`DitherPipeline::initialize`] (full rebuild) or
/// [`DitherPipeline::update_image`] (texture only); everything else is a
/// cheap uniform write or a fragment-shader swap.
pub struct DitherPipeline {
    shaders: ShaderRegistry,
    gpu: Option<Arc<GpuContext>>,
    stage: Stage,
    params: DitherParameters,
    uniforms: Option<Uniforms>,
    next_texture_id: u64,
    frames_rendered: u64,
}

impl DitherPipeline {
    /// Pipeline that creates its own headless GPU context on first use
    pub fn new(shaders: ShaderRegistry) -> Self {
        Self {
            shaders,
            gpu: None,
            stage: Stage::Uninitialized,
            params: DitherParameters::default(),
            uniforms: None,
            next_texture_id: 1,
            frames_rendered: 0,
        }
    }

    /// Pipeline bound to an existing context (e.g. one shared with a window)
    pub fn with_context(gpu: Arc<GpuContext>, shaders: ShaderRegistry) -> Self {
        let mut pipeline = Self::new(shaders);
        pipeline.gpu = Some(gpu);
        pipeline
    }

    pub fn state(&self) -> PipelineState {
        match self.stage {
            Stage::Uninitialized => PipelineState::Uninitialized,
            Stage::Ready(_) => PipelineState::Ready,
            Stage::Disposed => PipelineState::Disposed,
        }
    }

    /// Current (clamped) parameters, including live color strings
    pub fn params(&self) -> &DitherParameters {
        &self.params
    }

    /// Render target size, once ready
    pub fn target(&self) -> Option<DisplayContext> {
        match &self.stage {
            Stage::Ready(res) => Some(res.target),
            _ => None,
        }
    }

    /// Identity of the texture currently bound to the program
    pub fn bound_texture_id(&self) -> Option<u64> {
        match &self.stage {
            Stage::Ready(res) => Some(res.source.id),
            _ => None,
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Render target view, for hosts that present the output directly
    pub fn target_view(&self) -> Option<&wgpu::TextureView> {
        match &self.stage {
            Stage::Ready(res) => Some(&res.render_view),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&Arc<GpuContext>> {
        self.gpu.as_ref()
    }

    /// Build all GPU state for `image` and transition to `Ready`
    ///
    /// Called again while ready, the old state is released first and
    /// rebuilt from scratch. On failure the pipeline is left `Uninitialized`.
    pub fn initialize(&mut self, image: &Image, params: &DitherParameters) -> Result<()> {
        match std::mem::replace(&mut self.stage, Stage::Uninitialized) {
            Stage::Disposed => {
                self.stage = Stage::Disposed;
                return Err(PipelineError::Disposed);
            }
            Stage::Ready(old) => old.release(),
            Stage::Uninitialized => {}
        }

        let gpu = self.ensure_context()?;
        let params = params.clamped();
        let target = DisplayContext::fit(image.width(), image.height());
        let uniforms = Uniforms::from_params(&params, target);

        let resources = self.build_resources(&gpu, image, &params, &uniforms, target)?;
        log::info!(
            "Pipeline ready: {}x{} image -> {}x{} target, {} dithering",
            image.width(),
            image.height(),
            target.width,
            target.height,
            params.algorithm
        );

        self.stage = Stage::Ready(Box::new(resources));
        self.params = params;
        self.uniforms = Some(uniforms);
        self.render_frame()
    }

    /// Replace the source texture, resizing the target if needed
    ///
    /// The shader program is kept.
    pub fn update_image(&mut self, image: &Image) -> Result<()> {
        let gpu = self.ready_context()?;
        let texture_id = self.next_texture_id;
        let uniforms = self.uniforms.as_mut().ok_or(PipelineError::NotInitialized)?;
        let Stage::Ready(res) = &mut self.stage else {
            return Err(PipelineError::NotInitialized);
        };

        let source = upload_texture(&gpu, image, texture_id)?;
        self.next_texture_id += 1;

        let target = DisplayContext::fit(image.width(), image.height());
        if target != res.target {
            let (render_target, render_view) = create_render_target(gpu.device(), target);
            let staging_buffer = create_staging_buffer(gpu.device(), target);
            std::mem::replace(&mut res.render_target, render_target).destroy();
            std::mem::replace(&mut res.staging_buffer, staging_buffer).destroy();
            res.render_view = render_view;
            res.target = target;
            log::debug!("Resized render target to {}x{}", target.width, target.height);
        }

        res.bind_group = create_bind_group(
            gpu.device(),
            &res.bind_group_layout,
            &source.view,
            &res.sampler,
            &res.uniform_buffer,
        );
        let old = std::mem::replace(&mut res.source, source);
        old.texture.destroy();

        uniforms.set_resolution(target);
        gpu.queue()
            .write_buffer(&res.uniform_buffer, 0, bytemuck::bytes_of(&uniforms.to_gpu()));
        Ok(())
    }

    /// Change one uniform in place; no texture upload, no recompilation
    pub fn update_uniform(&mut self, update: UniformUpdate) -> Result<()> {
        let gpu = self.ready_context()?;
        let Stage::Ready(res) = &self.stage else {
            return Err(PipelineError::NotInitialized);
        };
        let uniforms = self.uniforms.as_mut().ok_or(PipelineError::NotInitialized)?;

        self.params.apply(&update);
        uniforms.apply(&update, &self.params);
        gpu.queue()
            .write_buffer(&res.uniform_buffer, 0, bytemuck::bytes_of(&uniforms.to_gpu()));
        Ok(())
    }

    /// Recompile with another fragment shader
    ///
    /// Only the program is rebuilt. The bind group holding the texture and
    /// uniforms is reused as-is, so the texture binding is intact when this
    /// returns. A shader that fails to compile leaves the old program active.
    pub fn swap_algorithm(&mut self, algorithm: Algorithm) -> Result<()> {
        let gpu = self.ready_context()?;
        let Stage::Ready(res) = &mut self.stage else {
            return Err(PipelineError::NotInitialized);
        };

        let label = format!("fragment ({})", algorithm);
        let fragment_module = compile_module(
            gpu.device(),
            &label,
            self.shaders.resolve(algorithm),
            FRAGMENT_ENTRY,
            naga::ShaderStage::Fragment,
        )?;

        res.program = create_program(
            gpu.device(),
            &format!("program ({})", algorithm),
            &res.pipeline_layout,
            &res.vertex_module,
            &fragment_module,
        )?;
        self.params.algorithm = algorithm;
        log::debug!(
            "Swapped to {} dithering, texture #{} still bound",
            algorithm,
            res.source.id
        );
        Ok(())
    }

    /// Render once and copy the target back to the CPU
    ///
    /// Render and readback are submitted together so the snapshot always
    /// reflects the current uniforms.
    pub fn read_pixels(&mut self) -> Result<PixelBuffer> {
        let gpu = self.ready_context()?;
        let Stage::Ready(res) = &self.stage else {
            return Err(PipelineError::NotInitialized);
        };

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Dither Readback Encoder"),
            });
        encode_draw(&mut encoder, res);

        let target = res.target;
        encoder.copy_texture_to_buffer(
            res.render_target.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &res.staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(target.padded_bytes_per_row()),
                    rows_per_image: Some(target.height),
                },
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue().submit(Some(encoder.finish()));
        self.frames_rendered += 1;

        let padded = gpu.read_buffer_sync(&res.staging_buffer)?;
        if padded.len() < target.padded_buffer_size() as usize {
            return Err(PipelineError::ExportReadback(format!(
                "short readback: {} of {} bytes",
                padded.len(),
                target.padded_buffer_size()
            )));
        }
        PixelBuffer::new(target.width, target.height, target.strip_padding(&padded))
            .map_err(|e| PipelineError::ExportReadback(e.to_string()))
    }

    /// Release every GPU resource and the context; the pipeline is unusable after
    pub fn dispose(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.stage, Stage::Disposed) {
            Stage::Disposed => Err(PipelineError::Disposed),
            Stage::Ready(res) => {
                res.release();
                self.release_context();
                Ok(())
            }
            Stage::Uninitialized => {
                self.release_context();
                Ok(())
            }
        }
    }

    fn release_context(&mut self) {
        self.uniforms = None;
        self.gpu = None;
        log::debug!("Pipeline disposed after {} frames", self.frames_rendered);
    }

    fn ensure_context(&mut self) -> std::result::Result<Arc<GpuContext>, RenderInitError> {
        if let Some(gpu) = &self.gpu {
            return Ok(gpu.clone());
        }
        let gpu = Arc::new(GpuContext::new_blocking()?);
        self.gpu = Some(gpu.clone());
        Ok(gpu)
    }

    /// Context of a `Ready` pipeline, or the error for the current state
    fn ready_context(&self) -> Result<Arc<GpuContext>> {
        match (&self.stage, &self.gpu) {
            (Stage::Disposed, _) => Err(PipelineError::Disposed),
            (Stage::Ready(_), Some(gpu)) => Ok(gpu.clone()),
            _ => Err(PipelineError::NotInitialized),
        }
    }

    fn build_resources(
        &mut self,
        gpu: &GpuContext,
        image: &Image,
        params: &DitherParameters,
        uniforms: &Uniforms,
        target: DisplayContext,
    ) -> Result<GpuResources> {
        let device = gpu.device();

        let vertex_module = compile_module(
            device,
            "vertex",
            self.shaders.vertex(),
            VERTEX_ENTRY,
            naga::ShaderStage::Vertex,
        )?;
        let fragment_module = compile_module(
            device,
            &format!("fragment ({})", params.algorithm),
            self.shaders.resolve(params.algorithm),
            FRAGMENT_ENTRY,
            naga::ShaderStage::Fragment,
        )?;

        let source = upload_texture(gpu, image, self.next_texture_id)?;
        self.next_texture_id += 1;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Index Buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Dither Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms.to_gpu()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Source Texture Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = create_bind_group_layout(device);
        let bind_group = create_bind_group(
            device,
            &bind_group_layout,
            &source.view,
            &sampler,
            &uniform_buffer,
        );

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Dither Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let program = create_program(
            device,
            &format!("program ({})", params.algorithm),
            &pipeline_layout,
            &vertex_module,
            &fragment_module,
        )?;

        let (render_target, render_view) = create_render_target(device, target);
        let staging_buffer = create_staging_buffer(device, target);

        Ok(GpuResources {
            target,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            sampler,
            bind_group_layout,
            pipeline_layout,
            vertex_module,
            program,
            source,
            bind_group,
            render_target,
            render_view,
            staging_buffer,
        })
    }
}

impl FrameRenderer for DitherPipeline {
    /// Draw the quad into the render target with the current uniforms
    fn render_frame(&mut self) -> Result<()> {
        let gpu = self.ready_context()?;
        let Stage::Ready(res) = &self.stage else {
            return Err(PipelineError::NotInitialized);
        };

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Dither Frame Encoder"),
            });
        encode_draw(&mut encoder, res);
        gpu.queue().submit(Some(encoder.finish()));
        self.frames_rendered += 1;
        Ok(())
    }
}

impl Drop for DitherPipeline {
    fn drop(&mut self) {
        if let Stage::Ready(res) = std::mem::replace(&mut self.stage, Stage::Disposed) {
            res.release();
        }
    }
}

fn encode_draw(encoder: &mut wgpu::CommandEncoder, res: &GpuResources) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Dither Render Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &res.render_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    render_pass.set_pipeline(&res.program);
    render_pass.set_bind_group(0, &res.bind_group, &[]);
    render_pass.set_vertex_buffer(0, res.vertex_buffer.slice(..));
    render_pass.set_index_buffer(res.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
    render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
}

fn upload_texture(
    gpu: &GpuContext,
    image: &Image,
    id: u64,
) -> std::result::Result<SourceTexture, RenderInitError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(RenderInitError::TextureUpload(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }
    let max = gpu.max_texture_dimension();
    if width > max || height > max {
        return Err(RenderInitError::TextureUpload(format!(
            "{}x{} exceeds the device texture limit of {}",
            width, height, max
        )));
    }

    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("Dither Source Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    gpu.queue().write_texture(
        texture.as_image_copy(),
        image.pixels(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    log::debug!("Uploaded texture #{} ({}x{})", id, width, height);
    Ok(SourceTexture { texture, view, id })
}

fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Dither Bind Group Layout"),
        entries: &[
            // Source texture (binding 0)
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            // Sampler (binding 1)
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            // Uniforms (binding 2)
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    // Lets program creation reject shaders that expect a larger block
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<DitherUniforms>() as u64,
                    ),
                },
                count: None,
            },
        ],
    })
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    uniform_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Dither Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(texture_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniform_buffer.as_entire_binding(),
            },
        ],
    })
}

/// Link the program; layout mismatches become `ShaderCompile` for `label`
fn create_program(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    vertex_module: &wgpu::ShaderModule,
    fragment_module: &wgpu::ShaderModule,
) -> std::result::Result<wgpu::RenderPipeline, RenderInitError> {
    scoped(device, label, || {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Dither Render Pipeline"),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: vertex_module,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[QuadVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment_module,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    })
}

fn create_render_target(
    device: &wgpu::Device,
    target: DisplayContext,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Dither Render Target"),
        size: wgpu::Extent3d {
            width: target.width,
            height: target.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn create_staging_buffer(device: &wgpu::Device, target: DisplayContext) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Dither Staging Buffer"),
        size: target.padded_buffer_size(),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    })
}
