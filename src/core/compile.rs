use crate::error::RenderInitError;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Parse and validate WGSL up front and check that `entry` exists for `stage`
///
/// Catches syntax and type errors without a device. Layout mismatches are
/// only visible to wgpu and are caught by [`scoped`].
pub fn validate_wgsl(
    label: &str,
    source: &str,
    entry: &str,
    stage: naga::ShaderStage,
) -> Result<(), RenderInitError> {
    let compile_error = |message: String| RenderInitError::ShaderCompile {
        stage: label.to_string(),
        message,
    };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| compile_error(e.message().to_string()))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| compile_error(e.into_inner().to_string()))?;

    let has_entry = module
        .entry_points
        .iter()
        .any(|ep| ep.name == entry && ep.stage == stage);
    if !has_entry {
        return Err(compile_error(format!(
            "missing {:?} entry point '{}'",
            stage, entry
        )));
    }

    Ok(())
}

/// Run `create` inside a validation error scope
///
/// Without a scope wgpu hands validation errors to the uncaptured-error
/// handler, which panics. Errors raised inside the scope come back as
/// `ShaderCompile` for `label`.
pub fn scoped<T>(
    device: &wgpu::Device,
    label: &str,
    create: impl FnOnce() -> T,
) -> Result<T, RenderInitError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(e) => Err(RenderInitError::ShaderCompile {
            stage: label.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Validate, then create the wgpu module
pub fn compile_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    entry: &str,
    stage: naga::ShaderStage,
) -> Result<wgpu::ShaderModule, RenderInitError> {
    validate_wgsl(label, source, entry, stage)?;
    log::debug!("Compiling {} shader ({} bytes)", label, source.len());

    scoped(device, label, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    })
}
