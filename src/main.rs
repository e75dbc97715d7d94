use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use gpu_dither::cli::Cli;
use gpu_dither::export::PNG_FILE_NAME;
use gpu_dither::window::run_preview;
use gpu_dither::{DitherParameters, DitherPipeline, DitherSession, Image, ShaderRegistry};

fn load_image(path: &Path) -> Result<Image> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Image::decode(&bytes).with_context(|| format!("Failed to decode {}", path.display()))
}

fn load_params(cli: &Cli) -> Result<DitherParameters> {
    let base = match &cli.preset {
        Some(path) => DitherParameters::from_json_file(path)
            .with_context(|| format!("Failed to load preset {}", path.display()))?,
        None => DitherParameters::default(),
    };
    Ok(cli.apply_overrides(base).clamped())
}

fn load_shaders(cli: &Cli) -> Result<ShaderRegistry> {
    match &cli.shader_dir {
        Some(dir) => ShaderRegistry::load_dir(dir)
            .with_context(|| format!("Failed to load shaders from {}", dir.display())),
        None => Ok(ShaderRegistry::builtin()),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let image = load_image(&cli.input)?;
    let params = load_params(&cli)?;
    let shaders = load_shaders(&cli)?;

    log::info!(
        "Loaded {} ({}x{}), {} dithering",
        cli.input.display(),
        image.width(),
        image.height(),
        params.algorithm
    );

    if cli.png.is_some() || cli.svg.is_some() || cli.wants_default_output() {
        let mut session = DitherSession::new(DitherPipeline::new(shaders.clone()));
        session
            .load_image(&image, &params)
            .context("Failed to initialize dithering pipeline")?;

        let png_path = match &cli.png {
            Some(path) => Some(path.clone()),
            None if cli.wants_default_output() => Some(PNG_FILE_NAME.into()),
            None => None,
        };
        if let Some(path) = png_path {
            let artifact = session.export_raster().context("PNG export failed")?;
            artifact
                .write_to_path(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }

        if let Some(path) = &cli.svg {
            let artifact = session
                .spawn_vector_export()
                .context("SVG export failed")?
                .wait()?;
            artifact
                .write_to_path(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }

        session.dispose()?;
    }

    if cli.preview {
        println!("Preview - Controls: 1-4 algorithm, Up/Down threshold, S/V save, Escape to quit");
        let output_dir = std::env::current_dir()?;
        run_preview(image, params, shaders, output_dir)?;
    }

    Ok(())
}
