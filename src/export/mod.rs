//! CPU-side exporters for a rendered [`PixelBuffer`](crate::frame::PixelBuffer)
//!
//! Both exporters are pure functions of a snapshot. [`ExportGate`] enforces
//! that only one export per pipeline is in flight.

pub mod raster;
pub mod vector;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::PipelineError;

pub use raster::export_raster;
pub use vector::export_vector;

pub const PNG_MIME: &str = "image/png";
pub const SVG_MIME: &str = "image/svg+xml";
pub const PNG_FILE_NAME: &str = "dithered-image.png";
pub const SVG_FILE_NAME: &str = "dithered-image.svg";

/// Finished export: encoded bytes plus how to save them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub file_name: &'static str,
}

impl ExportArtifact {
    /// Save under the suggested file name inside `dir`
    pub fn write_to(&self, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
        let path = dir.as_ref().join(self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }

    /// Save to an explicit path
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

/// Busy flag shared between a session and its in-flight export
#[derive(Debug, Clone, Default)]
pub struct ExportGate {
    busy: Arc<AtomicBool>,
}

impl ExportGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or fail with [`PipelineError::Busy`]
    pub fn try_acquire(&self) -> Result<ExportGuard, PipelineError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PipelineError::Busy)?;
        Ok(ExportGuard {
            busy: self.busy.clone(),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holds the gate until dropped, on success or failure alike
#[derive(Debug)]
pub struct ExportGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
