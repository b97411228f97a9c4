//! Where fusion results go once a run completes.

use depthfuse_data::{EncodeError, RenderableGrid, save_structured_grid};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to export fusion grid: {0}")]
    Export(#[from] EncodeError),
}

/// Receives the grid of each completed fusion run.
///
/// Each call replaces whatever was published before; the display owns the
/// grid from then on.
pub trait FusionDisplay {
    fn update_fusion(&mut self, grid: RenderableGrid) -> Result<(), PublishError>;
}

/// Keeps the most recent fusion result in memory.
#[derive(Debug, Default)]
pub struct LatestFusion {
    grid: Option<RenderableGrid>,
    updates: usize,
}

impl LatestFusion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&self) -> Option<&RenderableGrid> {
        self.grid.as_ref()
    }

    pub fn take(&mut self) -> Option<RenderableGrid> {
        self.grid.take()
    }

    /// Number of results published so far.
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl FusionDisplay for LatestFusion {
    fn update_fusion(&mut self, grid: RenderableGrid) -> Result<(), PublishError> {
        self.grid = Some(grid);
        self.updates += 1;
        Ok(())
    }
}

/// Writes each fusion result to a `.vts` file, overwriting the last one.
#[derive(Debug, Clone)]
pub struct VtsExport {
    path: PathBuf,
}

impl VtsExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FusionDisplay for VtsExport {
    fn update_fusion(&mut self, grid: RenderableGrid) -> Result<(), PublishError> {
        save_structured_grid(&self.path, &grid)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthfuse_data::{Volume, volume_to_renderable};
    use glam::DVec3;

    fn grid(value: f64) -> RenderableGrid {
        let volume = Volume::from_vec(1, 1, 1, vec![value]).unwrap();
        volume_to_renderable(volume, DVec3::ZERO, DVec3::ONE).unwrap()
    }

    #[test]
    fn test_latest_fusion_replaces_previous() {
        let mut display = LatestFusion::new();
        display.update_fusion(grid(1.0)).unwrap();
        display.update_fusion(grid(2.0)).unwrap();
        assert_eq!(display.updates(), 2);
        assert_eq!(display.grid().unwrap().value(0, 0, 0), 2.0);
        assert!(display.take().is_some());
        assert!(display.grid().is_none());
    }

    #[test]
    fn test_vts_export_overwrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut display = VtsExport::new(dir.path().join("fusion.vts"));
        display.update_fusion(grid(1.0)).unwrap();
        display.update_fusion(grid(2.5)).unwrap();
        let xml = std::fs::read_to_string(display.path()).unwrap();
        assert!(xml.contains("reconstruction_scalar"));
        assert!(xml.contains("2.5"));
    }

    #[test]
    fn test_vts_export_reports_io_failure() {
        let mut display = VtsExport::new("/nonexistent/dir/fusion.vts");
        let err = display.update_fusion(grid(1.0)).unwrap_err();
        assert!(matches!(err, PublishError::Export(EncodeError::Io(_))));
    }
}
