//! Export of renderable grids as VTK XML structured grids (`.vts`).

use crate::depth_map::EncodeError;
use crate::grid::RenderableGrid;
use crate::vtk::{
    self, DataArray, DataSection, Piece, PointsSection, StructuredGridElement, VtkFile,
};
use std::path::Path;
use tracing::info;

/// Serialize `grid` as an ascii VTK structured grid document.
pub fn encode_structured_grid(grid: &RenderableGrid) -> Result<String, EncodeError> {
    let extent = vtk::format_extent(grid.point_dimensions());
    let coords: Vec<f64> = grid.points().iter().flat_map(|p| p.to_array()).collect();

    let file = VtkFile {
        kind: vtk::STRUCTURED_GRID.to_string(),
        version: Some("1.0".to_string()),
        byte_order: Some("LittleEndian".to_string()),
        header_type: None,
        compressor: None,
        image_data: None,
        structured_grid: Some(StructuredGridElement {
            whole_extent: extent.clone(),
            pieces: vec![Piece {
                extent,
                point_data: Some(DataSection {
                    scalars: Some(grid.scalar_name().to_string()),
                    arrays: vec![DataArray::ascii_f64(
                        Some(grid.scalar_name()),
                        1,
                        grid.point_values(),
                    )],
                }),
                cell_data: None,
                points: Some(PointsSection {
                    array: DataArray::ascii_f64(Some("Points"), 3, &coords),
                }),
            }],
        }),
        appended_data: None,
    };

    let body = quick_xml::se::to_string_with_root(vtk::ROOT, &file)?;
    Ok(format!("{}{}\n", vtk::XML_DECLARATION, body))
}

/// Write `grid` to `path` as a `.vts` file.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn save_structured_grid(path: &Path, grid: &RenderableGrid) -> Result<(), EncodeError> {
    let xml = encode_structured_grid(grid)?;
    std::fs::write(path, xml)?;
    info!(
        "Wrote {:?} structured grid ({} points)",
        grid.point_dimensions(),
        grid.point_count()
    );
    Ok(())
}
