//! Conversion of integrated volumes into renderable structured grids.
//!
//! A [`Volume`] is treated as a block of cells: voxel `(i, j, k)` covers
//! `origin + [i, i+1] x [j, j+1] x [k, k+1] * spacing`. The cell values are
//! then resampled onto the grid points, each point taking the mean of the
//! cells that share it (between one and eight). This is the same rule VTK's
//! cell-data-to-point-data filter applies to image data.

use crate::types::Volume;
use glam::DVec3;
use thiserror::Error;
use tracing::debug;

/// Name of the single scalar field carried by converted grids.
pub const SCALAR_NAME: &str = "reconstruction_scalar";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("spacing must be finite and positive on every axis, got {0:?}")]
    InvalidSpacing([f64; 3]),

    #[error("origin must be finite, got {0:?}")]
    InvalidOrigin([f64; 3]),
}

/// A grid with one scalar value per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGrid {
    origin: DVec3,
    spacing: DVec3,
    cell_dims: [usize; 3],
    values: Vec<f64>,
}

impl CellGrid {
    /// Take ownership of `volume` and lay its voxels out as cells.
    pub fn from_volume(volume: Volume, origin: DVec3, spacing: DVec3) -> Result<Self, GridError> {
        validate(origin, spacing)?;

        // Volume storage is already k, j, i ordered.
        let cell_dims = volume.dimensions();
        let values = volume.into_vec();

        Ok(Self {
            origin,
            spacing,
            cell_dims,
            values,
        })
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    pub fn cell_dimensions(&self) -> [usize; 3] {
        self.cell_dims
    }

    pub fn scalar_name(&self) -> &str {
        SCALAR_NAME
    }

    /// Cell values in `k, j, i` order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Minimum and maximum corner of the covered space.
    pub fn extent(&self) -> (DVec3, DVec3) {
        extent(self.origin, self.spacing, self.cell_dims)
    }

    /// Resample onto grid points, consuming the cell grid.
    pub fn into_point_grid(self) -> RenderableGrid {
        let [cw, ch, cd] = self.cell_dims;
        if self.values.is_empty() {
            return RenderableGrid {
                origin: self.origin,
                spacing: self.spacing,
                cell_dims: self.cell_dims,
                point_dims: [0, 0, 0],
                points: Vec::new(),
                values: Vec::new(),
            };
        }

        let point_dims = [cw + 1, ch + 1, cd + 1];
        let count = point_dims[0] * point_dims[1] * point_dims[2];
        let mut points = Vec::with_capacity(count);
        let mut values = Vec::with_capacity(count);

        for pk in 0..point_dims[2] {
            for pj in 0..point_dims[1] {
                for pi in 0..point_dims[0] {
                    points.push(
                        self.origin + DVec3::new(pi as f64, pj as f64, pk as f64) * self.spacing,
                    );

                    let mut sum = 0.0;
                    let mut shared = 0usize;
                    for k in adjacent_cells(pk, cd) {
                        for j in adjacent_cells(pj, ch) {
                            for i in adjacent_cells(pi, cw) {
                                sum += self.values[(k * ch + j) * cw + i];
                                shared += 1;
                            }
                        }
                    }
                    values.push(sum / shared as f64);
                }
            }
        }

        RenderableGrid {
            origin: self.origin,
            spacing: self.spacing,
            cell_dims: self.cell_dims,
            point_dims,
            points,
            values,
        }
    }
}

/// Cells along one axis touching point index `p`.
fn adjacent_cells(p: usize, cells: usize) -> std::ops::RangeInclusive<usize> {
    p.saturating_sub(1)..=p.min(cells - 1)
}

fn validate(origin: DVec3, spacing: DVec3) -> Result<(), GridError> {
    if !origin.is_finite() {
        return Err(GridError::InvalidOrigin(origin.to_array()));
    }
    if !spacing.is_finite() || spacing.cmple(DVec3::ZERO).any() {
        return Err(GridError::InvalidSpacing(spacing.to_array()));
    }
    Ok(())
}

fn extent(origin: DVec3, spacing: DVec3, cell_dims: [usize; 3]) -> (DVec3, DVec3) {
    let dims = DVec3::new(
        cell_dims[0] as f64,
        cell_dims[1] as f64,
        cell_dims[2] as f64,
    );
    (origin, origin + dims * spacing)
}

/// A structured grid with explicit points and one point-centred scalar field.
///
/// Points are ordered x fastest, then y, then z.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableGrid {
    origin: DVec3,
    spacing: DVec3,
    cell_dims: [usize; 3],
    point_dims: [usize; 3],
    points: Vec<DVec3>,
    values: Vec<f64>,
}

impl RenderableGrid {
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    pub fn cell_dimensions(&self) -> [usize; 3] {
        self.cell_dims
    }

    /// Point counts per axis; all zero for a degenerate grid.
    pub fn point_dimensions(&self) -> [usize; 3] {
        self.point_dims
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn scalar_name(&self) -> &str {
        SCALAR_NAME
    }

    pub fn point_values(&self) -> &[f64] {
        &self.values
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn point_index(&self, i: usize, j: usize, k: usize) -> usize {
        let [pw, ph, pd] = self.point_dims;
        assert!(
            i < pw && j < ph && k < pd,
            "point ({i}, {j}, {k}) outside {pw}x{ph}x{pd} grid"
        );
        (k * ph + j) * pw + i
    }

    /// Position of grid point `(i, j, k)`.
    ///
    /// # Panics
    /// Panics if the point lies outside the grid.
    pub fn point(&self, i: usize, j: usize, k: usize) -> DVec3 {
        self.points[self.point_index(i, j, k)]
    }

    /// Scalar at grid point `(i, j, k)`.
    ///
    /// # Panics
    /// Panics if the point lies outside the grid.
    pub fn value(&self, i: usize, j: usize, k: usize) -> f64 {
        self.values[self.point_index(i, j, k)]
    }

    /// `origin .. origin + cell_dims * spacing`, defined even when degenerate.
    pub fn extent(&self) -> (DVec3, DVec3) {
        extent(self.origin, self.spacing, self.cell_dims)
    }

    /// Bounding box of the actual points.
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        let first = *self.points.first()?;
        Some(
            self.points
                .iter()
                .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
        )
    }

    /// Smallest and largest point value.
    pub fn scalar_range(&self) -> Option<(f64, f64)> {
        let first = *self.values.first()?;
        Some(
            self.values
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }
}

/// Convert an integrated volume into a renderable point grid.
pub fn volume_to_renderable(
    volume: Volume,
    origin: DVec3,
    spacing: DVec3,
) -> Result<RenderableGrid, GridError> {
    let dims = volume.dimensions();
    let grid = CellGrid::from_volume(volume, origin, spacing)?.into_point_grid();
    debug!(
        "Converted {:?} volume into {:?} point grid at {:?}",
        dims,
        grid.point_dimensions(),
        origin
    );
    Ok(grid)
}
