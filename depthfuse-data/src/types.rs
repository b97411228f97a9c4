//! Core data types for depth maps, voxel volumes and regions of interest.
//!
//! These are CPU-side representations shared by the codecs in this crate and
//! the fusion orchestration in depthfuse-fusion.

use glam::DVec3;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Identifier of a video frame.
pub type FrameId = i64;

/// A sample buffer did not match the dimensions it was paired with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected {expected} samples for dimensions {dims:?}, got {actual}")]
pub struct ShapeError {
    pub dims: Vec<usize>,
    pub expected: usize,
    pub actual: usize,
}

/// Errors building a [`RegionOfInterest`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoiError {
    #[error("region of interest has a non-finite corner")]
    NonFinite,

    #[error("region of interest is inverted on axis {axis}: min {min} > max {max}")]
    Inverted { axis: usize, min: f64, max: f64 },
}

/// A single-channel 2-D image of 8-byte floating point depths.
///
/// Samples are stored row-major: row 0 first, column-minor within a row.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl DepthImage {
    /// Create a zero-filled image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Wrap an existing row-major sample buffer.
    pub fn from_vec(width: usize, height: usize, data: Vec<f64>) -> Result<Self, ShapeError> {
        let expected = width.saturating_mul(height);
        if data.len() != expected {
            return Err(ShapeError {
                dims: vec![width, height],
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns true if the image holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Depth at column `x`, row `y`.
    ///
    /// # Panics
    /// Panics if `(x, y)` lies outside the image.
    pub fn at(&self, x: usize, y: usize) -> f64 {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} image",
            self.width,
            self.height
        );
        self.data[y * self.width + x]
    }

    /// Depth at column `x`, row `y`, or `None` outside the image.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        (x < self.width && y < self.height).then(|| self.data[y * self.width + x])
    }

    /// Set the depth at column `x`, row `y`.
    ///
    /// # Panics
    /// Panics if `(x, y)` lies outside the image.
    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} image",
            self.width,
            self.height
        );
        self.data[y * self.width + x] = value;
    }

    /// Samples of row `y`.
    pub fn row(&self, y: usize) -> &[f64] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Smallest and largest finite depth, or `None` if there is none.
    pub fn depth_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .fold(None, |acc, d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
    }
}

/// A depth image tied to the frame and file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    frame: FrameId,
    path: PathBuf,
    image: DepthImage,
}

impl DepthMap {
    pub fn new(frame: FrameId, path: impl Into<PathBuf>, image: DepthImage) -> Self {
        Self {
            frame,
            path: path.into(),
            image,
        }
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &DepthImage {
        &self.image
    }
}

/// A 3-D grid of scalar voxels produced by depth integration.
///
/// Voxel `(i, j, k)` lives at linear index `(k * height + j) * width + i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    width: usize,
    height: usize,
    depth: usize,
    data: Vec<f64>,
}

impl Volume {
    /// Create a zero-filled volume.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
            data: vec![0.0; width * height * depth],
        }
    }

    /// A volume with no voxels.
    pub fn empty() -> Self {
        Self::new(0, 0, 0)
    }

    /// Wrap an existing voxel buffer laid out depth-major, column-minor.
    pub fn from_vec(
        width: usize,
        height: usize,
        depth: usize,
        data: Vec<f64>,
    ) -> Result<Self, ShapeError> {
        let expected = width.saturating_mul(height).saturating_mul(depth);
        if data.len() != expected {
            return Err(ShapeError {
                dims: vec![width, height, depth],
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            depth,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// `[width, height, depth]`.
    pub fn dimensions(&self) -> [usize; 3] {
        [self.width, self.height, self.depth]
    }

    /// Returns true if any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear index of voxel `(i, j, k)`.
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.height + j) * self.width + i
    }

    /// Value of voxel `(i, j, k)`.
    ///
    /// # Panics
    /// Panics if the voxel lies outside the volume.
    pub fn at(&self, i: usize, j: usize, k: usize) -> f64 {
        assert!(
            i < self.width && j < self.height && k < self.depth,
            "voxel ({i}, {j}, {k}) outside {}x{}x{} volume",
            self.width,
            self.height,
            self.depth
        );
        self.data[self.index(i, j, k)]
    }

    /// Set voxel `(i, j, k)`.
    ///
    /// # Panics
    /// Panics if the voxel lies outside the volume.
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        assert!(
            i < self.width && j < self.height && k < self.depth,
            "voxel ({i}, {j}, {k}) outside {}x{}x{} volume",
            self.width,
            self.height,
            self.depth
        );
        let idx = self.index(i, j, k);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Give up the voxel buffer, in linear index order.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}

/// Axis-aligned box limiting the reconstructed volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionOfInterest {
    min: DVec3,
    max: DVec3,
}

impl RegionOfInterest {
    /// Create a region from its minimum and maximum corners.
    ///
    /// A flat region (`min == max` on some axis) is allowed.
    pub fn new(min: DVec3, max: DVec3) -> Result<Self, RoiError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(RoiError::NonFinite);
        }
        for axis in 0..3 {
            if min[axis] > max[axis] {
                return Err(RoiError::Inverted {
                    axis,
                    min: min[axis],
                    max: max[axis],
                });
            }
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> DVec3 {
        self.min
    }

    pub fn max(&self) -> DVec3 {
        self.max
    }
}
