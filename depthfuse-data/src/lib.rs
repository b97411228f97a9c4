//! Depthfuse Data Crate
//!
//! Data types and file formats for depth map fusion: per-frame depth maps
//! stored as VTK image data, integrated voxel volumes, and the structured
//! grids handed to the display layer. This crate is GUI-agnostic and knows
//! nothing about cameras or integration algorithms.

mod binary;
pub mod depth_map;
pub mod grid;
pub mod grid_io;
pub mod types;
mod vtk;

pub use binary::BinaryError;
pub use depth_map::{
    ArrayEncoding, DEPTHS_ARRAY, DecodeError, DepthMapReader, DepthMapWriter, EncodeError,
    RowOrder, load_depth_map, save_depth_map,
};
pub use grid::{CellGrid, GridError, RenderableGrid, SCALAR_NAME, volume_to_renderable};
pub use grid_io::{encode_structured_grid, save_structured_grid};
pub use types::{DepthImage, DepthMap, FrameId, RegionOfInterest, RoiError, ShapeError, Volume};
