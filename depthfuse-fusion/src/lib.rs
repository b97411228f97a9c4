//! Depthfuse Fusion Crate
//!
//! Orchestrates fusing per-frame depth maps into one volumetric
//! reconstruction. The integration algorithm itself is pluggable and lives
//! outside this crate.
//!
//! ## Modules
//!
//! - [`tool`]: the fusion run and its state machine
//! - [`algorithm`]: the integration capability and its registry
//! - [`config`]: hierarchical configuration loading and merging
//! - [`camera`]: perspective cameras and per-frame lookups
//! - [`display`]: sinks for published results
//! - [`cancel`]: cooperative cancellation

pub mod algorithm;
pub mod camera;
pub mod cancel;
pub mod config;
pub mod display;
pub mod error;
pub mod tool;

pub use algorithm::{
    AlgorithmRegistry, IntegrateDepthMaps, Integration, IntegrationError, IntegrationFactory,
};
pub use camera::{CameraMap, DepthLookup, PerspectiveCamera};
pub use cancel::CancelToken;
pub use config::{ConfigBlock, ConfigError, ConfigLocator};
pub use display::{FusionDisplay, LatestFusion, PublishError, VtsExport};
pub use error::{FailureKind, FusionError};
pub use tool::{
    ALGORITHM_BLOCK, CONFIG_RESOURCE, FuseDepthTool, FusionInputs, FusionState, FusionSummary,
    matching_frames,
};
