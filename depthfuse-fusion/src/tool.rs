//! The "Fuse Depth Maps" tool.
//!
//! A run is split in two, the way the host invokes tools: [`FuseDepthTool::execute`]
//! checks inputs and builds the integration algorithm from configuration,
//! then [`FuseDepthTool::run`] loads depth maps, integrates them and
//! publishes the resulting grid. [`FuseDepthTool::fuse`] does both.

use crate::algorithm::{AlgorithmRegistry, IntegrateDepthMaps, Integration};
use crate::camera::{CameraMap, DepthLookup};
use crate::cancel::CancelToken;
use crate::config::{ConfigBlock, ConfigLocator};
use crate::display::FusionDisplay;
use crate::error::{FailureKind, FusionError};
use depthfuse_data::{DepthMap, DepthMapReader, FrameId, RegionOfInterest, volume_to_renderable};
use glam::DVec3;
use tracing::{debug, info, warn};

/// Configuration resource read on every execution.
pub const CONFIG_RESOURCE: &str = "gui_integrate_depth_maps.conf";

/// Block of the configuration selecting the integration algorithm.
pub const ALGORITHM_BLOCK: &str = "integrate_depth_maps";

/// Where a fusion run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionState {
    Idle,
    ValidatingInputs,
    LoadingConfig,
    ConfiguringAlgorithm,
    CollectingInputs,
    Integrating,
    Publishing,
    Done,
    Failed(FailureKind),
    Cancelled,
}

/// Inputs the host hands to the tool. Either collection may be absent.
#[derive(Debug, Clone, Copy)]
pub struct FusionInputs<'a> {
    pub cameras: Option<&'a CameraMap>,
    pub depth_lookup: Option<&'a DepthLookup>,
    pub roi: RegionOfInterest,
}

impl<'a> FusionInputs<'a> {
    pub fn new(
        cameras: &'a CameraMap,
        depth_lookup: &'a DepthLookup,
        roi: RegionOfInterest,
    ) -> Self {
        Self {
            cameras: Some(cameras),
            depth_lookup: Some(depth_lookup),
            roi,
        }
    }

    fn available(&self) -> Result<(&'a CameraMap, &'a DepthLookup), FusionError> {
        match (self.cameras, self.depth_lookup) {
            (Some(cameras), Some(depths)) if !cameras.is_empty() && !depths.is_empty() => {
                Ok((cameras, depths))
            }
            (cameras, _) if cameras.is_none_or(|c| c.is_empty()) => {
                Err(FusionError::InsufficientData("no cameras available".into()))
            }
            _ => Err(FusionError::InsufficientData("no depth maps available".into())),
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionSummary {
    /// Frames whose depth map and camera were integrated, in order.
    pub frames: Vec<FrameId>,
    /// Frames with a depth map but no camera.
    pub skipped: Vec<FrameId>,
    /// Cell dimensions of the integrated volume.
    pub volume_dimensions: [usize; 3],
    pub spacing: DVec3,
    /// Points in the published grid.
    pub point_count: usize,
}

/// Split the depth lookup into frames that have a camera and frames that
/// do not, both in frame order.
pub fn matching_frames(
    cameras: &CameraMap,
    depth_lookup: &DepthLookup,
) -> (Vec<FrameId>, Vec<FrameId>) {
    depth_lookup
        .keys()
        .copied()
        .partition(|frame| cameras.contains_key(frame))
}

/// Fuses all depth maps into one volume.
pub struct FuseDepthTool {
    registry: AlgorithmRegistry,
    locator: ConfigLocator,
    ambient: ConfigBlock,
    reader: DepthMapReader,
    algorithm: Option<Box<dyn IntegrateDepthMaps>>,
    state: FusionState,
}

impl std::fmt::Debug for FuseDepthTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuseDepthTool")
            .field("registry", &self.registry)
            .field("locator", &self.locator)
            .field("configured", &self.algorithm.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl FuseDepthTool {
    pub fn new(registry: AlgorithmRegistry, locator: ConfigLocator) -> Self {
        Self {
            registry,
            locator,
            ambient: ConfigBlock::new(),
            reader: DepthMapReader::new(),
            algorithm: None,
            state: FusionState::Idle,
        }
    }

    /// Host configuration merged over the configuration resource. Values
    /// here win on conflicting keys.
    pub fn with_ambient_config(mut self, ambient: ConfigBlock) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn with_depth_reader(mut self, reader: DepthMapReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn state(&self) -> FusionState {
        self.state
    }

    /// Returns true once `execute` has built an algorithm.
    pub fn is_configured(&self) -> bool {
        self.algorithm.is_some()
    }

    fn fail<T>(&mut self, err: FusionError) -> Result<T, FusionError> {
        match err.kind() {
            Some(kind) => self.state = FusionState::Failed(kind),
            None if matches!(err, FusionError::Cancelled) => self.state = FusionState::Cancelled,
            None => {}
        }
        warn!("Depth fusion stopped: {}", err);
        Err(err)
    }

    /// Check inputs, load configuration and build the integration algorithm.
    ///
    /// Nothing is constructed if the inputs or configuration are unusable.
    #[tracing::instrument(skip_all)]
    pub fn execute(&mut self, inputs: &FusionInputs<'_>) -> Result<(), FusionError> {
        self.algorithm = None;

        self.state = FusionState::ValidatingInputs;
        if let Err(err) = inputs.available() {
            return self.fail(err);
        }

        self.state = FusionState::LoadingConfig;
        let mut config = match self.locator.read(CONFIG_RESOURCE) {
            Ok(config) => config,
            Err(err) => return self.fail(err.into()),
        };
        config.merge(&self.ambient);

        self.state = FusionState::ConfiguringAlgorithm;
        if let Err(err) = self.registry.check_nested(ALGORITHM_BLOCK, &config) {
            return self.fail(err.into());
        }
        match self.registry.create_nested(ALGORITHM_BLOCK, &config) {
            Ok(algorithm) => self.algorithm = Some(algorithm),
            Err(err) => return self.fail(err.into()),
        }

        debug!("Depth fusion configured");
        Ok(())
    }

    /// Load depth maps, integrate them and publish the grid to `display`.
    ///
    /// `cancel` is checked before each depth map load and before
    /// integration.
    #[tracing::instrument(skip_all)]
    pub fn run(
        &mut self,
        inputs: &FusionInputs<'_>,
        display: &mut dyn FusionDisplay,
        cancel: &CancelToken,
    ) -> Result<FusionSummary, FusionError> {
        let Some(algorithm) = self.algorithm.take() else {
            return self.fail(FusionError::NotConfigured);
        };
        let result = self.run_with(algorithm.as_ref(), inputs, display, cancel);
        self.algorithm = Some(algorithm);
        result
    }

    /// `execute` followed by `run`.
    pub fn fuse(
        &mut self,
        inputs: &FusionInputs<'_>,
        display: &mut dyn FusionDisplay,
        cancel: &CancelToken,
    ) -> Result<FusionSummary, FusionError> {
        self.execute(inputs)?;
        self.run(inputs, display, cancel)
    }

    fn run_with(
        &mut self,
        algorithm: &dyn IntegrateDepthMaps,
        inputs: &FusionInputs<'_>,
        display: &mut dyn FusionDisplay,
        cancel: &CancelToken,
    ) -> Result<FusionSummary, FusionError> {
        let (cameras, depth_lookup) = match inputs.available() {
            Ok(available) => available,
            Err(err) => return self.fail(err),
        };

        self.state = FusionState::CollectingInputs;
        let (frames, skipped) = matching_frames(cameras, depth_lookup);
        if !skipped.is_empty() {
            debug!("Skipping {} frames without a camera: {:?}", skipped.len(), skipped);
        }

        let mut depth_maps = Vec::with_capacity(frames.len());
        let mut frame_cameras = Vec::with_capacity(frames.len());
        for &frame in &frames {
            if cancel.is_cancelled() {
                return self.fail(FusionError::Cancelled);
            }
            let path = &depth_lookup[&frame];
            let image = match self.reader.load(path) {
                Ok(image) => image,
                Err(source) => {
                    return self.fail(FusionError::Decode {
                        frame,
                        path: path.clone(),
                        source,
                    });
                }
            };
            depth_maps.push(DepthMap::new(frame, path.clone(), image));
            frame_cameras.push(cameras[&frame].clone());
        }

        if cancel.is_cancelled() {
            return self.fail(FusionError::Cancelled);
        }
        if depth_maps.is_empty() {
            warn!("No frame has both a camera and a depth map; integrating nothing");
        }

        self.state = FusionState::Integrating;
        let roi = inputs.roi;
        let integration = algorithm.integrate(roi.min(), roi.max(), &depth_maps, &frame_cameras);
        drop(depth_maps);
        let Integration { volume, spacing } = match integration {
            Ok(integration) => integration,
            Err(err) => return self.fail(err.into()),
        };
        let volume_dimensions = volume.dimensions();
        info!(
            "Integrated {} depth maps into {:?} volume at {:?} (spacing {:?})",
            frames.len(),
            volume_dimensions,
            roi.min(),
            spacing
        );

        self.state = FusionState::Publishing;
        let grid = match volume_to_renderable(volume, roi.min(), spacing) {
            Ok(grid) => grid,
            Err(err) => return self.fail(err.into()),
        };
        let point_count = grid.point_count();
        if let Err(err) = display.update_fusion(grid) {
            return self.fail(err.into());
        }

        self.state = FusionState::Done;
        Ok(FusionSummary {
            frames,
            skipped,
            volume_dimensions,
            spacing,
            point_count,
        })
    }
}
