//! The pluggable depth integration capability and its registry.
//!
//! Integration algorithms live outside this crate. A host registers an
//! [`IntegrationFactory`] per algorithm; the configuration then names which
//! one to build:
//!
//! ```toml
//! [integrate_depth_maps]
//! type = "my_algorithm"
//!
//! [integrate_depth_maps.my_algorithm]
//! voxel_count = 200
//! ```

use crate::camera::PerspectiveCamera;
use crate::config::{ConfigBlock, ConfigError};
use depthfuse_data::{DepthMap, ShapeError, Volume};
use glam::DVec3;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Key naming the algorithm inside a nested block.
pub const TYPE_KEY: &str = "type";

/// Output of one integration: the voxel volume and its per-axis spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct Integration {
    pub volume: Volume,
    pub spacing: DVec3,
}

/// Failures inside an integration algorithm.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("invalid output volume: {0}")]
    Volume(#[from] ShapeError),

    #[error("{0}")]
    Failed(String),
}

/// Integrates depth maps seen by known cameras into a voxel volume.
///
/// `depth_maps[i]` was observed by `cameras[i]`. The volume spans
/// `min..max`; its resolution is the algorithm's choice. Given no depth
/// maps, implementations return an empty volume rather than an error.
pub trait IntegrateDepthMaps {
    fn integrate(
        &self,
        min: DVec3,
        max: DVec3,
        depth_maps: &[DepthMap],
        cameras: &[PerspectiveCamera],
    ) -> Result<Integration, IntegrationError>;
}

/// Validates configuration for, and constructs, one integration algorithm.
pub trait IntegrationFactory {
    /// Name used as the `type` value in configuration.
    fn name(&self) -> &str;

    /// Check the algorithm's own block without building anything.
    fn check_config(&self, config: &ConfigBlock) -> Result<(), ConfigError>;

    /// Build the algorithm from its (already checked) block.
    fn create(&self, config: &ConfigBlock) -> Result<Box<dyn IntegrateDepthMaps>, ConfigError>;
}

/// Integration factories keyed by name.
#[derive(Default)]
pub struct AlgorithmRegistry {
    factories: BTreeMap<String, Box<dyn IntegrationFactory>>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, returning any factory it replaced.
    pub fn register(
        &mut self,
        factory: Box<dyn IntegrationFactory>,
    ) -> Option<Box<dyn IntegrationFactory>> {
        let name = factory.name().to_string();
        debug!("Registering integration algorithm '{}'", name);
        self.factories.insert(name, factory)
    }

    pub fn with(mut self, factory: Box<dyn IntegrationFactory>) -> Self {
        self.register(factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Resolve the factory and algorithm block selected under `block`.
    fn resolve(
        &self,
        block: &str,
        config: &ConfigBlock,
    ) -> Result<(&dyn IntegrationFactory, ConfigBlock), ConfigError> {
        let type_key = format!("{block}.{TYPE_KEY}");
        let name: String = config.get(&type_key)?;
        let factory = self
            .factories
            .get(&name)
            .ok_or_else(|| ConfigError::UnknownAlgorithm {
                block: block.to_string(),
                name: name.clone(),
                available: self.names(),
            })?;
        Ok((factory.as_ref(), config.subblock(&format!("{block}.{name}"))))
    }

    /// Check that `block` names a registered algorithm whose own
    /// configuration is valid.
    pub fn check_nested(&self, block: &str, config: &ConfigBlock) -> Result<(), ConfigError> {
        let (factory, algo_config) = self.resolve(block, config)?;
        factory.check_config(&algo_config)
    }

    /// Build the algorithm selected under `block`.
    pub fn create_nested(
        &self,
        block: &str,
        config: &ConfigBlock,
    ) -> Result<Box<dyn IntegrateDepthMaps>, ConfigError> {
        let (factory, algo_config) = self.resolve(block, config)?;
        debug!("Creating integration algorithm '{}'", factory.name());
        factory.create(&algo_config)
    }
}

impl std::fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("factories", &self.names())
            .finish()
    }
}
