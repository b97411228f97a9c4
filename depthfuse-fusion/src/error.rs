//! Error types for fusion runs.

use crate::algorithm::IntegrationError;
use crate::config::ConfigError;
use crate::display::PublishError;
use depthfuse_data::{DecodeError, FrameId, GridError};
use std::path::PathBuf;
use thiserror::Error;

/// Broad category of a failed run, recorded in the tool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InsufficientData,
    Configuration,
    Decode,
    Integration,
    Publish,
}

/// Errors that end a fusion run.
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("failed to load depth map for frame {frame} from {}: {source}", path.display())]
    Decode {
        frame: FrameId,
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("depth integration failed: {0}")]
    Integration(#[from] IntegrationError),

    #[error("integration produced an unusable volume: {0}")]
    Grid(#[from] GridError),

    #[error("failed to publish fusion result: {0}")]
    Publish(#[from] PublishError),

    #[error("fusion run cancelled")]
    Cancelled,

    #[error("no integration algorithm configured")]
    NotConfigured,
}

impl FusionError {
    /// Category for state tracking; `None` for cancellation and misuse.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            FusionError::InsufficientData(_) => Some(FailureKind::InsufficientData),
            FusionError::Configuration(_) => Some(FailureKind::Configuration),
            FusionError::Decode { .. } => Some(FailureKind::Decode),
            FusionError::Integration(_) | FusionError::Grid(_) => Some(FailureKind::Integration),
            FusionError::Publish(_) => Some(FailureKind::Publish),
            FusionError::Cancelled | FusionError::NotConfigured => None,
        }
    }

    /// Returns true for failures that are expected and blocking: they are
    /// raised before any work starts and have no side effects.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            FusionError::InsufficientData(_) | FusionError::Configuration(_)
        )
    }

    /// Dialog title for this error.
    pub fn title(&self) -> &'static str {
        match self {
            FusionError::InsufficientData(_) => "Insufficient data",
            FusionError::Configuration(_) => "Configuration error",
            FusionError::Decode { .. } => "Depth map error",
            FusionError::Integration(_) | FusionError::Grid(_) => "Fusion error",
            FusionError::Publish(_) => "Display error",
            FusionError::Cancelled => "Cancelled",
            FusionError::NotConfigured => "Fusion error",
        }
    }

    /// Dialog text for this error.
    pub fn user_message(&self) -> String {
        match self {
            FusionError::InsufficientData(_) => {
                "This operation requires cameras and depth maps.".to_string()
            }
            FusionError::Configuration(ConfigError::NotFound { .. }) => {
                "No configuration data was found. Please check your installation.".to_string()
            }
            FusionError::Configuration(_) => {
                "An error was found in the integrate_depth_maps configuration.".to_string()
            }
            other => other.to_string(),
        }
    }
}
