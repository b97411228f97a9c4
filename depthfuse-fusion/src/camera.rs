//! Perspective cameras and the per-frame lookups fed to fusion.

use depthfuse_data::FrameId;
use glam::{DQuat, DVec2, DVec3};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Cameras keyed by the frame they observed.
pub type CameraMap = BTreeMap<FrameId, PerspectiveCamera>;

/// Depth map files keyed by frame.
pub type DepthLookup = BTreeMap<FrameId, PathBuf>;

/// A pinhole camera with a world pose.
///
/// `rotation` maps world directions into the camera frame, in which the
/// camera looks down +Z with +Y pointing down the image.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Focal length in pixels (fx, fy).
    pub focal: DVec2,
    /// Principal point in pixels.
    pub principal_point: DVec2,
    /// Image size in pixels (width, height).
    pub image_size: (u32, u32),
    /// World-to-camera rotation.
    pub rotation: DQuat,
    /// Camera center in world space.
    pub center: DVec3,
}

impl PerspectiveCamera {
    /// Create a camera at the world origin looking down +Z.
    pub fn new(focal: DVec2, principal_point: DVec2, image_size: (u32, u32)) -> Self {
        Self {
            focal,
            principal_point,
            image_size,
            rotation: DQuat::IDENTITY,
            center: DVec3::ZERO,
        }
    }

    /// Set the camera pose.
    pub fn with_pose(mut self, rotation: DQuat, center: DVec3) -> Self {
        self.rotation = rotation;
        self.center = center;
        self
    }

    /// Transform a world point into camera coordinates.
    pub fn to_camera(&self, world: DVec3) -> DVec3 {
        self.rotation * (world - self.center)
    }

    /// Distance of `world` along the optical axis.
    pub fn depth(&self, world: DVec3) -> f64 {
        self.to_camera(world).z
    }

    /// Project a world point to pixel coordinates.
    ///
    /// Returns `None` for points on or behind the image plane.
    pub fn project(&self, world: DVec3) -> Option<DVec2> {
        let p = self.to_camera(world);
        if p.z <= 0.0 {
            return None;
        }
        Some(DVec2::new(p.x / p.z, p.y / p.z) * self.focal + self.principal_point)
    }

    /// Returns true if `pixel` falls inside the image.
    pub fn in_image(&self, pixel: DVec2) -> bool {
        let (w, h) = self.image_size;
        pixel.x >= 0.0 && pixel.y >= 0.0 && pixel.x < w as f64 && pixel.y < h as f64
    }
}
