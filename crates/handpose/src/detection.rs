//! Common functionality for SSD-style object detectors.
//!
//! The palm detector decodes its raw network output into [`Detection`]s relative to the anchors
//! computed by [`ssd::Anchors`], then filters duplicates with [`nms::NonMaxSuppression`].

pub mod nms;
pub mod ssd;

use handpose_image::rect::Rect;
use nalgebra::{Point2, Vector2};

/// A detected object.
///
/// A [`Detection`] consists of a [`Rect`] enclosing the detected object, a confidence value
/// between 0.0 and 1.0, and a possibly empty set of located keypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    confidence: f32,
    rect: Rect,
    keypoints: Vec<Point2<f64>>,
}

impl Detection {
    pub fn new(confidence: f32, rect: Rect) -> Self {
        Self {
            confidence,
            rect,
            keypoints: Vec::new(),
        }
    }

    pub fn with_keypoints(confidence: f32, rect: Rect, keypoints: Vec<Point2<f64>>) -> Self {
        Self {
            confidence,
            rect,
            keypoints,
        }
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the axis-aligned bounding rectangle containing the detected object.
    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    pub fn keypoints(&self) -> &[Point2<f64>] {
        &self.keypoints
    }

    /// Scales the rectangle and all keypoints component-wise by `factor`, relative to the origin.
    ///
    /// This is used to map detections from the network's input resolution back to the frame.
    #[must_use]
    pub fn scaled(&self, factor: Vector2<f64>) -> Self {
        let scale = |p: Point2<f64>| Point2::from(p.coords.component_mul(&factor));
        Self {
            confidence: self.confidence,
            rect: Rect::from_corners(scale(self.rect.start()), scale(self.rect.end())),
            keypoints: self.keypoints.iter().copied().map(scale).collect(),
        }
    }
}
