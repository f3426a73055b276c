//! Hand landmark prediction.

use std::ops::{Deref, DerefMut};

use handpose_image::rect::Rect;
use nalgebra::{Point2, Point3};
use ndarray::Array4;

use crate::{landmark::Landmarks, nn::packed_convolution_override, rotation::compute_rotation};

/// Number of landmarks estimated per hand.
pub const NUM_LANDMARKS: usize = 21;

/// Number of raw coordinate values the landmark network outputs (`x, y, z` per landmark).
pub const NUM_KEYPOINT_VALUES: usize = NUM_LANDMARKS * 3;

/// Raw output of a [`LandmarkNetwork`].
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkOutput {
    /// Confidence that a hand is present in the input.
    pub confidence: f32,
    /// Flattened `x, y, z` coordinates of all landmarks, in the input image's pixel space.
    pub keypoints: Vec<f32>,
}

/// A hand landmark network.
pub trait LandmarkNetwork {
    /// Runs the network on a crop of the hand.
    ///
    /// `input` has shape `[1, height, width, 3]` with color values mapped to `[0, 1]`. The output
    /// has to contain [`NUM_KEYPOINT_VALUES`] keypoint values.
    fn predict(&mut self, input: Array4<f32>) -> anyhow::Result<LandmarkOutput>;

    /// Returns whether this network can toggle packed convolutions.
    ///
    /// Packed convolutions are faster on some backends but produce inaccurate depthwise
    /// convolution results on others, so the pipeline disables them while the landmark network
    /// runs (unless `HANDPOSE_PACKED_CONV` says otherwise).
    fn supports_packed_convolution(&self) -> bool {
        false
    }

    fn packed_convolution(&self) -> bool {
        false
    }

    fn set_packed_convolution(&mut self, _enabled: bool) {}
}

impl<L: LandmarkNetwork + ?Sized> LandmarkNetwork for &mut L {
    fn predict(&mut self, input: Array4<f32>) -> anyhow::Result<LandmarkOutput> {
        (**self).predict(input)
    }

    fn supports_packed_convolution(&self) -> bool {
        (**self).supports_packed_convolution()
    }

    fn packed_convolution(&self) -> bool {
        (**self).packed_convolution()
    }

    fn set_packed_convolution(&mut self, enabled: bool) {
        (**self).set_packed_convolution(enabled)
    }
}

/// Scoped packed convolution setting of a [`LandmarkNetwork`].
///
/// The previous setting is restored when this guard is dropped.
pub struct PackedConvolutionGuard<'a, L: LandmarkNetwork + ?Sized> {
    network: &'a mut L,
    previous: Option<bool>,
}

impl<'a, L: LandmarkNetwork + ?Sized> PackedConvolutionGuard<'a, L> {
    /// Sets the packed convolution setting of `network` to `enabled` for the lifetime of the guard.
    ///
    /// Does nothing if the network doesn't support packed convolutions.
    pub fn new(network: &'a mut L, enabled: bool) -> Self {
        let previous = if network.supports_packed_convolution() {
            let previous = network.packed_convolution();
            network.set_packed_convolution(enabled);
            Some(previous)
        } else {
            None
        };
        Self { network, previous }
    }

    /// Applies the setting used while running the landmark network.
    ///
    /// Packed convolutions are turned off unless `HANDPOSE_PACKED_CONV` overrides this.
    pub fn for_landmarks(network: &'a mut L) -> Self {
        Self::new(network, packed_convolution_override().unwrap_or(false))
    }
}

impl<L: LandmarkNetwork + ?Sized> Deref for PackedConvolutionGuard<'_, L> {
    type Target = L;

    fn deref(&self) -> &L {
        &*self.network
    }
}

impl<L: LandmarkNetwork + ?Sized> DerefMut for PackedConvolutionGuard<'_, L> {
    fn deref_mut(&mut self) -> &mut L {
        &mut *self.network
    }
}

impl<L: LandmarkNetwork + ?Sized> Drop for PackedConvolutionGuard<'_, L> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous {
            self.network.set_packed_convolution(previous);
        }
    }
}

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// The landmarks used to derive the palm of a tracked hand region, in palm landmark order.
///
/// Entry 0 is the palm base, entry 2 the middle finger base.
pub const PALM_LANDMARKS: [LandmarkIdx; 7] = {
    use LandmarkIdx::*;
    [
        Wrist,
        IndexFingerMcp,
        MiddleFingerMcp,
        RingFingerMcp,
        PinkyMcp,
        ThumbCmc,
        ThumbMcp,
    ]
};

/// A hand found by the pipeline.
#[derive(Debug, Clone)]
pub struct HandEstimate {
    landmarks: Landmarks,
    confidence: f32,
    rect: Rect,
}

impl HandEstimate {
    pub(crate) fn new(landmarks: Landmarks, confidence: f32, rect: Rect) -> Self {
        assert_eq!(landmarks.len(), NUM_LANDMARKS);
        Self {
            landmarks,
            confidence,
            rect,
        }
    }

    /// Returns the 21 landmarks in the frame's coordinate system.
    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    pub fn landmark(&self, idx: LandmarkIdx) -> Point3<f64> {
        self.landmarks.get(idx as usize)
    }

    /// Returns the confidence value reported by the landmark network.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the hand box that will be tracked in the next frame.
    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    pub fn top_left(&self) -> Point2<f64> {
        self.rect.start()
    }

    pub fn bottom_right(&self) -> Point2<f64> {
        self.rect.end()
    }

    /// Returns an iterator over the landmarks that surround the palm.
    pub fn palm_landmarks(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        PALM_LANDMARKS.into_iter().map(|idx| self.landmark(idx))
    }

    /// Computes the center position of the hand's palm by averaging the palm landmarks.
    pub fn palm_center(&self) -> Point3<f64> {
        let sum = self
            .palm_landmarks()
            .fold(Point3::origin(), |acc, p| acc + p.coords);
        sum / PALM_LANDMARKS.len() as f64
    }

    /// Computes the clockwise rotation of the palm compared to an upright position.
    ///
    /// A rotation of 0° means that fingers are pointed upwards.
    pub fn rotation_radians(&self) -> f64 {
        compute_rotation(
            self.landmark(LandmarkIdx::Wrist).xy(),
            self.landmark(LandmarkIdx::MiddleFingerMcp).xy(),
        )
    }
}
