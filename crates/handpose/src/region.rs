//! Hand regions of interest.

use handpose_image::rect::Rect;
use nalgebra::Point2;

use crate::rotation::compute_rotation;

/// Number of palm landmarks attached to a [`HandRegion`].
pub const PALM_LANDMARK_COUNT: usize = 7;

/// Index of the palm base within [`HandRegion::palm_landmarks`].
pub const PALM_BASE: usize = 0;

/// Index of the middle finger base within [`HandRegion::palm_landmarks`].
pub const MIDDLE_FINGER_BASE: usize = 2;

/// An axis-aligned box around a hand, optionally carrying the 7 palm landmarks it was derived
/// from.
///
/// The box geometry operations ([`HandRegion::shift_rel`], [`HandRegion::squarify`],
/// [`HandRegion::scale`]) only change the box and keep the palm landmarks as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct HandRegion {
    rect: Rect,
    palm_landmarks: Option<[Point2<f64>; PALM_LANDMARK_COUNT]>,
}

impl HandRegion {
    /// Creates a region without palm landmarks.
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            rect,
            palm_landmarks: None,
        }
    }

    pub fn with_palm_landmarks(
        rect: Rect,
        palm_landmarks: [Point2<f64>; PALM_LANDMARK_COUNT],
    ) -> Self {
        Self {
            rect,
            palm_landmarks: Some(palm_landmarks),
        }
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    #[inline]
    pub fn palm_landmarks(&self) -> Option<&[Point2<f64>; PALM_LANDMARK_COUNT]> {
        self.palm_landmarks.as_ref()
    }

    pub fn palm_base(&self) -> Option<Point2<f64>> {
        self.palm_landmarks.map(|lms| lms[PALM_BASE])
    }

    pub fn middle_finger_base(&self) -> Option<Point2<f64>> {
        self.palm_landmarks.map(|lms| lms[MIDDLE_FINGER_BASE])
    }

    /// Computes the rotation that turns this hand upright, from palm base to middle finger base.
    ///
    /// Regions without palm landmarks are considered upright and return `0.0`.
    pub fn alignment_angle(&self) -> f64 {
        match (self.palm_base(), self.middle_finger_base()) {
            (Some(base), Some(finger)) => compute_rotation(base, finger),
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn shift_rel(&self, factor: [f64; 2]) -> Self {
        self.map_rect(|r| r.shift_rel(factor))
    }

    #[must_use]
    pub fn squarify(&self) -> Self {
        self.map_rect(|r| r.squarify())
    }

    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        self.map_rect(|r| r.scale(factor))
    }

    fn map_rect(&self, f: impl FnOnce(&Rect) -> Rect) -> Self {
        Self {
            rect: f(&self.rect),
            palm_landmarks: self.palm_landmarks,
        }
    }
}

impl From<Rect> for HandRegion {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn palm() -> [Point2<f64>; PALM_LANDMARK_COUNT] {
        [
            [50.0, 100.0],
            [30.0, 60.0],
            [50.0, 50.0],
            [60.0, 55.0],
            [70.0, 60.0],
            [35.0, 90.0],
            [30.0, 80.0],
        ]
        .map(Point2::from)
    }

    #[test]
    fn geometry_keeps_palm() {
        let rect = Rect::from_corners([0.0, 0.0], [10.0, 20.0]);
        let region = HandRegion::with_palm_landmarks(rect, palm());
        let moved = region.shift_rel([0.0, -0.5]).squarify().scale(2.0);
        assert_eq!(moved.palm_landmarks(), Some(&palm()));
        assert_eq!(moved.rect(), Rect::from_center(5.0, 0.0, 40.0, 40.0));
        // Original is untouched.
        assert_eq!(region.rect(), Rect::from_corners([0.0, 0.0], [10.0, 20.0]));
    }

    #[test]
    fn alignment() {
        // Middle finger base straight above the palm base.
        let region =
            HandRegion::with_palm_landmarks(Rect::from_center(0.0, 0.0, 1.0, 1.0), palm());
        assert_abs_diff_eq!(region.alignment_angle(), 0.0);
        assert_eq!(region.palm_base(), Some(Point2::new(50.0, 100.0)));
        assert_eq!(region.middle_finger_base(), Some(Point2::new(50.0, 50.0)));

        let bare = HandRegion::from_rect(Rect::from_center(0.0, 0.0, 1.0, 1.0));
        assert_eq!(bare.alignment_angle(), 0.0);
        assert_eq!(bare.palm_base(), None);
    }
}
