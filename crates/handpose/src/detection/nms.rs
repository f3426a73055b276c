//! Non-Maximum Suppression.
//!
//! Typical Single-Shot MultiBox Detectors (SSD) produce duplicate detections for individual
//! objects. Non-Maximum Suppression (NMS) filters these duplicates out, leaving only the
//! detection with the highest confidence for each object.

use crate::num::TotalF32;

use super::Detection;

/// A non-maximum suppression algorithm.
#[derive(Debug, Clone)]
pub struct NonMaxSuppression {
    iou_thresh: f64,
    max_outputs: usize,
}

impl NonMaxSuppression {
    /// The default intersection-over-union threshold used to determine if two detections overlap.
    pub const DEFAULT_IOU_THRESH: f64 = 0.3;

    /// Creates a new non-maximum suppressor with the default IOU threshold and no limit on the
    /// number of returned detections.
    pub fn new() -> Self {
        Self {
            iou_thresh: Self::DEFAULT_IOU_THRESH,
            max_outputs: usize::MAX,
        }
    }

    /// Sets the intersection-over-union threshold to consider two detections as overlapping.
    ///
    /// By default, [`Self::DEFAULT_IOU_THRESH`] is used.
    pub fn set_iou_thresh(&mut self, iou_thresh: f64) {
        self.iou_thresh = iou_thresh;
    }

    /// Limits the number of detections returned by [`NonMaxSuppression::process`].
    pub fn set_max_outputs(&mut self, max_outputs: usize) {
        self.max_outputs = max_outputs;
    }

    /// Performs non-maximum suppression on `detections`.
    ///
    /// The surviving detections are returned in order of descending confidence. `detections` is
    /// consumed in the process.
    pub fn process(&self, detections: &mut Vec<Detection>) -> Vec<Detection> {
        let mut out = Vec::new();

        // Sort by ascending confidence, process highest confidence first by starting at the back.
        detections.sort_unstable_by_key(|det| TotalF32(det.confidence()));

        while let Some(seed) = detections.pop() {
            if out.len() >= self.max_outputs {
                break;
            }
            detections.retain(|other| {
                let iou = seed.bounding_rect().iou(&other.bounding_rect());
                iou < self.iou_thresh
            });
            out.push(seed);
        }

        detections.clear();
        out
    }
}

impl Default for NonMaxSuppression {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use handpose_image::rect::Rect;

    use super::*;

    #[test]
    fn nms_suppresses_non_maximum() {
        let nms = NonMaxSuppression::new();

        let rect = Rect::from_center(0.0, 0.0, 1.0, 1.0);
        let a = Detection::new(0.6, rect);
        let b = Detection::new(0.55, rect.scale(1.5));
        let detections = nms.process(&mut vec![b, a]);
        assert_eq!(detections.len(), 1);

        let d = &detections[0];
        assert_eq!(d.confidence(), 0.6);
        assert_eq!(d.bounding_rect(), rect);
    }

    #[test]
    fn nms_ignores_nonoverlapping() {
        let nms = NonMaxSuppression::new();

        let a = Detection::new(0.7, Rect::from_center(0.0, 0.0, 1.0, 1.0));
        let b = Detection::new(0.9, Rect::from_center(5.0, 0.0, 1.0, 1.0));

        let detections = nms.process(&mut vec![a, b]);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].confidence(), 0.9);
        assert_eq!(detections[1].confidence(), 0.7);
    }

    #[test]
    fn nms_limits_outputs() {
        let mut nms = NonMaxSuppression::new();
        nms.set_max_outputs(1);

        let mut detections = (0..5)
            .map(|i| {
                let x = f64::from(i) * 10.0;
                Detection::new(i as f32 * 0.1, Rect::from_center(x, 0.0, 1.0, 1.0))
            })
            .collect::<Vec<_>>();
        let out = nms.process(&mut detections);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bounding_rect().center().x, 40.0);
        assert!(detections.is_empty());
    }
}
