//! Palm detection.

use handpose_image::{rect::Rect, Image, Resolution};
use nalgebra::{Point2, Vector2};
use ndarray::{Array2, Array4};

use crate::{
    detection::{
        nms::NonMaxSuppression,
        ssd::{Anchor, AnchorParams, Anchors, PALM_LAYERS},
        Detection,
    },
    iter::zip_exact,
    nn::{image_to_tensor, ColorMapper},
    num::sigmoid,
    region::{HandRegion, PALM_LANDMARK_COUNT},
    timer::Timer,
};

/// Number of values the palm network outputs per anchor.
///
/// Every row is `[score_logit, dx, dy, w, h]` followed by 7 `(x, y)` palm landmark offsets.
pub const VALUES_PER_ANCHOR: usize = 5 + 2 * PALM_LANDMARK_COUNT;

/// Something that finds the region containing a hand in a full frame.
pub trait HandBoundsEstimator {
    /// Locates a hand in `frame`.
    ///
    /// Returns `Ok(None)` if no hand is visible. The returned region should carry the palm
    /// landmarks it was derived from, since they determine the hand's orientation.
    fn estimate_hand_bounds(&mut self, frame: &Image) -> anyhow::Result<Option<HandRegion>>;
}

/// A raw palm detection network.
pub trait PalmDetectionNetwork {
    /// Returns the expected input image size.
    fn input_resolution(&self) -> Resolution;

    /// Runs the network.
    ///
    /// `input` has shape `[1, height, width, 3]` with color values mapped to `[-1, 1]`. The
    /// returned array must have one row of [`VALUES_PER_ANCHOR`] values per SSD anchor.
    fn infer(&self, input: Array4<f32>) -> anyhow::Result<Array2<f32>>;
}

/// Palm detector configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmDetectorConfig {
    score_threshold: f32,
    iou_threshold: f64,
}

impl PalmDetectorConfig {
    pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
    pub const DEFAULT_IOU_THRESHOLD: f64 = NonMaxSuppression::DEFAULT_IOU_THRESH;

    #[inline]
    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    /// Sets the minimum confidence a detection needs to be considered.
    pub fn set_score_threshold(&mut self, score_threshold: f32) {
        self.score_threshold = score_threshold;
    }

    #[inline]
    pub fn iou_threshold(&self) -> f64 {
        self.iou_threshold
    }

    /// Sets the IOU above which overlapping detections are suppressed.
    pub fn set_iou_threshold(&mut self, iou_threshold: f64) {
        self.iou_threshold = iou_threshold;
    }
}

impl Default for PalmDetectorConfig {
    fn default() -> Self {
        Self {
            score_threshold: Self::DEFAULT_SCORE_THRESHOLD,
            iou_threshold: Self::DEFAULT_IOU_THRESHOLD,
        }
    }
}

/// Finds the most confident palm in a frame.
///
/// Wraps a [`PalmDetectionNetwork`] and decodes its output against the SSD anchors of the palm
/// model. At most one palm is returned.
pub struct PalmDetector<N> {
    network: N,
    anchors: Anchors,
    config: PalmDetectorConfig,
    nms: NonMaxSuppression,
    t_resize: Timer,
    t_infer: Timer,
    t_extract: Timer,
}

impl<N: PalmDetectionNetwork> PalmDetector<N> {
    pub fn new(network: N) -> Self {
        Self::with_config(network, PalmDetectorConfig::default())
    }

    pub fn with_config(network: N, config: PalmDetectorConfig) -> Self {
        let mut nms = NonMaxSuppression::new();
        nms.set_iou_thresh(config.iou_threshold());
        nms.set_max_outputs(1);

        Self {
            network,
            anchors: Anchors::calculate(&AnchorParams {
                layers: PALM_LAYERS,
            }),
            config,
            nms,
            t_resize: Timer::new("resize"),
            t_infer: Timer::new("infer"),
            t_extract: Timer::new("extract"),
        }
    }

    pub fn config(&self) -> &PalmDetectorConfig {
        &self.config
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Detects the most confident palm in `frame`.
    ///
    /// The returned [`Detection`] is in the coordinate system of `frame` and carries the 7 palm
    /// keypoints.
    pub fn detect(&mut self, frame: &Image) -> anyhow::Result<Option<Detection>> {
        let input_res = self.network.input_resolution();

        let input = self.t_resize.time(|| {
            let resized = frame.resize(input_res);
            image_to_tensor(&resized, &ColorMapper::linear(-1.0..=1.0))
        });
        let raw = self.t_infer.time(|| self.network.infer(input))?;

        let mut detections = self.t_extract.time(|| {
            extract_detections(&self.anchors, input_res, &raw, self.config.score_threshold)
        });
        drop(raw);
        log::trace!("{} palm candidates above threshold", detections.len());

        let best = self.nms.process(&mut detections).into_iter().next();
        let scale = Vector2::new(
            f64::from(frame.width()) / f64::from(input_res.width()),
            f64::from(frame.height()) / f64::from(input_res.height()),
        );
        Ok(best.map(|det| det.scaled(scale)))
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_resize, &self.t_infer, &self.t_extract].into_iter()
    }
}

impl<N: PalmDetectionNetwork> HandBoundsEstimator for PalmDetector<N> {
    fn estimate_hand_bounds(&mut self, frame: &Image) -> anyhow::Result<Option<HandRegion>> {
        let Some(det) = self.detect(frame)? else {
            return Ok(None);
        };

        let mut palm = [Point2::origin(); PALM_LANDMARK_COUNT];
        palm.copy_from_slice(det.keypoints());
        Ok(Some(HandRegion::with_palm_landmarks(
            det.bounding_rect(),
            palm,
        )))
    }
}

/// Decodes all detections with a score of at least `thresh`.
///
/// Positions are in the coordinate system of the network input.
fn extract_detections(
    anchors: &Anchors,
    input_res: Resolution,
    raw: &Array2<f32>,
    thresh: f32,
) -> Vec<Detection> {
    assert_eq!(
        raw.ncols(),
        VALUES_PER_ANCHOR,
        "unexpected palm network output shape"
    );

    let mut detections = Vec::new();
    for (anchor, row) in zip_exact(anchors.iter(), raw.rows()) {
        let confidence = sigmoid(row[0]);
        if confidence.is_nan() || confidence < thresh {
            continue;
        }
        if !row.iter().all(|v| v.is_finite()) {
            log::trace!("skipping palm candidate with non-finite box");
            continue;
        }

        let params = row.iter().map(|&v| f64::from(v)).collect::<Vec<_>>();
        detections.push(extract_detection(anchor, input_res, &params, confidence));
    }
    detections
}

fn extract_detection(
    anchor: &Anchor,
    input_res: Resolution,
    box_params: &[f64],
    confidence: f32,
) -> Detection {
    let input_w = f64::from(input_res.width());
    let input_h = f64::from(input_res.height());
    let anchor_pos = Vector2::new(anchor.x_center() * input_w, anchor.y_center() * input_h);

    let center = Point2::new(box_params[1], box_params[2]) + anchor_pos;
    let w = box_params[3].max(0.0);
    let h = box_params[4].max(0.0);

    let keypoints = box_params[5..]
        .chunks_exact(2)
        .map(|lm| Point2::new(lm[0], lm[1]) + anchor_pos)
        .collect();

    Detection::with_keypoints(
        confidence,
        Rect::from_center(center.x, center.y, w, h),
        keypoints,
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    /// Anchor index of the first box of the cell at `(x, y)` in the 32x32 layer.
    fn first_layer_anchor(x: usize, y: usize) -> usize {
        (y * 32 + x) * 2
    }

    struct FakeNetwork {
        rows: Vec<(usize, [f32; VALUES_PER_ANCHOR])>,
    }

    impl PalmDetectionNetwork for FakeNetwork {
        fn input_resolution(&self) -> Resolution {
            Resolution::new(256, 256)
        }

        fn infer(&self, input: Array4<f32>) -> anyhow::Result<Array2<f32>> {
            assert_eq!(input.shape(), &[1, 256, 256, 3]);
            assert!(input.iter().all(|v| (-1.0..=1.0).contains(v)));

            let mut out = Array2::from_elem((2944, VALUES_PER_ANCHOR), -100.0);
            for (index, row) in &self.rows {
                for (dst, src) in out.row_mut(*index).iter_mut().zip(row) {
                    *dst = *src;
                }
            }
            Ok(out)
        }
    }

    fn row(score: f32, dx: f32, dy: f32, size: f32) -> [f32; VALUES_PER_ANCHOR] {
        let mut row = [0.0; VALUES_PER_ANCHOR];
        row[0] = score;
        row[1] = dx;
        row[2] = dy;
        row[3] = size;
        row[4] = size;
        // Palm base below the center, middle finger base above it.
        row[5..7].copy_from_slice(&[dx, dy + 10.0]);
        row[9..11].copy_from_slice(&[dx, dy - 10.0]);
        row
    }

    #[test]
    fn no_palm() {
        let mut detector = PalmDetector::new(FakeNetwork { rows: Vec::new() });
        let frame = Image::new((64, 64));
        assert!(detector.detect(&frame).unwrap().is_none());
        assert!(detector.estimate_hand_bounds(&frame).unwrap().is_none());
    }

    #[test]
    fn decodes_against_anchor() {
        // Anchor at cell (16, 8) has its center at (132, 68) in input coordinates.
        let index = first_layer_anchor(16, 8);
        let mut detector = PalmDetector::new(FakeNetwork {
            rows: vec![(index, row(5.0, 4.0, -2.0, 40.0))],
        });

        // Same size as the network input, so no scaling happens.
        let frame = Image::new((256, 256));
        let det = detector.detect(&frame).unwrap().unwrap();
        assert!(det.confidence() > 0.99);
        let rect = det.bounding_rect();
        assert_abs_diff_eq!(rect.center(), Point2::new(136.0, 66.0), epsilon = 1e-9);
        assert_abs_diff_eq!(rect.width(), 40.0, epsilon = 1e-9);
        assert_eq!(det.keypoints().len(), PALM_LANDMARK_COUNT);
        assert_abs_diff_eq!(det.keypoints()[0], Point2::new(136.0, 76.0), epsilon = 1e-9);
    }

    #[test]
    fn scales_to_frame() {
        let index = first_layer_anchor(16, 16);
        let mut detector = PalmDetector::new(FakeNetwork {
            rows: vec![(index, row(5.0, 0.0, 0.0, 64.0))],
        });

        let frame = Image::new((512, 128));
        let region = detector.estimate_hand_bounds(&frame).unwrap().unwrap();
        let rect = region.rect();
        assert_abs_diff_eq!(rect.center(), Point2::new(264.0, 66.0), epsilon = 1e-9);
        assert_abs_diff_eq!(rect.width(), 128.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rect.height(), 32.0, epsilon = 1e-9);
        assert_abs_diff_eq!(region.alignment_angle(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn keeps_most_confident() {
        let mut detector = PalmDetector::new(FakeNetwork {
            rows: vec![
                (first_layer_anchor(4, 4), row(1.0, 0.0, 0.0, 20.0)),
                (first_layer_anchor(4, 4) + 1, row(3.0, 1.0, 0.0, 20.0)),
                (first_layer_anchor(25, 25), row(2.0, 0.0, 0.0, 20.0)),
            ],
        });

        let det = detector.detect(&Image::new((256, 256))).unwrap().unwrap();
        assert_abs_diff_eq!(det.confidence(), sigmoid(3.0));
        assert_abs_diff_eq!(det.bounding_rect().center(), Point2::new(37.0, 36.0), epsilon = 1e-9);
    }

    #[test]
    fn threshold() {
        let mut config = PalmDetectorConfig::default();
        config.set_score_threshold(0.99);
        let mut detector = PalmDetector::with_config(
            FakeNetwork {
                rows: vec![(first_layer_anchor(4, 4), row(1.0, 0.0, 0.0, 20.0))],
            },
            config,
        );
        assert!(detector.detect(&Image::new((256, 256))).unwrap().is_none());
    }

    #[test]
    fn skips_non_finite_candidates() {
        let mut broken = row(5.0, 0.0, 0.0, 20.0);
        broken[3] = f32::NAN;
        let mut detector = PalmDetector::new(FakeNetwork {
            rows: vec![
                (first_layer_anchor(4, 4), row(f32::NAN, 0.0, 0.0, 20.0)),
                (first_layer_anchor(8, 8), broken),
            ],
        });
        assert!(detector.detect(&Image::new((256, 256))).unwrap().is_none());
    }

    #[test]
    #[should_panic(expected = "different lengths")]
    fn anchor_count_mismatch() {
        let anchors = Anchors::calculate(&AnchorParams {
            layers: PALM_LAYERS,
        });
        let raw = Array2::zeros((10, VALUES_PER_ANCHOR));
        extract_detections(&anchors, Resolution::new(256, 256), &raw, 0.5);
    }
}
