//! Per-frame hand tracking.
//!
//! [`HandPipeline`] runs the following steps on every frame:
//!
//! 1. If the [`RegionTracker`] has no usable region, run the [`HandBoundsEstimator`] on the whole
//!    frame. No hand means no result for this frame.
//! 2. Rotate the frame about the region's center so that the hand points upwards.
//! 3. Cut the hand out of the rotated frame and resample it to the landmark network's input size.
//! 4. Run the [`LandmarkNetwork`]. Results below the confidence threshold are discarded.
//! 5. Map the landmarks back into the frame's coordinate system, derive the region to track in the
//!    next frame, and hand the region to the tracker.
//!
//! Whenever a frame yields no hand (or a collaborator fails), the tracked region is discarded, so
//! the next frame runs full detection again.

use anyhow::Context;
use handpose_image::{rect::Rect, Color, Image, Resolution};
use nalgebra::{Point2, Point3, Vector2};

use crate::{
    hand::{
        detection::HandBoundsEstimator,
        landmark::{
            HandEstimate, LandmarkNetwork, PackedConvolutionGuard, NUM_KEYPOINT_VALUES,
            PALM_LANDMARKS,
        },
    },
    landmark::Landmarks,
    nn::{image_to_tensor, ColorMapper},
    region::{HandRegion, PALM_LANDMARK_COUNT},
    rotation::RotationMatrix,
    timer::Timer,
    tracker::RegionTracker,
};

/// Relative shift applied to the palm box, towards the fingers.
const PALM_BOX_SHIFT: [f64; 2] = [0.0, -0.4];
/// Factor by which the palm box is enlarged so that the whole hand fits.
const PALM_BOX_ENLARGE: f64 = 3.0;
/// Relative shift applied to the bounding box of the estimated hand landmarks.
const HAND_BOX_SHIFT: [f64; 2] = [0.0, -0.1];
/// Factor by which the landmark bounding box is enlarged.
const HAND_BOX_ENLARGE: f64 = 1.65;

/// Configuration of a [`HandPipeline`], fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    mesh_input: Resolution,
    max_continuous_checks: u32,
    detection_confidence: f32,
}

impl PipelineConfig {
    pub const DEFAULT_MESH_INPUT: Resolution = Resolution::new(256, 256);
    pub const DEFAULT_MAX_CONTINUOUS_CHECKS: u32 = RegionTracker::DEFAULT_MAX_CONTINUOUS_CHECKS;
    pub const DEFAULT_DETECTION_CONFIDENCE: f32 = 0.8;

    /// Returns the input size of the landmark network.
    #[inline]
    pub fn mesh_input(&self) -> Resolution {
        self.mesh_input
    }

    /// Sets the input size of the landmark network.
    ///
    /// # Panics
    ///
    /// Panics if `res` is empty.
    pub fn set_mesh_input(&mut self, res: impl Into<Resolution>) {
        let res = res.into();
        assert!(!res.is_empty(), "landmark network input size must not be empty");
        self.mesh_input = res;
    }

    #[inline]
    pub fn max_continuous_checks(&self) -> u32 {
        self.max_continuous_checks
    }

    /// Sets the number of consecutive frames that may reuse a tracked region before the palm
    /// detector is run again.
    pub fn set_max_continuous_checks(&mut self, max_continuous_checks: u32) {
        self.max_continuous_checks = max_continuous_checks;
    }

    #[inline]
    pub fn detection_confidence(&self) -> f32 {
        self.detection_confidence
    }

    /// Sets the minimum landmark confidence for a hand to be reported.
    pub fn set_detection_confidence(&mut self, detection_confidence: f32) {
        self.detection_confidence = detection_confidence;
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mesh_input: Self::DEFAULT_MESH_INPUT,
            max_continuous_checks: Self::DEFAULT_MAX_CONTINUOUS_CHECKS,
            detection_confidence: Self::DEFAULT_DETECTION_CONFIDENCE,
        }
    }
}

/// Per-call options of [`HandPipeline::estimate_hand`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EstimateConfig {
    min_confidence: Option<f32>,
}

impl EstimateConfig {
    /// Overrides the pipeline's detection confidence for one call.
    pub fn with_min_confidence(min_confidence: f32) -> Self {
        Self {
            min_confidence: Some(min_confidence),
        }
    }

    #[inline]
    pub fn min_confidence(&self) -> Option<f32> {
        self.min_confidence
    }
}

/// Tracks a single hand across a sequence of frames.
pub struct HandPipeline<D, L> {
    detector: D,
    landmarks: L,
    tracker: RegionTracker,
    config: PipelineConfig,
    t_detect: Timer,
    t_crop: Timer,
    t_landmarks: Timer,
    t_map: Timer,
}

impl<D: HandBoundsEstimator, L: LandmarkNetwork> HandPipeline<D, L> {
    pub fn new(detector: D, landmarks: L, config: PipelineConfig) -> Self {
        Self {
            detector,
            landmarks,
            tracker: RegionTracker::new(config.max_continuous_checks()),
            config,
            t_detect: Timer::new("detect"),
            t_crop: Timer::new("crop"),
            t_landmarks: Timer::new("landmarks"),
            t_map: Timer::new("map"),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &RegionTracker {
        &self.tracker
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn landmark_network(&self) -> &L {
        &self.landmarks
    }

    /// Drops the tracked region, so that the next frame runs full detection.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }

    /// Estimates the hand landmarks in `frame`.
    ///
    /// Returns `Ok(None)` when no hand was found or the landmark network was not confident
    /// enough. Errors are returned when the detector or the landmark network fail. In all of
    /// those cases the tracked region is discarded.
    pub fn estimate_hand(
        &mut self,
        frame: &Image,
        config: &EstimateConfig,
    ) -> anyhow::Result<Option<HandEstimate>> {
        let result = self.estimate_hand_impl(frame, config);
        if !matches!(result, Ok(Some(_))) {
            self.tracker.reset();
        }
        result
    }

    fn estimate_hand_impl(
        &mut self,
        frame: &Image,
        config: &EstimateConfig,
    ) -> anyhow::Result<Option<HandEstimate>> {
        if frame.resolution().is_empty() {
            anyhow::bail!("cannot track hands in empty frame");
        }

        let fresh_detection = self.tracker.should_run_full_detection();
        let roi = if fresh_detection {
            let detected = self
                .t_detect
                .time(|| self.detector.estimate_hand_bounds(frame))?;
            let Some(region) = detected else {
                log::trace!("no hand detected");
                return Ok(None);
            };
            log::trace!("detected hand at {:?}", region.rect());
            self.tracker.update_region(region.clone(), true);
            region
        } else {
            self.tracker.record_tracked_frame();
            self.tracker
                .roi()
                .cloned()
                .context("tracker skipped detection without a tracked region")?
        };

        let angle = roi.alignment_angle();
        let palm_center = roi.rect().center();
        let rotation_matrix = RotationMatrix::new(-angle, palm_center);

        let (crop_box, input) = self.t_crop.time(|| {
            let rotated = frame.rotate_with_offset(
                angle,
                [
                    palm_center.x / f64::from(frame.width()),
                    palm_center.y / f64::from(frame.height()),
                ],
                Color::NONE,
            );

            let crop_box = match roi.palm_landmarks() {
                Some(palm) if fresh_detection => box_for_palm_landmarks(palm, &rotation_matrix),
                _ => roi.rect(),
            };

            let crop = rotated.crop_and_resize(&crop_box, self.config.mesh_input);
            drop(rotated);
            (crop_box, image_to_tensor(&crop, &ColorMapper::linear(0.0..=1.0)))
        });

        let output = {
            let _guard = self.t_landmarks.start();
            let mut network = PackedConvolutionGuard::for_landmarks(&mut self.landmarks);
            network.predict(input)?
        };

        let threshold = config
            .min_confidence()
            .unwrap_or(self.config.detection_confidence);
        if output.confidence.is_nan() || output.confidence < threshold {
            log::debug!(
                "landmark confidence {} below threshold {}, lost hand",
                output.confidence,
                threshold
            );
            return Ok(None);
        }

        assert_eq!(
            output.keypoints.len(),
            NUM_KEYPOINT_VALUES,
            "landmark network returned wrong number of keypoint values"
        );
        if !output.keypoints.iter().all(|v| v.is_finite()) {
            log::debug!("landmark network returned non-finite keypoints, lost hand");
            return Ok(None);
        }
        let confidence = output.confidence;
        let raw = Landmarks::from_flat(&output.keypoints);
        drop(output);

        let landmarks = self.t_map.time(|| {
            transform_raw_coords(
                &raw,
                &crop_box,
                angle,
                &rotation_matrix,
                self.config.mesh_input,
            )
        });

        let hand_region = box_for_hand_landmarks(&landmarks);
        let rect = hand_region.rect();
        self.tracker.update_region(hand_region, false);

        Ok(Some(HandEstimate::new(landmarks, confidence, rect)))
    }

    /// Returns profiling timers for detection, cropping, landmark inference and coordinate
    /// mapping.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_detect, &self.t_crop, &self.t_landmarks, &self.t_map].into_iter()
    }
}

/// Computes the crop box for a freshly detected palm.
///
/// The palm landmarks are moved into the rotated frame with `rotation_matrix`. Their bounding
/// box is shifted towards the fingers, made square, and enlarged to cover the whole hand.
pub fn box_for_palm_landmarks(
    palm_landmarks: &[Point2<f64>; PALM_LANDMARK_COUNT],
    rotation_matrix: &RotationMatrix,
) -> Rect {
    let rotated = palm_landmarks.map(|p| rotation_matrix.rotate_point(p));
    let bounds = Rect::bounding(rotated).expect("palm landmark list is never empty");
    bounds
        .shift_rel(PALM_BOX_SHIFT)
        .squarify()
        .scale(PALM_BOX_ENLARGE)
}

/// Computes the region to track from the hand landmarks, in frame coordinates.
///
/// The palm landmarks of the region are taken from the hand landmarks, without depth.
///
/// # Panics
///
/// Panics if `landmarks` does not contain the full set of hand landmarks.
pub fn box_for_hand_landmarks(landmarks: &Landmarks) -> HandRegion {
    let bounds = landmarks
        .bounding_rect()
        .expect("hand landmark list is never empty");
    let palm = PALM_LANDMARKS.map(|idx| landmarks.get(idx as usize).xy());

    HandRegion::with_palm_landmarks(bounds, palm)
        .shift_rel(HAND_BOX_SHIFT)
        .squarify()
        .scale(HAND_BOX_ENLARGE)
}

/// Maps landmarks from the landmark network's input space back into the frame.
///
/// `crop_box` is the box that was cut from the rotated frame, `angle` the alignment angle the
/// frame was rotated with, and `rotation_matrix` the transform from frame to rotated frame
/// coordinates. Depth values are passed through unchanged.
pub fn transform_raw_coords(
    raw: &Landmarks,
    crop_box: &Rect,
    angle: f64,
    rotation_matrix: &RotationMatrix,
    input_res: Resolution,
) -> Landmarks {
    let input_size = Vector2::new(
        f64::from(input_res.width()),
        f64::from(input_res.height()),
    );
    let scale = crop_box.size().component_div(&input_size);
    let half_input = input_size * 0.5;

    let rotate = RotationMatrix::new(angle, Point2::origin());
    let center = rotation_matrix.inverse().rotate_point(crop_box.center());

    let mut landmarks = raw.clone();
    landmarks.map_positions(|p| {
        let scaled = (p.xy().coords - half_input).component_mul(&scale);
        let rotated = rotate.apply_homogeneous([scaled.x, scaled.y, 1.0]);
        Point3::new(rotated.x + center.x, rotated.y + center.y, p.z)
    });
    landmarks
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_6};

    use approx::assert_abs_diff_eq;
    use ndarray::Array4;

    use crate::{
        hand::landmark::{LandmarkOutput, NUM_LANDMARKS},
        test::{upright_palm, FixedLandmarkNetwork, ScriptedDetector},
    };

    use super::*;

    #[test]
    fn hand_box_from_landmarks() {
        let mut coords = vec![0.0; NUM_KEYPOINT_VALUES];
        for (i, lm) in coords.chunks_exact_mut(3).enumerate() {
            // Spread the landmarks over (10,10)-(50,90), landmark 0 at the top left.
            lm[0] = 10.0 + (i % 5) as f32 * 10.0;
            lm[1] = 10.0 + (i / 5) as f32 * 20.0;
            lm[2] = i as f32;
        }
        let landmarks = Landmarks::from_flat(&coords);
        assert_eq!(
            landmarks.bounding_rect().unwrap(),
            Rect::from_corners([10.0, 10.0], [50.0, 90.0])
        );

        let region = box_for_hand_landmarks(&landmarks);
        let rect = region.rect();
        assert_abs_diff_eq!(rect.start(), Point2::new(-36.0, -24.0), epsilon = 1e-9);
        assert_abs_diff_eq!(rect.end(), Point2::new(96.0, 108.0), epsilon = 1e-9);
        assert_abs_diff_eq!(rect.width(), rect.height(), epsilon = 1e-9);

        let palm = region.palm_landmarks().unwrap();
        for (palm, idx) in palm.iter().zip(PALM_LANDMARKS) {
            let lm = landmarks.get(idx as usize);
            assert_eq!(*palm, Point2::new(lm.x, lm.y));
        }
    }

    #[test]
    fn palm_box_upright() {
        let palm = upright_palm(Point2::new(100.0, 100.0), 20.0);
        let rect = box_for_palm_landmarks(&palm, &RotationMatrix::identity());
        let bounds = Rect::bounding(palm).unwrap();
        let expected = bounds.shift_rel([0.0, -0.4]).squarify().scale(3.0);
        assert_eq!(rect, expected);
        assert_abs_diff_eq!(rect.width(), rect.height());
    }

    #[test]
    fn palm_box_is_rotated() {
        let center = Point2::new(100.0, 100.0);
        let upright = upright_palm(center, 20.0);
        let expected = box_for_palm_landmarks(&upright, &RotationMatrix::identity());

        // Palm turned by 90° about its center, then rotated back by the matrix.
        let turned = RotationMatrix::new(FRAC_PI_2, center);
        let palm = upright.map(|p| turned.rotate_point(p));
        let rect = box_for_palm_landmarks(&palm, &turned.inverse());
        assert_abs_diff_eq!(rect.start(), expected.start(), epsilon = 1e-9);
        assert_abs_diff_eq!(rect.end(), expected.end(), epsilon = 1e-9);
    }

    #[test]
    fn input_center_maps_to_crop_center() {
        let crop_box = Rect::from_corners([100.0, 50.0], [228.0, 178.0]);
        let raw = Landmarks::from_flat(&[128.0, 128.0, 3.5]);
        let out = transform_raw_coords(
            &raw,
            &crop_box,
            0.0,
            &RotationMatrix::new(0.0, [164.0, 114.0]),
            Resolution::new(256, 256),
        );
        assert_abs_diff_eq!(out.get(0), Point3::new(164.0, 114.0, 3.5), epsilon = 1e-9);
    }

    #[test]
    fn mapping_scales_by_crop_size() {
        let crop_box = Rect::from_corners([0.0, 0.0], [512.0, 128.0]);
        let raw = Landmarks::from_flat(&[0.0, 0.0, 0.0, 256.0, 256.0, -1.0]);
        let out = transform_raw_coords(
            &raw,
            &crop_box,
            0.0,
            &RotationMatrix::identity(),
            Resolution::new(256, 256),
        );
        assert_abs_diff_eq!(out.get(0), Point3::new(0.0, 0.0, 0.0), epsilon = 1e-9);
        assert_abs_diff_eq!(out.get(1), Point3::new(512.0, 128.0, -1.0), epsilon = 1e-9);
    }

    /// Points placed in the rotated crop map back to where they came from in the frame.
    #[test]
    fn mapping_inverts_forward_transform() {
        let mut rng = fastrand::Rng::with_seed(7);
        let input_res = Resolution::new(256, 256);
        for angle in [0.0, FRAC_PI_6, FRAC_PI_2, -1.0, 2.5] {
            let pivot = Point2::new(320.0, 240.0);
            let rotation_matrix = RotationMatrix::new(-angle, pivot);
            let crop_box = Rect::from_center(330.0, 200.0, 180.0, 180.0);

            for _ in 0..10 {
                let frame_point = Point2::new(rng.f64() * 640.0, rng.f64() * 480.0);
                // Forward: frame -> rotated frame -> crop -> network input.
                let rotated = rotation_matrix.rotate_point(frame_point);
                let input = (rotated - crop_box.start())
                    .component_mul(&Vector2::new(256.0, 256.0))
                    .component_div(&crop_box.size());

                let raw = Landmarks::from_flat(&[input.x as f32, input.y as f32, 0.0]);
                let back =
                    transform_raw_coords(&raw, &crop_box, angle, &rotation_matrix, input_res);
                // `raw` went through `f32`.
                assert_abs_diff_eq!(back.get(0).xy(), frame_point, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.mesh_input(), Resolution::new(256, 256));
        assert_eq!(config.max_continuous_checks(), u32::MAX);
        assert_eq!(config.detection_confidence(), 0.8);
        assert_eq!(EstimateConfig::default().min_confidence(), None);
    }

    #[test]
    #[should_panic]
    fn empty_mesh_input() {
        PipelineConfig::default().set_mesh_input((0, 256));
    }

    #[test]
    fn rejects_empty_frame() {
        let mut pipeline = HandPipeline::new(
            ScriptedDetector::new([]),
            FixedLandmarkNetwork::centered(1.0),
            PipelineConfig::default(),
        );
        let frame = Image::new((0, 0));
        assert!(pipeline
            .estimate_hand(&frame, &EstimateConfig::default())
            .is_err());
        assert_eq!(pipeline.detector().calls(), 0);
    }

    #[test]
    fn first_frame_without_hand() {
        let mut pipeline = HandPipeline::new(
            ScriptedDetector::new([None]),
            FixedLandmarkNetwork::centered(1.0),
            PipelineConfig::default(),
        );
        let frame = Image::new((64, 64));
        let result = pipeline
            .estimate_hand(&frame, &EstimateConfig::default())
            .unwrap();
        assert!(result.is_none());
        assert_eq!(pipeline.tracker().roi_count(), 0);
        assert_eq!(pipeline.landmark_network().calls(), 0);
    }

    #[test]
    fn tracks_detected_hand() {
        let palm = upright_palm(Point2::new(32.0, 32.0), 8.0);
        let region = HandRegion::with_palm_landmarks(Rect::bounding(palm).unwrap(), palm);
        let mut config = PipelineConfig::default();
        config.set_mesh_input((64, 64));
        let mut pipeline = HandPipeline::new(
            ScriptedDetector::new([Some(region)]),
            FixedLandmarkNetwork::centered(0.95),
            config,
        );
        let frame = Image::new((64, 64));

        let estimate = pipeline
            .estimate_hand(&frame, &EstimateConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(estimate.confidence(), 0.95);
        assert_eq!(estimate.landmarks().len(), NUM_LANDMARKS);
        assert_eq!(pipeline.detector().calls(), 1);
        assert_eq!(pipeline.tracker().roi_count(), 1);
        assert_eq!(pipeline.tracker().frames_since_detection(), 0);
        assert_eq!(
            pipeline.tracker().roi().unwrap().rect(),
            estimate.bounding_rect()
        );

        // Second frame reuses the region without running the detector.
        pipeline
            .estimate_hand(&frame, &EstimateConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(pipeline.detector().calls(), 1);
        assert_eq!(pipeline.landmark_network().calls(), 2);
        assert_eq!(pipeline.tracker().frames_since_detection(), 1);

        for timer in pipeline.timers() {
            assert!(timer.count() > 0, "{} never ran", timer.name());
        }
    }

    #[test]
    fn landmark_failure_resets() {
        let palm = upright_palm(Point2::new(32.0, 32.0), 8.0);
        let region = HandRegion::with_palm_landmarks(Rect::bounding(palm).unwrap(), palm);
        let mut pipeline = HandPipeline::new(
            ScriptedDetector::new([Some(region)]),
            FixedLandmarkNetwork::centered(0.9).failing_after(1),
            PipelineConfig::default(),
        );
        let frame = Image::new((64, 64));

        assert!(pipeline
            .estimate_hand(&frame, &EstimateConfig::default())
            .unwrap()
            .is_some());
        assert_eq!(pipeline.tracker().roi_count(), 1);

        assert!(pipeline
            .estimate_hand(&frame, &EstimateConfig::default())
            .is_err());
        assert_eq!(pipeline.tracker().roi_count(), 0);
        assert!(pipeline.tracker().should_run_full_detection());
    }

    #[test]
    fn low_confidence_resets() {
        let palm = upright_palm(Point2::new(32.0, 32.0), 8.0);
        let region = HandRegion::with_palm_landmarks(Rect::bounding(palm).unwrap(), palm);
        let mut pipeline = HandPipeline::new(
            ScriptedDetector::new([Some(region.clone()), Some(region)]),
            FixedLandmarkNetwork::centered(0.5),
            PipelineConfig::default(),
        );
        let frame = Image::new((64, 64));

        let result = pipeline
            .estimate_hand(&frame, &EstimateConfig::default())
            .unwrap();
        assert!(result.is_none());
        assert_eq!(pipeline.tracker().roi_count(), 0);

        // A lower per-call threshold accepts the same confidence.
        let result = pipeline
            .estimate_hand(&frame, &EstimateConfig::with_min_confidence(0.4))
            .unwrap();
        assert!(result.is_some());
        assert_eq!(pipeline.detector().calls(), 2);
    }

    /// A white dot in the frame, found in the rotated crop, maps back to where it was drawn.
    #[test]
    fn crop_pixels_map_back_to_frame() {
        let dot = Point2::new(140.5, 100.5);
        let mut frame = Image::filled((256, 256), Color::BLACK);
        for y in 99..=101 {
            for x in 139..=141 {
                frame.set(x, y, Color::WHITE);
            }
        }

        let pivot = Point2::new(120.0, 130.0);
        let input_res = Resolution::new(128, 128);
        let crop_box = Rect::from_center(125.0, 125.0, 100.0, 100.0);
        for angle in [0.0, 0.7, -1.2, 2.5] {
            let rotated =
                frame.rotate_with_offset(angle, [pivot.x / 256.0, pivot.y / 256.0], Color::NONE);
            let crop = rotated.crop_and_resize(&crop_box, input_res);

            let (mut sum, mut weight) = (Vector2::zeros(), 0.0);
            for y in 0..crop.height() {
                for x in 0..crop.width() {
                    let w = f64::from(crop.get(x, y).r());
                    sum += Vector2::new(f64::from(x) + 0.5, f64::from(y) + 0.5) * w;
                    weight += w;
                }
            }
            assert!(weight > 0.0, "dot not visible in crop at angle {angle}");
            let found = sum / weight;

            let raw = Landmarks::from_flat(&[found.x as f32, found.y as f32, 0.0]);
            let rotation_matrix = RotationMatrix::new(-angle, pivot);
            let back = transform_raw_coords(&raw, &crop_box, angle, &rotation_matrix, input_res);
            assert_abs_diff_eq!(back.get(0).xy(), dot, epsilon = 1.5);
        }
    }

    struct NonFiniteNetwork {
        confidence: f32,
    }

    impl LandmarkNetwork for NonFiniteNetwork {
        fn predict(&mut self, _input: Array4<f32>) -> anyhow::Result<LandmarkOutput> {
            Ok(LandmarkOutput {
                confidence: self.confidence,
                keypoints: vec![f32::NAN; NUM_KEYPOINT_VALUES],
            })
        }
    }

    #[test]
    fn non_finite_output_resets() {
        let palm = upright_palm(Point2::new(32.0, 32.0), 8.0);
        let region = HandRegion::with_palm_landmarks(Rect::bounding(palm).unwrap(), palm);
        let frame = Image::new((64, 64));

        for confidence in [f32::NAN, 1.0] {
            let mut pipeline = HandPipeline::new(
                ScriptedDetector::new([Some(region.clone())]),
                NonFiniteNetwork { confidence },
                PipelineConfig::default(),
            );
            let result = pipeline
                .estimate_hand(&frame, &EstimateConfig::default())
                .unwrap();
            assert!(result.is_none(), "confidence {confidence} was accepted");
            assert_eq!(pipeline.tracker().roi_count(), 0);
            assert!(pipeline.tracker().should_run_full_detection());
        }
    }
}
