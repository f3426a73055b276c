//! Region of interest tracking for a single hand.
//!
//! Full-frame palm detection is much slower than landmark estimation on a small crop. Once a hand
//! has been found, [`RegionTracker`] keeps the region it occupies and lets the pipeline reuse it
//! for subsequent frames, until either tracking is lost or a configurable number of frames have
//! been processed without a fresh detection.

use crate::region::HandRegion;

/// Tracking state of a single hand.
#[derive(Debug, Clone)]
pub struct RegionTracker {
    roi: Option<HandRegion>,
    frames_since_detection: u32,
    max_continuous_checks: u32,
}

impl RegionTracker {
    /// By default, the tracker never forces a new detection while it is tracking a hand.
    pub const DEFAULT_MAX_CONTINUOUS_CHECKS: u32 = u32::MAX;

    /// Minimum IOU between the tracked region and an updated one for the tracked region to be
    /// kept as-is.
    pub const RETAIN_IOU_THRESH: f64 = 0.8;

    pub fn new(max_continuous_checks: u32) -> Self {
        Self {
            roi: None,
            frames_since_detection: 0,
            max_continuous_checks,
        }
    }

    /// Returns whether the next frame has to run the full-frame detector.
    ///
    /// This is the case when no region is tracked, or when the tracked region has been reused
    /// for `max_continuous_checks` frames.
    pub fn should_run_full_detection(&self) -> bool {
        self.roi_count() != 1 || self.frames_since_detection >= self.max_continuous_checks
    }

    /// Updates the tracked region.
    ///
    /// With `force_replace`, `region` becomes the new tracked region and the frame counter is
    /// reset. Otherwise, the current region is kept when it overlaps `region` with an IOU above
    /// [`Self::RETAIN_IOU_THRESH`].
    pub fn update_region(&mut self, region: HandRegion, force_replace: bool) {
        if force_replace {
            log::trace!("tracking new region {:?}", region.rect());
            self.roi = Some(region);
            self.frames_since_detection = 0;
            return;
        }

        let iou = self
            .roi
            .as_ref()
            .map_or(0.0, |roi| roi.rect().iou(&region.rect()));
        if iou > Self::RETAIN_IOU_THRESH {
            log::trace!("iou={iou:.3}, retaining tracked region");
        } else {
            log::trace!("iou={iou:.3}, replacing tracked region");
            self.roi = Some(region);
        }
    }

    /// Records that a frame was processed by reusing the tracked region.
    pub fn record_tracked_frame(&mut self) {
        self.frames_since_detection = self.frames_since_detection.saturating_add(1);
    }

    /// Forgets the tracked region, forcing the next frame to run full detection.
    pub fn reset(&mut self) {
        if self.roi.take().is_some() {
            log::debug!(
                "lost tracking after {} frames without detection",
                self.frames_since_detection
            );
        }
    }

    pub fn roi(&self) -> Option<&HandRegion> {
        self.roi.as_ref()
    }

    /// Returns the number of tracked regions (either 0 or 1).
    pub fn roi_count(&self) -> usize {
        usize::from(self.roi.is_some())
    }

    pub fn frames_since_detection(&self) -> u32 {
        self.frames_since_detection
    }

    pub fn max_continuous_checks(&self) -> u32 {
        self.max_continuous_checks
    }

    pub fn set_max_continuous_checks(&mut self, max_continuous_checks: u32) {
        self.max_continuous_checks = max_continuous_checks;
    }
}

impl Default for RegionTracker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_CONTINUOUS_CHECKS)
    }
}
