use log::{trace, warn};

use crate::bbox::BoundingBox;
use crate::image::Image;
use crate::pool::{OnlineSample, OnlineSamplePool};
use crate::Estimator;

/// What the estimator reports for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub bbox: BoundingBox,
    /// Classifier score, when the estimator has one.
    pub confidence: Option<f32>,
}

impl Estimate {
    #[inline]
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            confidence: None,
        }
    }

    #[inline]
    pub fn with_confidence(bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            bbox,
            confidence: Some(confidence),
        }
    }
}

/// Per-video tracking state: previous frame and box, frame counter,
/// last success flag and the online sample pool.
#[derive(Debug)]
pub struct TrackerState {
    pub image_prev: Image,
    pub bbox_prev: BoundingBox,
    pub cur_frame: usize,
    pub pool: OnlineSamplePool,
    /// Sample taken from the annotated first frame, kept out of the rolling pool.
    pub anchor: Option<OnlineSample>,
    success: bool,
    failures: usize,
}

impl TrackerState {
    pub fn new(image: Image, bbox: BoundingBox, first_frame: usize, pool_capacity: usize) -> Self {
        Self {
            image_prev: image,
            bbox_prev: bbox,
            cur_frame: first_frame,
            pool: OnlineSamplePool::new(pool_capacity),
            anchor: None,
            success: true,
            failures: 0,
        }
    }

    /// Estimates the target in `image_curr` from the previous frame and box.
    ///
    /// Estimator errors, invalid boxes and low confidence all count as a
    /// failed frame; the previous box is kept as the estimate for invalid
    /// output so the next frame still has a usable search location.
    pub fn track<E: Estimator + ?Sized>(
        &mut self,
        estimator: &mut E,
        image_curr: &Image,
        success_threshold: f32,
    ) -> BoundingBox {
        let fallback = self.bbox_prev.crop_against_image(image_curr);

        let (bbox, success) =
            match estimator.predict(&self.image_prev, &self.bbox_prev, image_curr) {
                Ok(estimate) => match estimate.bbox.validated(image_curr) {
                    Ok(bbox) => {
                        let confident = estimate
                            .confidence
                            .map_or(true, |c| c >= success_threshold);

                        (bbox, confident)
                    }
                    Err(err) => {
                        warn!("frame {}: {}", self.cur_frame + 1, err);
                        (fallback, false)
                    }
                },
                Err(err) => {
                    warn!("frame {}: estimator failed: {}", self.cur_frame + 1, err);
                    (fallback, false)
                }
            };

        if !success {
            self.failures += 1;
        }

        trace!(
            "frame {}: estimate {:?} success {}",
            self.cur_frame + 1,
            bbox,
            success
        );

        self.success = success;
        bbox
    }

    #[inline]
    pub fn is_success_estimate(&self) -> bool {
        self.success
    }

    /// Frames whose estimate failed so far.
    #[inline]
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Makes the current frame and estimate the context for the next frame.
    pub fn update_state(&mut self, image_curr: Image, bbox_estimate: BoundingBox) {
        self.image_prev = image_curr;
        self.bbox_prev = bbox_estimate;
        self.cur_frame += 1;
    }
}
