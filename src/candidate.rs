use serde_derive::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::config::SamplerConfig;
use crate::image::Image;

pub const POS_LABEL: f32 = 1.0;
pub const NEG_LABEL: f32 = 0.0;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Positive,
    Negative,
}

impl Label {
    #[inline(always)]
    pub fn value(self) -> f32 {
        match self {
            Label::Positive => POS_LABEL,
            Label::Negative => NEG_LABEL,
        }
    }
}

/// Sampled box with its label and its overlap with the reference box.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub bbox: BoundingBox,
    pub label: Label,
    pub iou: f32,
}

impl Candidate {
    pub fn positive(bbox: BoundingBox, reference: &BoundingBox) -> Self {
        Self {
            bbox,
            label: Label::Positive,
            iou: bbox.iou(reference),
        }
    }

    pub fn negative(bbox: BoundingBox, reference: &BoundingBox) -> Self {
        Self {
            bbox,
            label: Label::Negative,
            iou: bbox.iou(reference),
        }
    }

    #[inline(always)]
    pub fn is_positive(&self) -> bool {
        self.label == Label::Positive
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SampleMethod {
    /// Gaussian offsets and scale exponent around the box.
    Gaussian,
    /// Uniform offsets and scale exponent around the box.
    Uniform,
    /// Center anywhere in the image, uniform scale exponent.
    Whole,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CandidateParams {
    pub method: SampleMethod,
    pub trans_range: f32,
    pub scale_range: f32,
    pub sd_x: f32,
    pub sd_y: f32,
    pub sd_scale: f32,
}

impl CandidateParams {
    pub fn positive(config: &SamplerConfig) -> Self {
        Self {
            method: SampleMethod::Gaussian,
            trans_range: config.pos_trans_range,
            scale_range: config.pos_scale_range,
            sd_x: config.sd_x,
            sd_y: config.sd_y,
            sd_scale: config.sd_scale,
        }
    }

    pub fn near_negative(config: &SamplerConfig) -> Self {
        Self {
            method: SampleMethod::Uniform,
            trans_range: config.near_neg_trans_range,
            ..Self::positive(config)
        }
    }

    pub fn whole_negative(config: &SamplerConfig) -> Self {
        Self {
            method: SampleMethod::Whole,
            scale_range: config.neg_scale_range,
            ..Self::positive(config)
        }
    }
}

/// Search-region crop, appearance template and the target box inside the
/// crop in scaled network-input coordinates.
#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub image: Image,
    pub target: Image,
    pub bbox_gt_scaled: BoundingBox,
}

/// Everything the trainer consumes in one call.
#[derive(Debug, Clone, Default)]
pub struct TrainingBatch {
    pub images: Vec<Image>,
    pub targets: Vec<Image>,
    pub bboxes_gt_scaled: Vec<BoundingBox>,
    pub candidates: Vec<Image>,
    pub labels: Vec<f32>,
}

impl TrainingBatch {
    pub fn push_example(&mut self, example: TrainingExample) {
        self.images.push(example.image);
        self.targets.push(example.target);
        self.bboxes_gt_scaled.push(example.bbox_gt_scaled);
    }

    pub fn push_candidate(&mut self, crop: Image, label: f32) {
        self.candidates.push(crop);
        self.labels.push(label);
    }

    #[inline]
    pub fn num_examples(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.candidates.is_empty()
    }
}
