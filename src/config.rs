use crate::error::{Error, Result};
use serde_derive::{Deserialize, Serialize};
use std::io::Read;

/// Parameters of the synthetic example and candidate generator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    /// Rate of the exponential center shift used for motion-augmented examples.
    pub lambda_shift: f32,
    /// Rate of the exponential scale change used for motion-augmented examples.
    pub lambda_scale: f32,
    pub min_scale: f32,
    pub max_scale: f32,

    /// Gaussian candidate offsets, as fractions of box width / height.
    pub sd_x: f32,
    pub sd_y: f32,
    /// Gaussian scale exponent deviation.
    pub sd_scale: f32,

    pub pos_trans_range: f32,
    pub pos_scale_range: f32,
    /// Uniform offset range of near-miss negatives, as a fraction of box size.
    pub near_neg_trans_range: f32,
    /// Scale range of whole-image negatives; their center is drawn over the
    /// full image.
    pub neg_scale_range: f32,

    pub pos_iou_threshold: f32,
    /// Draws allowed per positive before falling back to the best one seen.
    pub max_pos_attempts: usize,

    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            lambda_shift: 5.0,
            lambda_scale: 15.0,
            min_scale: -0.4,
            max_scale: 0.4,
            sd_x: 0.1,
            sd_y: 0.1,
            sd_scale: 1.0,
            pos_trans_range: 0.1,
            pos_scale_range: 1.0,
            // twice sd_x
            near_neg_trans_range: 0.2,
            neg_scale_range: 1.2,
            pos_iou_threshold: 0.7,
            max_pos_attempts: 100,
            seed: 0,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("sd_x", self.sd_x),
            ("sd_y", self.sd_y),
            ("sd_scale", self.sd_scale),
            ("pos_trans_range", self.pos_trans_range),
            ("pos_scale_range", self.pos_scale_range),
            ("near_neg_trans_range", self.near_neg_trans_range),
            ("neg_scale_range", self.neg_scale_range),
        ];

        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [
            ("lambda_shift", self.lambda_shift),
            ("lambda_scale", self.lambda_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if !self.min_scale.is_finite() || !self.max_scale.is_finite() {
            return Err(Error::InvalidConfig("scale bounds must be finite".into()));
        }

        if self.min_scale > self.max_scale {
            return Err(Error::InvalidConfig(format!(
                "min_scale {} is greater than max_scale {}",
                self.min_scale, self.max_scale
            )));
        }

        if !(0.0..=1.0).contains(&self.pos_iou_threshold) {
            return Err(Error::InvalidConfig(format!(
                "pos_iou_threshold must be within [0, 1], got {}",
                self.pos_iou_threshold
            )));
        }

        if self.max_pos_attempts == 0 {
            return Err(Error::InvalidConfig("max_pos_attempts must be > 0".into()));
        }

        Ok(())
    }
}

/// When online fine-tuning fires after a tracked frame.
///
/// Precedence is last frame, then failure, then the periodic cadence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FineTuneTrigger {
    /// Fine-tune every `interval` frames; `0` disables the cadence.
    pub interval: usize,
    pub on_failure: bool,
    pub on_last_frame: bool,
}

impl Default for FineTuneTrigger {
    fn default() -> Self {
        Self {
            interval: 10,
            on_failure: true,
            on_last_frame: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FineTuneConfig {
    /// Trainer calls made on the first frame before tracking starts.
    pub bootstrap_iterations: usize,
    /// Motion-augmented examples per training batch and per enqueued frame.
    pub augment_count: usize,
    pub first_frame_pos: usize,
    pub first_frame_neg: usize,
    pub frame_pos: usize,
    pub frame_neg: usize,

    pub trigger: FineTuneTrigger,
    /// Frames of pool history used after a failed frame.
    pub short_term_window: usize,
    /// Frames of pool history used for periodic and last-frame updates.
    pub long_term_window: usize,
    pub pool_capacity: usize,
    /// Trainer calls per triggered update.
    pub online_iterations: usize,

    /// Minimum estimator confidence for a frame to count as tracked.
    pub success_threshold: f32,
}

impl Default for FineTuneConfig {
    fn default() -> Self {
        Self {
            bootstrap_iterations: 10,
            augment_count: 10,
            first_frame_pos: 50,
            first_frame_neg: 500,
            frame_pos: 50,
            frame_neg: 200,
            trigger: FineTuneTrigger::default(),
            short_term_window: 20,
            long_term_window: 100,
            pool_capacity: 100,
            online_iterations: 1,
            success_threshold: 0.5,
        }
    }
}

impl FineTuneConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pool_capacity == 0 {
            return Err(Error::InvalidConfig("pool_capacity must be > 0".into()));
        }

        if self.short_term_window == 0 || self.long_term_window == 0 {
            return Err(Error::InvalidConfig(
                "fine-tune windows must be > 0".into(),
            ));
        }

        if !self.success_threshold.is_finite() {
            return Err(Error::InvalidConfig(
                "success_threshold must be finite".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    pub sampler: SamplerConfig,
    pub fine_tune: FineTuneConfig,
}

impl TrackerConfig {
    pub fn from_json_str(src: &str) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_str(src)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_reader(reader)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.sampler.validate()?;
        self.fine_tune.validate()
    }
}
