use log::{trace, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::bbox::BoundingBox;
use crate::candidate::{Candidate, CandidateParams, SampleMethod, TrainingExample};
use crate::config::SamplerConfig;
use crate::error::{Error, Result};
use crate::image::{self, Image};
use crate::math;

/// Candidates are never narrower or shorter than this before clamping.
const MIN_CANDIDATE_SIDE: f32 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingStats {
    /// Positive searches that ran out of attempts and took the best box seen.
    pub pos_fallbacks: usize,
}

#[derive(Debug, Clone)]
struct SourcePair {
    bbox_prev: BoundingBox,
    bbox_curr: BoundingBox,
    image_curr: Image,
    target_pad: Image,
    target_tight: Image,
}

/// Generates training examples and labeled candidates from a pair of frames.
///
/// The generator owns its random engine, so two generators built from the
/// same config produce the same samples for the same calls.
pub struct ExampleGenerator {
    config: SamplerConfig,
    rng: StdRng,
    pair: Option<SourcePair>,
    stats: SamplingStats,
}

impl ExampleGenerator {
    pub fn new(config: SamplerConfig) -> Result<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            rng,
            pair: None,
            stats: SamplingStats::default(),
        })
    }

    #[inline]
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> SamplingStats {
        self.stats
    }

    /// Sets the frames to sample from. The template is taken around
    /// `bbox_prev` in `image_prev`; examples and candidates are cut from
    /// `image_curr` where the target sits at `bbox_curr`.
    pub fn reset(
        &mut self,
        bbox_prev: &BoundingBox,
        bbox_curr: &BoundingBox,
        image_prev: &Image,
        image_curr: &Image,
    ) -> Result<()> {
        let bbox_curr = bbox_curr.validated(image_curr)?;
        let target_tight = image::crop_out_region(image_prev, bbox_prev)?;
        let target_pad = image::crop_pad_image(bbox_prev, image_prev).image;

        self.pair = Some(SourcePair {
            bbox_prev: *bbox_prev,
            bbox_curr,
            image_curr: image_curr.clone(),
            target_pad,
            target_tight,
        });

        Ok(())
    }

    fn pair(&self) -> Result<&SourcePair> {
        self.pair.as_ref().ok_or(Error::SamplerNotReset)
    }

    /// Reference box the candidates are labeled against.
    pub fn bbox_curr(&self) -> Result<BoundingBox> {
        Ok(self.pair()?.bbox_curr)
    }

    /// Search region at the previous location, no synthetic motion.
    pub fn make_true_example(&self) -> Result<TrainingExample> {
        let pair = self.pair()?;
        Ok(Self::example_at(pair, &pair.bbox_prev, pair.target_pad.clone()))
    }

    /// Same as `make_true_example` but with the unpadded template.
    pub fn make_true_example_tight(&self) -> Result<TrainingExample> {
        let pair = self.pair()?;
        Ok(Self::example_at(pair, &pair.bbox_prev, pair.target_tight.clone()))
    }

    fn example_at(pair: &SourcePair, search_around: &BoundingBox, target: Image) -> TrainingExample {
        let pad = image::crop_pad_image(search_around, &pair.image_curr);
        let bbox_gt_scaled = pair
            .bbox_curr
            .recenter(&pad.location, pad.edge_spacing_x, pad.edge_spacing_y)
            .scale(&pad.image);

        TrainingExample {
            image: pad.image,
            target,
            bbox_gt_scaled,
        }
    }

    /// One example whose search region is shifted and rescaled at random,
    /// simulating apparent motion of the target.
    pub fn make_training_example_bb_shift(&mut self) -> Result<TrainingExample> {
        let config = &self.config;
        let pair = self.pair.as_ref().ok_or(Error::SamplerNotReset)?;

        let shifted = pair.bbox_curr.shift(
            &pair.image_curr,
            config.lambda_scale,
            config.lambda_shift,
            config.min_scale,
            config.max_scale,
            true,
            &mut self.rng,
        );

        Ok(Self::example_at(pair, &shifted, pair.target_pad.clone()))
    }

    pub fn make_training_examples(&mut self, count: usize) -> Result<Vec<TrainingExample>> {
        (0..count)
            .map(|_| self.make_training_example_bb_shift())
            .collect()
    }

    /// Draws one candidate around `bbox`, clamped to a `width` x `height` image.
    pub fn generate_one_random_candidate<R: Rng + ?Sized>(
        bbox: &BoundingBox,
        rng: &mut R,
        width: f32,
        height: f32,
        params: &CandidateParams,
    ) -> BoundingBox {
        let (cx, cy) = (bbox.center_x(), bbox.center_y());
        let (bw, bh) = (bbox.width().abs(), bbox.height().abs());

        let exponent = match params.method {
            SampleMethod::Gaussian => math::sample_gauss(rng, params.sd_scale),
            SampleMethod::Uniform | SampleMethod::Whole => {
                math::sample_symmetric(rng, params.scale_range)
            }
        };

        let m = math::scale_multiplier(exponent);
        let nw = (bw * m).max(MIN_CANDIDATE_SIDE).min(width.max(MIN_CANDIDATE_SIDE));
        let nh = (bh * m).max(MIN_CANDIDATE_SIDE).min(height.max(MIN_CANDIDATE_SIDE));

        let (ncx, ncy) = match params.method {
            SampleMethod::Gaussian => (
                cx + math::sample_gauss(rng, params.sd_x * bw),
                cy + math::sample_gauss(rng, params.sd_y * bh),
            ),
            SampleMethod::Uniform => (
                cx + math::sample_symmetric(rng, params.trans_range * bw),
                cy + math::sample_symmetric(rng, params.trans_range * bh),
            ),
            SampleMethod::Whole => (
                math::sample_between(rng, nw / 2.0, width - nw / 2.0),
                math::sample_between(rng, nh / 2.0, height - nh / 2.0),
            ),
        };

        let ncx = ncx.max(0.0).min(width);
        let ncy = ncy.max(0.0).min(height);

        BoundingBox::from_center(ncx, ncy, nw, nh).crop_against_width_height(width, height)
    }

    /// `count` positives, each overlapping the current box by at least
    /// `iou_threshold`. A search that exhausts its attempts keeps the best
    /// candidate it saw.
    pub fn make_candidates_pos(
        &mut self,
        count: usize,
        params: &CandidateParams,
        iou_threshold: f32,
    ) -> Result<Vec<Candidate>> {
        let pair = self.pair.as_ref().ok_or(Error::SamplerNotReset)?;
        let gt = pair.bbox_curr;
        let (w, h) = image::dims(&pair.image_curr);
        let (w, h) = (w as f32, h as f32);
        let max_attempts = self.config.max_pos_attempts;

        let mut out = Vec::with_capacity(count);

        for _ in 0..count {
            let mut best: Option<(BoundingBox, f32)> = None;
            let mut accepted = None;

            for _ in 0..max_attempts {
                let bbox = Self::generate_one_random_candidate(&gt, &mut self.rng, w, h, params);
                let iou = bbox.iou(&gt);

                if iou >= iou_threshold {
                    accepted = Some(bbox);
                    break;
                }

                if best.map_or(true, |(_, b)| iou > b) {
                    best = Some((bbox, iou));
                }
            }

            let bbox = match accepted {
                Some(bbox) => bbox,
                None => {
                    self.stats.pos_fallbacks += 1;
                    warn!(
                        "positive search exhausted {} attempts, best iou {:.3} < {:.3}",
                        max_attempts,
                        best.map_or(0.0, |(_, iou)| iou),
                        iou_threshold
                    );

                    best.map_or(gt, |(bbox, _)| bbox)
                }
            };

            out.push(Candidate::positive(bbox, &gt));
        }

        trace!("sampled {} positive candidates around {:?}", out.len(), gt);

        Ok(out)
    }

    /// `count` negatives; overlap is not checked, the sampling range decides
    /// how hard they are.
    pub fn make_candidates_neg(
        &mut self,
        count: usize,
        params: &CandidateParams,
    ) -> Result<Vec<Candidate>> {
        let pair = self.pair.as_ref().ok_or(Error::SamplerNotReset)?;
        let gt = pair.bbox_curr;
        let (w, h) = image::dims(&pair.image_curr);
        let (w, h) = (w as f32, h as f32);

        let out: Vec<_> = (0..count)
            .map(|_| {
                let bbox = Self::generate_one_random_candidate(&gt, &mut self.rng, w, h, params);
                Candidate::negative(bbox, &gt)
            })
            .collect();

        trace!("sampled {} {:?} negative candidates", out.len(), params.method);

        Ok(out)
    }

    /// Positives plus half near-miss and half whole-image negatives, shuffled.
    pub fn make_candidates_and_labels(
        &mut self,
        num_pos: usize,
        num_neg: usize,
    ) -> Result<Vec<Candidate>> {
        let pos_params = CandidateParams::positive(&self.config);
        let near_params = CandidateParams::near_negative(&self.config);
        let whole_params = CandidateParams::whole_negative(&self.config);
        let threshold = self.config.pos_iou_threshold;

        let near = num_neg / 2;

        let mut all = self.make_candidates_pos(num_pos, &pos_params, threshold)?;
        all.extend(self.make_candidates_neg(near, &near_params)?);
        all.extend(self.make_candidates_neg(num_neg - near, &whole_params)?);

        self.shuffle(&mut all);

        Ok(all)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Pixel crops and label values for candidates sampled from the current frame.
    pub fn candidate_crops(&self, candidates: &[Candidate]) -> Result<(Vec<Image>, Vec<f32>)> {
        let pair = self.pair()?;

        let mut crops = Vec::with_capacity(candidates.len());
        let mut labels = Vec::with_capacity(candidates.len());

        for c in candidates {
            crops.push(image::crop_out_region(&pair.image_curr, &c.bbox)?);
            labels.push(c.label.value());
        }

        Ok((crops, labels))
    }
}
