use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use crate::candidate::{CandidateParams, TrainingBatch};
use crate::config::{FineTuneConfig, TrackerConfig};
use crate::error::{Error, Result};
use crate::image::{self, Image};
use crate::pool::OnlineSample;
use crate::sampler::ExampleGenerator;
use crate::track::TrackedFrame;
use crate::tracker::TrackerState;
use crate::{BoundingBox, Estimator, FrameSink, FrameSource, IterationMarker, Trainer};

/// Identity of the video being tracked.
#[derive(Debug, Clone, Copy)]
pub struct VideoContext<'a> {
    pub video_num: usize,
    pub name: &'a str,
    pub num_frames: usize,
}

/// Hooks the control loop calls around each video and frame.
pub trait TrackPolicy {
    /// After the first annotated frame is loaded and the state is built from it.
    fn video_init(&mut self, _video: &VideoContext<'_>, _state: &mut TrackerState) -> Result<()> {
        Ok(())
    }

    /// Right before the estimator runs on a frame.
    fn setup_estimate(&mut self) {}

    /// After the estimate for a frame is known, before the state advances.
    fn process_track_output(
        &mut self,
        video: &VideoContext<'_>,
        frame: &TrackedFrame<'_>,
        state: &mut TrackerState,
    ) -> Result<()>;

    /// Once per started video, whether tracking it succeeded or not.
    fn post_process_video(
        &mut self,
        _video: &VideoContext<'_>,
        _estimator: &mut dyn Estimator,
    ) -> Result<()> {
        Ok(())
    }

    fn post_process_all(&mut self) {}

    /// Estimator confidence below which a frame counts as failed.
    fn success_threshold(&self) -> f32 {
        FineTuneConfig::default().success_threshold
    }

    /// Capacity of the per-video online sample pool.
    fn pool_capacity(&self) -> usize {
        FineTuneConfig::default().pool_capacity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReport {
    pub video_num: usize,
    pub name: String,
    pub frames_tracked: usize,
    pub failures: usize,
    pub samples_enqueued: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub videos: Vec<VideoReport>,
    /// Videos that were abandoned, with the reason.
    pub skipped: Vec<(usize, String)>,
}

impl RunSummary {
    #[inline]
    pub fn total_frames(&self) -> usize {
        self.videos.iter().map(|v| v.frames_tracked).sum()
    }
}

/// Runs the estimator over every frame of every video, in order, and lets
/// the policy act on the output.
pub struct TrackerManager<E, P> {
    estimator: E,
    policy: P,
}

impl<E: Estimator, P: TrackPolicy> TrackerManager<E, P> {
    pub fn new(estimator: E, policy: P) -> Self {
        Self { estimator, policy }
    }

    #[inline]
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    #[inline]
    pub fn policy(&self) -> &P {
        &self.policy
    }

    #[inline]
    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    pub fn into_parts(self) -> (E, P) {
        (self.estimator, self.policy)
    }

    #[inline]
    pub fn track_all<S: FrameSource>(&mut self, videos: &[S]) -> RunSummary {
        self.track_all_from(videos, 0)
    }

    /// Tracks `videos[start_video..]`. A video that fails is reported and
    /// skipped; the run goes on with the next one.
    pub fn track_all_from<S: FrameSource>(&mut self, videos: &[S], start_video: usize) -> RunSummary {
        let mut summary = RunSummary::default();

        for (video_num, source) in videos.iter().enumerate().skip(start_video) {
            let video = VideoContext {
                video_num,
                name: source.name(),
                num_frames: source.len(),
            };

            info!("video {}: {}", video_num + 1, video.name);

            let tracked = self.track_video(&video, source);
            let post = self.policy.post_process_video(&video, &mut self.estimator);

            match tracked.and_then(|report| post.map(|_| report)) {
                Ok(report) => {
                    info!(
                        "video {}: tracked {} frames, {} failed",
                        video_num + 1,
                        report.frames_tracked,
                        report.failures
                    );

                    summary.videos.push(report);
                }
                Err(err) => {
                    error!("video {} ({}) skipped: {}", video_num + 1, video.name, err);
                    summary.skipped.push((video_num, err.to_string()));
                }
            }
        }

        self.policy.post_process_all();

        summary
    }

    fn track_video<S: FrameSource + ?Sized>(
        &mut self,
        video: &VideoContext<'_>,
        source: &S,
    ) -> Result<VideoReport> {
        let first = source.load_first_annotation()?;
        let gt = first
            .annotation
            .ok_or_else(|| Error::MissingFirstAnnotation {
                video: video.name.to_string(),
            })?
            .validated(&first.image)?;

        let success_threshold = self.policy.success_threshold();
        let mut state =
            TrackerState::new(first.image, gt, first.index, self.policy.pool_capacity());
        self.policy.video_init(video, &mut state)?;

        let mut frames_tracked = 0;

        for frame_num in first.index + 1..video.num_frames {
            let frame = source.load_frame(frame_num, false, false)?;

            self.policy.setup_estimate();

            // ground truth of this frame never reaches the estimator
            let estimate = state.track(&mut self.estimator, &frame.image, success_threshold);

            let tracked = TrackedFrame {
                frame_num,
                image: &frame.image,
                annotation: frame.annotation,
                estimate,
                success: state.is_success_estimate(),
            };

            self.policy.process_track_output(video, &tracked, &mut state)?;

            state.update_state(frame.image, estimate);
            frames_tracked += 1;
        }

        Ok(VideoReport {
            video_num: video.video_num,
            name: video.name.to_string(),
            frames_tracked,
            failures: state.failures(),
            samples_enqueued: state.pool.enqueued(),
        })
    }
}

/// Copy of the frame with ground truth in white and the estimate in red.
fn annotate(frame: &TrackedFrame<'_>) -> Image {
    let mut out = frame.image.clone();

    if let Some(gt) = frame.annotation {
        gt.draw_bounding_box(&mut out);
    }

    frame.estimate.draw(image::RED, &mut out, 2);

    out
}

/// Draws every tracked frame and hands it to a sink.
pub struct VisualizePolicy<K> {
    sink: K,
}

impl<K: FrameSink> VisualizePolicy<K> {
    pub fn new(sink: K) -> Self {
        Self { sink }
    }

    pub fn into_sink(self) -> K {
        self.sink
    }
}

impl<K: FrameSink> TrackPolicy for VisualizePolicy<K> {
    fn video_init(&mut self, video: &VideoContext<'_>, _state: &mut TrackerState) -> Result<()> {
        info!("Video: {}", video.video_num);
        Ok(())
    }

    fn process_track_output(
        &mut self,
        video: &VideoContext<'_>,
        frame: &TrackedFrame<'_>,
        _state: &mut TrackerState,
    ) -> Result<()> {
        let out = annotate(frame);
        self.sink.write_frame(video.video_num, frame.frame_num, &out)
    }

    fn post_process_video(
        &mut self,
        video: &VideoContext<'_>,
        _estimator: &mut dyn Estimator,
    ) -> Result<()> {
        self.sink.finish_video(video.video_num)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FineTuneReason {
    LastFrame,
    Failure,
    Periodic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FineTuneStats {
    pub bootstrap_batches: usize,
    pub online_updates: usize,
    pub trainer_calls: usize,
    pub resets: usize,
}

/// Adapts the estimator to each video: primes it on the first frame, keeps
/// collecting samples while tracking and retrains from them when the
/// trigger fires. Weights and solver state are reset after every video.
pub struct FineTunePolicy<T> {
    trainer: T,
    generator: ExampleGenerator,
    config: FineTuneConfig,
    sink: Option<Box<dyn FrameSink>>,
    total_frames: usize,
    stats: FineTuneStats,
}

impl<T: Trainer> FineTunePolicy<T> {
    pub fn new(trainer: T, config: &TrackerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            trainer,
            generator: ExampleGenerator::new(config.sampler.clone())?,
            config: config.fine_tune.clone(),
            sink: None,
            total_frames: 0,
            stats: FineTuneStats::default(),
        })
    }

    /// Also forwards annotated frames to `sink`, e.g. a video encoder.
    pub fn with_sink<K: FrameSink + 'static>(mut self, sink: K) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    #[inline]
    pub fn trainer(&self) -> &T {
        &self.trainer
    }

    #[inline]
    pub fn stats(&self) -> FineTuneStats {
        self.stats
    }

    #[inline]
    pub fn generator(&self) -> &ExampleGenerator {
        &self.generator
    }

    /// Which trigger, if any, fires after `frame_num`.
    pub fn fine_tune_reason(
        &self,
        frame_num: usize,
        success: bool,
        is_last_frame: bool,
    ) -> Option<FineTuneReason> {
        let trigger = &self.config.trigger;

        if trigger.on_last_frame && is_last_frame {
            Some(FineTuneReason::LastFrame)
        } else if trigger.on_failure && !success {
            Some(FineTuneReason::Failure)
        } else if trigger.interval > 0 && frame_num % trigger.interval == 0 {
            Some(FineTuneReason::Periodic)
        } else {
            None
        }
    }

    fn bootstrap(&mut self, state: &mut TrackerState) -> Result<()> {
        let gt = state.bbox_prev;

        for iter in 0..self.config.bootstrap_iterations {
            debug!("first frame fine tune iter {}", iter);

            let image = &state.image_prev;
            self.generator.reset(&gt, &gt, image, image)?;

            let mut batch = TrainingBatch::default();
            batch.push_example(self.generator.make_true_example()?);
            for example in self.generator.make_training_examples(self.config.augment_count)? {
                batch.push_example(example);
            }

            let candidates = self
                .generator
                .make_candidates_and_labels(self.config.first_frame_pos, self.config.first_frame_neg)?;
            let (crops, labels) = self.generator.candidate_crops(&candidates)?;
            for (crop, label) in crops.into_iter().zip(labels) {
                batch.push_candidate(crop, label);
            }

            self.trainer.train_batch(&batch, IterationMarker::Bootstrap)?;
            self.stats.bootstrap_batches += 1;
            self.stats.trainer_calls += 1;
        }

        let anchor = self.sample_frame(
            state.cur_frame,
            &state.image_prev,
            &gt,
            &state.image_prev,
            &gt,
        )?;
        state.anchor = Some(anchor);

        Ok(())
    }

    fn sample_frame(
        &mut self,
        frame_index: usize,
        image_prev: &Image,
        bbox_prev: &BoundingBox,
        image_curr: &Image,
        bbox_curr: &BoundingBox,
    ) -> Result<OnlineSample> {
        self.generator
            .reset(bbox_prev, bbox_curr, image_prev, image_curr)?;

        let mut examples = vec![self.generator.make_true_example()?];
        examples.extend(self.generator.make_training_examples(self.config.augment_count)?);

        let candidates = self
            .generator
            .make_candidates_and_labels(self.config.frame_pos, self.config.frame_neg)?;
        let (crops, _) = self.generator.candidate_crops(&candidates)?;

        let mut positives = Vec::with_capacity(self.config.frame_pos);
        let mut negatives = Vec::with_capacity(self.config.frame_neg);
        for (crop, candidate) in crops.into_iter().zip(&candidates) {
            if candidate.is_positive() {
                positives.push(crop);
            } else {
                negatives.push(crop);
            }
        }

        Ok(OnlineSample {
            frame_index,
            success: true,
            examples,
            positives,
            negatives,
        })
    }

    /// A failed estimate contributes only negatives drawn around it.
    fn sample_failed_frame(
        &mut self,
        frame_index: usize,
        image_curr: &Image,
        estimate: &BoundingBox,
    ) -> Result<OnlineSample> {
        self.generator.reset(estimate, estimate, image_curr, image_curr)?;

        let params = CandidateParams::near_negative(self.generator.config());
        let candidates = self.generator.make_candidates_neg(self.config.frame_neg, &params)?;
        let (negatives, _) = self.generator.candidate_crops(&candidates)?;

        Ok(OnlineSample {
            negatives,
            ..OnlineSample::empty(frame_index, false)
        })
    }

    fn enqueue_online_samples(&mut self, state: &mut TrackerState, frame: &TrackedFrame<'_>) {
        let sampled = if frame.success {
            self.sample_frame(
                frame.frame_num,
                &state.image_prev,
                &state.bbox_prev,
                frame.image,
                &frame.estimate,
            )
        } else {
            self.sample_failed_frame(frame.frame_num, frame.image, &frame.estimate)
        };

        let sample = sampled.unwrap_or_else(|err| {
            warn!("frame {}: no online samples: {}", frame.frame_num, err);
            OnlineSample::empty(frame.frame_num, frame.success)
        });

        debug!(
            "frame {}: enqueue {} examples, {} pos, {} neg",
            frame.frame_num,
            sample.examples.len(),
            sample.positives.len(),
            sample.negatives.len()
        );

        state.pool.enqueue(sample);
    }

    fn fine_tune_online(
        &mut self,
        state: &TrackerState,
        reason: FineTuneReason,
        frame_num: usize,
    ) -> Result<()> {
        let window = match reason {
            FineTuneReason::Failure => self.config.short_term_window,
            FineTuneReason::LastFrame | FineTuneReason::Periodic => self.config.long_term_window,
        };

        let (mut batch, mut candidates) = state.pool.collect_batch(window, state.anchor.as_ref());
        self.generator.shuffle(&mut candidates);
        for (crop, label) in candidates {
            batch.push_candidate(crop, label);
        }

        if batch.is_empty() {
            debug!("frame {}: nothing to fine-tune on", frame_num);
            return Ok(());
        }

        debug!(
            "frame {}: fine-tune ({:?}) on {} examples, {} candidates",
            frame_num,
            reason,
            batch.num_examples(),
            batch.num_candidates()
        );

        for _ in 0..self.config.online_iterations {
            self.trainer
                .train_batch(&batch, IterationMarker::Step(frame_num))?;
            self.stats.trainer_calls += 1;
        }

        self.stats.online_updates += 1;

        Ok(())
    }
}

impl<T: Trainer> TrackPolicy for FineTunePolicy<T> {
    fn video_init(&mut self, video: &VideoContext<'_>, state: &mut TrackerState) -> Result<()> {
        self.total_frames = video.num_frames;

        info!("fine-tuning on the first frame of video {}", video.video_num);
        self.bootstrap(state)
    }

    fn process_track_output(
        &mut self,
        video: &VideoContext<'_>,
        frame: &TrackedFrame<'_>,
        state: &mut TrackerState,
    ) -> Result<()> {
        self.enqueue_online_samples(state, frame);

        let is_last_frame = frame.frame_num + 1 == self.total_frames;
        if let Some(reason) = self.fine_tune_reason(frame.frame_num, frame.success, is_last_frame) {
            self.fine_tune_online(state, reason, frame.frame_num)?;
        }

        if let Some(sink) = self.sink.as_mut() {
            let out = annotate(frame);
            sink.write_frame(video.video_num, frame.frame_num, &out)?;
        }

        Ok(())
    }

    fn post_process_video(
        &mut self,
        video: &VideoContext<'_>,
        estimator: &mut dyn Estimator,
    ) -> Result<()> {
        let weights = estimator.reset();
        let solver = self.trainer.reset_solver_state();
        let sink = match self.sink.as_mut() {
            Some(sink) => sink.finish_video(video.video_num),
            None => Ok(()),
        };

        self.stats.resets += 1;

        weights.and(solver).and(sink)
    }

    fn success_threshold(&self) -> f32 {
        self.config.success_threshold
    }

    fn pool_capacity(&self) -> usize {
        self.config.pool_capacity
    }
}

/// Writes per-frame results to one file per video and times the estimator.
pub struct BenchmarkPolicy {
    output_dir: PathBuf,
    sink: Option<Box<dyn FrameSink>>,
    output: Option<BufWriter<File>>,
    started: Option<Instant>,
    total_ms: f64,
    num_frames: usize,
    num_videos: usize,
}

impl BenchmarkPolicy {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            sink: None,
            output: None,
            started: None,
            total_ms: 0.0,
            num_frames: 0,
            num_videos: 0,
        }
    }

    pub fn with_sink<K: FrameSink + 'static>(mut self, sink: K) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Result file for a video: its last path component inside the output directory.
    pub fn result_path(&self, video: &VideoContext<'_>) -> PathBuf {
        let name = video
            .name
            .rsplit('/')
            .find(|part| !part.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("video{}", video.video_num));

        self.output_dir.join(name)
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Mean estimator time per frame.
    pub fn mean_ms(&self) -> Option<f64> {
        if self.num_frames == 0 {
            None
        } else {
            Some(self.total_ms / self.num_frames as f64)
        }
    }
}

impl TrackPolicy for BenchmarkPolicy {
    fn video_init(&mut self, video: &VideoContext<'_>, _state: &mut TrackerState) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;

        let path = self.result_path(video);
        info!("Video {}: writing results to {}", video.video_num + 1, path.display());

        self.output = Some(BufWriter::new(File::create(path)?));
        self.num_videos += 1;

        Ok(())
    }

    fn setup_estimate(&mut self) {
        self.started = Some(Instant::now());
    }

    fn process_track_output(
        &mut self,
        video: &VideoContext<'_>,
        frame: &TrackedFrame<'_>,
        _state: &mut TrackerState,
    ) -> Result<()> {
        let ms = self
            .started
            .take()
            .map_or(0.0, |t| t.elapsed().as_secs_f64() * 1000.0);

        self.total_ms += ms;
        self.num_frames += 1;

        let [x_min, y_min, width, height] = frame.estimate.to_ltwh();

        if let Some(out) = self.output.as_mut() {
            writeln!(
                out,
                "{} {:.6} {:.6} {:.6} {:.6}",
                frame.frame_num + 1,
                x_min,
                y_min,
                width,
                height
            )?;
        }

        if let Some(sink) = self.sink.as_mut() {
            let out = annotate(frame);
            sink.write_frame(video.video_num, frame.frame_num, &out)?;
        }

        Ok(())
    }

    fn post_process_video(
        &mut self,
        video: &VideoContext<'_>,
        _estimator: &mut dyn Estimator,
    ) -> Result<()> {
        let flushed = match self.output.take() {
            Some(mut out) => out.flush().map_err(Error::from),
            None => Ok(()),
        };

        let sink = match self.sink.as_mut() {
            Some(sink) => sink.finish_video(video.video_num),
            None => Ok(()),
        };

        flushed.and(sink)
    }

    fn post_process_all(&mut self) {
        info!(
            "Finished tracking {} videos with {} total frames",
            self.num_videos, self.num_frames
        );

        if let Some(mean) = self.mean_ms() {
            info!("Mean time: {:.3} ms", mean);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FineTuneTrigger;
    use crate::{Estimate, Frame};

    struct Recorder {
        calls: Vec<(i64, usize, usize)>,
        resets: usize,
    }

    impl Trainer for Recorder {
        fn train_batch(&mut self, batch: &TrainingBatch, iteration: IterationMarker) -> Result<()> {
            self.calls
                .push((iteration.raw(), batch.num_examples(), batch.num_candidates()));
            Ok(())
        }

        fn reset_solver_state(&mut self) -> Result<()> {
            self.resets += 1;
            Ok(())
        }
    }

    struct Still;

    impl Estimator for Still {
        fn predict(&mut self, _: &Image, bbox_prev: &BoundingBox, _: &Image) -> Result<Estimate> {
            Ok(Estimate::new(*bbox_prev))
        }

        fn reset(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct Clip {
        name: String,
        frames: usize,
        first: Option<BoundingBox>,
    }

    impl FrameSource for Clip {
        fn name(&self) -> &str {
            &self.name
        }

        fn len(&self) -> usize {
            self.frames
        }

        fn load_first_annotation(&self) -> Result<Frame> {
            Ok(Frame {
                index: 0,
                image: image::blank(64, 48, 3),
                annotation: self.first,
            })
        }

        fn load_frame(&self, index: usize, _: bool, _: bool) -> Result<Frame> {
            if index >= self.frames {
                return Err(Error::FrameOutOfRange {
                    index,
                    len: self.frames,
                });
            }

            Ok(Frame {
                index,
                image: image::blank(64, 48, 3),
                annotation: None,
            })
        }
    }

    fn small_config() -> TrackerConfig {
        let mut config = TrackerConfig::default();
        config.fine_tune.bootstrap_iterations = 2;
        config.fine_tune.augment_count = 2;
        config.fine_tune.first_frame_pos = 4;
        config.fine_tune.first_frame_neg = 10;
        config.fine_tune.frame_pos = 3;
        config.fine_tune.frame_neg = 6;
        config
    }

    fn policy(trigger: FineTuneTrigger) -> FineTunePolicy<Recorder> {
        let mut config = small_config();
        config.fine_tune.trigger = trigger;

        FineTunePolicy::new(
            Recorder {
                calls: Vec::new(),
                resets: 0,
            },
            &config,
        )
        .unwrap()
    }

    #[test]
    fn test_trigger_precedence() {
        let p = policy(FineTuneTrigger::default());

        assert_eq!(p.fine_tune_reason(7, false, true), Some(FineTuneReason::LastFrame));
        assert_eq!(p.fine_tune_reason(7, false, false), Some(FineTuneReason::Failure));
        assert_eq!(p.fine_tune_reason(10, true, false), Some(FineTuneReason::Periodic));
        assert_eq!(p.fine_tune_reason(11, true, false), None);
    }

    #[test]
    fn test_trigger_disabled_factors() {
        let p = policy(FineTuneTrigger {
            interval: 0,
            on_failure: false,
            on_last_frame: false,
        });

        assert_eq!(p.fine_tune_reason(10, false, true), None);
    }

    #[test]
    fn test_bootstrap_batches() {
        let mut manager = TrackerManager::new(Still, policy(FineTuneTrigger::default()));
        let clip = Clip {
            name: "clip".into(),
            frames: 1,
            first: Some(BoundingBox::new(10.0, 10.0, 30.0, 30.0)),
        };

        let summary = manager.track_all(&[clip]);
        assert_eq!(summary.videos.len(), 1);

        let trainer = manager.policy().trainer();
        assert_eq!(trainer.calls.len(), 2);
        for &(marker, examples, candidates) in &trainer.calls {
            assert_eq!(marker, IterationMarker::BOOTSTRAP_RAW);
            assert_eq!(examples, 1 + 2);
            assert_eq!(candidates, 4 + 10);
        }
        assert_eq!(trainer.resets, 1);
    }

    #[test]
    fn test_online_updates_use_step_marker() {
        let trigger = FineTuneTrigger {
            interval: 2,
            on_failure: true,
            on_last_frame: true,
        };
        let mut manager = TrackerManager::new(Still, policy(trigger));
        let clip = Clip {
            name: "clip".into(),
            frames: 6,
            first: Some(BoundingBox::new(10.0, 10.0, 30.0, 30.0)),
        };

        manager.track_all(&[clip]);

        let p = manager.policy();
        let online: Vec<_> = p.trainer().calls.iter().filter(|c| c.0 >= 0).collect();

        // frames 2 and 4 periodic, frame 5 last
        assert_eq!(online.iter().map(|c| c.0).collect::<Vec<_>>(), vec![2, 4, 5]);
        assert_eq!(p.stats().online_updates, 3);

        // anchor plus frames 1..=5, each with 1 + 2 examples and 3 + 6 candidates
        let last = online.last().unwrap();
        assert_eq!(last.1, 6 * 3);
        assert_eq!(last.2, 6 * 9);
    }

    #[test]
    fn test_pool_capacity_comes_from_policy() {
        let mut config = small_config();
        config.fine_tune.pool_capacity = 2;
        let policy = FineTunePolicy::new(
            Recorder {
                calls: Vec::new(),
                resets: 0,
            },
            &config,
        )
        .unwrap();
        assert_eq!(policy.pool_capacity(), 2);

        let mut manager = TrackerManager::new(Still, policy);
        let clip = Clip {
            name: "clip".into(),
            frames: 6,
            first: Some(BoundingBox::new(10.0, 10.0, 30.0, 30.0)),
        };

        let summary = manager.track_all(&[clip]);
        assert_eq!(summary.videos[0].samples_enqueued, 5);

        // last-frame batch: anchor plus the two samples the pool still holds
        let last = manager.policy().trainer().calls.last().unwrap();
        assert_eq!(last.0, 5);
        assert_eq!(last.1, 3 * 3);
        assert_eq!(last.2, 3 * 9);
    }

    #[test]
    fn test_missing_first_annotation_skips_video() {
        let mut manager = TrackerManager::new(Still, policy(FineTuneTrigger::default()));
        let clips = [
            Clip {
                name: "broken".into(),
                frames: 3,
                first: None,
            },
            Clip {
                name: "fine".into(),
                frames: 3,
                first: Some(BoundingBox::new(10.0, 10.0, 30.0, 30.0)),
            },
        ];

        let summary = manager.track_all(&clips);

        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].0, 0);
        assert_eq!(summary.videos.len(), 1);
        assert_eq!(summary.videos[0].name, "fine");
        assert_eq!(summary.videos[0].frames_tracked, 2);
        // reset ran for both videos
        assert_eq!(manager.policy().trainer().resets, 2);
    }

    #[test]
    fn test_benchmark_result_file() {
        let dir = std::env::temp_dir().join(format!("ftrack-bench-{}", std::process::id()));
        let mut manager = TrackerManager::new(Still, BenchmarkPolicy::new(&dir));
        let clip = Clip {
            name: "data/vot/ball".into(),
            frames: 3,
            first: Some(BoundingBox::new(10.0, 12.0, 30.0, 40.0)),
        };

        let summary = manager.track_all(&[clip]);
        assert_eq!(summary.total_frames(), 2);
        assert_eq!(manager.policy().num_frames(), 2);
        assert!(manager.policy().mean_ms().is_some());

        let written = fs::read_to_string(dir.join("ball")).unwrap();
        assert_eq!(
            written,
            "2 10.000000 12.000000 20.000000 28.000000\n\
             3 10.000000 12.000000 20.000000 28.000000\n"
        );

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_visualize_draws_estimate() {
        struct Frames(Vec<(usize, Image)>, usize);

        impl FrameSink for Frames {
            fn write_frame(&mut self, _: usize, frame_num: usize, image: &Image) -> Result<()> {
                self.0.push((frame_num, image.clone()));
                Ok(())
            }

            fn finish_video(&mut self, _: usize) -> Result<()> {
                self.1 += 1;
                Ok(())
            }
        }

        let mut manager = TrackerManager::new(Still, VisualizePolicy::new(Frames(Vec::new(), 0)));
        let clip = Clip {
            name: "clip".into(),
            frames: 3,
            first: Some(BoundingBox::new(10.0, 10.0, 30.0, 30.0)),
        };

        manager.track_all(&[clip]);

        let (_, policy) = manager.into_parts();
        let sink = policy.into_sink();
        assert_eq!(sink.0.iter().map(|f| f.0).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(sink.0[0].1[[10, 20, 0]], 255);
        assert_eq!(sink.0[0].1[[10, 20, 1]], 0);
        assert_eq!(sink.1, 1);
    }
}
