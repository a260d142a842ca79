pub mod bbox;
pub mod candidate;
pub mod config;
pub mod error;
pub mod frame;
pub mod image;
pub mod manager;
pub mod math;
pub mod pool;
pub mod sampler;
pub mod tracker;

mod circular_queue;
mod track;

pub use bbox::BoundingBox;
pub use candidate::{Candidate, Label, TrainingBatch, TrainingExample, NEG_LABEL, POS_LABEL};
pub use config::{FineTuneConfig, SamplerConfig, TrackerConfig};
pub use error::{Error, Result};
pub use frame::Frame;
pub use image::Image;
pub use manager::{
    BenchmarkPolicy, FineTunePolicy, FineTuneReason, FineTuneStats, RunSummary, TrackPolicy,
    TrackerManager, VideoContext, VideoReport, VisualizePolicy,
};
pub use sampler::ExampleGenerator;
pub use track::TrackedFrame;
pub use tracker::{Estimate, TrackerState};

/// Ordered access to the frames of one annotated video.
pub trait FrameSource {
    /// Identifier of the video, usually its path.
    fn name(&self) -> &str;

    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First frame that carries ground truth.
    fn load_first_annotation(&self) -> Result<Frame>;

    /// Frame `index`; `annotation` is `None` when the frame has no ground
    /// truth. An index past the end is an error.
    fn load_frame(&self, index: usize, draw_bounding_box: bool, load_only_annotation: bool)
        -> Result<Frame>;
}

/// Box regressor run on every frame.
pub trait Estimator {
    /// Must only see the previous frame's box, never the current ground truth.
    fn predict(
        &mut self,
        image_prev: &Image,
        bbox_prev: &BoundingBox,
        image_curr: &Image,
    ) -> Result<Estimate>;

    /// Reloads the baseline weights.
    fn reset(&mut self) -> Result<()>;
}

/// Marks what a trainer call is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationMarker {
    /// First-frame fine-tuning before tracking starts.
    Bootstrap,
    /// Online update after the given frame.
    Step(usize),
}

impl IterationMarker {
    pub const BOOTSTRAP_RAW: i64 = -1;

    /// Integer form expected by solvers: `-1` for bootstrap, else the frame.
    #[inline]
    pub fn raw(self) -> i64 {
        match self {
            IterationMarker::Bootstrap => Self::BOOTSTRAP_RAW,
            IterationMarker::Step(frame) => frame as i64,
        }
    }
}

pub trait Trainer {
    fn train_batch(&mut self, batch: &TrainingBatch, iteration: IterationMarker) -> Result<()>;

    /// Drops optimizer state so the next video starts from the baseline.
    fn reset_solver_state(&mut self) -> Result<()>;
}

/// Receives annotated frames for display or encoding.
pub trait FrameSink {
    fn write_frame(&mut self, video_num: usize, frame_num: usize, image: &Image) -> Result<()>;

    /// Called once a video is done, on success and failure alike.
    #[inline]
    fn finish_video(&mut self, _video_num: usize) -> Result<()> {
        Ok(())
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn load_first_annotation(&self) -> Result<Frame> {
        (**self).load_first_annotation()
    }

    fn load_frame(&self, index: usize, draw_bounding_box: bool, load_only_annotation: bool)
        -> Result<Frame> {
        (**self).load_frame(index, draw_bounding_box, load_only_annotation)
    }
}

impl<T: Estimator + ?Sized> Estimator for Box<T> {
    fn predict(
        &mut self,
        image_prev: &Image,
        bbox_prev: &BoundingBox,
        image_curr: &Image,
    ) -> Result<Estimate> {
        (**self).predict(image_prev, bbox_prev, image_curr)
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }
}

impl<T: Trainer + ?Sized> Trainer for Box<T> {
    fn train_batch(&mut self, batch: &TrainingBatch, iteration: IterationMarker) -> Result<()> {
        (**self).train_batch(batch, iteration)
    }

    fn reset_solver_state(&mut self) -> Result<()> {
        (**self).reset_solver_state()
    }
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn write_frame(&mut self, video_num: usize, frame_num: usize, image: &Image) -> Result<()> {
        (**self).write_frame(video_num, frame_num, image)
    }

    fn finish_video(&mut self, video_num: usize) -> Result<()> {
        (**self).finish_video(video_num)
    }
}
