use ftrack::image;
use ftrack::{
    BenchmarkPolicy, BoundingBox, Error, Estimate, Estimator, FineTunePolicy, Frame, FrameSource,
    Image, IterationMarker, Result, TrackerConfig, TrackerManager, Trainer, TrainingBatch,
};

struct Video {
    name: String,
    frames: usize,
    first: Option<usize>,
}

impl Video {
    fn new(name: &str, frames: usize, first: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            frames,
            first,
        }
    }

    fn gt(index: usize) -> BoundingBox {
        let offset = index as f32 * 2.0;
        BoundingBox::new(20.0 + offset, 16.0, 44.0 + offset, 40.0)
    }
}

impl FrameSource for Video {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.frames
    }

    fn load_first_annotation(&self) -> Result<Frame> {
        let index = self.first.unwrap_or(0);

        Ok(Frame {
            index,
            image: image::blank(96, 72, 3),
            annotation: self.first.map(Video::gt),
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
            image: image::blank(96, 72, 3),
            annotation: Some(Video::gt(index)),
        })
    }
}

/// Echoes the previous box and records what it was shown.
#[derive(Default)]
struct Echo {
    seen: Vec<BoundingBox>,
    resets: usize,
    fail: bool,
    confidence: Option<f32>,
}

impl Estimator for Echo {
    fn predict(&mut self, _: &Image, bbox_prev: &BoundingBox, _: &Image) -> Result<Estimate> {
        self.seen.push(*bbox_prev);

        if self.fail {
            Err(Error::Estimator("lost".into()))
        } else {
            Ok(Estimate {
                bbox: *bbox_prev,
                confidence: self.confidence,
            })
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }
}

#[derive(Default)]
struct Solver {
    markers: Vec<i64>,
    resets: usize,
}

impl Trainer for Solver {
    fn train_batch(&mut self, batch: &TrainingBatch, iteration: IterationMarker) -> Result<()> {
        assert!(!batch.is_empty());
        self.markers.push(iteration.raw());
        Ok(())
    }

    fn reset_solver_state(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }
}

fn config() -> TrackerConfig {
    TrackerConfig::from_json_str(
        r#"{
            "sampler": { "seed": 7 },
            "fine_tune": {
                "bootstrap_iterations": 3,
                "augment_count": 2,
                "first_frame_pos": 5,
                "first_frame_neg": 12,
                "frame_pos": 4,
                "frame_neg": 8
            }
        }"#,
    )
    .unwrap()
}

#[test]
fn five_frame_video_with_fine_tuning() {
    let config = config();
    let policy = FineTunePolicy::new(Solver::default(), &config).unwrap();
    let mut manager = TrackerManager::new(Echo::default(), policy);

    let summary = manager.track_all(&[Video::new("seq/car", 5, Some(0))]);

    assert!(summary.skipped.is_empty());
    let report = &summary.videos[0];
    assert_eq!(report.frames_tracked, 4);
    assert_eq!(report.samples_enqueued, 4);
    assert_eq!(report.failures, 0);

    let (estimator, policy) = manager.into_parts();

    // the estimator only ever sees the first annotation, echoed forward
    assert_eq!(estimator.seen, vec![Video::gt(0); 4]);
    assert_eq!(estimator.resets, 1);

    let solver = policy.trainer();
    assert_eq!(solver.resets, 1);
    assert_eq!(&solver.markers[..3], &[-1, -1, -1]);
    // last frame is the only trigger that fires with the default interval
    assert_eq!(&solver.markers[3..], &[4]);
}

#[test]
fn failing_estimator_still_collects_samples() {
    let config = config();
    let policy = FineTunePolicy::new(Solver::default(), &config).unwrap();
    let estimator = Echo {
        fail: true,
        ..Echo::default()
    };
    let mut manager = TrackerManager::new(estimator, policy);

    let summary = manager.track_all(&[Video::new("seq/lost", 4, Some(0))]);

    let report = &summary.videos[0];
    assert_eq!(report.failures, 3);
    assert_eq!(report.samples_enqueued, 3);

    let solver = manager.policy().trainer();
    assert_eq!(
        solver.markers.iter().filter(|&&m| m >= 0).copied().collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn fine_tune_threshold_decides_failures() {
    let failures = |threshold: f32| {
        let mut config = config();
        config.fine_tune.success_threshold = threshold;

        let policy = FineTunePolicy::new(Solver::default(), &config).unwrap();
        let estimator = Echo {
            confidence: Some(0.7),
            ..Echo::default()
        };
        let mut manager = TrackerManager::new(estimator, policy);

        let summary = manager.track_all(&[Video::new("seq/dim", 4, Some(0))]);
        summary.videos[0].failures
    };

    assert_eq!(failures(0.5), 0);
    assert_eq!(failures(0.9), 3);
}

#[test]
fn bad_video_does_not_stop_the_run() {
    let dir = std::env::temp_dir().join(format!("ftrack-run-{}", std::process::id()));
    let mut manager = TrackerManager::new(Echo::default(), BenchmarkPolicy::new(&dir));

    let videos = vec![
        Video::new("seq/first", 3, Some(0)),
        Video::new("seq/unlabeled", 3, None),
        Video::new("seq/late", 4, Some(1)),
    ];

    let summary = manager.track_all(&videos);

    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].0, 1);
    assert_eq!(
        summary.videos.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        vec!["seq/first", "seq/late"]
    );
    assert_eq!(summary.total_frames(), 2 + 2);

    let late = std::fs::read_to_string(dir.join("late")).unwrap();
    let lines: Vec<_> = late.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "3 22.000000 16.000000 24.000000 24.000000");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn start_video_skips_earlier_entries() {
    let dir = std::env::temp_dir().join(format!("ftrack-start-{}", std::process::id()));
    let mut manager = TrackerManager::new(Echo::default(), BenchmarkPolicy::new(&dir));

    let videos = vec![Video::new("a", 3, Some(0)), Video::new("b", 3, Some(0))];
    let summary = manager.track_all_from(&videos, 1);

    assert_eq!(summary.videos.len(), 1);
    assert_eq!(summary.videos[0].video_num, 1);
    assert!(!dir.join("a").exists());

    std::fs::remove_dir_all(&dir).ok();
}
