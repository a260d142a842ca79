use crate::candidate::{TrainingBatch, TrainingExample, NEG_LABEL, POS_LABEL};
use crate::circular_queue::CircularQueue;
use crate::image::Image;

/// Labeled material collected from one frame.
#[derive(Debug, Clone)]
pub struct OnlineSample {
    pub frame_index: usize,
    pub success: bool,
    pub examples: Vec<TrainingExample>,
    pub positives: Vec<Image>,
    pub negatives: Vec<Image>,
}

impl OnlineSample {
    /// Placeholder for a frame nothing usable could be sampled from.
    pub fn empty(frame_index: usize, success: bool) -> Self {
        Self {
            frame_index,
            success,
            examples: Vec::new(),
            positives: Vec::new(),
            negatives: Vec::new(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty() && self.positives.is_empty() && self.negatives.is_empty()
    }
}

/// Rolling per-video store of online samples.
#[derive(Debug)]
pub struct OnlineSamplePool {
    queue: CircularQueue<OnlineSample>,
}

impl OnlineSamplePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: CircularQueue::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn enqueue(&mut self, sample: OnlineSample) {
        self.queue.push(sample);
    }

    /// Enqueue events since the pool was created or cleared.
    #[inline]
    pub fn enqueued(&self) -> usize {
        self.queue.pushed()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.queue.clear()
    }

    #[inline]
    pub fn latest(&self) -> Option<&OnlineSample> {
        self.queue.newest()
    }

    /// Up to `frames` most recent samples, newest first.
    #[inline]
    pub fn window(&self, frames: usize) -> impl Iterator<Item = &'_ OnlineSample> {
        self.queue.recent(frames)
    }

    /// Gathers the last `frames` samples plus `anchor` into a batch. The
    /// candidate crops come back as a separate list so the caller can
    /// shuffle them before they are added.
    pub fn collect_batch(
        &self,
        frames: usize,
        anchor: Option<&OnlineSample>,
    ) -> (TrainingBatch, Vec<(Image, f32)>) {
        let mut batch = TrainingBatch::default();
        let mut candidates = Vec::new();

        for sample in anchor.into_iter().chain(self.window(frames)) {
            for example in &sample.examples {
                batch.push_example(example.clone());
            }

            candidates.extend(sample.positives.iter().map(|c| (c.clone(), POS_LABEL)));
            candidates.extend(sample.negatives.iter().map(|c| (c.clone(), NEG_LABEL)));
        }

        (batch, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BoundingBox;
    use crate::image;

    fn sample(frame_index: usize, success: bool, pos: usize, neg: usize) -> OnlineSample {
        let crop = image::blank(4, 4, 3);
        let examples = if success {
            vec![TrainingExample {
                image: image::blank(8, 8, 3),
                target: image::blank(8, 8, 3),
                bbox_gt_scaled: BoundingBox::new(2.5, 2.5, 7.5, 7.5),
            }]
        } else {
            Vec::new()
        };

        OnlineSample {
            frame_index,
            success,
            examples,
            positives: vec![crop.clone(); pos],
            negatives: vec![crop; neg],
        }
    }

    #[test]
    fn test_pool_is_bounded() {
        let mut pool = OnlineSamplePool::new(3);
        for i in 0..5 {
            pool.enqueue(sample(i, true, 1, 1));
        }

        assert_eq!(pool.len(), 3);
        assert_eq!(pool.enqueued(), 5);
        assert_eq!(pool.latest().map(|s| s.frame_index), Some(4));

        let frames: Vec<_> = pool.window(10).map(|s| s.frame_index).collect();
        assert_eq!(frames, vec![4, 3, 2]);
    }

    #[test]
    fn test_collect_batch_window_and_anchor() {
        let mut pool = OnlineSamplePool::new(10);
        pool.enqueue(sample(1, true, 2, 3));
        pool.enqueue(sample(2, false, 0, 4));
        pool.enqueue(sample(3, true, 2, 3));

        let anchor = sample(0, true, 5, 5);

        let (batch, candidates) = pool.collect_batch(2, Some(&anchor));
        // anchor + frames 3 and 2
        assert_eq!(batch.num_examples(), 2);
        assert_eq!(candidates.len(), 10 + 5 + 4);
        assert_eq!(candidates.iter().filter(|(_, l)| *l == POS_LABEL).count(), 7);

        let (batch, candidates) = pool.collect_batch(10, None);
        assert_eq!(batch.num_examples(), 2);
        assert_eq!(candidates.len(), 5 + 4 + 5);
    }

    #[test]
    fn test_empty_sample() {
        let s = OnlineSample::empty(7, false);
        assert!(s.is_empty());
        assert!(!sample(1, false, 0, 1).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut pool = OnlineSamplePool::new(4);
        pool.enqueue(sample(1, true, 1, 1));
        pool.clear();

        assert!(pool.is_empty());
        assert_eq!(pool.enqueued(), 0);
        assert_eq!(pool.capacity(), 4);
    }
}
