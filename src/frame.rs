use crate::bbox::BoundingBox;
use crate::image::{self, Image};

/// One decoded video frame and its ground truth, if the dataset has any.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub image: Image,
    pub annotation: Option<BoundingBox>,
}

impl Frame {
    #[inline]
    pub fn has_annotation(&self) -> bool {
        self.annotation.is_some()
    }

    /// (width, height)
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        image::dims(&self.image)
    }
}
