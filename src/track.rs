use crate::bbox::BoundingBox;
use crate::image::Image;

/// Tracker output for one frame, handed to the active policy.
#[derive(Debug, Clone, Copy)]
pub struct TrackedFrame<'a> {
    pub frame_num: usize,
    pub image: &'a Image,
    pub annotation: Option<BoundingBox>,
    pub estimate: BoundingBox,
    // estimate passed the validity and confidence checks
    pub success: bool,
}
