use crate::error::{Error, Result};
use crate::image::{self, Image};
use crate::math;

use nalgebra as na;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};

/// How much larger than the target the search region is, per side length.
pub const CONTEXT_FACTOR: f32 = 2.0;

/// Network-input coordinates are image-normalized coordinates times this.
pub const SCALE_FACTOR: f32 = 10.0;

const MAX_SHIFT_TRIES: usize = 10;

/// Left-top-right-bottom box in pixel (or scaled network-input) coordinates.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,

    // only meaningful for boxes produced by `scale`
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f32,
}

fn default_scale_factor() -> f32 {
    SCALE_FACTOR
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl From<[f32; 4]> for BoundingBox {
    #[inline]
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    #[inline]
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
    }
}

impl BoundingBox {
    #[inline]
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            scale_factor: SCALE_FACTOR,
        }
    }

    /// Builds a box from left, top, width and height.
    #[inline]
    pub fn from_ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    /// Builds a box from its center and width-height.
    #[inline]
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(
            cx - width / 2.0,
            cy - height / 2.0,
            cx + width / 2.0,
            cy + height / 2.0,
        )
    }

    /// Left-top-width-height, tolerant of swapped corners.
    pub fn to_ltwh(&self) -> [f32; 4] {
        [
            self.x1.min(self.x2),
            self.y1.min(self.y2),
            self.width().abs(),
            self.height().abs(),
        ]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    #[inline(always)]
    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }

    #[inline(always)]
    pub fn center_y(&self) -> f32 {
        (self.y1 + self.y2) / 2.0
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Width of the padded search region around this box.
    #[inline]
    pub fn output_width(&self) -> f32 {
        (self.width() * CONTEXT_FACTOR).max(1.0)
    }

    /// Height of the padded search region around this box.
    #[inline]
    pub fn output_height(&self) -> f32 {
        (self.height() * CONTEXT_FACTOR).max(1.0)
    }

    /// How far the search region sticks out past the left image edge.
    #[inline]
    pub fn edge_spacing_x(&self) -> f32 {
        (self.output_width() / 2.0 - self.center_x()).max(0.0)
    }

    /// How far the search region sticks out past the top image edge.
    #[inline]
    pub fn edge_spacing_y(&self) -> f32 {
        (self.output_height() / 2.0 - self.center_y()).max(0.0)
    }

    /// Normalizes the box by the image size into network-input space.
    pub fn scale(&self, image: &Image) -> Self {
        let (width, height) = image::dims(image);
        self.scale_dims(width as f32, height as f32)
    }

    pub fn scale_dims(&self, width: f32, height: f32) -> Self {
        let sf = self.scale_factor;

        Self {
            x1: self.x1 / width * sf,
            y1: self.y1 / height * sf,
            x2: self.x2 / width * sf,
            y2: self.y2 / height * sf,
            scale_factor: sf,
        }
    }

    /// Undoes `scale` for the same image size.
    pub fn unscale(&self, image: &Image) -> Self {
        let (width, height) = image::dims(image);
        self.unscale_dims(width as f32, height as f32)
    }

    pub fn unscale_dims(&self, width: f32, height: f32) -> Self {
        let sf = self.scale_factor;

        Self {
            x1: self.x1 / sf * width,
            y1: self.y1 / sf * height,
            x2: self.x2 / sf * width,
            y2: self.y2 / sf * height,
            scale_factor: sf,
        }
    }

    /// Expresses `self` (a ground-truth box) relative to the padded search
    /// region located at `search_location`.
    pub fn recenter(
        &self,
        search_location: &BoundingBox,
        edge_spacing_x: f32,
        edge_spacing_y: f32,
    ) -> Self {
        Self {
            x1: self.x1 - search_location.x1 + edge_spacing_x,
            y1: self.y1 - search_location.y1 + edge_spacing_y,
            x2: self.x2 - search_location.x1 + edge_spacing_x,
            y2: self.y2 - search_location.y1 + edge_spacing_y,
            scale_factor: self.scale_factor,
        }
    }

    /// Inverse of `recenter`. Callers that need the result inside the image
    /// follow up with `crop_against_image`.
    pub fn uncenter(
        &self,
        search_location: &BoundingBox,
        edge_spacing_x: f32,
        edge_spacing_y: f32,
    ) -> Self {
        Self {
            x1: self.x1 + search_location.x1 - edge_spacing_x,
            y1: self.y1 + search_location.y1 - edge_spacing_y,
            x2: self.x2 + search_location.x1 - edge_spacing_x,
            y2: self.y2 + search_location.y1 - edge_spacing_y,
            scale_factor: self.scale_factor,
        }
    }

    /// Random crop region around this box, simulating apparent translation
    /// and scale change of the target.
    #[allow(clippy::too_many_arguments)]
    pub fn shift<R: Rng + ?Sized>(
        &self,
        image: &Image,
        lambda_scale: f32,
        lambda_shift: f32,
        min_scale: f32,
        max_scale: f32,
        shift_motion_model: bool,
        rng: &mut R,
    ) -> Self {
        let (iw, ih) = image::dims(image);
        let (iw, ih) = (iw as f32, ih as f32);

        let scale_sample = |rng: &mut R| {
            if shift_motion_model {
                math::sample_exp_two_sided(rng, lambda_scale)
                    .max(min_scale)
                    .min(max_scale)
            } else {
                rng.gen::<f32>() * (max_scale - min_scale) + min_scale
            }
        };

        let new_width = shift_side(self.width(), iw, || scale_sample(rng));
        let new_height = shift_side(self.height(), ih, || scale_sample(rng));

        let new_cx = shift_center(
            self.center_x(),
            self.width(),
            new_width,
            iw,
            lambda_shift,
            shift_motion_model,
            rng,
        );
        let new_cy = shift_center(
            self.center_y(),
            self.height(),
            new_height,
            ih,
            lambda_shift,
            shift_motion_model,
            rng,
        );

        Self::from_center(new_cx, new_cy, new_width, new_height)
    }

    pub fn intersection(&self, other: &BoundingBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);

        w * h
    }

    pub fn union(&self, other: &BoundingBox) -> f32 {
        self.area() + other.area() - self.intersection(other)
    }

    /// Intersection over union, in `[0, 1]`.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let union = self.union(other);
        if union <= f32::EPSILON {
            return 0.0;
        }

        (self.intersection(other) / union).clamp(0.0, 1.0)
    }

    /// Euclidean distance between box centers.
    pub fn center_distance(&self, other: &BoundingBox) -> f32 {
        na::distance(
            &na::Point2::new(self.center_x(), self.center_y()),
            &na::Point2::new(other.center_x(), other.center_y()),
        )
    }

    pub fn check_within_image(&self, image: &Image) -> bool {
        let (w, h) = image::dims(image);

        self.x1 >= 0.0 && self.y1 >= 0.0 && self.x2 <= w as f32 && self.y2 <= h as f32
    }

    #[inline]
    pub fn crop_against_image(&self, image: &Image) -> Self {
        let (w, h) = image::dims(image);
        self.crop_against_width_height(w as f32, h as f32)
    }

    pub fn crop_against_width_height(&self, width: f32, height: f32) -> Self {
        let mut out = *self;
        out.clamp_in_place(width, height);
        out
    }

    /// Clamps corners into `[0, width] x [0, height]`.
    pub fn clamp_in_place(&mut self, width: f32, height: f32) {
        self.x1 = self.x1.max(0.0).min(width);
        self.x2 = self.x2.max(0.0).min(width);
        self.y1 = self.y1.max(0.0).min(height);
        self.y2 = self.y2.max(0.0).min(height);
    }

    /// At least one pixel in each dimension.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width() >= 1.0 && self.height() >= 1.0
    }

    /// Clamps against the image and fails if nothing usable remains.
    pub fn validated(&self, image: &Image) -> Result<Self> {
        let cropped = self.crop_against_image(image);

        if cropped.is_valid() {
            Ok(cropped)
        } else {
            Err(Error::InvalidGeometry { bbox: *self })
        }
    }

    /// Draws the box outline onto `image`.
    pub fn draw(&self, color: [u8; 3], image: &mut Image, thickness: usize) {
        let (w, h) = image::dims(image);
        if w == 0 || h == 0 {
            return;
        }

        let b = self.crop_against_width_height(w as f32 - 1.0, h as f32 - 1.0);
        let (x1, y1) = (b.x1.round() as usize, b.y1.round() as usize);
        let (x2, y2) = (b.x2.round() as usize, b.y2.round() as usize);
        let t = thickness.max(1);

        for y in y1..=y2 {
            for x in x1..=x2 {
                let on_edge = x < x1 + t || x + t > x2 || y < y1 + t || y + t > y2;
                if on_edge {
                    image::put_pixel(image, x, y, color);
                }
            }
        }
    }

    /// White outline, used for ground truth.
    #[inline]
    pub fn draw_bounding_box(&self, image: &mut Image) {
        self.draw(image::WHITE, image, 2);
    }
}

fn shift_side(side: f32, image_side: f32, mut sample: impl FnMut() -> f32) -> f32 {
    let mut new_side = -1.0;
    let mut tries = 0;

    while (new_side < 0.0 || new_side > image_side - 1.0) && tries < MAX_SHIFT_TRIES {
        new_side = side * (1.0 + sample());
        new_side = new_side.min(image_side - 1.0).max(1.0);
        tries += 1;
    }

    new_side
}

fn shift_center<R: Rng + ?Sized>(
    center: f32,
    side: f32,
    new_side: f32,
    image_side: f32,
    lambda_shift: f32,
    shift_motion_model: bool,
    rng: &mut R,
) -> f32 {
    let reach = side * CONTEXT_FACTOR / 2.0;
    let half = new_side / 2.0;

    let mut first = true;
    let mut new_center = -1.0;
    let mut tries = 0;

    while (first
        || new_center < center - reach
        || new_center > center + reach
        || new_center - half < 0.0
        || new_center + half > image_side)
        && tries < MAX_SHIFT_TRIES
    {
        let moved = if shift_motion_model {
            center + side * math::sample_exp_two_sided(rng, lambda_shift)
        } else {
            center + rng.gen::<f32>() * (2.0 * new_side) - new_side
        };

        new_center = moved.max(half).min(image_side - half);
        first = false;
        tries += 1;
    }

    new_center
}
