use crate::bbox::BoundingBox;
use crate::error::{Error, Result};

use ndarray::{s, Array3};

/// Interleaved HWC pixel buffer.
pub type Image = Array3<u8>;

pub const WHITE: [u8; 3] = [255, 255, 255];
pub const RED: [u8; 3] = [255, 0, 0];

/// (width, height) of an image.
#[inline]
pub fn dims(image: &Image) -> (usize, usize) {
    let shape = image.shape();
    (shape[1], shape[0])
}

#[inline]
pub fn blank(width: usize, height: usize, channels: usize) -> Image {
    Array3::zeros((height, width, channels))
}

pub(crate) fn put_pixel(image: &mut Image, x: usize, y: usize, color: [u8; 3]) {
    let channels = image.shape()[2];

    for (c, value) in color.iter().copied().enumerate().take(channels) {
        image[[y, x, c]] = value;
    }
}

/// Padded search region cut out around a box.
#[derive(Debug, Clone)]
pub struct CropPad {
    pub image: Image,
    /// Where the region sits in the source image (clamped to it).
    pub location: BoundingBox,
    pub edge_spacing_x: f32,
    pub edge_spacing_y: f32,
}

/// Location of the padded search region around `bbox_tight`, clamped to the image.
pub fn compute_crop_pad_location(bbox_tight: &BoundingBox, image: &Image) -> BoundingBox {
    let (w, h) = dims(image);
    let (w, h) = (w as f32, h as f32);

    let cx = bbox_tight.center_x();
    let cy = bbox_tight.center_y();
    let half_w = bbox_tight.output_width() / 2.0;
    let half_h = bbox_tight.output_height() / 2.0;

    let roi_left = (cx - half_w).max(0.0);
    let roi_top = (cy - half_h).max(0.0);

    let left_half = half_w.min(cx);
    let right_half = half_w.min(w - cx);
    let roi_width = (left_half + right_half).max(1.0);

    let top_half = half_h.min(cy);
    let bottom_half = half_h.min(h - cy);
    let roi_height = (top_half + bottom_half).max(1.0);

    BoundingBox::new(roi_left, roi_top, roi_left + roi_width, roi_top + roi_height)
}

/// Cuts the search region around `bbox_tight` out of `image`, padding with
/// zeros where the region extends past the image edges.
pub fn crop_pad_image(bbox_tight: &BoundingBox, image: &Image) -> CropPad {
    let location = compute_crop_pad_location(bbox_tight, image);
    let (w, h) = dims(image);
    let channels = image.shape()[2];

    if w == 0 || h == 0 {
        return CropPad {
            image: blank(1, 1, channels),
            location,
            edge_spacing_x: 0.0,
            edge_spacing_y: 0.0,
        };
    }

    let roi_left = location.x1.max(0.0).min(w as f32 - 1.0) as usize;
    let roi_top = location.y1.max(0.0).min(h as f32 - 1.0) as usize;
    let roi_width = ((location.x2 - location.x1).ceil().max(1.0) as usize)
        .min(w)
        .min(w - roi_left);
    let roi_height = ((location.y2 - location.y1).ceil().max(1.0) as usize)
        .min(h)
        .min(h - roi_top);

    let edge_spacing_x = bbox_tight.edge_spacing_x().min(w as f32 - 1.0);
    let edge_spacing_y = bbox_tight.edge_spacing_y().min(h as f32 - 1.0);
    let ex = edge_spacing_x as usize;
    let ey = edge_spacing_y as usize;

    let out_w = (bbox_tight.output_width().ceil() as usize)
        .max(roi_width)
        .max(ex + roi_width);
    let out_h = (bbox_tight.output_height().ceil() as usize)
        .max(roi_height)
        .max(ey + roi_height);

    let mut out = blank(out_w, out_h, channels);
    out.slice_mut(s![ey..ey + roi_height, ex..ex + roi_width, ..])
        .assign(&image.slice(s![
            roi_top..roi_top + roi_height,
            roi_left..roi_left + roi_width,
            ..
        ]));

    CropPad {
        image: out,
        location,
        edge_spacing_x,
        edge_spacing_y,
    }
}

/// Pixels covered by the box after clamping it to the image.
pub fn crop_out_region(image: &Image, bbox: &BoundingBox) -> Result<Image> {
    let clamped = bbox.validated(image)?;

    let (w, h) = dims(image);
    let x1 = (clamped.x1.floor() as usize).min(w - 1);
    let y1 = (clamped.y1.floor() as usize).min(h - 1);
    let x2 = (clamped.x2.ceil() as usize).min(w).max(x1 + 1);
    let y2 = (clamped.y2.ceil() as usize).min(h).max(y1 + 1);

    if x2 <= x1 || y2 <= y1 {
        return Err(Error::InvalidGeometry { bbox: *bbox });
    }

    Ok(image.slice(s![y1..y2, x1..x2, ..]).to_owned())
}
