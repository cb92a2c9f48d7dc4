use ndarray::{Array2, Axis};

use crate::error::Result;
use crate::processing::{check_boxes, ImageShape};

/// Keeps boxes that lie fully inside the image: all four corners within
/// `[0, width) x [0, height)`. Returns the kept indices alongside the kept
/// rows so downstream results can be scattered back to the full index space.
pub fn inside_image(boxes: &Array2<f32>, im_shape: ImageShape) -> Result<(Vec<usize>, Array2<f32>)> {
    check_boxes(boxes)?;

    let height = im_shape.0 as f32;
    let width = im_shape.1 as f32;

    let indices: Vec<usize> = boxes
        .rows()
        .into_iter()
        .enumerate()
        .filter(|(_, b)| b[0] >= 0.0 && b[1] >= 0.0 && b[2] < width && b[3] < height)
        .map(|(i, _)| i)
        .collect();

    let kept = boxes.select(Axis(0), &indices);
    Ok((indices, kept))
}

/// Indices of boxes at least `min_size` pixels wide and tall, with
/// inclusive-pixel widths.
pub fn filter_boxes(boxes: &Array2<f32>, min_size: f32) -> Result<Vec<usize>> {
    check_boxes(boxes)?;

    Ok(boxes
        .rows()
        .into_iter()
        .enumerate()
        .filter(|(_, b)| {
            let w = b[2] - b[0] + 1.0;
            let h = b[3] - b[1] + 1.0;
            w >= min_size && h >= min_size
        })
        .map(|(i, _)| i)
        .collect())
}
