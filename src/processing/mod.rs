pub mod anchor_target;
pub mod bbox_transform;
pub mod filters;
pub mod generate_anchors;
pub mod nms;
pub mod overlaps;
pub mod propose;
pub mod roi;
pub mod sampler;

use ndarray::Array2;

use crate::error::{Error, Result};

/// Image extent as `(height, width, channels)`. All pixel coordinates in the
/// crate are expressed in this frame.
pub type ImageShape = (usize, usize, usize);

pub(crate) fn check_boxes(boxes: &Array2<f32>) -> Result<()> {
    if boxes.ncols() != 4 {
        return Err(Error::MalformedBoxes {
            rows: boxes.nrows(),
            cols: boxes.ncols(),
        });
    }
    Ok(())
}
