use ndarray::Array2;

use crate::error::Result;
use crate::processing::check_boxes;

/// Dense pairwise IoU between `boxes` (N rows) and `query_boxes` (M rows).
/// Output is N x M with values in `[0, 1]`; pairs that do not overlap are 0.
/// Areas use inclusive-pixel widths, so `w = x2 - x1 + 1`.
pub fn bbox_overlaps(boxes: &Array2<f32>, query_boxes: &Array2<f32>) -> Result<Array2<f32>> {
    check_boxes(boxes)?;
    check_boxes(query_boxes)?;

    let n = boxes.nrows();
    let k = query_boxes.nrows();
    let mut overlaps = Array2::<f32>::zeros((n, k));

    for j in 0..k {
        let query_area = (query_boxes[[j, 2]] - query_boxes[[j, 0]] + 1.0)
            * (query_boxes[[j, 3]] - query_boxes[[j, 1]] + 1.0);
        for i in 0..n {
            let iw = (boxes[[i, 2]].min(query_boxes[[j, 2]])
                - boxes[[i, 0]].max(query_boxes[[j, 0]])
                + 1.0)
                .max(0.0);
            if iw > 0.0 {
                let ih = (boxes[[i, 3]].min(query_boxes[[j, 3]])
                    - boxes[[i, 1]].max(query_boxes[[j, 1]])
                    + 1.0)
                    .max(0.0);
                if ih > 0.0 {
                    let box_area = (boxes[[i, 2]] - boxes[[i, 0]] + 1.0)
                        * (boxes[[i, 3]] - boxes[[i, 1]] + 1.0);
                    let union = box_area + query_area - iw * ih;
                    overlaps[[i, j]] = iw * ih / union;
                }
            }
        }
    }

    Ok(overlaps)
}
