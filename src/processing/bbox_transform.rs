use ndarray::{s, stack, Array2, Axis};

use crate::error::{Error, Result};
use crate::processing::{check_boxes, ImageShape};

/// Encodes `gt_rois` as `(dx, dy, dw, dh)` regression targets relative to
/// `ex_rois`, row by row. The center offsets are normalized by the reference
/// width/height and the size terms are log-ratios.
///
/// Reference boxes must be non-degenerate (positive inclusive width and
/// height); callers are expected to have filtered them beforehand.
pub fn nonlinear_transform(ex_rois: &Array2<f32>, gt_rois: &Array2<f32>) -> Result<Array2<f32>> {
    check_boxes(ex_rois)?;
    check_boxes(gt_rois)?;
    if ex_rois.nrows() != gt_rois.nrows() {
        return Err(Error::BoxCountMismatch {
            reference: ex_rois.nrows(),
            target: gt_rois.nrows(),
        });
    }

    let ex_widths = &ex_rois.slice(s![.., 2]) - &ex_rois.slice(s![.., 0]) + 1.0;
    let ex_heights = &ex_rois.slice(s![.., 3]) - &ex_rois.slice(s![.., 1]) + 1.0;
    let ex_ctr_x = &ex_rois.slice(s![.., 0]) + 0.5 * (&ex_widths - 1.0);
    let ex_ctr_y = &ex_rois.slice(s![.., 1]) + 0.5 * (&ex_heights - 1.0);

    let gt_widths = &gt_rois.slice(s![.., 2]) - &gt_rois.slice(s![.., 0]) + 1.0;
    let gt_heights = &gt_rois.slice(s![.., 3]) - &gt_rois.slice(s![.., 1]) + 1.0;
    let gt_ctr_x = &gt_rois.slice(s![.., 0]) + 0.5 * (&gt_widths - 1.0);
    let gt_ctr_y = &gt_rois.slice(s![.., 1]) + 0.5 * (&gt_heights - 1.0);

    let targets_dx = (&gt_ctr_x - &ex_ctr_x) / &ex_widths;
    let targets_dy = (&gt_ctr_y - &ex_ctr_y) / &ex_heights;
    let targets_dw = (&gt_widths / &ex_widths).mapv(f32::ln);
    let targets_dh = (&gt_heights / &ex_heights).mapv(f32::ln);

    Ok(stack![Axis(1), targets_dx, targets_dy, targets_dw, targets_dh])
}

/// Inverse of [`nonlinear_transform`]: applies `(dx, dy, dw, dh)` deltas to
/// `boxes` and returns the shifted, resized boxes in corner coordinates.
pub fn nonlinear_pred(boxes: &Array2<f32>, deltas: &Array2<f32>) -> Result<Array2<f32>> {
    check_boxes(boxes)?;
    if deltas.ncols() != 4 || deltas.nrows() != boxes.nrows() {
        return Err(Error::MalformedDeltas {
            rows: deltas.nrows(),
            cols: deltas.ncols(),
            boxes: boxes.nrows(),
        });
    }
    if boxes.nrows() == 0 {
        return Ok(Array2::zeros((0, 4)));
    }

    let widths = &boxes.slice(s![.., 2]) - &boxes.slice(s![.., 0]) + 1.0;
    let heights = &boxes.slice(s![.., 3]) - &boxes.slice(s![.., 1]) + 1.0;
    let ctr_x = &boxes.slice(s![.., 0]) + 0.5 * (&widths - 1.0);
    let ctr_y = &boxes.slice(s![.., 1]) + 0.5 * (&heights - 1.0);

    let dx = deltas.slice(s![.., 0]);
    let dy = deltas.slice(s![.., 1]);
    let dw = deltas.slice(s![.., 2]);
    let dh = deltas.slice(s![.., 3]);

    let pred_ctr_x = &dx * &widths + &ctr_x;
    let pred_ctr_y = &dy * &heights + &ctr_y;
    let pred_w = dw.mapv(f32::exp) * &widths;
    let pred_h = dh.mapv(f32::exp) * &heights;

    let x1 = &pred_ctr_x - &(0.5 * (&pred_w - 1.0));
    let y1 = &pred_ctr_y - &(0.5 * (&pred_h - 1.0));
    let x2 = &pred_ctr_x + &(0.5 * (&pred_w - 1.0));
    let y2 = &pred_ctr_y + &(0.5 * (&pred_h - 1.0));

    Ok(stack![Axis(1), x1, y1, x2, y2])
}

/// Clamps every coordinate into the image: x into `[0, width - 1]`, y into
/// `[0, height - 1]`.
pub fn clip_boxes(boxes: &mut Array2<f32>, im_shape: ImageShape) {
    let height = im_shape.0 as f32 - 1.0;
    let width = im_shape.1 as f32 - 1.0;

    for mut row in boxes.rows_mut() {
        row[0] = row[0].min(width).max(0.0);
        row[1] = row[1].min(height).max(0.0);
        row[2] = row[2].min(width).max(0.0);
        row[3] = row[3].min(height).max(0.0);
    }
}
