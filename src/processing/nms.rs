use std::cmp::Ordering;

use ndarray::{s, Array1, Array2};

use crate::error::{Error, Result};
use crate::processing::check_boxes;

/// Indices that would sort `scores` in descending order. The sort is stable,
/// so equal scores keep their input order.
pub fn argsort_descending(scores: &Array1<f32>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&i, &j| scores[j].partial_cmp(&scores[i]).unwrap_or(Ordering::Equal));
    order
}

/// Greedy non-maximum suppression. Walks the boxes in descending score
/// order, keeps the current box and suppresses every remaining box whose IoU
/// with it reaches `iou_threshold`. Returns kept indices, highest score
/// first, stopping once `max_output` boxes are kept.
pub fn nms(
    boxes: &Array2<f32>,
    scores: &Array1<f32>,
    iou_threshold: f32,
    max_output: Option<usize>,
) -> Result<Vec<usize>> {
    check_boxes(boxes)?;
    if scores.len() != boxes.nrows() {
        return Err(Error::ScoreCountMismatch {
            scores: scores.len(),
            boxes: boxes.nrows(),
        });
    }
    if let Some(0) = max_output {
        return Ok(Vec::new());
    }

    let x1 = boxes.slice(s![.., 0]);
    let y1 = boxes.slice(s![.., 1]);
    let x2 = boxes.slice(s![.., 2]);
    let y2 = boxes.slice(s![.., 3]);
    let areas: Array1<f32> = (&x2 - &x1 + 1.0) * (&y2 - &y1 + 1.0);

    let order = argsort_descending(scores);
    let mut suppressed = vec![false; boxes.nrows()];
    let mut keep = Vec::new();

    for &i in &order {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        if let Some(max) = max_output {
            if keep.len() == max {
                break;
            }
        }

        for &j in &order {
            if j == i || suppressed[j] {
                continue;
            }
            let xx1 = x1[i].max(x1[j]);
            let yy1 = y1[i].max(y1[j]);
            let xx2 = x2[i].min(x2[j]);
            let yy2 = y2[i].min(y2[j]);
            let w = (xx2 - xx1 + 1.0).max(0.0);
            let h = (yy2 - yy1 + 1.0).max(0.0);
            let inter = w * h;
            let ovr = inter / (areas[i] + areas[j] - inter);
            if ovr >= iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    Ok(keep)
}
