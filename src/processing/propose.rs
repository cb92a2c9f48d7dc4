use log::debug;
use ndarray::{Array1, Array2, Axis};

use crate::config::RpnConfig;
use crate::error::{Error, Result};
use crate::processing::bbox_transform::{clip_boxes, nonlinear_pred};
use crate::processing::filters::filter_boxes;
use crate::processing::nms::nms;
use crate::processing::ImageShape;

/// Fixed-size proposal set for one image. `boxes` always has exactly
/// `max_proposals` rows in descending score order; slots past the last
/// surviving proposal are zero boxes with score 0 so the output shape never
/// varies with how many boxes NMS keeps.
#[derive(Debug, Clone)]
pub struct Proposals {
    /// Which image of the batch these proposals belong to.
    pub batch_index: usize,
    /// `(max_proposals, 4)` corner-coordinate boxes.
    pub boxes: Array2<f32>,
    /// Objectness score per row, 0 for padding rows.
    pub scores: Array1<f32>,
}

/// Decodes per-anchor regression deltas into scored image-space proposals:
/// decode against the anchors, clip to the image, drop boxes under
/// `min_box_size` (scores follow in lockstep), apply the optional score cut,
/// then greedy NMS capped at `max_proposals`.
pub fn propose(
    deltas: &Array2<f32>,
    scores: &Array1<f32>,
    anchors: &Array2<f32>,
    im_shape: ImageShape,
    batch_index: usize,
    cfg: &RpnConfig,
) -> Result<Proposals> {
    if scores.len() != anchors.nrows() {
        return Err(Error::ScoreCountMismatch {
            scores: scores.len(),
            boxes: anchors.nrows(),
        });
    }

    let mut boxes = nonlinear_pred(anchors, deltas)?;
    clip_boxes(&mut boxes, im_shape);

    let keep = filter_boxes(&boxes, cfg.min_box_size)?;
    let mut boxes = boxes.select(Axis(0), &keep);
    let mut scores = Array1::from_iter(keep.iter().map(|&i| scores[i]));

    if let Some(threshold) = cfg.score_threshold {
        let keep: Vec<usize> = scores
            .iter()
            .enumerate()
            .filter(|(_, &s)| s >= threshold)
            .map(|(i, _)| i)
            .collect();
        boxes = boxes.select(Axis(0), &keep);
        scores = Array1::from_iter(keep.iter().map(|&i| scores[i]));
    }

    let keep = nms(&boxes, &scores, cfg.nms_iou_threshold, Some(cfg.max_proposals))?;
    debug!(
        "propose: {} anchors, {} after size filter, {} after nms",
        anchors.nrows(),
        boxes.nrows(),
        keep.len()
    );

    let mut out_boxes = Array2::<f32>::zeros((cfg.max_proposals, 4));
    let mut out_scores = Array1::<f32>::zeros(cfg.max_proposals);
    for (row, &i) in keep.iter().enumerate() {
        out_boxes.row_mut(row).assign(&boxes.row(i));
        out_scores[row] = scores[i];
    }

    Ok(Proposals {
        batch_index,
        boxes: out_boxes,
        scores: out_scores,
    })
}
