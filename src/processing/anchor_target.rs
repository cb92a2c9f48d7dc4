use log::debug;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;

use crate::config::RpnConfig;
use crate::error::{Error, Result};
use crate::processing::bbox_transform::nonlinear_transform;
use crate::processing::filters::inside_image;
use crate::processing::overlaps::bbox_overlaps;
use crate::processing::sampler::balance;
use crate::processing::ImageShape;

/// Best-match bookkeeping between an anchor set and a ground-truth set.
#[derive(Debug, Clone)]
pub struct Matches {
    /// Ground-truth column with the highest IoU for each anchor row.
    pub argmax_overlaps_inds: Array1<usize>,
    /// That highest IoU, per anchor row.
    pub max_overlaps: Array1<f32>,
    /// Anchor row with the highest IoU for each ground-truth column. This is
    /// what guarantees every ground-truth box at least one assigned anchor,
    /// even when all its IoUs sit below the foreground threshold.
    pub gt_argmax_overlaps_inds: Array1<usize>,
}

fn argmax(values: ArrayView1<'_, f32>) -> (usize, f32) {
    let mut best = (0, f32::NEG_INFINITY);
    for (i, &v) in values.iter().enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}

/// Computes the overlap matrix between `anchors` and `gt_boxes` and reduces
/// it along both axes. Ties resolve to the lowest index. An empty
/// ground-truth set cannot be matched against and is rejected.
pub fn overlapping(anchors: &Array2<f32>, gt_boxes: &Array2<f32>) -> Result<Matches> {
    if gt_boxes.nrows() == 0 {
        return Err(Error::EmptyGroundTruth);
    }

    let overlaps = bbox_overlaps(anchors, gt_boxes)?;
    let n = overlaps.nrows();
    let m = overlaps.ncols();

    let mut argmax_overlaps_inds = Array1::<usize>::zeros(n);
    let mut max_overlaps = Array1::<f32>::zeros(n);
    for i in 0..n {
        let (j, v) = argmax(overlaps.row(i));
        argmax_overlaps_inds[i] = j;
        max_overlaps[i] = v;
    }

    let mut gt_argmax_overlaps_inds = Array1::<usize>::zeros(m);
    for j in 0..m {
        let (i, _) = argmax(overlaps.column(j));
        gt_argmax_overlaps_inds[j] = i;
    }

    Ok(Matches {
        argmax_overlaps_inds,
        max_overlaps,
        gt_argmax_overlaps_inds,
    })
}

/// Assigns a training label to every anchor in `inside_anchors`: 1 where the
/// best IoU reaches `fg_threshold` or the anchor is some ground-truth box's
/// best match, 0 where the best IoU falls below `bg_threshold`, -1 otherwise.
/// Background is written first so a foreground assignment always wins when
/// both rules hit the same anchor. Returns the per-anchor ground-truth match
/// indices alongside the labels; both run over the inside subset and keep
/// its order.
pub fn label(
    gt_boxes: &Array2<f32>,
    inside_anchors: &Array2<f32>,
    fg_threshold: f32,
    bg_threshold: f32,
) -> Result<(Array1<usize>, Array1<i32>)> {
    let matches = overlapping(inside_anchors, gt_boxes)?;
    let labels = label_from_matches(&matches, fg_threshold, bg_threshold);
    Ok((matches.argmax_overlaps_inds, labels))
}

fn label_from_matches(matches: &Matches, fg_threshold: f32, bg_threshold: f32) -> Array1<i32> {
    let n = matches.max_overlaps.len();
    let mut labels = Array1::<i32>::from_elem(n, -1);

    for i in 0..n {
        if matches.max_overlaps[i] < bg_threshold {
            labels[i] = 0;
        }
    }
    for &i in matches.gt_argmax_overlaps_inds.iter() {
        labels[i] = 1;
    }
    for i in 0..n {
        if matches.max_overlaps[i] >= fg_threshold {
            labels[i] = 1;
        }
    }

    labels
}

/// Scatters `values` computed over a kept subset back to an array of length
/// `total`, placing entry k at `inds[k]` and `fill` everywhere else.
pub fn unmap<T: Copy>(values: &Array1<T>, inds: &[usize], total: usize, fill: T) -> Array1<T> {
    let mut full = Array1::from_elem(total, fill);
    for (k, &i) in inds.iter().enumerate() {
        full[i] = values[k];
    }
    full
}

/// Row-wise counterpart of [`unmap`] for per-box data such as regression
/// targets.
pub fn unmap_rows(values: &Array2<f32>, inds: &[usize], total: usize, fill: f32) -> Array2<f32> {
    let mut full = Array2::from_elem((total, values.ncols()), fill);
    for (k, &i) in inds.iter().enumerate() {
        full.row_mut(i).assign(&values.row(k));
    }
    full
}

/// Training targets for a full anchor grid, all in the full index space.
#[derive(Debug, Clone)]
pub struct AnchorTargets {
    /// Per-anchor label in {-1, 0, 1}. Anchors outside the image are -1.
    pub labels: Array1<i32>,
    /// Per-anchor best ground-truth index; -1 where no match was computed
    /// (anchors outside the image).
    pub argmax_overlaps_inds: Array1<i64>,
    /// Per-anchor `(dx, dy, dw, dh)` regression targets; zero everywhere the
    /// label is not foreground.
    pub bbox_targets: Array2<f32>,
}

/// Full training-target assignment for one image: restrict the grid to
/// anchors inside the image, match and label them against `gt_boxes`,
/// balance the labeled set, encode regression targets for the foreground
/// anchors, and scatter everything back to the full grid.
pub fn anchor_targets<R: Rng>(
    gt_boxes: &Array2<f32>,
    all_anchors: &Array2<f32>,
    im_shape: ImageShape,
    cfg: &RpnConfig,
    rng: &mut R,
) -> Result<AnchorTargets> {
    let (inds_inside, inside_anchors) = inside_image(all_anchors, im_shape)?;
    let matches = overlapping(&inside_anchors, gt_boxes)?;

    let mut labels = label_from_matches(&matches, cfg.fg_threshold, cfg.bg_threshold);
    balance(&mut labels, cfg.batch_size, cfg.positive_fraction, rng);

    let fg_inds: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l == 1)
        .map(|(i, _)| i)
        .collect();

    let mut bbox_targets = Array2::<f32>::zeros((inside_anchors.nrows(), 4));
    if !fg_inds.is_empty() {
        let ex_rois = inside_anchors.select(Axis(0), &fg_inds);
        let gt_inds: Vec<usize> = fg_inds
            .iter()
            .map(|&i| matches.argmax_overlaps_inds[i])
            .collect();
        let gt_rois = gt_boxes.select(Axis(0), &gt_inds);
        let targets = nonlinear_transform(&ex_rois, &gt_rois)?;
        for (k, &i) in fg_inds.iter().enumerate() {
            bbox_targets.row_mut(i).assign(&targets.row(k));
        }
    }

    debug!(
        "anchor targets: {} anchors, {} inside, {} foreground",
        all_anchors.nrows(),
        inside_anchors.nrows(),
        fg_inds.len()
    );

    let total = all_anchors.nrows();
    let matched = matches.argmax_overlaps_inds.mapv(|j| j as i64);

    Ok(AnchorTargets {
        labels: unmap(&labels, &inds_inside, total, -1),
        argmax_overlaps_inds: unmap(&matched, &inds_inside, total, -1),
        bbox_targets: unmap_rows(&bbox_targets, &inds_inside, total, 0.0),
    })
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array1, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::RpnConfig;
    use crate::processing::anchor_target::{anchor_targets, label, overlapping, unmap};
    use crate::processing::filters::inside_image;
    use crate::processing::generate_anchors::{generate_anchors, shift_anchors};

    fn inside_224_anchors() -> (Vec<usize>, Array2<f32>, Array2<f32>) {
        let base = generate_anchors(&RpnConfig::default());
        let all = shift_anchors(&base, (14, 14), 16);
        let (inds, kept) = inside_image(&all, (224, 224, 1)).unwrap();
        (inds, kept, all)
    }

    #[test]
    fn test_overlapping_shapes() {
        let (_, inside_anchors, _) = inside_224_anchors();
        let gt_boxes = Array2::<f32>::zeros((91, 4));

        let matches = overlapping(&inside_anchors, &gt_boxes).unwrap();

        assert_eq!(matches.argmax_overlaps_inds.len(), 84);
        assert_eq!(matches.max_overlaps.len(), 84);
        assert_eq!(matches.gt_argmax_overlaps_inds.len(), 91);
    }

    #[test]
    fn test_label_shapes() {
        let (_, inside_anchors, _) = inside_224_anchors();
        let gt_boxes = Array2::<f32>::zeros((91, 4));

        let cfg = RpnConfig::default();
        let (argmax_overlaps_inds, labels) =
            label(&gt_boxes, &inside_anchors, cfg.fg_threshold, cfg.bg_threshold).unwrap();

        assert_eq!(argmax_overlaps_inds.len(), 84);
        assert_eq!(labels.len(), 84);
        assert!(labels.iter().all(|&l| (-1..=1).contains(&l)));
    }

    #[test]
    fn test_label_rules() {
        // One anchor matches the ground truth exactly, one overlaps weakly,
        // one not at all.
        let gt_boxes = array![[0.0, 0.0, 9.0, 9.0]];
        // IoUs against the ground truth: 1.0, 64/136, 0.0.
        let anchors = array![
            [0.0, 0.0, 9.0, 9.0],
            [2.0, 2.0, 11.0, 11.0],
            [100.0, 100.0, 120.0, 120.0]
        ];

        let (argmax_overlaps_inds, labels) = label(&gt_boxes, &anchors, 0.7, 0.3).unwrap();

        assert_eq!(labels.to_vec(), vec![1, -1, 0]);
        assert_eq!(argmax_overlaps_inds.to_vec(), vec![0, 0, 0]);
    }

    #[test]
    fn test_gt_argmax_forces_foreground() {
        // The best available anchor sits below the foreground threshold but
        // still gets labeled 1 through the per-ground-truth argmax.
        let gt_boxes = array![[0.0, 0.0, 9.0, 9.0]];
        let anchors = array![[5.0, 5.0, 14.0, 14.0], [100.0, 100.0, 120.0, 120.0]];

        let (_, labels) = label(&gt_boxes, &anchors, 0.7, 0.3).unwrap();

        assert_eq!(labels[0], 1);
        assert_eq!(labels[1], 0);
    }

    #[test]
    fn test_empty_ground_truth_rejected() {
        let anchors = array![[0.0, 0.0, 9.0, 9.0]];
        let gt_boxes = Array2::<f32>::zeros((0, 4));
        assert!(overlapping(&anchors, &gt_boxes).is_err());
    }

    #[test]
    fn test_unmap() {
        let values = Array1::from(vec![5, 6]);
        let full = unmap(&values, &[1, 3], 5, -1);
        assert_eq!(full.to_vec(), vec![-1, 5, -1, 6, -1]);
    }

    #[test]
    fn test_anchor_targets_full_grid() {
        let _ = env_logger::builder().is_test(true).try_init();

        let cfg = RpnConfig::default();
        let base = generate_anchors(&cfg);
        let all = shift_anchors(&base, (14, 14), 16);
        let gt_boxes = array![[48.0, 48.0, 175.0, 175.0]];

        let mut rng = StdRng::seed_from_u64(0);
        let targets = anchor_targets(&gt_boxes, &all, (224, 224, 3), &cfg, &mut rng).unwrap();

        assert_eq!(targets.labels.len(), 1764);
        assert_eq!(targets.argmax_overlaps_inds.len(), 1764);
        assert_eq!(targets.bbox_targets.dim(), (1764, 4));

        // Anchors dropped by the image-bounds filter stay ignored.
        let (inds_inside, _) = inside_image(&all, (224, 224, 3)).unwrap();
        let inside: std::collections::HashSet<usize> = inds_inside.into_iter().collect();
        for i in 0..1764 {
            if !inside.contains(&i) {
                assert_eq!(targets.labels[i], -1);
                assert_eq!(targets.argmax_overlaps_inds[i], -1);
            }
        }

        // The ground-truth box has at least one foreground anchor, all of
        // them matched to column 0.
        let fg: Vec<usize> = (0..1764).filter(|&i| targets.labels[i] == 1).collect();
        assert!(!fg.is_empty());
        for &i in &fg {
            assert_eq!(targets.argmax_overlaps_inds[i], 0);
        }
    }
}
