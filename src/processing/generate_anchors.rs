use ndarray::{array, s, Array1, Array2, ArrayView1, Axis};

use crate::config::RpnConfig;

/// Width, height and center of an inclusive-coordinate box.
fn whctrs(anchor: ArrayView1<'_, f32>) -> (f32, f32, f32, f32) {
    let w = anchor[2] - anchor[0] + 1.0;
    let h = anchor[3] - anchor[1] + 1.0;
    let x_ctr = anchor[0] + 0.5 * (w - 1.0);
    let y_ctr = anchor[1] + 0.5 * (h - 1.0);
    (w, h, x_ctr, y_ctr)
}

fn mkanchors(ws: &Array1<f32>, hs: &Array1<f32>, x_ctr: f32, y_ctr: f32) -> Array2<f32> {
    Array2::from_shape_fn((ws.len(), 4), |(i, j)| match j {
        0 => x_ctr - 0.5 * (ws[i] - 1.0),
        1 => y_ctr - 0.5 * (hs[i] - 1.0),
        2 => x_ctr + 0.5 * (ws[i] - 1.0),
        3 => y_ctr + 0.5 * (hs[i] - 1.0),
        _ => unreachable!(),
    })
}

/// One box per aspect ratio, each keeping the area of `anchor`.
fn ratio_enum(anchor: ArrayView1<'_, f32>, ratios: &Array1<f32>) -> Array2<f32> {
    let (w, h, x_ctr, y_ctr) = whctrs(anchor);
    let size = w * h;
    let ws = ratios.mapv(|r| (size / r).sqrt().round());
    let hs = (&ws * ratios).mapv(f32::round);
    mkanchors(&ws, &hs, x_ctr, y_ctr)
}

/// One box per scale, each a multiple of `anchor` about its own center.
fn scale_enum(anchor: ArrayView1<'_, f32>, scales: &Array1<f32>) -> Array2<f32> {
    let (w, h, x_ctr, y_ctr) = whctrs(anchor);
    let ws = scales.mapv(|s| w * s);
    let hs = scales.mapv(|s| h * s);
    mkanchors(&ws, &hs, x_ctr, y_ctr)
}

/// Base anchor templates for a single grid cell: one box for every
/// (ratio, scale) pair, ratio-major, around a `base_size`-sided box at the
/// origin. With the default 3 ratios and 3 scales this yields the canonical
/// 9 templates.
pub fn generate_anchors(cfg: &RpnConfig) -> Array2<f32> {
    let side = cfg.base_size as f32 - 1.0;
    let base_anchor = array![0.0, 0.0, side, side];
    let ratios = Array1::from(cfg.ratios.clone());
    let scales = Array1::from(cfg.scales.clone());

    let ratio_anchors = ratio_enum(base_anchor.view(), &ratios);
    let per_ratio = scales.len();

    let mut anchors = Array2::<f32>::zeros((ratio_anchors.nrows() * per_ratio, 4));
    for (i, anchor) in ratio_anchors.axis_iter(Axis(0)).enumerate() {
        let scaled = scale_enum(anchor, &scales);
        anchors
            .slice_mut(s![i * per_ratio..(i + 1) * per_ratio, ..])
            .assign(&scaled);
    }

    anchors
}

/// Tiles base anchors across a feature grid of `(grid_h, grid_w)` cells,
/// `stride` image pixels apart. Output rows are cell-major, anchor-minor:
/// cell `k = iy * grid_w + ix` owns rows `[k * a, (k + 1) * a)`.
pub fn shift_anchors(
    base_anchors: &Array2<f32>,
    grid_shape: (usize, usize),
    stride: usize,
) -> Array2<f32> {
    let (grid_h, grid_w) = grid_shape;
    let a = base_anchors.nrows();
    let mut all_anchors = Array2::<f32>::zeros((grid_h * grid_w * a, 4));

    for iy in 0..grid_h {
        let sy = (iy * stride) as f32;
        for ix in 0..grid_w {
            let sx = (ix * stride) as f32;
            let cell = iy * grid_w + ix;
            for k in 0..a {
                let row = cell * a + k;
                all_anchors[[row, 0]] = base_anchors[[k, 0]] + sx;
                all_anchors[[row, 1]] = base_anchors[[k, 1]] + sy;
                all_anchors[[row, 2]] = base_anchors[[k, 2]] + sx;
                all_anchors[[row, 3]] = base_anchors[[k, 3]] + sy;
            }
        }
    }

    all_anchors
}
