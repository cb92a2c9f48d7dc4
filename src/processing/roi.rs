use ndarray::{Array2, Array3, Array4};

use crate::error::{Error, Result};
use crate::processing::check_boxes;

/// Extracts a fixed-size bilinear resample of `features` for every box.
///
/// `features` is `(height, width, channels)`; each box row is
/// `(y1, x1, y2, x2)` expressed as fractions of the feature-map extent, and
/// the output is `(num_boxes, crop_size, crop_size, channels)`. Coordinates
/// outside `[0, 1]` are not an error: sampling clamps to the nearest edge
/// texel, which extends the border values outward.
pub fn crop_and_resize(
    features: &Array3<f32>,
    boxes: &Array2<f32>,
    crop_size: usize,
) -> Result<Array4<f32>> {
    check_boxes(boxes)?;
    if crop_size == 0 {
        return Err(Error::ZeroCropSize);
    }

    let (height, width, channels) = features.dim();
    let n = boxes.nrows();
    let mut patches = Array4::<f32>::zeros((n, crop_size, crop_size, channels));
    if height == 0 || width == 0 {
        return Ok(patches);
    }

    for b in 0..n {
        let y1 = boxes[[b, 0]];
        let x1 = boxes[[b, 1]];
        let y2 = boxes[[b, 2]];
        let x2 = boxes[[b, 3]];

        for i in 0..crop_size {
            let y = sample_coord(y1, y2, i, crop_size, height);
            for j in 0..crop_size {
                let x = sample_coord(x1, x2, j, crop_size, width);
                bilinear(features, y, x, &mut |ch, v| patches[[b, i, j, ch]] = v);
            }
        }
    }

    Ok(patches)
}

/// Position of output cell `i` along one axis, in source-pixel coordinates.
/// A single-cell output samples the box center.
fn sample_coord(lo: f32, hi: f32, i: usize, crop_size: usize, dim: usize) -> f32 {
    let extent = (dim - 1) as f32;
    if crop_size > 1 {
        lo * extent + i as f32 * (hi - lo) * extent / (crop_size - 1) as f32
    } else {
        0.5 * (lo + hi) * extent
    }
}

fn bilinear(features: &Array3<f32>, y: f32, x: f32, write: &mut impl FnMut(usize, f32)) {
    let (height, width, channels) = features.dim();
    let clamp = |v: isize, max: usize| v.clamp(0, max as isize - 1) as usize;

    let ty = y - y.floor();
    let tx = x - x.floor();
    let y0 = clamp(y.floor() as isize, height);
    let y1 = clamp(y.floor() as isize + 1, height);
    let x0 = clamp(x.floor() as isize, width);
    let x1 = clamp(x.floor() as isize + 1, width);

    for ch in 0..channels {
        let top = (1.0 - tx) * features[[y0, x0, ch]] + tx * features[[y0, x1, ch]];
        let bottom = (1.0 - tx) * features[[y1, x0, ch]] + tx * features[[y1, x1, ch]];
        write(ch, (1.0 - ty) * top + ty * bottom);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2, Array3};

    use crate::processing::roi::crop_and_resize;

    #[test]
    fn test_output_shape() {
        let features = Array3::<f32>::ones((28, 28, 3));
        let boxes = array![[0.1, 0.1, 0.2, 0.2], [0.5, 0.5, 0.8, 0.8]];

        let patches = crop_and_resize(&features, &boxes, 7).unwrap();

        assert_eq!(patches.dim(), (2, 7, 7, 3));
        assert!(patches.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_identity_crop() {
        // The full-extent box at the same resolution reproduces the map.
        let features =
            Array3::from_shape_fn((4, 4, 1), |(y, x, _)| (y * 4 + x) as f32);
        let boxes = array![[0.0, 0.0, 1.0, 1.0]];

        let patches = crop_and_resize(&features, &boxes, 4).unwrap();

        for y in 0..4 {
            for x in 0..4 {
                assert_abs_diff_eq!(patches[[0, y, x, 0]], features[[y, x, 0]], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_interpolates_between_texels() {
        let features = Array3::from_shape_fn((2, 2, 1), |(y, x, _)| (y * 2 + x) as f32);
        // Box spanning the whole map, sampled at 3x3: the center lands
        // between all four texels.
        let boxes = array![[0.0, 0.0, 1.0, 1.0]];

        let patches = crop_and_resize(&features, &boxes, 3).unwrap();

        assert_abs_diff_eq!(patches[[0, 0, 0, 0]], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(patches[[0, 1, 1, 0]], 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(patches[[0, 2, 2, 0]], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_out_of_range_boxes_extrapolate() {
        let features = Array3::<f32>::ones((8, 8, 2));
        let boxes = array![[-0.5, -0.5, 1.5, 1.5]];

        let patches = crop_and_resize(&features, &boxes, 5).unwrap();

        // Edge clamping keeps every sample on the constant map.
        assert!(patches.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_empty_box_set() {
        let features = Array3::<f32>::ones((8, 8, 2));
        let boxes = Array2::<f32>::zeros((0, 4));
        let patches = crop_and_resize(&features, &boxes, 7).unwrap();
        assert_eq!(patches.dim(), (0, 7, 7, 2));
    }
}
