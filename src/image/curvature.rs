// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The discrete Laplacian curvature filter (§4.3). Peaks have negative
//! curvature; this sign convention is load-bearing for the island
//! segmenter's summit extraction.

use ndarray::Array2;

use super::{CurvatureMap, Image};
use crate::constants::IQR_TO_SIGMA;

const KERNEL: [[f32; 3]; 3] = [[1.0, 1.0, 1.0], [1.0, -8.0, 1.0], [1.0, 1.0, 1.0]];

/// Convolve `image` with the 3x3 Laplacian kernel (reflect edge handling),
/// and estimate the curvature map's own noise as the IQR-scaled rms of its
/// finite pixels if `c_sigma` is not supplied.
pub fn estimate_curvature(image: &Image, c_sigma: Option<f64>) -> (CurvatureMap, f64) {
    let (ny, nx) = image.shape();
    let mut curv = Array2::from_elem((ny, nx), f32::NAN);

    for y in 0..ny {
        for x in 0..nx {
            if !image.get(y, x).is_finite() {
                continue;
            }
            let mut acc = 0.0f32;
            let mut any_nonfinite = false;
            for (dy_idx, dy) in [-1i64, 0, 1].into_iter().enumerate() {
                for (dx_idx, dx) in [-1i64, 0, 1].into_iter().enumerate() {
                    let k = KERNEL[dy_idx][dx_idx];
                    if k == 0.0 {
                        continue;
                    }
                    let yy = reflect(y as i64 + dy, ny);
                    let xx = reflect(x as i64 + dx, nx);
                    let v = image.get(yy, xx);
                    if !v.is_finite() {
                        any_nonfinite = true;
                        break;
                    }
                    acc += k * v;
                }
                if any_nonfinite {
                    break;
                }
            }
            curv[[y, x]] = if any_nonfinite { f32::NAN } else { acc };
        }
    }

    let sigma = match c_sigma {
        Some(s) => s,
        None => estimate_iqr_sigma(&curv),
    };

    (CurvatureMap(curv), sigma)
}

fn reflect(i: i64, n: usize) -> usize {
    let n = n as i64;
    if n <= 1 {
        return 0;
    }
    let mut i = i;
    if i < 0 {
        i = -i - 1;
    } else if i >= n {
        i = 2 * n - i - 1;
    }
    i.clamp(0, n - 1) as usize
}

fn estimate_iqr_sigma(map: &Array2<f32>) -> f64 {
    let mut vals: Vec<f32> = map.iter().copied().filter(|v| v.is_finite()).collect();
    if vals.len() < 4 {
        return f64::NAN;
    }
    vals.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = vals.len();
    let p25 = vals[n / 4] as f64;
    let p75 = vals[3 * n / 4] as f64;
    (p75 - p25) / IQR_TO_SIGMA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_has_negative_curvature() {
        let mut data = Array2::from_elem((5, 5), 0.0f32);
        data[[2, 2]] = 10.0;
        let image = Image::new(data);
        let (curv, _) = estimate_curvature(&image, Some(1.0));
        assert!(curv.get(2, 2) < 0.0);
    }

    #[test]
    fn reflect_handles_edges_without_panicking() {
        let data = Array2::from_elem((3, 3), 1.0f32);
        let image = Image::new(data);
        let (curv, _) = estimate_curvature(&image, Some(1.0));
        assert!(curv.get(0, 0).is_finite());
    }
}
