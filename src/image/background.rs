// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tiled background and rms estimation (§4.2 of the design).

use ndarray::Array2;

use super::{BackgroundMap, Image, RmsMap};
use crate::constants::{DEFAULT_MESH, IQR_TO_SIGMA, MIN_FINITE_PIXELS};
use crate::coord::PixelBeam;

/// Estimate a per-pixel background and rms map by tiling `image` with a
/// mesh scaled by the pixel beam at image centre. `forced_rms`, if given,
/// bypasses estimation entirely: background is zero everywhere and rms is
/// the supplied constant.
pub fn estimate_background_rms(
    image: &Image,
    pixel_beam_at_centre: PixelBeam,
    forced_rms: Option<f64>,
) -> (BackgroundMap, RmsMap) {
    let (ny, nx) = image.shape();

    if let Some(rms) = forced_rms {
        let bg = Array2::from_elem((ny, nx), 0.0f32);
        let rms_map = Array2::from_elem((ny, nx), rms as f32);
        return (BackgroundMap(bg), RmsMap(rms_map));
    }

    let pa = pixel_beam_at_centre.pa.to_radians();
    let (a, b) = (pixel_beam_at_centre.a, pixel_beam_at_centre.b);
    let tile_w = DEFAULT_MESH * (pa.cos() * b).abs().max((pa.sin() * a).abs());
    let tile_h = DEFAULT_MESH * (pa.sin() * b).abs().max((pa.cos() * a).abs());

    let x_tiles = tile_edges(nx, tile_w);
    let y_tiles = tile_edges(ny, tile_h);

    let mut bg = Array2::from_elem((ny, nx), f32::NAN);
    let mut rms_map = Array2::from_elem((ny, nx), f32::NAN);

    for &(y0, y1) in &y_tiles {
        for &(x0, x1) in &x_tiles {
            let mut vals: Vec<f32> = Vec::with_capacity((y1 - y0) * (x1 - x0));
            for y in y0..y1 {
                for x in x0..x1 {
                    let v = image.get(y, x);
                    if v.is_finite() {
                        vals.push(v);
                    }
                }
            }
            let (tile_bg, tile_rms) = if vals.len() < MIN_FINITE_PIXELS {
                (f32::NAN, f32::NAN)
            } else {
                vals.sort_by(|a, b| a.partial_cmp(b).unwrap());
                let n = vals.len();
                let median = vals[n / 2];
                let p25 = vals[n / 4];
                let p75 = vals[3 * n / 4];
                (median, (p75 - p25) / IQR_TO_SIGMA as f32)
            };
            for y in y0..y1 {
                for x in x0..x1 {
                    bg[[y, x]] = tile_bg;
                    rms_map[[y, x]] = tile_rms;
                }
            }
        }
    }

    (BackgroundMap(bg), RmsMap(rms_map))
}

/// Pixel-index tile boundaries along one axis of length `n`, anchored so
/// that one tile of width `tile_size` is centred on `n/2`; partial tiles
/// tile outward to the edges. If `tile_size` is at least as large as the
/// axis, the whole axis is a single tile.
fn tile_edges(n: usize, tile_size: f64) -> Vec<(usize, usize)> {
    let n_f = n as f64;
    if tile_size >= n_f || tile_size <= 0.0 {
        return vec![(0, n)];
    }

    let centre = n_f / 2.0;
    let mut bounds = vec![centre - tile_size / 2.0, centre + tile_size / 2.0];

    let mut left = centre - tile_size / 2.0;
    while left > 0.0 {
        left -= tile_size;
        bounds.push(left);
    }
    let mut right = centre + tile_size / 2.0;
    while right < n_f {
        right += tile_size;
        bounds.push(right);
    }

    let mut idxs: Vec<usize> = bounds
        .into_iter()
        .map(|b| b.clamp(0.0, n_f).round() as usize)
        .collect();
    idxs.sort_unstable();
    idxs.dedup();

    idxs.windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| (w[0], w[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_rms_gives_zero_background() {
        let image = Image::new(Array2::from_elem((8, 8), 1.0f32));
        let beam = PixelBeam::new(4.0, 2.0, 0.0);
        let (bg, rms) = estimate_background_rms(&image, beam, Some(2.5));
        assert!(bg.as_array().iter().all(|&v| v == 0.0));
        assert!(rms.as_array().iter().all(|&v| v == 2.5));
    }

    #[test]
    fn tile_edges_single_tile_when_beam_spans_image() {
        let edges = tile_edges(64, 1000.0);
        assert_eq!(edges, vec![(0, 64)]);
    }

    #[test]
    fn tile_edges_cover_whole_axis_without_gaps() {
        let edges = tile_edges(100, 12.0);
        assert_eq!(edges.first().unwrap().0, 0);
        assert_eq!(edges.last().unwrap().1, 100);
        for w in edges.windows(2) {
            assert_eq!(w[0].1, w[1].0);
        }
    }

    #[test]
    fn sparse_tile_yields_nan() {
        let mut data = Array2::from_elem((8, 8), f32::NAN);
        data[[0, 0]] = 1.0;
        let image = Image::new(data);
        let beam = PixelBeam::new(2.0, 2.0, 0.0);
        let (bg, rms) = estimate_background_rms(&image, beam, None);
        assert!(bg.get(0, 0).is_nan());
        assert!(rms.get(0, 0).is_nan());
    }
}
