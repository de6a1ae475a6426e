// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The per-island parameter estimator (§4.5): classifies an island by its
//! finite-pixel count, extracts candidate Gaussian summits from the
//! curvature map, and builds a bounded initial parameter vector for each.

use ndarray::{Array2, ArrayView2};

use super::flags::FitFlags;
use super::island::{Island, Segmenter};
use crate::constants::{FIXED2PSF_MAX_PIXELS, FWHM_TO_SIGMA, MIN_FINITE_PIXELS};
use crate::coord::PixelBeam;

/// One fittable (or fixed) scalar parameter: its initial value, whether the
/// fitter should hold it fixed, and its two-sided bound.
#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub value: f64,
    pub fixed: bool,
    pub lower: f64,
    pub upper: f64,
}

impl ParamSpec {
    fn free(value: f64, lower: f64, upper: f64) -> Self {
        Self {
            value,
            fixed: false,
            lower,
            upper,
        }
    }

    fn fixed_at(value: f64) -> Self {
        Self {
            value,
            fixed: true,
            lower: value,
            upper: value,
        }
    }
}

/// The six-parameter initial guess for one Gaussian candidate, in island
/// pixel coordinates.
#[derive(Clone, Debug)]
pub struct CandidateParams {
    pub amp: ParamSpec,
    pub xo: ParamSpec,
    pub yo: ParamSpec,
    pub major: ParamSpec,
    pub minor: ParamSpec,
    pub pa: ParamSpec,
    pub flags: FitFlags,
}

/// The full output of the estimator for one island.
#[derive(Clone, Debug)]
pub struct Estimate {
    pub candidates: Vec<CandidateParams>,
    pub flags: FitFlags,
}

/// Estimate initial Gaussian parameters for `island`. `rms` and `curvature`
/// must be cropped to the same shape as `island.data`, aligned pixel for
/// pixel. `pixel_beam` is the beam projected at the island's centroid.
pub fn estimate_parameters(
    island: &Island,
    rms: ArrayView2<f32>,
    curvature: ArrayView2<f32>,
    pixel_beam: PixelBeam,
    seed_clip: f64,
    c_sigma: f64,
) -> Estimate {
    let n = island.n_finite();
    let (ysize, xsize) = island.data.dim();

    if n < MIN_FINITE_PIXELS {
        let (yo, xo) = argmax(&island.data);
        let amp = island.data[[yo, xo]] as f64;
        let candidate = CandidateParams {
            amp: ParamSpec::fixed_at(amp),
            xo: ParamSpec::fixed_at(xo as f64),
            yo: ParamSpec::fixed_at(yo as f64),
            major: ParamSpec::fixed_at(pixel_beam.a / FWHM_TO_SIGMA),
            minor: ParamSpec::fixed_at(pixel_beam.b / FWHM_TO_SIGMA),
            pa: ParamSpec::fixed_at(pixel_beam.pa),
            flags: FitFlags::FITERRSMALL,
        };
        return Estimate {
            candidates: vec![candidate],
            flags: FitFlags::FITERRSMALL,
        };
    }

    if n <= FIXED2PSF_MAX_PIXELS {
        let (yo, xo) = argmax(&island.data);
        let amp = island.data[[yo, xo]] as f64;
        let local_rms = rms[[yo, xo]] as f64;
        let candidate = CandidateParams {
            amp: amplitude_spec(amp, local_rms),
            xo: centre_spec(xo as f64, pixel_beam, Axis::X, xsize),
            yo: centre_spec(yo as f64, pixel_beam, Axis::Y, ysize),
            major: ParamSpec::fixed_at(pixel_beam.a / FWHM_TO_SIGMA),
            minor: ParamSpec::fixed_at(pixel_beam.b / FWHM_TO_SIGMA),
            pa: ParamSpec::fixed_at(pixel_beam.pa),
            flags: FitFlags::FIXED2PSF,
        };
        return Estimate {
            candidates: vec![candidate],
            flags: FitFlags::FIXED2PSF,
        };
    }

    let mut mask = Array2::from_elem((ysize, xsize), f32::NAN);
    for y in 0..ysize {
        for x in 0..xsize {
            let d = island.data[[y, x]];
            let r = rms[[y, x]];
            let c = curvature[[y, x]];
            if d.is_finite()
                && r.is_finite()
                && (d as f64 - seed_clip * r as f64) > 0.0
                && (c as f64) < -c_sigma
            {
                mask[[y, x]] = 1.0;
            }
        }
    }
    let ones = Array2::from_elem((ysize, xsize), 1.0f32);
    let summits: Vec<Island> = Segmenter::new(mask.view(), ones.view(), 0.0, 0.0).collect();

    let mut candidates = Vec::with_capacity(summits.len().max(1));
    for summit in &summits {
        let (sy, sx) = argmax_masked(&summit.data, island, summit.ymin, summit.xmin);
        let amp = island.data[[sy, sx]] as f64;
        let local_rms = rms[[sy, sx]] as f64;

        let major_init = pixel_beam.a / FWHM_TO_SIGMA;
        let minor_init = pixel_beam.b / FWHM_TO_SIGMA;
        let base_term = (xsize.max(ysize) as f64 + 1.0) * std::f64::consts::SQRT_2 / FWHM_TO_SIGMA;
        // The upper bound intentionally uses `major_init` for both axes;
        // see the design ledger's "minor-axis upper bound" entry.
        let major = ParamSpec::free(major_init, 0.8 * major_init, base_term.max(1.1 * major_init));
        let minor = ParamSpec::free(minor_init, 0.8 * minor_init, base_term.max(1.1 * major_init));

        let mut flags = FitFlags::empty();
        if major.lower == major.upper || minor.lower == minor.upper {
            flags |= FitFlags::FIXED2PSF;
        }

        candidates.push(CandidateParams {
            amp: amplitude_spec(amp, local_rms),
            xo: centre_spec(sx as f64, pixel_beam, Axis::X, xsize),
            yo: centre_spec(sy as f64, pixel_beam, Axis::Y, ysize),
            major: if flags.contains(FitFlags::FIXED2PSF) {
                ParamSpec::fixed_at(major_init)
            } else {
                major
            },
            minor: if flags.contains(FitFlags::FIXED2PSF) {
                ParamSpec::fixed_at(minor_init)
            } else {
                minor
            },
            pa: ParamSpec::free(pixel_beam.pa, -180.0, 180.0),
            flags,
        });
    }

    if candidates.is_empty() {
        // No curvature-qualified summit; fall back to a single candidate at
        // the island max so every island contributes at least one record.
        let (yo, xo) = argmax(&island.data);
        let amp = island.data[[yo, xo]] as f64;
        let local_rms = rms[[yo, xo]] as f64;
        candidates.push(CandidateParams {
            amp: amplitude_spec(amp, local_rms),
            xo: centre_spec(xo as f64, pixel_beam, Axis::X, xsize),
            yo: centre_spec(yo as f64, pixel_beam, Axis::Y, ysize),
            major: ParamSpec::free(
                pixel_beam.a / FWHM_TO_SIGMA,
                0.8 * pixel_beam.a / FWHM_TO_SIGMA,
                1.1 * pixel_beam.a / FWHM_TO_SIGMA,
            ),
            minor: ParamSpec::free(
                pixel_beam.b / FWHM_TO_SIGMA,
                0.8 * pixel_beam.b / FWHM_TO_SIGMA,
                1.1 * pixel_beam.a / FWHM_TO_SIGMA,
            ),
            pa: ParamSpec::free(pixel_beam.pa, -180.0, 180.0),
            flags: FitFlags::empty(),
        });
    }

    Estimate {
        candidates,
        flags: FitFlags::empty(),
    }
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

fn amplitude_spec(amp: f64, local_rms: f64) -> ParamSpec {
    ParamSpec::free(amp, 4.0 * local_rms, 1.05 * amp + 3.0 * local_rms)
}

fn centre_spec(init: f64, pixel_beam: PixelBeam, axis: Axis, size: usize) -> ParamSpec {
    let pa = pixel_beam.pa.to_radians();
    let half_extent = match axis {
        Axis::X => (pixel_beam.a * pa.cos()).abs().max((pixel_beam.b * pa.sin()).abs()),
        Axis::Y => (pixel_beam.a * pa.sin()).abs().max((pixel_beam.b * pa.cos()).abs()),
    };
    let box_max = (size.saturating_sub(1)) as f64;
    let mut lower = (init - half_extent).max(0.0);
    let mut upper = (init + half_extent).min(box_max);
    if lower == upper {
        lower -= 0.5;
        upper += 0.5;
    }
    ParamSpec::free(init, lower, upper)
}

fn argmax(data: &Array2<f32>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f32::NEG_INFINITY;
    for ((y, x), &v) in data.indexed_iter() {
        if v.is_finite() && v > best_val {
            best_val = v;
            best = (y, x);
        }
    }
    best
}

/// Argmax of a summit's membership mask, re-expressed in the coordinates of
/// the parent `island` (whose real flux values are used for the amplitude,
/// not the 1.0 mask placeholder).
fn argmax_masked(
    summit_mask: &Array2<f32>,
    island: &Island,
    y_offset: usize,
    x_offset: usize,
) -> (usize, usize) {
    let mut best = (y_offset, x_offset);
    let mut best_val = f32::NEG_INFINITY;
    for ((y, x), &v) in summit_mask.indexed_iter() {
        if v.is_finite() {
            let (iy, ix) = (y + y_offset, x + x_offset);
            let flux = island.data[[iy, ix]];
            if flux > best_val {
                best_val = flux;
                best = (iy, ix);
            }
        }
    }
    best
}
