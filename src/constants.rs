// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. Aegean should do as many
calculations as possible in double precision before converting to a lower
precision, if it is ever required.
 */

pub use std::f64::consts::PI;

/// Conversion factor from a Gaussian's FWHM to its standard deviation:
/// `sigma = fwhm / FWHM_TO_SIGMA`.
pub const FWHM_TO_SIGMA: f64 = 2.354_820_045_030_949_3; // 2 * sqrt(2 * ln 2)

/// Scales an interquartile range to a Gaussian standard deviation:
/// `sigma = (p75 - p25) / IQR_TO_SIGMA`.
pub const IQR_TO_SIGMA: f64 = 1.34896;

/// Default seed-clip threshold (multiples of the local rms) used by the
/// island segmenter.
pub const DEFAULT_SEED_CLIP: f64 = 5.0;

/// Default flood-clip threshold (multiples of the local rms) used by the
/// island segmenter.
pub const DEFAULT_FLOOD_CLIP: f64 = 4.0;

/// Number of sub-tiles per beam-scaled background/rms mesh axis.
pub const DEFAULT_MESH: f64 = 20.0;

/// Minimum number of finite pixels in a background/rms tile (or in an
/// island) before a fit is even attempted; fewer than this and the tile (or
/// island) is flagged rather than estimated.
pub const MIN_FINITE_PIXELS: usize = 4;

/// Islands with a finite-pixel count in `[MIN_FINITE_PIXELS, FIXED2PSF_MAX_PIXELS]`
/// get their shape frozen to the pixel beam rather than fitted freely.
pub const FIXED2PSF_MAX_PIXELS: usize = 6;

/// Number of islands submitted to the worker pool per batch.
pub const ISLAND_BATCH_SIZE: usize = 20;

/// Default maximum number of Levenberg-Marquardt iterations per island fit.
pub const DEFAULT_MAX_ITERATIONS: usize = 200;
