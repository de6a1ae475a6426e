// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The image and its derived per-pixel statistics: background, rms, and
curvature maps.

[`Image`] is the only mutable-at-construction, immutable-after-load type in
the crate; everything downstream borrows it. FITS I/O is isolated behind the
[`FitsImageSource`] trait so the rest of the pipeline has no cfitsio calls in
it at all.
 */

mod background;
mod curvature;
mod error;
mod fits;

pub use background::estimate_background_rms;
pub use curvature::estimate_curvature;
pub use error::ImageError;
pub use fits::{write_fits_f32, FitsImageSource, FitsReader};

use ndarray::Array2;

/// A 2-D array of 32-bit flux values. Non-finite entries mark blanked
/// pixels and are preserved rather than filtered out, so array indices stay
/// aligned with sky position.
#[derive(Clone, Debug)]
pub struct Image {
    data: Array2<f32>,
}

impl Image {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn shape(&self) -> (usize, usize) {
        let d = self.data.dim();
        (d.0, d.1)
    }

    /// Pixel value at `[row, col]` = `[y, x]`.
    pub fn get(&self, y: usize, x: usize) -> f32 {
        self.data[[y, x]]
    }
}

/// Per-pixel background estimate, shape-equal to the parent image.
#[derive(Clone, Debug)]
pub struct BackgroundMap(pub(crate) Array2<f32>);

/// Per-pixel local noise estimate, shape-equal to the parent image. Strictly
/// positive, except `NaN` where the source tile had fewer than four finite
/// samples; a `NaN` there means "no detection possible at this pixel".
#[derive(Clone, Debug)]
pub struct RmsMap(pub(crate) Array2<f32>);

/// Discrete-Laplacian second-derivative map, shape-equal to the parent
/// image. Peaks have negative curvature.
#[derive(Clone, Debug)]
pub struct CurvatureMap(pub(crate) Array2<f32>);

macro_rules! impl_map_access {
    ($ty:ty) => {
        impl $ty {
            pub fn shape(&self) -> (usize, usize) {
                let d = self.0.dim();
                (d.0, d.1)
            }

            pub fn get(&self, y: usize, x: usize) -> f32 {
                self.0[[y, x]]
            }

            pub fn as_array(&self) -> &Array2<f32> {
                &self.0
            }
        }
    };
}

impl_map_access!(BackgroundMap);
impl_map_access!(RmsMap);
impl_map_access!(CurvatureMap);
