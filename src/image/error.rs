// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),

    #[error("auxiliary image '{name}' has shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        got: (usize, usize),
        expected: (usize, usize),
    },

    #[error("a background/rms tile had no finite pixels")]
    NoFiniteTile,

    #[error("FITS header is missing required WCS keywords (CRPIX/CRVAL/CDELT)")]
    NoWcsKeywords,

    #[error("HDU {0} is not a 2-D image")]
    BadHdu(usize),

    #[error("WCS keyword error: {0}")]
    Wcs(String),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
