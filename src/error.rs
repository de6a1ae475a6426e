// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all Aegean-related errors. This should be the *only* error
//! enum that is publicly visible.

use thiserror::Error;

use crate::{
    catalogue::CatalogueError, cli::CliError, dispatch::DispatchError, image::ImageError,
};

/// The *only* publicly visible error from Aegean.
#[derive(Error, Debug)]
pub enum AegeanError {
    /// An error reading or validating the input image(s).
    #[error("{0}")]
    Image(String),

    /// An error from the FITS library.
    #[error("cfitsio error: {0}")]
    Cfitsio(String),

    /// An error projecting between pixel and sky coordinates.
    #[error("WCS error: {0}")]
    Wcs(String),

    /// An error running the island dispatcher or a worker.
    #[error("{0}")]
    Dispatch(String),

    /// An error writing the output catalogue.
    #[error("{0}")]
    Catalogue(String),

    /// An error in the command-line arguments.
    #[error("{0}")]
    Cli(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

impl From<ImageError> for AegeanError {
    fn from(e: ImageError) -> Self {
        let s = e.to_string();
        match e {
            ImageError::Fitsio(_) => Self::Cfitsio(s),
            ImageError::ShapeMismatch { .. }
            | ImageError::NoFiniteTile
            | ImageError::NoWcsKeywords
            | ImageError::BadHdu(_) => Self::Image(s),
            ImageError::Wcs(_) => Self::Wcs(s),
            ImageError::IO(_) => Self::Generic(s),
        }
    }
}

impl From<DispatchError> for AegeanError {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e.to_string())
    }
}

impl From<CatalogueError> for AegeanError {
    fn from(e: CatalogueError) -> Self {
        let s = e.to_string();
        match e {
            CatalogueError::IO(_) | CatalogueError::Serialize(_) => Self::Generic(s),
        }
    }
}

impl From<CliError> for AegeanError {
    fn from(e: CliError) -> Self {
        Self::Cli(e.to_string())
    }
}
