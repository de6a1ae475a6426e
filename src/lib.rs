// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A radio-astronomy compact-source finder.
//!
//! Given a 2-D FITS image of the radio sky plus a beam model, Aegean estimates
//! per-pixel background and noise statistics, segments the image into compact
//! emission islands, decomposes each island into one or more elliptical
//! Gaussian components with a bounded non-linear least-squares fit, and
//! reports a catalogue of positions, fluxes, shapes and errors in sky (WCS)
//! units.

pub mod catalogue;
pub mod cli;
pub(crate) mod constants;
pub mod coord;
pub mod detect;
pub mod dispatch;
pub(crate) mod error;
pub(crate) mod foreign;
pub mod image;

// Re-exports.
pub use catalogue::{Catalogue, IslandSource, OutputSource};
pub use cli::AegeanArgs;
pub use coord::{Beam, Frame, PixelBeam, WcsAdapter};
pub use detect::FitFlags;
pub use error::AegeanError;
pub use image::{BackgroundMap, CurvatureMap, Image, RmsMap};
