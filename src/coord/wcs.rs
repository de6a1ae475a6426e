// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The concrete `WcsAdapter` used when the pipeline is driven against a
//! simple-WCS FITS header. Wraps a [`TangentPlane`] and tags it with the
//! catalogue [`Frame`] implied by the header's `CTYPE` keywords.

use super::{Frame, SkyProjection, TangentPlane};

/// A FITS header's worth of simple-WCS keywords, enough to build a
/// [`WcsAdapter`]. Extracted from the image HDU by `image::fits`.
#[derive(Clone, Copy, Debug)]
pub struct WcsHeader {
    pub crpix1: f64,
    pub crpix2: f64,
    pub crval1: f64,
    pub crval2: f64,
    pub cdelt1: f64,
    pub cdelt2: f64,
    pub crota2: f64,
    /// True if `CTYPE1` starts with `GLON`, i.e. the image is in galactic
    /// coordinates rather than equatorial.
    pub galactic: bool,
}

/// A tangent-plane projection plus the celestial frame its axes are in.
#[derive(Clone, Copy, Debug)]
pub struct WcsAdapter {
    plane: TangentPlane,
    pub frame: Frame,
}

impl WcsAdapter {
    pub fn new(plane: TangentPlane, frame: Frame) -> Self {
        Self { plane, frame }
    }

    pub fn from_header(header: WcsHeader) -> Self {
        let plane = TangentPlane::from_simple_wcs(
            (header.crpix1, header.crpix2),
            (header.crval1, header.crval2),
            (header.cdelt1, header.cdelt2),
            header.crota2,
        );
        let frame = if header.galactic {
            Frame::Galactic
        } else {
            Frame::Equatorial
        };
        Self { plane, frame }
    }
}

impl SkyProjection for WcsAdapter {
    fn pix_to_sky(&self, x: f64, y: f64) -> (f64, f64) {
        self.plane.pix_to_sky(x, y)
    }

    fn sky_to_pix(&self, ra: f64, dec: f64) -> (f64, f64) {
        self.plane.sky_to_pix(ra, dec)
    }

    fn sky_to_pix_vec(&self, ra: f64, dec: f64, r_deg: f64, pa_deg: f64) -> (f64, f64, f64, f64) {
        self.plane.sky_to_pix_vec(ra, dec, r_deg, pa_deg)
    }

    fn pix_to_sky_vec(&self, x: f64, y: f64, r_pix: f64, theta_deg: f64) -> (f64, f64, f64, f64) {
        self.plane.pix_to_sky_vec(x, y, r_pix, theta_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn galactic_ctype_sets_frame() {
        let header = WcsHeader {
            crpix1: 32.5,
            crpix2: 32.5,
            crval1: 150.0,
            crval2: -30.0,
            cdelt1: -1.0 / 3600.0,
            cdelt2: 1.0 / 3600.0,
            crota2: 0.0,
            galactic: true,
        };
        let wcs = WcsAdapter::from_header(header);
        assert_eq!(wcs.frame, Frame::Galactic);
    }
}
