// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The pixel↔sky conversion contract, and a concrete tangent-plane (gnomonic)
//! implementation of it.
//!
//! A full WCS library (handling every FITS projection, SIP distortion, etc.)
//! is an external collaborator; [`SkyProjection`] is the minimal contract the
//! rest of the crate needs from one. [`TangentPlane`] is a self-contained
//! reference implementation good enough to drive the test suite and to
//! handle the common TAN-projected radio image.

use crate::foreign::erfa::{eraPas, eraSeps};

/// The celestial frame a catalogue's longitude/latitude columns are in.
/// Equatorial catalogues report `ra`/`dec`; galactic catalogues rename the
/// same columns to `lon`/`lat` (see the catalogue module).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frame {
    Equatorial,
    Galactic,
}

/// The contract any WCS implementation must satisfy. All angles in degrees
/// unless documented otherwise; `(x, y)` pixel coordinates use the FITS
/// convention of 1-indexed pixel centres, fast axis first.
pub trait SkyProjection {
    /// Convert a pixel position to a sky position.
    fn pix_to_sky(&self, x: f64, y: f64) -> (f64, f64);

    /// Convert a sky position to a pixel position. Note the axis order is
    /// `(ra, dec) -> (x, y)`; this is *not* a transpose of the underlying
    /// array storage, which is row-major `[y, x]`.
    fn sky_to_pix(&self, ra: f64, dec: f64) -> (f64, f64);

    /// Re-express a sky-frame vector (length `r_deg` at position angle
    /// `pa_deg`, measured east of north, anchored at `(ra, dec)`) in pixel
    /// magnitude and pixel-frame angle. Returns `(x, y, r_pix, theta_deg)`
    /// where `(x, y)` is the anchor projected to pixel space.
    fn sky_to_pix_vec(&self, ra: f64, dec: f64, r_deg: f64, pa_deg: f64) -> (f64, f64, f64, f64);

    /// Re-express a pixel-frame vector (length `r_pix` at angle `theta_deg`,
    /// anchored at `(x, y)`) as a sky-frame great-circle vector. Returns
    /// `(ra, dec, r_deg, pa_deg)` where `(ra, dec)` is the anchor projected
    /// to sky space.
    fn pix_to_sky_vec(&self, x: f64, y: f64, r_pix: f64, theta_deg: f64) -> (f64, f64, f64, f64);

    /// Project a sky-frame beam to pixel units at a specific image location.
    /// Because the projection's pixel scale and orientation vary across the
    /// image (especially near the poles), callers must always request a
    /// local pixel beam and never cache a global one.
    fn pixel_beam_at(&self, x: f64, y: f64, beam: super::Beam) -> super::PixelBeam {
        let (ra, dec) = self.pix_to_sky(x, y);
        let (_, _, r_a, theta_a) = self.sky_to_pix_vec(ra, dec, beam.a, beam.pa);
        let (_, _, r_b, _) = self.sky_to_pix_vec(ra, dec, beam.b, beam.pa + 90.0);
        super::PixelBeam::new(r_a, r_b, theta_a)
    }
}

/// A gnomonic (FITS `TAN`) tangent-plane projection: the image's reference
/// pixel `crpix`, the sky position it corresponds to `crval`, and a CD
/// matrix mapping pixel offsets (degrees/pixel) to intermediate world
/// coordinates.
#[derive(Clone, Copy, Debug)]
pub struct TangentPlane {
    /// Reference pixel `(x, y)`, 1-indexed.
    pub crpix: (f64, f64),
    /// Reference sky position, radians `(ra, dec)`.
    pub crval: (f64, f64),
    /// CD matrix, degrees per pixel: `[[cd11, cd12], [cd21, cd22]]`.
    pub cd: [[f64; 2]; 2],
}

impl TangentPlane {
    /// Build a tangent plane from the common simple-WCS case: independent
    /// pixel scales on each axis (degrees/pixel, `cdelt.0` along x) and a
    /// single rotation of the image's y axis from north (degrees, CCW).
    pub fn from_simple_wcs(
        crpix: (f64, f64),
        crval_deg: (f64, f64),
        cdelt: (f64, f64),
        crota2_deg: f64,
    ) -> Self {
        let rot = crota2_deg.to_radians();
        let (sin_r, cos_r) = rot.sin_cos();
        let cd = [
            [cdelt.0 * cos_r, -cdelt.1 * sin_r],
            [cdelt.0 * sin_r, cdelt.1 * cos_r],
        ];
        Self {
            crpix,
            crval: (crval_deg.0.to_radians(), crval_deg.1.to_radians()),
            cd,
        }
    }

    fn pix_to_intermediate(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.crpix.0;
        let dy = y - self.crpix.1;
        let xi = self.cd[0][0] * dx + self.cd[0][1] * dy;
        let eta = self.cd[1][0] * dx + self.cd[1][1] * dy;
        (xi.to_radians(), eta.to_radians())
    }

    fn intermediate_to_pix(&self, xi: f64, eta: f64) -> (f64, f64) {
        let xi_deg = xi.to_degrees();
        let eta_deg = eta.to_degrees();
        let det = self.cd[0][0] * self.cd[1][1] - self.cd[0][1] * self.cd[1][0];
        let dx = (self.cd[1][1] * xi_deg - self.cd[0][1] * eta_deg) / det;
        let dy = (self.cd[0][0] * eta_deg - self.cd[1][0] * xi_deg) / det;
        (self.crpix.0 + dx, self.crpix.1 + dy)
    }
}

impl SkyProjection for TangentPlane {
    fn pix_to_sky(&self, x: f64, y: f64) -> (f64, f64) {
        let (xi, eta) = self.pix_to_intermediate(x, y);
        let (ra0, dec0) = self.crval;
        let rho = (xi * xi + eta * eta).sqrt();
        if rho == 0.0 {
            return (ra0.to_degrees(), dec0.to_degrees());
        }
        let c = rho.atan();
        let (sin_c, cos_c) = c.sin_cos();
        let dec = (cos_c * dec0.sin() + (eta * sin_c * dec0.cos()) / rho).asin();
        let ra = ra0 + (xi * sin_c).atan2(rho * dec0.cos() * cos_c - eta * dec0.sin() * sin_c);
        (ra.to_degrees().rem_euclid(360.0), dec.to_degrees())
    }

    fn sky_to_pix(&self, ra: f64, dec: f64) -> (f64, f64) {
        let (ra0, dec0) = self.crval;
        let ra = ra.to_radians();
        let dec = dec.to_radians();
        let cos_c = dec0.sin() * dec.sin() + dec0.cos() * dec.cos() * (ra - ra0).cos();
        let xi = dec.cos() * (ra - ra0).sin() / cos_c;
        let eta = (dec0.cos() * dec.sin() - dec0.sin() * dec.cos() * (ra - ra0).cos()) / cos_c;
        self.intermediate_to_pix(xi, eta)
    }

    fn sky_to_pix_vec(&self, ra: f64, dec: f64, r_deg: f64, pa_deg: f64) -> (f64, f64, f64, f64) {
        let (x, y) = self.sky_to_pix(ra, dec);
        let (ra2, dec2) = great_circle_endpoint(ra.to_radians(), dec.to_radians(), r_deg.to_radians(), pa_deg.to_radians());
        let (x2, y2) = self.sky_to_pix(ra2.to_degrees(), dec2.to_degrees());
        let dx = x2 - x;
        let dy = y2 - y;
        let r_pix = (dx * dx + dy * dy).sqrt();
        let theta_deg = dy.atan2(dx).to_degrees();
        (x, y, r_pix, theta_deg)
    }

    fn pix_to_sky_vec(&self, x: f64, y: f64, r_pix: f64, theta_deg: f64) -> (f64, f64, f64, f64) {
        let (ra, dec) = self.pix_to_sky(x, y);
        let theta = theta_deg.to_radians();
        let x2 = x + r_pix * theta.cos();
        let y2 = y + r_pix * theta.sin();
        let (ra2, dec2) = self.pix_to_sky(x2, y2);
        let r_deg = unsafe { eraSeps(ra.to_radians(), dec.to_radians(), ra2.to_radians(), dec2.to_radians()) }
            .to_degrees();
        let pa_deg = unsafe { eraPas(ra.to_radians(), dec.to_radians(), ra2.to_radians(), dec2.to_radians()) }
            .to_degrees();
        (ra, dec, r_deg, pa_deg)
    }
}

/// The sky point reached by travelling `r_rad` along a great circle from
/// `(ra_rad, dec_rad)` at bearing `pa_rad` (radians, east of north).
fn great_circle_endpoint(ra_rad: f64, dec_rad: f64, r_rad: f64, pa_rad: f64) -> (f64, f64) {
    let dec2 = (dec_rad.sin() * r_rad.cos() + dec_rad.cos() * r_rad.sin() * pa_rad.cos()).asin();
    let ra2 = ra_rad
        + (pa_rad.sin() * r_rad.sin() * dec_rad.cos())
            .atan2(r_rad.cos() - dec_rad.sin() * dec2.sin());
    (ra2, dec2)
}
