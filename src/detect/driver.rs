// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The per-island fit driver (§4.7): estimate, fit, and convert every
//! component from island pixel coordinates into sky units, applying the
//! error-propagation, shape-ordering, and error-inflation rules.

use ndarray::ArrayView2;

use super::estimate::estimate_parameters;
use super::fit::fit_island;
use super::flags::FitFlags;
use super::island::Island;
use crate::catalogue::{IslandSource, OutputSource};
use crate::constants::FWHM_TO_SIGMA;
use crate::coord::{Beam, PixelBeam, SkyProjection};

/// Everything one worker needs to turn an island into catalogue records.
pub struct IslandFitResult {
    pub components: Vec<OutputSource>,
    pub island_record: Option<IslandSource>,
}

/// Run the full §4.5–§4.7 pipeline for one island.
///
/// `rms`, `background` and `curvature` must already be cropped to the same
/// shape as `island.data`, aligned pixel for pixel (the dispatcher does this
/// crop once per island from the shared global maps).
#[allow(clippy::too_many_arguments)]
pub fn run_island(
    island_id: i64,
    island: &Island,
    rms: ArrayView2<f32>,
    background: ArrayView2<f32>,
    curvature: ArrayView2<f32>,
    wcs: &dyn SkyProjection,
    sky_beam: Beam,
    seed_clip: f64,
    flood_clip: f64,
    c_sigma: f64,
    max_summits: Option<usize>,
    max_iterations: usize,
    emit_island_record: bool,
) -> IslandFitResult {
    let centre_x = island.xmin as f64 + (island.xmax - island.xmin) as f64 / 2.0 + 1.0;
    let centre_y = island.ymin as f64 + (island.ymax - island.ymin) as f64 / 2.0 + 1.0;
    let pixel_beam = wcs.pixel_beam_at(centre_x, centre_y, sky_beam);

    let estimate = estimate_parameters(island, rms, curvature, pixel_beam, seed_clip, c_sigma);
    let outcome = fit_island(island, rms, &estimate, max_summits, max_iterations);

    let n_finite = island.n_finite() as f64;
    let n_components = outcome.components.len().max(1) as f64;
    let inflation = (n_finite / n_components).sqrt();

    let mut components = Vec::with_capacity(outcome.components.len());
    for (i, comp) in outcome.components.iter().enumerate() {
        let candidate_flags = estimate
            .candidates
            .get(i)
            .map(|c| c.flags)
            .unwrap_or_else(FitFlags::empty);
        let mut flags = candidate_flags;
        if outcome.notfit {
            flags |= FitFlags::NOTFIT;
        }
        if outcome.fiterr {
            flags |= FitFlags::FITERR;
        }

        let x_pix = comp.xo + island.xmin as f64 + 1.0;
        let y_pix = comp.yo + island.ymin as f64 + 1.0;

        let (ra, dec, a_deg, pa_sky) =
            wcs.pix_to_sky_vec(x_pix, y_pix, comp.major * FWHM_TO_SIGMA, comp.pa_deg);
        let (_, _, b_deg, _) =
            wcs.pix_to_sky_vec(x_pix, y_pix, comp.minor * FWHM_TO_SIGMA, comp.pa_deg + 90.0);

        let err_xo = comp.err_xo;
        let err_yo = comp.err_yo;
        let (err_ra, err_dec) = propagate_position_error(
            wcs,
            x_pix,
            y_pix,
            err_xo,
            err_yo,
            island.data.nrows() as f64,
            island.data.ncols() as f64,
            ra,
            dec,
        );

        let err_a_deg = propagate_radius_error(
            wcs,
            x_pix,
            y_pix,
            comp.major,
            comp.pa_deg,
            comp.err_major,
            a_deg,
        );
        let err_b_deg = propagate_radius_error(
            wcs,
            x_pix,
            y_pix,
            comp.minor,
            comp.pa_deg + 90.0,
            comp.err_minor,
            b_deg,
        );
        let err_pa_deg = propagate_pa_error(
            wcs,
            x_pix,
            y_pix,
            comp.major,
            comp.pa_deg,
            comp.err_pa_deg,
            pa_sky,
        );

        let (mut a_arcsec, mut b_arcsec, mut err_a, mut err_b, mut pa) = (
            a_deg * 3600.0,
            b_deg * 3600.0,
            err_a_deg * 3600.0,
            err_b_deg * 3600.0,
            pa_sky,
        );
        if a_arcsec < b_arcsec {
            std::mem::swap(&mut a_arcsec, &mut b_arcsec);
            std::mem::swap(&mut err_a, &mut err_b);
            pa += 90.0;
        }
        pa = wrap_pa(pa);
        // pa-err_pa = 180deg is the same as 0deg, so re-wrap the error too.
        let err_pa = if err_pa_deg > 0.0 { wrap_pa(err_pa_deg).abs() } else { err_pa_deg };

        let by = clamp_island_index(y_pix - island.ymin as f64, island.data.nrows());
        let bx = clamp_island_index(x_pix - island.xmin as f64, island.data.ncols());
        let background_val = background[[by, bx]] as f64;
        let local_rms = rms[[by, bx]] as f64;

        let int_flux = comp.amp * comp.major * comp.minor * FWHM_TO_SIGMA.powi(2)
            / (pixel_beam.a * pixel_beam.b);
        let rel = |err: f64, val: f64| if err <= 0.0 || val == 0.0 { 0.0 } else { err / val };
        let err_int_flux = int_flux
            * (rel(comp.err_amp, comp.amp).powi(2)
                + rel(err_a, a_arcsec).powi(2)
                + rel(err_b, b_arcsec).powi(2))
            .sqrt();

        let inflate = |e: f64| if e > 0.0 { e * inflation } else { e };

        components.push(OutputSource {
            island: island_id,
            source: i as i64,
            background: background_val,
            local_rms,
            ra,
            dec,
            ra_str: String::new(),
            dec_str: String::new(),
            err_ra: inflate(err_ra),
            err_dec: inflate(err_dec),
            peak_flux: comp.amp,
            err_peak_flux: inflate(if comp.err_amp <= 0.0 { -1.0 } else { comp.err_amp }),
            int_flux,
            err_int_flux: inflate(err_int_flux),
            a: a_arcsec,
            err_a: inflate(err_a),
            b: b_arcsec,
            err_b: inflate(err_b),
            pa,
            err_pa: inflate(err_pa),
            flags: flags.bits(),
        }
        .with_sexagesimal());
    }

    let island_record = if emit_island_record {
        build_island_record(island_id, island, rms, background, wcs, seed_clip, flood_clip, pixel_beam)
    } else {
        None
    };

    IslandFitResult {
        components,
        island_record,
    }
}

fn clamp_island_index(v: f64, len: usize) -> usize {
    (v.round() as i64).clamp(0, len as i64 - 1) as usize
}

fn wrap_pa(pa: f64) -> f64 {
    let mut pa = pa % 180.0;
    if pa <= -90.0 {
        pa += 180.0;
    } else if pa > 90.0 {
        pa -= 180.0;
    }
    pa
}

/// Propagate the fitted position error onto the sky by perturbing the pixel
/// position once by the joint `(err_xo, err_yo)` offset, clamped to `[-1,
/// max_x_err]`/`[-1, max_y_err]`, and reading the single resulting sky delta
/// off `pix_to_sky` (rather than perturbing each axis independently and
/// RSS-combining the results, which drops the cross term a rotated or
/// anisotropic WCS introduces).
#[allow(clippy::too_many_arguments)]
fn propagate_position_error(
    wcs: &dyn SkyProjection,
    x_pix: f64,
    y_pix: f64,
    err_xo: f64,
    err_yo: f64,
    max_x_err: f64,
    max_y_err: f64,
    ra: f64,
    dec: f64,
) -> (f64, f64) {
    let x_err_pix = x_pix + err_xo.clamp(-1.0, max_x_err);
    let y_err_pix = y_pix + err_yo.clamp(-1.0, max_y_err);
    let (ra2, dec2) = wcs.pix_to_sky(x_err_pix, y_err_pix);
    let err_ra = if err_xo > 0.0 { (ra - ra2).abs() } else { -1.0 };
    let err_dec = if err_yo > 0.0 { (dec - dec2).abs() } else { -1.0 };
    (err_ra, err_dec)
}

fn propagate_radius_error(
    wcs: &dyn SkyProjection,
    x_pix: f64,
    y_pix: f64,
    sigma: f64,
    pa_deg: f64,
    err_sigma: f64,
    nominal_deg: f64,
) -> f64 {
    if err_sigma <= 0.0 {
        return -1.0;
    }
    let (_, _, r_deg, _) =
        wcs.pix_to_sky_vec(x_pix, y_pix, (sigma + err_sigma) * FWHM_TO_SIGMA, pa_deg);
    (r_deg - nominal_deg).abs()
}

/// Propagate the fitted position-angle error onto the sky the same way
/// [`propagate_radius_error`] handles the axis errors: perturb `theta` by
/// `err_pa_deg` and read the resulting sky-frame pa off `pix_to_sky_vec`,
/// rather than passing the pixel-frame fit error straight through.
fn propagate_pa_error(
    wcs: &dyn SkyProjection,
    x_pix: f64,
    y_pix: f64,
    major_sigma: f64,
    pa_deg: f64,
    err_pa_deg: f64,
    nominal_pa_sky: f64,
) -> f64 {
    if err_pa_deg <= 0.0 {
        return -1.0;
    }
    let (_, _, _, pa_perturbed) = wcs.pix_to_sky_vec(
        x_pix,
        y_pix,
        major_sigma * FWHM_TO_SIGMA,
        pa_deg + err_pa_deg,
    );
    (nominal_pa_sky - pa_perturbed).abs()
}

#[allow(clippy::too_many_arguments)]
fn build_island_record(
    island_id: i64,
    island: &Island,
    rms: ArrayView2<f32>,
    background: ArrayView2<f32>,
    wcs: &dyn SkyProjection,
    seed_clip: f64,
    flood_clip: f64,
    pixel_beam: PixelBeam,
) -> Option<IslandSource> {
    let (ny, nx) = island.data.dim();
    let mut peak = f32::NEG_INFINITY;
    let mut peak_pos = (0usize, 0usize);
    let mut clipped_sum = 0.0f64;
    let mut any_finite = false;
    for y in 0..ny {
        for x in 0..nx {
            let d = island.data[[y, x]];
            if !d.is_finite() {
                continue;
            }
            any_finite = true;
            let r = rms[[y, x]] as f64;
            let clipped = (d as f64 - seed_clip * r).max(0.0);
            clipped_sum += clipped;
            if d > peak {
                peak = d;
                peak_pos = (y, x);
            }
        }
    }
    if !any_finite {
        return None;
    }

    let x_pix = peak_pos.1 as f64 + island.xmin as f64 + 1.0;
    let y_pix = peak_pos.0 as f64 + island.ymin as f64 + 1.0;
    let (ra, dec) = wcs.pix_to_sky(x_pix, y_pix);

    let local_rms = rms[peak_pos] as f64;
    let arg = -(local_rms * flood_clip / peak as f64).ln();
    if !(arg >= 0.0) {
        // log(local_rms*flood_clip/peak) >= 0 would make eta imaginary;
        // skip the island-integrated record for this island.
        return None;
    }
    let eta = erf(arg.sqrt());
    let sigma_a = pixel_beam.a / FWHM_TO_SIGMA;
    let sigma_b = pixel_beam.b / FWHM_TO_SIGMA;
    let int_flux = clipped_sum / (2.0 * std::f64::consts::PI * sigma_a * sigma_b) / (eta * eta);

    let background_val = background[peak_pos] as f64;

    Some(IslandSource(
        OutputSource {
            island: island_id,
            source: -1,
            background: background_val,
            local_rms,
            ra,
            dec,
            ra_str: String::new(),
            dec_str: String::new(),
            err_ra: -1.0,
            err_dec: -1.0,
            peak_flux: peak as f64,
            err_peak_flux: -1.0,
            int_flux,
            err_int_flux: -1.0,
            a: pixel_beam.a,
            err_a: -1.0,
            b: pixel_beam.b,
            err_b: -1.0,
            pa: pixel_beam.pa,
            err_pa: -1.0,
            flags: 0,
        }
        .with_sexagesimal(),
    ))
}

/// The error function, needed for the island-integrated flux correction.
/// Abramowitz & Stegun 7.1.26, accurate to ~1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TangentPlane;
    use ndarray::Array2;

    #[test]
    fn point_source_round_trips_peak_flux() {
        let wcs = TangentPlane::from_simple_wcs(
            (32.5, 32.5),
            (150.0, -30.0),
            (-1.0 / 3600.0, 1.0 / 3600.0),
            0.0,
        );
        let mut data = Array2::from_elem((64, 64), f32::NAN);
        let sigma = 2.0f64;
        for y in 0..64 {
            for x in 0..64 {
                let dx = x as f64 - 32.0;
                let dy = y as f64 - 32.0;
                let v = 10.0 * (-0.5 * (dx * dx + dy * dy) / (sigma * sigma)).exp();
                if v > 1e-3 {
                    data[[y, x]] = v as f32;
                }
            }
        }
        let island = Island {
            data,
            xmin: 0,
            xmax: 63,
            ymin: 0,
            ymax: 63,
        };
        let rms = Array2::from_elem((64, 64), 1.0f32);
        let bkg = Array2::from_elem((64, 64), 0.0f32);
        let curv = Array2::from_elem((64, 64), -1.0f32);
        let beam = Beam::new(
            2.0 * crate::constants::FWHM_TO_SIGMA / 3600.0,
            2.0 * crate::constants::FWHM_TO_SIGMA / 3600.0,
            0.0,
        );
        let result = run_island(
            0,
            &island,
            rms.view(),
            bkg.view(),
            curv.view(),
            &wcs,
            beam,
            5.0,
            4.0,
            3.0,
            None,
            200,
            false,
        );
        assert_eq!(result.components.len(), 1);
        let c = &result.components[0];
        assert!((c.peak_flux - 10.0).abs() < 0.5);
        assert!(c.a >= c.b);
        assert!(c.pa > -90.0 && c.pa <= 90.0);
    }
}
