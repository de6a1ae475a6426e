// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The bounded multi-Gaussian Levenberg-Marquardt fitter (§4.6), built on
//! `rmpfit`, a Rust port of MPFIT. Every parameter carries a fixed flag and
//! a two-sided bound; fixed parameters are held at their initial value and
//! excluded from the Jacobian.

use ndarray::ArrayView2;
use rmpfit::{MPFitter, MPPar, MPResult};

use super::estimate::{CandidateParams, Estimate, ParamSpec};
use super::island::Island;

/// One component's final six parameters and their 1-sigma errors, in island
/// pixel coordinates. An error of `-1.0` means "unknown/singular".
#[derive(Clone, Copy, Debug)]
pub struct FittedComponent {
    pub amp: f64,
    pub xo: f64,
    pub yo: f64,
    pub major: f64,
    pub minor: f64,
    pub pa_deg: f64,
    pub err_amp: f64,
    pub err_xo: f64,
    pub err_yo: f64,
    pub err_major: f64,
    pub err_minor: f64,
    pub err_pa_deg: f64,
}

/// The outcome of attempting to fit one island's worth of candidates.
#[derive(Clone, Debug)]
pub struct FitOutcome {
    pub components: Vec<FittedComponent>,
    /// No fit was attempted; the initial parameter vector was returned
    /// as-is (too-many-summits or already flagged `FITERRSMALL`).
    pub notfit: bool,
    /// The fit ran but produced no usable covariance.
    pub fiterr: bool,
}

/// Fit (or fast-path) the Gaussian candidates in `estimate` against
/// `island`'s finite pixels, using `rms` cropped to the same shape.
pub fn fit_island(
    island: &Island,
    rms: ArrayView2<f32>,
    estimate: &Estimate,
    max_summits: Option<usize>,
    max_iterations: usize,
) -> FitOutcome {
    use super::flags::FitFlags;

    let too_many = max_summits
        .map(|max| estimate.candidates.len() > max)
        .unwrap_or(false);

    if estimate.flags.contains(FitFlags::FITERRSMALL) || too_many {
        let components = estimate
            .candidates
            .iter()
            .map(initial_as_fitted)
            .collect();
        return FitOutcome {
            components,
            notfit: true,
            fiterr: false,
        };
    }

    let problem = GaussianProblem::new(island, rms, &estimate.candidates);
    let mut params: Vec<f64> = estimate
        .candidates
        .iter()
        .flat_map(flatten_initial)
        .collect();
    let par_configs: Vec<MPPar> = estimate
        .candidates
        .iter()
        .flat_map(flatten_par_config)
        .collect();

    let mut config = rmpfit::MPConfig::default();
    config.max_iter = max_iterations as i32;

    let mut fitter = problem;
    let status = fitter.mpfit(&mut params, Some(&par_configs), &config);

    let (xerror, converged) = match status {
        Ok(result) => (result.xerror, true),
        Err(_) => (vec![0.0; params.len()], false),
    };

    let fiterr = !converged || xerror.iter().all(|&e| e == 0.0);

    let mut components = Vec::with_capacity(estimate.candidates.len());
    for (i, _) in estimate.candidates.iter().enumerate() {
        let base = i * 6;
        let remap = |e: f64| if e == 0.0 { -1.0 } else { e };
        components.push(FittedComponent {
            amp: params[base],
            xo: params[base + 1],
            yo: params[base + 2],
            major: params[base + 3],
            minor: params[base + 4],
            pa_deg: params[base + 5],
            err_amp: remap(xerror.get(base).copied().unwrap_or(0.0)),
            err_xo: remap(xerror.get(base + 1).copied().unwrap_or(0.0)),
            err_yo: remap(xerror.get(base + 2).copied().unwrap_or(0.0)),
            err_major: remap(xerror.get(base + 3).copied().unwrap_or(0.0)),
            err_minor: remap(xerror.get(base + 4).copied().unwrap_or(0.0)),
            err_pa_deg: remap(xerror.get(base + 5).copied().unwrap_or(0.0)),
        });
    }

    FitOutcome {
        components,
        notfit: false,
        fiterr,
    }
}

fn initial_as_fitted(c: &CandidateParams) -> FittedComponent {
    FittedComponent {
        amp: c.amp.value,
        xo: c.xo.value,
        yo: c.yo.value,
        major: c.major.value,
        minor: c.minor.value,
        pa_deg: c.pa.value,
        err_amp: -1.0,
        err_xo: -1.0,
        err_yo: -1.0,
        err_major: -1.0,
        err_minor: -1.0,
        err_pa_deg: -1.0,
    }
}

fn flatten_initial(c: &CandidateParams) -> [f64; 6] {
    [
        c.amp.value,
        c.xo.value,
        c.yo.value,
        c.major.value,
        c.minor.value,
        c.pa.value,
    ]
}

fn flatten_par_config(c: &CandidateParams) -> [MPPar; 6] {
    [
        to_mppar(&c.amp),
        to_mppar(&c.xo),
        to_mppar(&c.yo),
        to_mppar(&c.major),
        to_mppar(&c.minor),
        to_mppar(&c.pa),
    ]
}

fn to_mppar(spec: &ParamSpec) -> MPPar {
    let mut par = MPPar::default();
    par.fixed = spec.fixed;
    if !spec.fixed {
        par.limited_low = true;
        par.limited_up = true;
        par.limit_low = spec.lower;
        par.limit_up = spec.upper;
    }
    par
}

/// One evaluable problem: a flattened pixel list (finite island pixels,
/// each with its local rms) and the number of Gaussian components being fit
/// simultaneously.
struct GaussianProblem {
    xs: Vec<f64>,
    ys: Vec<f64>,
    data: Vec<f64>,
    rms: Vec<f64>,
    n_components: usize,
}

impl GaussianProblem {
    fn new(island: &Island, rms: ArrayView2<f32>, candidates: &[CandidateParams]) -> Self {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        let mut data = Vec::new();
        let mut rms_vals = Vec::new();
        for ((y, x), &v) in island.data.indexed_iter() {
            if v.is_finite() {
                let r = rms[[y, x]];
                if r.is_finite() && r > 0.0 {
                    xs.push(x as f64);
                    ys.push(y as f64);
                    data.push(v as f64);
                    rms_vals.push(r as f64);
                }
            }
        }
        Self {
            xs,
            ys,
            data,
            rms: rms_vals,
            n_components: candidates.len(),
        }
    }

    fn model_at(&self, params: &[f64], x: f64, y: f64) -> f64 {
        let mut model = 0.0;
        for i in 0..self.n_components {
            let base = i * 6;
            let amp = params[base];
            let xo = params[base + 1];
            let yo = params[base + 2];
            let major = params[base + 3];
            let minor = params[base + 4];
            // Negated so positive pa is clockwise in pixel coordinates.
            let theta = -params[base + 5].to_radians();
            let dx = x - xo;
            let dy = y - yo;
            let xp = dx * theta.cos() + dy * theta.sin();
            let yp = -dx * theta.sin() + dy * theta.cos();
            model += amp * (-0.5 * ((xp / major).powi(2) + (yp / minor).powi(2))).exp();
        }
        model
    }
}

impl MPFitter for GaussianProblem {
    fn eval(&self, params: &[f64], deviates: &mut [f64]) -> MPResult<()> {
        for i in 0..self.xs.len() {
            let model = self.model_at(params, self.xs[i], self.ys[i]);
            deviates[i] = (model - self.data[i]) / self.rms[i];
        }
        Ok(())
    }

    fn number_of_points(&self) -> usize {
        self.xs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::estimate::estimate_parameters;
    use crate::coord::PixelBeam;
    use ndarray::Array2;

    #[test]
    fn notfit_fast_path_preserves_initial_values() {
        let island = Island {
            data: Array2::from_elem((2, 2), 3.0f32),
            xmin: 0,
            xmax: 1,
            ymin: 0,
            ymax: 1,
        };
        let rms = Array2::from_elem((2, 2), 1.0f32);
        let curv = Array2::from_elem((2, 2), -1.0f32);
        let beam = PixelBeam::new(4.0, 4.0, 0.0);
        let estimate = estimate_parameters(&island, rms.view(), curv.view(), beam, 5.0, 3.0);
        let outcome = fit_island(&island, rms.view(), &estimate, None, 200);
        assert!(outcome.notfit);
        assert!(outcome.components[0].err_amp == -1.0);
    }
}
