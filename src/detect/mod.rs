// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Island segmentation, parameter estimation, multi-Gaussian fitting, and the
per-island driver that turns a fitted island into catalogue records.
 */

mod driver;
mod estimate;
mod fit;
mod flags;
mod island;

pub use driver::{run_island, IslandFitResult};
pub use estimate::{estimate_parameters, CandidateParams, Estimate, ParamSpec};
pub use fit::{fit_island, FitOutcome, FittedComponent};
pub use flags::FitFlags;
pub use island::{Island, Segmenter};
