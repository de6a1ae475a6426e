// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bindings to the subset of ERFA's spherical-astronomy functions used by
//! `coord::projection`.

extern "C" {
    /// Angular separation between two sets of spherical coordinates, in
    /// radians. `a1`/`a2` are longitude (e.g. RA), `b1`/`b2` are latitude
    /// (e.g. Dec), all in radians. Returns the separation in radians.
    pub(crate) fn eraSeps(a1: f64, b1: f64, a2: f64, b2: f64) -> f64;

    /// Position-angle, in radians, of a second point relative to a first,
    /// measured from north through east.
    pub(crate) fn eraPas(al: f64, ap: f64, bl: f64, bp: f64) -> f64;
}
