// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use bitflags::bitflags;

bitflags! {
    /// Per-component fit-quality flags. Bit values are fixed for interop
    /// with downstream consumers; do not renumber.
    #[derive(Default)]
    pub struct FitFlags: u8 {
        /// Island has fewer than four finite pixels; no fit was attempted.
        const FITERRSMALL = 1;
        /// The fitter returned no covariance.
        const FITERR = 2;
        /// Shape was frozen to the pixel beam.
        const FIXED2PSF = 4;
        /// Reserved.
        const FIXEDCIRCULAR = 8;
        /// Too many summits; parameters are estimates only, no fit was run.
        const NOTFIT = 16;
    }
}
