// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Pixel↔sky coordinate conversion and the beam model.

Everything that needs to reason about direction on the sky lives here: the
beam triple, its pixel-space projection, the `SkyProjection` contract that
any WCS library can satisfy, and a concrete tangent-plane implementation used
when no external WCS library is wired in.
 */

mod beam;
mod projection;
mod sexagesimal;
mod wcs;

pub use beam::{Beam, PixelBeam};
pub use projection::{Frame, SkyProjection, TangentPlane};
pub use sexagesimal::{format_dms, format_hms};
pub use wcs::{WcsAdapter, WcsHeader};
