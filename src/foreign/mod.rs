// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
This module handles interfacing with C.

Foreign functions from the ERFA astrometry library are declared here; the
native symbols are provided by the `erfa-sys` crate's linked `liberfa`.
 */

pub(crate) mod erfa;
