// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The catalogue: typed component records, a shared header for the component
and island-integrated variants, and a writer contract. Table serialization
formats other than JSON (CSV/VO/FITS-table/SQLite/region files) are external
collaborators.
 */

mod error;
mod writer;

pub use error::CatalogueError;
pub use writer::{CatalogueWriter, JsonWriter};

use serde::Serialize;

use crate::coord::{format_dms, format_hms, Frame};
use crate::detect::FitFlags;

/// One fitted Gaussian component. Column order matches §3/§6: it is fixed
/// and load-bearing for downstream tools.
#[derive(Clone, Debug, Serialize)]
pub struct OutputSource {
    pub island: i64,
    pub source: i64,
    pub background: f64,
    pub local_rms: f64,
    pub ra: f64,
    pub dec: f64,
    pub ra_str: String,
    pub dec_str: String,
    pub err_ra: f64,
    pub err_dec: f64,
    pub peak_flux: f64,
    pub err_peak_flux: f64,
    pub int_flux: f64,
    pub err_int_flux: f64,
    pub a: f64,
    pub err_a: f64,
    pub b: f64,
    pub err_b: f64,
    pub pa: f64,
    pub err_pa: f64,
    pub flags: u8,
}

/// A shared subset of fields, common to every catalogue record variant
/// (component or island-integrated).
pub trait CatalogueRecord {
    fn island(&self) -> i64;
    fn source(&self) -> i64;
    fn ra(&self) -> f64;
    fn dec(&self) -> f64;
    fn peak_flux(&self) -> f64;
    fn err_peak_flux(&self) -> f64;
    fn background(&self) -> f64;
    fn local_rms(&self) -> f64;
}

impl CatalogueRecord for OutputSource {
    fn island(&self) -> i64 {
        self.island
    }
    fn source(&self) -> i64 {
        self.source
    }
    fn ra(&self) -> f64 {
        self.ra
    }
    fn dec(&self) -> f64 {
        self.dec
    }
    fn peak_flux(&self) -> f64 {
        self.peak_flux
    }
    fn err_peak_flux(&self) -> f64 {
        self.err_peak_flux
    }
    fn background(&self) -> f64 {
        self.background
    }
    fn local_rms(&self) -> f64 {
        self.local_rms
    }
}

/// The island-integrated record (§4.7): same column set as [`OutputSource`],
/// with `source = -1`, peak taken as the island max, and an integrated flux
/// corrected for the flood-threshold's analytic flux loss.
#[derive(Clone, Debug, Serialize)]
pub struct IslandSource(pub OutputSource);

impl CatalogueRecord for IslandSource {
    fn island(&self) -> i64 {
        self.0.island
    }
    fn source(&self) -> i64 {
        self.0.source
    }
    fn ra(&self) -> f64 {
        self.0.ra
    }
    fn dec(&self) -> f64 {
        self.0.dec
    }
    fn peak_flux(&self) -> f64 {
        self.0.peak_flux
    }
    fn err_peak_flux(&self) -> f64 {
        self.0.err_peak_flux
    }
    fn background(&self) -> f64 {
        self.0.background
    }
    fn local_rms(&self) -> f64 {
        self.0.local_rms
    }
}

impl OutputSource {
    /// Build the sexagesimal display strings from `ra`/`dec`. Galactic-frame
    /// catalogues don't use these (`lon`/`lat` are plain degrees), so this
    /// is only ever called for equatorial output.
    pub fn with_sexagesimal(mut self) -> Self {
        self.ra_str = format_hms(self.ra);
        self.dec_str = format_dms(self.dec);
        self
    }
}

/// A run's accumulated catalogue: fitted components plus, optionally,
/// island-integrated records. Output order is a stable sort by
/// `(island, source)`, which is what makes multi-threaded runs
/// deterministic (§4.8, §8).
#[derive(Clone, Debug, Default)]
pub struct Catalogue {
    pub frame: Option<Frame>,
    pub components: Vec<OutputSource>,
    pub islands: Vec<IslandSource>,
}

impl Catalogue {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame: Some(frame),
            components: Vec::new(),
            islands: Vec::new(),
        }
    }

    pub fn extend_components(&mut self, components: impl IntoIterator<Item = OutputSource>) {
        self.components.extend(components);
    }

    pub fn push_island(&mut self, island: IslandSource) {
        self.islands.push(island);
    }

    /// Sort components by `(island, source)`. Must be called before
    /// comparing catalogues produced by different worker counts.
    pub fn sort(&mut self) {
        self.components
            .sort_by_key(|c| (c.island, c.source));
        self.islands.sort_by_key(|i| (i.0.island, i.0.source));
    }
}
