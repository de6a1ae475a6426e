// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Catalogue serialization. CSV/VO-table/FITS-table/SQLite/DS9/Kvis writers
//! are external collaborators; this crate ships a JSON reference writer
//! good enough to drive the test suite and downstream tooling that doesn't
//! need a legacy format.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde_json::{json, Value};

use super::{CatalogueError, OutputSource};
use crate::coord::Frame;
use crate::Catalogue;

/// The output-table contract. Implementations other than [`JsonWriter`]
/// (CSV, VOTable, FITS binary table, SQLite, DS9/Kvis region files) are out
/// of scope for the core.
pub trait CatalogueWriter {
    fn write(&self, catalogue: &Catalogue, path: &Path) -> Result<(), CatalogueError>;
}

/// Writes the catalogue as a JSON array of objects, one per component (and,
/// if present, one per island-integrated record, tagged `"island_record":
/// true`). Galactic-frame catalogues rename `ra`/`dec`/`err_ra`/`err_dec` to
/// `lon`/`lat`/`err_lon`/`err_lat`.
#[derive(Default)]
pub struct JsonWriter;

impl JsonWriter {
    fn record_to_value(source: &OutputSource, frame: Frame, is_island_record: bool) -> Value {
        let (lon_key, lat_key, err_lon_key, err_lat_key) = match frame {
            Frame::Equatorial => ("ra", "dec", "err_ra", "err_dec"),
            Frame::Galactic => ("lon", "lat", "err_lon", "err_lat"),
        };
        let mut value = json!({
            "island": source.island,
            "source": source.source,
            "background": source.background,
            "local_rms": source.local_rms,
            lon_key: source.ra,
            lat_key: source.dec,
            err_lon_key: source.err_ra,
            err_lat_key: source.err_dec,
            "peak_flux": source.peak_flux,
            "err_peak_flux": source.err_peak_flux,
            "int_flux": source.int_flux,
            "err_int_flux": source.err_int_flux,
            "a": source.a,
            "err_a": source.err_a,
            "b": source.b,
            "err_b": source.err_b,
            "pa": source.pa,
            "err_pa": source.err_pa,
            "flags": source.flags,
        });
        if frame == Frame::Equatorial {
            value["ra_str"] = json!(source.ra_str);
            value["dec_str"] = json!(source.dec_str);
        }
        if is_island_record {
            value["island_record"] = json!(true);
        }
        value
    }
}

impl CatalogueWriter for JsonWriter {
    fn write(&self, catalogue: &Catalogue, path: &Path) -> Result<(), CatalogueError> {
        let frame = catalogue.frame.unwrap_or(Frame::Equatorial);
        let mut records: Vec<Value> = catalogue
            .components
            .iter()
            .map(|c| Self::record_to_value(c, frame, false))
            .collect();
        records.extend(
            catalogue
                .islands
                .iter()
                .map(|i| Self::record_to_value(&i.0, frame, true)),
        );

        let mut file = File::create(path)?;
        serde_json::to_writer_pretty(&mut file, &records)?;
        file.write_all(b"\n")?;
        Ok(())
    }
}
