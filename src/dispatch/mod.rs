// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The parallel island dispatcher (§4.8, §5).

[`GlobalFittingData`] is built once, wrapped in an `Arc`, and never mutated
again; workers only ever take a shared borrow. Islands are pulled lazily
from the segmenter, batched, and — when running with more than one core —
handed to a producer/consumer pair (a bounded `crossbeam-channel` feeding a
`rayon` batch of island fits) so the driver never blocks longer than one
batch's worth of work. A single-core run skips the channel machinery
entirely and is the canonical reference for output semantics: both modes
must produce byte-identical sorted catalogues.

A panic while fitting one island (a `rmpfit` bug, a pathological summit
count, ...) is caught at the per-island boundary and logged rather than
aborting the run — the rest of the catalogue still gets produced. A panic
on the segmenter/producer thread is a different failure (no more islands
can be produced at all) and does abort the run via [`DispatchError`].
 */

mod error;

pub use error::DispatchError;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::bounded;
use crossbeam_utils::atomic::AtomicCell;
use rayon::prelude::*;
use scopeguard::defer_on_unwind;

use crate::catalogue::Catalogue;
use crate::constants::ISLAND_BATCH_SIZE;
use crate::coord::{Beam, WcsAdapter};
use crate::detect::{run_island, Island};
use crate::image::{BackgroundMap, CurvatureMap, Image, RmsMap};

/// The read-only context shared by every worker for the lifetime of a run.
pub struct GlobalFittingData {
    pub image: Image,
    pub background: BackgroundMap,
    pub rms: RmsMap,
    pub curvature: CurvatureMap,
    pub wcs: WcsAdapter,
    pub beam: Beam,
    pub c_sigma: f64,
}

/// The scalar knobs that vary per run but not per island.
#[derive(Clone, Copy, Debug)]
pub struct DispatchConfig {
    pub seed_clip: f64,
    pub flood_clip: f64,
    pub max_summits: Option<usize>,
    pub cores: usize,
    pub emit_island_record: bool,
    pub max_iterations: usize,
}

/// Fit every island yielded by `islands` against `global`, returning an
/// (unsorted-across-batches but internally complete) catalogue. Call
/// [`Catalogue::sort`] on the result before comparing runs.
pub fn dispatch(
    global: Arc<GlobalFittingData>,
    islands: impl Iterator<Item = (i64, Island)>,
    config: DispatchConfig,
) -> Result<Catalogue, DispatchError> {
    if config.cores <= 1 {
        return Ok(dispatch_single_threaded(&global, islands, config));
    }

    let mut catalogue = Catalogue::new(global.wcs.frame);
    let error = AtomicCell::new(false);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.cores)
        .build()
        .map_err(|_| DispatchError::WorkerPanic)?;

    let (tx, rx) = bounded::<Vec<(i64, Island)>>(2);

    thread::scope(|scope| {
        scope.spawn(|| {
            defer_on_unwind! { error.store(true); }
            let mut batch = Vec::with_capacity(ISLAND_BATCH_SIZE);
            for item in islands {
                batch.push(item);
                if batch.len() == ISLAND_BATCH_SIZE {
                    if tx.send(std::mem::take(&mut batch)).is_err() {
                        return;
                    }
                }
            }
            if !batch.is_empty() {
                let _ = tx.send(batch);
            }
        });

        for batch in rx {
            if error.load() {
                break;
            }
            let results: Vec<_> = pool.install(|| {
                batch
                    .into_par_iter()
                    .map(|(id, island)| fit_one_island_guarded(&global, id, &island, config))
                    .collect()
            });
            for result in results.into_iter().flatten() {
                catalogue.extend_components(result.components);
                if let Some(island_record) = result.island_record {
                    catalogue.push_island(island_record);
                }
            }
        }
    });

    if error.load() {
        return Err(DispatchError::WorkerPanic);
    }

    Ok(catalogue)
}

fn dispatch_single_threaded(
    global: &GlobalFittingData,
    islands: impl Iterator<Item = (i64, Island)>,
    config: DispatchConfig,
) -> Catalogue {
    let mut catalogue = Catalogue::new(global.wcs.frame);
    for (id, island) in islands {
        if let Some(result) = fit_one_island_guarded(global, id, &island, config) {
            catalogue.extend_components(result.components);
            if let Some(island_record) = result.island_record {
                catalogue.push_island(island_record);
            }
        }
    }
    catalogue
}

/// Fit one island, catching a panic so that one bad island can't take down
/// the rest of the run. A caught panic is logged and the island is skipped
/// entirely (no component, no island record) rather than propagated.
fn fit_one_island_guarded(
    global: &GlobalFittingData,
    id: i64,
    island: &Island,
    config: DispatchConfig,
) -> Option<crate::detect::IslandFitResult> {
    match catch_unwind(AssertUnwindSafe(|| fit_one_island(global, id, island, config))) {
        Ok(result) => Some(result),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("island {id} panicked during fit, skipping it: {message}");
            None
        }
    }
}

fn fit_one_island(
    global: &GlobalFittingData,
    id: i64,
    island: &Island,
    config: DispatchConfig,
) -> crate::detect::IslandFitResult {
    use crate::coord::SkyProjection;

    let (ymin, ymax, xmin, xmax) = (island.ymin, island.ymax, island.xmin, island.xmax);
    let rms = global.rms.as_array().slice(ndarray::s![ymin..=ymax, xmin..=xmax]);
    let background = global
        .background
        .as_array()
        .slice(ndarray::s![ymin..=ymax, xmin..=xmax]);
    let curvature = global
        .curvature
        .as_array()
        .slice(ndarray::s![ymin..=ymax, xmin..=xmax]);

    run_island(
        id,
        island,
        rms,
        background,
        curvature,
        &global.wcs as &dyn SkyProjection,
        global.beam,
        config.seed_clip,
        config.flood_clip,
        global.c_sigma,
        config.max_summits,
        config.max_iterations,
        config.emit_island_record,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{Frame, TangentPlane, WcsAdapter};
    use ndarray::Array2;

    fn toy_global() -> GlobalFittingData {
        let wcs = WcsAdapter::new(
            TangentPlane::from_simple_wcs((16.5, 16.5), (150.0, -30.0), (-1.0 / 3600.0, 1.0 / 3600.0), 0.0),
            Frame::Equatorial,
        );
        GlobalFittingData {
            image: Image::new(Array2::from_elem((32, 32), 0.0f32)),
            background: BackgroundMap(Array2::from_elem((32, 32), 0.0f32)),
            rms: RmsMap(Array2::from_elem((32, 32), 1.0f32)),
            curvature: CurvatureMap(Array2::from_elem((32, 32), -1.0f32)),
            wcs,
            beam: Beam::new(2.0 / 3600.0, 2.0 / 3600.0, 0.0),
            c_sigma: 3.0,
        }
    }

    #[test]
    fn single_and_multi_core_agree_on_an_empty_island_set() {
        let global = Arc::new(toy_global());
        let islands: Vec<(i64, Island)> = Vec::new();
        let config = DispatchConfig {
            seed_clip: 5.0,
            flood_clip: 4.0,
            max_summits: None,
            cores: 1,
            emit_island_record: false,
            max_iterations: 200,
        };
        let mut cat1 = dispatch(Arc::clone(&global), islands.clone().into_iter(), config).unwrap();
        let mut config8 = config;
        config8.cores = 4;
        let mut cat8 = dispatch(global, islands.into_iter(), config8).unwrap();
        cat1.sort();
        cat8.sort();
        assert_eq!(cat1.components.len(), cat8.components.len());
    }
}
