// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The command-line surface: argument parsing is an external collaborator in
spirit (the core only cares about the flags in §6), but a concrete `clap`
definition and a `run` entry point are provided so the crate is directly
runnable.
 */

pub mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

use crate::catalogue::{CatalogueWriter, JsonWriter};
use crate::constants::{DEFAULT_FLOOD_CLIP, DEFAULT_MAX_ITERATIONS, DEFAULT_SEED_CLIP};
use crate::coord::{Beam, SkyProjection};
use crate::detect::Segmenter;
use crate::dispatch::{dispatch, DispatchConfig, GlobalFittingData};
use crate::image::{
    estimate_background_rms, estimate_curvature, write_fits_f32, FitsImageSource, FitsReader,
};
use crate::AegeanError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("--beam requires exactly 3 values: MAJ MIN PA")]
    BadBeamArgCount,

    #[error("no beam supplied and the image header has no BMAJ/BMIN/BPA keywords")]
    NoBeam,
}

/// Aegean: detect and fit compact radio sources in a FITS image.
#[derive(Parser, Debug)]
#[clap(name = "aegean", version, about)]
pub struct AegeanArgs {
    /// Input FITS image.
    pub input: PathBuf,

    /// Output catalogue path (JSON).
    #[clap(long, short, default_value = "catalogue.json")]
    pub output: PathBuf,

    /// HDU index to read the image from.
    #[clap(long, default_value_t = 0)]
    pub hdu: usize,

    /// Forced uniform rms; bypasses background/rms estimation.
    #[clap(long)]
    pub rms: Option<f64>,

    /// Skip the fit (tag NOTFIT) if an island has more summits than this.
    #[clap(long)]
    pub maxsummits: Option<usize>,

    /// Curvature noise threshold; estimated from the curvature map if unset.
    #[clap(long)]
    pub csigma: Option<f64>,

    /// Seed detection threshold, in multiples of the local rms.
    #[clap(long, default_value_t = DEFAULT_SEED_CLIP)]
    pub seedclip: f64,

    /// Flood detection threshold, in multiples of the local rms.
    #[clap(long, default_value_t = DEFAULT_FLOOD_CLIP)]
    pub floodclip: f64,

    /// Worker count; defaults to all available cores.
    #[clap(long)]
    pub cores: Option<usize>,

    /// Also emit island-integrated records.
    #[clap(long)]
    pub island: bool,

    /// Write the background/rms/curvature maps as FITS images and exit.
    #[clap(long)]
    pub save_background: bool,

    /// Override the header's beam: MAJ MIN PA, in degrees.
    #[clap(long, number_of_values = 3)]
    pub beam: Option<Vec<f64>>,

    /// An rms FITS image with the same shape as the input, bypassing §4.2.
    #[clap(long)]
    pub rmsin: Option<PathBuf>,

    /// A background FITS image with the same shape as the input.
    #[clap(long)]
    pub bkgin: Option<PathBuf>,

    /// Increase log verbosity; repeatable.
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: u8,
}

/// Run the full pipeline for one set of parsed arguments.
pub fn run(args: AegeanArgs) -> Result<(), AegeanError> {
    logging::setup_logging(args.verbose).map_err(|e| AegeanError::Generic(e.to_string()))?;

    let reader = FitsReader::default();
    let (image, wcs, header_beam) = reader.read_image(&args.input, args.hdu)?;

    let beam = match &args.beam {
        Some(values) if values.len() == 3 => Beam::new(values[0], values[1], values[2]),
        Some(_) => return Err(AegeanError::from(CliError::BadBeamArgCount)),
        None => header_beam.ok_or_else(|| AegeanError::from(CliError::NoBeam))?,
    };

    let shape = image.shape();
    let centre = ((shape.1 as f64) / 2.0 + 1.0, (shape.0 as f64) / 2.0 + 1.0);
    let pixel_beam_at_centre = wcs.pixel_beam_at(centre.0, centre.1, beam);

    let (background, rms) = match (&args.bkgin, &args.rmsin) {
        (Some(bkg_path), Some(rms_path)) => {
            let bkg_image = reader.read_auxiliary(bkg_path, "bkgin", shape)?;
            let rms_image = reader.read_auxiliary(rms_path, "rmsin", shape)?;
            (
                crate::image::BackgroundMap(bkg_image.data().clone()),
                crate::image::RmsMap(rms_image.data().clone()),
            )
        }
        _ => estimate_background_rms(&image, pixel_beam_at_centre, args.rms),
    };

    write_with_background(&args, image, wcs, beam, background, rms)
}

fn write_with_background(
    args: &AegeanArgs,
    image: crate::image::Image,
    wcs: crate::coord::WcsAdapter,
    beam: Beam,
    background: crate::image::BackgroundMap,
    rms: crate::image::RmsMap,
) -> Result<(), AegeanError> {
    let (curvature, c_sigma) = estimate_curvature(&image, args.csigma);

    if args.save_background {
        log::info!("--save_background given; writing background/rms/curvature maps and exiting");
        write_fits_f32(Path::new("aegean-background.fits"), background.as_array())?;
        write_fits_f32(Path::new("aegean-rms.fits"), rms.as_array())?;
        write_fits_f32(Path::new("aegean-curvature.fits"), curvature.as_array())?;
        log::info!("saved aegean-background.fits, aegean-rms.fits and aegean-curvature.fits");
        return Ok(());
    }

    let global = Arc::new(GlobalFittingData {
        image,
        background,
        rms,
        curvature,
        wcs,
        beam,
        c_sigma,
    });

    let islands = Segmenter::new(
        global.image.data().view(),
        global.rms.as_array().view(),
        args.seedclip,
        args.floodclip,
    )
    .enumerate()
    .map(|(i, island)| (i as i64, island));

    let cores = args
        .cores
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    let config = DispatchConfig {
        seed_clip: args.seedclip,
        flood_clip: args.floodclip,
        max_summits: args.maxsummits,
        cores,
        emit_island_record: args.island,
        max_iterations: DEFAULT_MAX_ITERATIONS,
    };

    let mut catalogue = dispatch(global, islands, config)?;
    catalogue.sort();

    JsonWriter::default()
        .write(&catalogue, &args.output)
        .map_err(AegeanError::from)?;

    log::info!(
        "wrote {} components ({} islands) to {}",
        catalogue.components.len(),
        catalogue.islands.len(),
        args.output.display()
    );
    Ok(())
}
