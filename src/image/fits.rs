// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The FITS collaborator: reads a 2-D image HDU plus the header keywords
//! the rest of the pipeline needs (WCS, beam). This is the only place
//! `fitsio` is called from.

use std::path::Path;

use fitsio::hdu::HduInfo;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::Array2;

use super::{Image, ImageError};
use crate::coord::{Beam, WcsAdapter, WcsHeader};

/// The contract the pipeline needs from a FITS image file: a 2-D pixel
/// array, the WCS keywords needed to build a [`WcsAdapter`], and an optional
/// beam from `BMAJ`/`BMIN`/`BPA`.
pub trait FitsImageSource {
    fn read_image(&self, path: &Path, hdu: usize) -> Result<(Image, WcsAdapter, Option<Beam>), ImageError>;

    /// Read an auxiliary image (a `--rmsin`/`--bkgin` file) and check it
    /// matches `expected_shape`.
    fn read_auxiliary(
        &self,
        path: &Path,
        name: &'static str,
        expected_shape: (usize, usize),
    ) -> Result<Image, ImageError>;
}

/// The default [`FitsImageSource`], backed directly by `fitsio`/cfitsio.
#[derive(Default)]
pub struct FitsReader;

impl FitsReader {
    fn read_2d_f32(fptr: &mut FitsFile, hdu_index: usize) -> Result<Array2<f32>, ImageError> {
        let hdu = fptr.hdu(hdu_index)?;
        let shape = match &hdu.info {
            HduInfo::ImageInfo { shape, .. } if shape.len() == 2 => (shape[0], shape[1]),
            _ => return Err(ImageError::BadHdu(hdu_index)),
        };
        let data: Vec<f32> = hdu.read_image(fptr)?;
        // FITS images are stored fastest-axis-first (NAXIS1 = x); cfitsio's
        // `read_image` already returns row-major [NAXIS2, NAXIS1] = [y, x].
        Array2::from_shape_vec(shape, data)
            .map_err(|_| ImageError::BadHdu(hdu_index))
    }

    fn try_read_key(hdu: &fitsio::hdu::FitsHdu, fptr: &mut FitsFile, key: &str) -> Option<f64> {
        hdu.read_key::<f64>(fptr, key).ok()
    }
}

impl FitsImageSource for FitsReader {
    fn read_image(&self, path: &Path, hdu_index: usize) -> Result<(Image, WcsAdapter, Option<Beam>), ImageError> {
        let mut fptr = FitsFile::open(path)?;
        let data = Self::read_2d_f32(&mut fptr, hdu_index)?;
        let hdu = fptr.hdu(hdu_index)?;

        let crpix1 = Self::try_read_key(&hdu, &mut fptr, "CRPIX1").ok_or(ImageError::NoWcsKeywords)?;
        let crpix2 = Self::try_read_key(&hdu, &mut fptr, "CRPIX2").ok_or(ImageError::NoWcsKeywords)?;
        let crval1 = Self::try_read_key(&hdu, &mut fptr, "CRVAL1").ok_or(ImageError::NoWcsKeywords)?;
        let crval2 = Self::try_read_key(&hdu, &mut fptr, "CRVAL2").ok_or(ImageError::NoWcsKeywords)?;
        let cdelt1 = Self::try_read_key(&hdu, &mut fptr, "CDELT1").ok_or(ImageError::NoWcsKeywords)?;
        let cdelt2 = Self::try_read_key(&hdu, &mut fptr, "CDELT2").ok_or(ImageError::NoWcsKeywords)?;
        let crota2 = Self::try_read_key(&hdu, &mut fptr, "CROTA2").unwrap_or(0.0);
        let ctype1: String = hdu
            .read_key::<String>(&mut fptr, "CTYPE1")
            .unwrap_or_default();

        let wcs_header = WcsHeader {
            crpix1,
            crpix2,
            crval1,
            crval2,
            cdelt1,
            cdelt2,
            crota2,
            galactic: ctype1.starts_with("GLON"),
        };
        let wcs = WcsAdapter::from_header(wcs_header);

        let bmaj = Self::try_read_key(&hdu, &mut fptr, "BMAJ");
        let bmin = Self::try_read_key(&hdu, &mut fptr, "BMIN");
        let bpa = Self::try_read_key(&hdu, &mut fptr, "BPA");
        let beam = match (bmaj, bmin, bpa) {
            (Some(a), Some(b), Some(pa)) => Some(Beam::new(a, b, pa)),
            _ => None,
        };

        Ok((Image::new(data), wcs, beam))
    }

    fn read_auxiliary(
        &self,
        path: &Path,
        name: &'static str,
        expected_shape: (usize, usize),
    ) -> Result<Image, ImageError> {
        let mut fptr = FitsFile::open(path)?;
        let data = Self::read_2d_f32(&mut fptr, 0)?;
        let got = data.dim();
        if got != expected_shape {
            return Err(ImageError::ShapeMismatch {
                name,
                got,
                expected: expected_shape,
            });
        }
        Ok(Image::new(data))
    }
}

/// Write a single 2-D float map to a fresh FITS primary HDU at `path`,
/// overwriting any existing file. Used by `--save_background` to persist
/// the background/rms/curvature maps.
pub fn write_fits_f32(path: &Path, data: &Array2<f32>) -> Result<(), ImageError> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let (ny, nx) = data.dim();
    let description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: &[ny, nx],
    };
    let mut fptr = FitsFile::create(path).with_custom_primary(&description).open()?;
    let hdu = fptr.primary_hdu()?;
    // `ndarray`'s row-major `[y, x]` layout is already FITS's NAXIS2/NAXIS1
    // order, so the flat buffer needs no transposition.
    let flat: Vec<f32> = data.iter().copied().collect();
    hdu.write_image(&mut fptr, &flat)?;
    Ok(())
}
