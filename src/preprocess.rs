//! Preprocessor (spec §4.1): grey-conversion, deskew, polarity analysis,
//! morphological clean, bottom-band crop.

use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::raster::{Polarity, Raster};
use opencv::core::{
    self, AlgorithmHint, Point as CvPoint, Point2f, Scalar, Size, Vector, BORDER_REPLICATE,
};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;

/// Configurable half-open crop fractions, per axis, applied by
/// `bottom_band_crop`. Defaults keep the lower 40% of the image.
#[derive(Debug, Clone, Copy)]
pub struct CropFractions {
    pub begin_width: f64,
    pub end_width: f64,
    pub begin_height: f64,
    pub end_height: f64,
}

impl Default for CropFractions {
    fn default() -> Self {
        Self {
            begin_width: 0.0,
            end_width: 1.0,
            begin_height: 0.60,
            end_height: 1.0,
        }
    }
}

impl CropFractions {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("begin.width", self.begin_width),
            ("end.width", self.end_width),
            ("begin.height", self.begin_height),
            ("end.height", self.end_height),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::input(format!("crop fraction {name}={v} outside [0,1]")));
            }
        }
        Ok(())
    }
}

pub fn run(raster: &Raster, crop: CropFractions) -> Result<Raster> {
    crop.validate()?;
    if raster.is_empty() {
        return Err(Error::input("zero-size image"));
    }

    let grey = grey_convert(raster)?;
    let deskewed = deskew(&grey)?;
    let polarity = analyze_polarity(&deskewed)?;
    let cleaned = morphological_clean(&deskewed, polarity)?;
    let cropped = bottom_band_crop(&cleaned, crop)?;
    Ok(cropped)
}

fn grey_convert(raster: &Raster) -> Result<Raster> {
    if raster.channels() == 1 {
        return raster.clone_mat();
    }
    let mut grey = core::Mat::default();
    imgproc::cvt_color(
        &raster.mat,
        &mut grey,
        imgproc::COLOR_BGR2GRAY,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;
    Ok(Raster::new(grey, raster.polarity))
}

struct DeskewCandidate {
    rect: Rect,
    ratio: f64,
    min_area_angle: f64,
    min_area_width: f32,
    min_area_height: f32,
}

/// §4.1.1 deskew: find the most "rectangular" horizontal bar among the
/// dilated Otsu contours, derive a correction angle from its minimum-area
/// rotated rectangle, and rotate the image to compensate. No-op if no
/// candidate qualifies.
fn deskew(raster: &Raster) -> Result<Raster> {
    let mut blurred = core::Mat::default();
    imgproc::gaussian_blur(
        &raster.mat,
        &mut blurred,
        Size::new(7, 7),
        0.0,
        0.0,
        core::BORDER_DEFAULT,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    let mut binary = core::Mat::default();
    imgproc::threshold(
        &blurred,
        &mut binary,
        0.0,
        255.0,
        imgproc::THRESH_BINARY_INV | imgproc::THRESH_OTSU,
    )?;

    let kernel = imgproc::get_structuring_element(
        imgproc::MORPH_RECT,
        Size::new(25, 1),
        CvPoint::new(-1, -1),
    )?;
    let mut dilated = core::Mat::default();
    imgproc::dilate(
        &binary,
        &mut dilated,
        &kernel,
        CvPoint::new(-1, -1),
        1,
        core::BORDER_CONSTANT,
        Scalar::all(0.0),
    )?;

    let mut cv_contours: Vector<Vector<CvPoint>> = Vector::new();
    imgproc::find_contours(
        &dilated,
        &mut cv_contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
        CvPoint::new(0, 0),
    )?;

    let image_width = raster.width();
    let image_height = raster.height();

    let mut best: Option<DeskewCandidate> = None;
    for cv_contour in &cv_contours {
        let rect = crate::contour::bounding_rect(
            &cv_contour
                .iter()
                .map(|p| crate::geometry::Point::new(p.x, p.y))
                .collect::<Vec<_>>(),
        );

        if rect.left() <= 0
            || rect.top() <= 0
            || rect.right() >= image_width
            || rect.bottom() >= image_height
        {
            continue;
        }
        if rect.width <= 120 || rect.height >= 100 || rect.height <= 10 {
            continue;
        }

        let rect_area = rect.area() as f64;
        let filled_area = contour_area_of(&cv_contour)?;
        if filled_area <= 0.0 {
            continue;
        }
        let ratio = rect_area / filled_area;

        let min_rect = imgproc::min_area_rect(&cv_contour)?;
        let size = min_rect.size;
        let angle = if size.width < size.height {
            -(90.0 - min_rect.angle as f64)
        } else {
            min_rect.angle as f64
        };

        let better = match &best {
            None => true,
            Some(b) => ratio < b.ratio,
        };
        if better {
            best = Some(DeskewCandidate {
                rect,
                ratio,
                min_area_angle: angle,
                min_area_width: size.width,
                min_area_height: size.height,
            });
        }
    }

    let Some(candidate) = best else {
        return raster.clone_mat();
    };
    let _ = (candidate.rect, candidate.min_area_width, candidate.min_area_height);

    rotate(raster, candidate.min_area_angle)
}

fn contour_area_of(contour: &Vector<CvPoint>) -> Result<f64> {
    Ok(imgproc::contour_area(contour, false)?)
}

fn rotate(raster: &Raster, angle_degrees: f64) -> Result<Raster> {
    if angle_degrees.abs() < 1e-6 {
        return raster.clone_mat();
    }
    let center = Point2f::new(raster.width() as f32 / 2.0, raster.height() as f32 / 2.0);
    let m = imgproc::get_rotation_matrix_2d(center, angle_degrees, 1.0)?;
    let mut rotated = core::Mat::default();
    imgproc::warp_affine(
        &raster.mat,
        &mut rotated,
        &m,
        Size::new(raster.width(), raster.height()),
        InterpolationFlags::INTER_CUBIC as i32,
        BORDER_REPLICATE,
        Scalar::all(0.0),
    )?;
    Ok(Raster::new(rotated, raster.polarity))
}

/// §4.1.2 polarity analysis: 10x10 uniform grid sample; background is
/// light iff mean intensity exceeds 128.
fn analyze_polarity(raster: &Raster) -> Result<Polarity> {
    let w = raster.width();
    let h = raster.height();
    if w == 0 || h == 0 {
        return Ok(Polarity::ForegroundDark);
    }

    let mut sum = 0.0f64;
    let mut count = 0i64;
    for gy in 0..10 {
        for gx in 0..10 {
            let x = ((gx as f64 + 0.5) / 10.0 * w as f64) as i32;
            let y = ((gy as f64 + 0.5) / 10.0 * h as f64) as i32;
            let x = x.clamp(0, w - 1);
            let y = y.clamp(0, h - 1);
            let v: u8 = *raster.mat.at_2d::<u8>(y, x)?;
            sum += v as f64;
            count += 1;
        }
    }
    let mean = if count > 0 { sum / count as f64 } else { 0.0 };
    Ok(if mean > 128.0 {
        Polarity::ForegroundDark // light background -> dark foreground ink
    } else {
        Polarity::ForegroundBright
    })
}

/// erode->dilate if background is light (dark ink to shrink/restore),
/// dilate->erode if dark, with a 2x2 rectangular kernel.
fn morphological_clean(raster: &Raster, polarity: Polarity) -> Result<Raster> {
    let kernel =
        imgproc::get_structuring_element(imgproc::MORPH_RECT, Size::new(2, 2), CvPoint::new(-1, -1))?;

    let mut first = core::Mat::default();
    let mut second = core::Mat::default();

    match polarity {
        Polarity::ForegroundDark => {
            imgproc::erode(
                &raster.mat,
                &mut first,
                &kernel,
                CvPoint::new(-1, -1),
                1,
                core::BORDER_CONSTANT,
                imgproc::morphology_default_border_value()?,
            )?;
            imgproc::dilate(
                &first,
                &mut second,
                &kernel,
                CvPoint::new(-1, -1),
                1,
                core::BORDER_CONSTANT,
                Scalar::all(0.0),
            )?;
        }
        Polarity::ForegroundBright => {
            imgproc::dilate(
                &raster.mat,
                &mut first,
                &kernel,
                CvPoint::new(-1, -1),
                1,
                core::BORDER_CONSTANT,
                Scalar::all(0.0),
            )?;
            imgproc::erode(
                &first,
                &mut second,
                &kernel,
                CvPoint::new(-1, -1),
                1,
                core::BORDER_CONSTANT,
                imgproc::morphology_default_border_value()?,
            )?;
        }
    }

    Ok(Raster::new(second, raster.polarity))
}

/// Crop to the configurable lower band of the image.
fn bottom_band_crop(raster: &Raster, crop: CropFractions) -> Result<Raster> {
    let w = raster.width();
    let h = raster.height();

    let x0 = (crop.begin_width * w as f64).round() as i32;
    let x1 = (crop.end_width * w as f64).round() as i32;
    let y0 = (crop.begin_height * h as f64).round() as i32;
    let y1 = (crop.end_height * h as f64).round() as i32;

    let rect = Rect::from_minmax(x0, y0, (x1 - 1).max(x0), (y1 - 1).max(y0)).clamp_to(w, h);

    let cv_rect = core::Rect::new(rect.x, rect.y, rect.width, rect.height);
    let sub = core::Mat::roi(&raster.mat, cv_rect)?;
    let owned = sub.try_clone()?;
    Ok(Raster::new(owned, raster.polarity))
}
