//! Overlap corrector (spec §4.6): invoked when a `Line` reports overlap.
//! Produces a padded ROI around the line's bounding rectangle, follows
//! and erases ink reaching into the MICR band from above, clears the
//! padding strips, and thins residual thick strokes. The corrected
//! raster replaces the Line's image and the caller re-enters stage 4
//! (anchor finding) on it.

pub mod curve;
pub mod edge;
pub mod point;
pub mod thinning;

use crate::config::Config;
use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::line::Line;
use crate::raster::Raster;
use curve::Curve;

/// Guards against a pathological ROI producing unbounded curve-crossing
/// attempts; each `Curve` already caps its own forward probes, this
/// caps how many top-border runs one overlap pass will process.
const MAX_CURVES_PER_PASS: usize = 64;

pub fn correct(raster: &Raster, line: &Line, config: &Config) -> Result<Raster> {
    let pad = config.overlap_padding;
    let roi_rect = line.rect.pad(pad, pad, pad, pad).clamp_to(raster.width(), raster.height());

    let mut corrected = raster.clone_mat()?;

    let runs = top_border_ink_runs(&corrected, &roi_rect)?;
    for (mut left, mut right) in runs.into_iter().take(MAX_CURVES_PER_PASS) {
        let mut guard = 0;
        loop {
            guard += 1;
            if guard > MAX_CURVES_PER_PASS {
                break;
            }
            let mut curve = Curve::seed(left, right);
            let met_cleanly = curve.follow(&corrected, &roi_rect, config);
            curve.clear(&mut corrected, &roi_rect)?;

            if met_cleanly {
                break;
            }
            match curve.cross_intersection(&corrected, config) {
                Some((next_left, next_right)) => {
                    left = next_left;
                    right = next_right;
                }
                None => break,
            }
        }
    }

    thinning::clear_padding(&mut corrected, &roi_rect, pad)?;
    thinning::vertical_clear(
        &mut corrected,
        &roi_rect,
        line.thresholds.vertical_thickness_threshold,
    )?;
    thinning::hv_thin(
        &mut corrected,
        &roi_rect,
        line.thresholds.min_horizontal_run,
        line.thresholds.min_vertical_run,
    )?;

    Ok(corrected)
}

/// Find contiguous X-runs of set pixels along the ROI's top border;
/// each becomes one Curve seed (left end, right end).
fn top_border_ink_runs(raster: &Raster, roi: &Rect) -> Result<Vec<(Point, Point)>> {
    let y = roi.top();
    let mut runs = Vec::new();
    let mut x = roi.left();
    while x < roi.right() {
        if raster.is_set(x, y)? {
            let start = x;
            while x < roi.right() && raster.is_set(x, y)? {
                x += 1;
            }
            runs.push((Point::new(start, y), Point::new(x - 1, y)));
        } else {
            x += 1;
        }
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::{Contour, SizeClass};
    use crate::line::LineThresholds;
    use crate::raster::Polarity;
    use crate::scope::Scope;
    use opencv::core::{Mat, Scalar, CV_8UC1};

    fn synthetic_line(width: i32, height: i32) -> (Raster, Line) {
        let mat = Mat::new_rows_cols_with_default(height, width, CV_8UC1, Scalar::all(0.0)).unwrap();
        let raster = Raster::new(mat, Polarity::ForegroundBright);
        let mut scope = Scope::new();
        let handle = scope.own_raster(raster.clone_mat().unwrap());

        let anchor = Contour {
            polyline: vec![],
            rect: Rect::new(10, 10, 20, 15),
            filled_area: 240.0,
            rect_area: 300.0,
            size_class: SizeClass::Medium,
            index: 0,
            in_line: true,
            overlap_adjusted: false,
            orig_rect: None,
        };
        let thresholds = LineThresholds::from_anchor(&anchor);
        let line = Line {
            contours: vec![anchor],
            rect: Rect::new(10, 10, 20, 15),
            overlap: true,
            thresholds,
            anchor_index: 0,
            image: handle,
        };
        (raster, line)
    }

    #[test]
    fn correct_never_increases_foreground_pixel_count() {
        let (mut raster, line) = synthetic_line(80, 60);
        // paint a thin vertical stroke reaching from the top border down
        // into the line's band, simulating signature overlap ink.
        {
            use opencv::prelude::MatTrait;
            for y in 0..20 {
                *MatTrait::at_2d_mut::<u8>(&mut raster.mat, y, 15).unwrap() = 255;
            }
        }
        let config = Config::default();

        let before = count_set(&raster);
        let corrected = correct(&raster, &line, &config).unwrap();
        let after = count_set(&corrected);
        assert!(after <= before);
    }

    fn count_set(raster: &Raster) -> i32 {
        let mut n = 0;
        for y in 0..raster.height() {
            for x in 0..raster.width() {
                if raster.is_set(x, y).unwrap() {
                    n += 1;
                }
            }
        }
        n
    }
}
