//! Vertical-thickness clearing and HV thinning (spec §4.6.2/§4.6.3),
//! run after curve-based correction to remove the thin residue a signature
//! stroke leaves behind once its body has been erased.

use crate::error::Result;
use crate::geometry::Rect;
use crate::raster::Raster;

const HV_THINNING_MAX_ITERATIONS: u32 = 100;

/// Erase columns whose vertical run of set pixels is `<= threshold`,
/// within `roi` (spec §4.6.2 vertical-thickness clear).
pub fn vertical_clear(raster: &mut Raster, roi: &Rect, threshold: i32) -> Result<()> {
    for x in roi.left()..roi.right() {
        let mut y = roi.top();
        while y < roi.bottom() {
            if !raster.is_set(x, y)? {
                y += 1;
                continue;
            }
            let run_start = y;
            while y < roi.bottom() && raster.is_set(x, y)? {
                y += 1;
            }
            let run_len = y - run_start;
            if run_len <= threshold {
                clear_run(raster, x, run_start, y)?;
            }
        }
    }
    Ok(())
}

/// Repeatedly erase any set pixel whose maximum horizontal run AND
/// maximum vertical run through it are both below their thresholds
/// (spec §4.6.3), iterating to a fixpoint capped at 100 rounds.
pub fn hv_thin(raster: &mut Raster, roi: &Rect, min_h: i32, min_v: i32) -> Result<()> {
    for _ in 0..HV_THINNING_MAX_ITERATIONS {
        let mut changed = false;
        let mut to_clear = Vec::new();

        for y in roi.top()..roi.bottom() {
            for x in roi.left()..roi.right() {
                if !raster.is_set(x, y)? {
                    continue;
                }
                let h_run = horizontal_run_through(raster, roi, x, y)?;
                let v_run = vertical_run_through(raster, roi, x, y)?;
                if h_run < min_h && v_run < min_v {
                    to_clear.push((x, y));
                }
            }
        }

        if to_clear.is_empty() {
            break;
        }
        for (x, y) in to_clear {
            set_pixel(raster, x, y, false)?;
            changed = true;
        }
        if !changed {
            break;
        }
    }
    Ok(())
}

fn horizontal_run_through(raster: &Raster, roi: &Rect, x: i32, y: i32) -> Result<i32> {
    let mut left = x;
    while left - 1 >= roi.left() && raster.is_set(left - 1, y)? {
        left -= 1;
    }
    let mut right = x;
    while right + 1 < roi.right() && raster.is_set(right + 1, y)? {
        right += 1;
    }
    Ok(right - left + 1)
}

fn vertical_run_through(raster: &Raster, roi: &Rect, x: i32, y: i32) -> Result<i32> {
    let mut top = y;
    while top - 1 >= roi.top() && raster.is_set(x, top - 1)? {
        top -= 1;
    }
    let mut bottom = y;
    while bottom + 1 < roi.bottom() && raster.is_set(x, bottom + 1)? {
        bottom += 1;
    }
    Ok(bottom - top + 1)
}

fn clear_run(raster: &mut Raster, x: i32, y0: i32, y1: i32) -> Result<()> {
    for y in y0..y1 {
        set_pixel(raster, x, y, false)?;
    }
    Ok(())
}

/// Zero the pad-wide strips on all four sides of `roi` (spec §4.6's
/// padding-clear step).
pub fn clear_padding(raster: &mut Raster, roi: &Rect, pad: i32) -> Result<()> {
    for y in roi.top()..roi.bottom() {
        for x in roi.left()..roi.right() {
            let in_top = y - roi.top() < pad;
            let in_bottom = roi.bottom() - y <= pad;
            let in_left = x - roi.left() < pad;
            let in_right = roi.right() - x <= pad;
            if in_top || in_bottom || in_left || in_right {
                set_pixel(raster, x, y, false)?;
            }
        }
    }
    Ok(())
}

fn set_pixel(raster: &mut Raster, x: i32, y: i32, value: bool) -> Result<()> {
    use crate::raster::Polarity;
    use opencv::prelude::MatTrait;
    let v: u8 = match (raster.polarity, value) {
        (Polarity::ForegroundBright, false) => 0,
        (Polarity::ForegroundBright, true) => 255,
        (Polarity::ForegroundDark, false) => 255,
        (Polarity::ForegroundDark, true) => 0,
    };
    if x < 0 || y < 0 || x >= raster.width() || y >= raster.height() {
        return Ok(());
    }
    *MatTrait::at_2d_mut::<u8>(&mut raster.mat, y, x)? = v;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Polarity;
    use opencv::core::{Mat, Scalar, CV_8UC1};

    fn raster_with_vertical_stripe(width: i32, height: i32, stripe_x: i32, stripe_len: i32) -> Raster {
        let mut mat = Mat::new_rows_cols_with_default(height, width, CV_8UC1, Scalar::all(0.0)).unwrap();
        for y in 0..stripe_len.min(height) {
            *mat.at_2d_mut::<u8>(y, stripe_x).unwrap() = 255;
        }
        Raster::new(mat, Polarity::ForegroundBright)
    }

    #[test]
    fn vertical_clear_removes_short_runs_only() {
        let mut raster = raster_with_vertical_stripe(20, 20, 5, 3);
        let roi = Rect::new(0, 0, 20, 20);
        vertical_clear(&mut raster, &roi, 5).unwrap();
        assert!(!raster.is_set(5, 0).unwrap());
    }

    #[test]
    fn vertical_clear_keeps_long_runs() {
        let mut raster = raster_with_vertical_stripe(20, 20, 5, 15);
        let roi = Rect::new(0, 0, 20, 20);
        vertical_clear(&mut raster, &roi, 5).unwrap();
        assert!(raster.is_set(5, 0).unwrap());
    }

    #[test]
    fn overlap_correction_never_adds_foreground_pixels() {
        let mut raster = raster_with_vertical_stripe(20, 20, 5, 15);
        let roi = Rect::new(0, 0, 20, 20);
        let before = count_set(&raster, &roi);
        vertical_clear(&mut raster, &roi, 5).unwrap();
        hv_thin(&mut raster, &roi, 2, 2).unwrap();
        let after = count_set(&raster, &roi);
        assert!(after <= before);
    }

    fn count_set(raster: &Raster, roi: &Rect) -> i32 {
        let mut n = 0;
        for y in roi.top()..roi.bottom() {
            for x in roi.left()..roi.right() {
                if raster.is_set(x, y).unwrap() {
                    n += 1;
                }
            }
        }
        n
    }
}
