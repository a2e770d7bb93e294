//! `Raster` — a thin wrapper around an `opencv::core::Mat`, carrying the
//! width/height/channel/polarity metadata spec §3 requires alongside the
//! pixel data. Kept deliberately close to the teacher's direct-`Mat`
//! style: no pixel-buffer reinvention, just the extra bookkeeping the
//! geometric pipeline needs that a bare `Mat` doesn't carry.

use crate::error::Result;
use opencv::core::{Mat, MatTraitConst};
use opencv::prelude::*;

/// Which pixel value represents ink. The binarizer always normalizes to
/// `ForegroundBright`; the preprocessor observes the raw scan's polarity
/// before that happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ForegroundBright,
    ForegroundDark,
}

pub struct Raster {
    pub mat: Mat,
    pub polarity: Polarity,
}

impl Raster {
    pub fn new(mat: Mat, polarity: Polarity) -> Self {
        Self { mat, polarity }
    }

    pub fn width(&self) -> i32 {
        self.mat.cols()
    }

    pub fn height(&self) -> i32 {
        self.mat.rows()
    }

    pub fn channels(&self) -> i32 {
        self.mat.channels()
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Whether the pixel at `(x, y)` is foreground, honoring polarity.
    /// Assumes a single-channel 8-bit `Mat`.
    pub fn is_set(&self, x: i32, y: i32) -> Result<bool> {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return Ok(false);
        }
        let v: u8 = *self.mat.at_2d::<u8>(y, x)?;
        Ok(match self.polarity {
            Polarity::ForegroundBright => v >= 128,
            Polarity::ForegroundDark => v < 128,
        })
    }

    pub fn clone_mat(&self) -> Result<Raster> {
        Ok(Raster::new(self.mat.try_clone()?, self.polarity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Mat, Scalar, CV_8UC1};

    #[test]
    fn polarity_round_trip_on_flat_fields() {
        let black = Mat::new_rows_cols_with_default(10, 10, CV_8UC1, Scalar::all(0.0)).unwrap();
        let white = Mat::new_rows_cols_with_default(10, 10, CV_8UC1, Scalar::all(255.0)).unwrap();

        let bright_black = Raster::new(black.try_clone().unwrap(), Polarity::ForegroundBright);
        let bright_white = Raster::new(white.try_clone().unwrap(), Polarity::ForegroundBright);
        assert!(!bright_black.is_set(5, 5).unwrap());
        assert!(bright_white.is_set(5, 5).unwrap());

        let dark_black = Raster::new(black, Polarity::ForegroundDark);
        let dark_white = Raster::new(white, Polarity::ForegroundDark);
        assert!(dark_black.is_set(5, 5).unwrap());
        assert!(!dark_white.is_set(5, 5).unwrap());
    }

    #[test]
    fn out_of_bounds_is_never_set() {
        let mat = Mat::new_rows_cols_with_default(10, 10, CV_8UC1, Scalar::all(255.0)).unwrap();
        let raster = Raster::new(mat, Polarity::ForegroundBright);
        assert!(!raster.is_set(-1, 0).unwrap());
        assert!(!raster.is_set(0, 100).unwrap());
    }
}
