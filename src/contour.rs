//! `Contour` value type plus the extractor (spec §4.3) that produces it
//! from a binarized `Raster`.
//!
//! Follows the teacher's blend of opencv-contour-finding +ain pure-Rust
//! area/filter logic seen in `detect_photos`/`rects_overlap`: contours
//! themselves come straight out of `imgproc::find_contours`, everything
//! downstream (area, size class, filtering, sorting) is plain Rust over
//! the returned point lists.

use crate::error::Result;
use crate::geometry::{Border, Point, Rect};
use crate::raster::Raster;
use opencv::core::{Point as CvPoint, Vector};
use opencv::imgproc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct Contour {
    pub polyline: Vec<Point>,
    pub rect: Rect,
    pub filled_area: f64,
    pub rect_area: f64,
    pub size_class: SizeClass,
    pub index: usize,
    pub in_line: bool,
    pub overlap_adjusted: bool,
    /// Preserved pre-restriction rectangle, set when a contour is
    /// cloned and shrunk to a projection/probe rectangle (spec §4.5.3).
    pub orig_rect: Option<Rect>,
}

impl Contour {
    pub fn mid_x(&self) -> i32 {
        self.rect.mid_x()
    }

    /// Shoelace-formula area over the polyline, matching how the
    /// teacher computes `contour_area` alongside the opencv-native
    /// bounding rect rather than trusting a second opencv call for it.
    pub fn vertex_area(points: &[Point]) -> f64 {
        if points.len() < 3 {
            return 0.0;
        }
        let mut sum = 0.0f64;
        for i in 0..points.len() {
            let p0 = points[i];
            let p1 = points[(i + 1) % points.len()];
            sum += p0.x as f64 * p1.y as f64 - p1.x as f64 * p0.y as f64;
        }
        (sum / 2.0).abs()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContourFilter {
    pub min_width: Option<i32>,
    pub max_width: Option<i32>,
    pub min_height: Option<i32>,
    pub max_height: Option<i32>,
    pub min_filled_area: Option<f64>,
    pub max_filled_area: Option<f64>,
    pub forbidden_borders: Vec<Border>,
}

impl ContourFilter {
    fn accepts(&self, c: &Contour, image_width: i32, image_height: i32) -> bool {
        if let Some(v) = self.min_width {
            if c.rect.width < v {
                return false;
            }
        }
        if let Some(v) = self.max_width {
            if c.rect.width > v {
                return false;
            }
        }
        if let Some(v) = self.min_height {
            if c.rect.height < v {
                return false;
            }
        }
        if let Some(v) = self.max_height {
            if c.rect.height > v {
                return false;
            }
        }
        if let Some(v) = self.min_filled_area {
            if c.filled_area < v {
                return false;
            }
        }
        if let Some(v) = self.max_filled_area {
            if c.filled_area > v {
                return false;
            }
        }
        for border in &self.forbidden_borders {
            if c.rect.touches_border(image_width, image_height, *border) {
                return false;
            }
        }
        true
    }
}

/// Extract external contours from a binarized raster, compute rect/area
/// statistics, apply `filter`, sort survivors strictly by `rect.x`, and
/// reassign dense indices (spec §4.3).
pub fn extract(raster: &Raster, filter: &ContourFilter) -> Result<Vec<Contour>> {
    let mut cv_contours: Vector<Vector<CvPoint>> = Vector::new();
    imgproc::find_contours(
        &raster.mat,
        &mut cv_contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
        CvPoint::new(0, 0),
    )?;

    let image_width = raster.width();
    let image_height = raster.height();

    let mut contours = Vec::new();
    for cv_contour in cv_contours {
        let polyline: Vec<Point> = cv_contour.iter().map(|p| Point::new(p.x, p.y)).collect();
        if polyline.is_empty() {
            continue;
        }
        let rect = bounding_rect(&polyline);
        let filled_area = Contour::vertex_area(&polyline).max(1.0);
        let rect_area = rect.area() as f64;

        let mut contour = Contour {
            polyline,
            rect,
            filled_area,
            rect_area,
            size_class: SizeClass::Unknown,
            index: 0,
            in_line: false,
            overlap_adjusted: false,
            orig_rect: None,
        };

        if filter.accepts(&contour, image_width, image_height) {
            contour.rect = contour.rect.clamp_to(image_width, image_height);
            contours.push(contour);
        }
    }

    contours.sort_by_key(|c| c.rect.x);
    for (i, c) in contours.iter_mut().enumerate() {
        c.index = i;
    }
    Ok(contours)
}

pub fn bounding_rect(points: &[Point]) -> Rect {
    let x_min = points.iter().map(|p| p.x).min().unwrap_or(0);
    let x_max = points.iter().map(|p| p.x).max().unwrap_or(0);
    let y_min = points.iter().map(|p| p.y).min().unwrap_or(0);
    let y_max = points.iter().map(|p| p.y).max().unwrap_or(0);
    Rect::from_minmax(x_min, y_min, x_max, y_max)
}

/// Restrict a contour's rectangle to the portion of its foreground pixels
/// that fall inside `clip` (spec §4.5.3, pixel-grid scan variant).
/// Width/height are clamped to >= 1; the original rectangle is preserved
/// in `orig_rect`.
pub fn restrict_to_rect(raster: &Raster, contour: &Contour, clip: &Rect) -> Result<Contour> {
    let search = contour
        .rect
        .intersection(clip)
        .unwrap_or(Rect::new(clip.x, clip.y, 1, 1));

    let mut x_min = i32::MAX;
    let mut y_min = i32::MAX;
    let mut x_max = i32::MIN;
    let mut y_max = i32::MIN;

    for y in search.top()..search.bottom() {
        for x in search.left()..search.right() {
            if raster.is_set(x, y)? {
                x_min = x_min.min(x);
                x_max = x_max.max(x);
                y_min = y_min.min(y);
                y_max = y_max.max(y);
            }
        }
    }

    let new_rect = if x_min <= x_max && y_min <= y_max {
        Rect::from_minmax(x_min, y_min, x_max, y_max)
    } else {
        Rect::new(search.x, search.y, 1, 1)
    };

    let mut clone = contour.clone();
    clone.orig_rect = Some(contour.rect);
    clone.rect = new_rect;
    clone.overlap_adjusted = true;
    Ok(clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_area_of_unit_square() {
        let pts = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(Contour::vertex_area(&pts), 100.0);
    }

    #[test]
    fn bounding_rect_matches_extent() {
        let pts = vec![Point::new(2, 3), Point::new(10, 20), Point::new(5, 1)];
        let r = bounding_rect(&pts);
        assert_eq!(r, Rect::from_minmax(2, 1, 10, 20));
    }

    #[test]
    fn filter_rejects_border_touching() {
        let filter = ContourFilter {
            forbidden_borders: vec![Border::Left],
            ..Default::default()
        };
        let c = Contour {
            polyline: vec![],
            rect: Rect::new(0, 5, 10, 10),
            filled_area: 50.0,
            rect_area: 100.0,
            size_class: SizeClass::Unknown,
            index: 0,
            in_line: false,
            overlap_adjusted: false,
            orig_rect: None,
        };
        assert!(!filter.accepts(&c, 100, 100));
    }
}
