//! Line builder (spec §4.5): grows the MICR line from an anchor contour
//! via a neighbour sweep, then fills gaps using projection-based
//! recovery.

use crate::contour::{self, Contour, SizeClass};
use crate::error::Result;
use crate::geometry::Rect;
use crate::raster::Raster;
use crate::scope::RasterHandle;

/// Per-line numeric thresholds derived from the anchor contour, spec §4.5.
#[derive(Debug, Clone, Copy)]
pub struct LineThresholds {
    pub min_area: f64,
    pub max_area: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
    pub containment_pad: f64,
    pub min_horizontal_run: i32,
    pub min_vertical_run: i32,
    pub vertical_thickness_threshold: i32,
}

impl LineThresholds {
    pub fn from_anchor(anchor: &Contour) -> Self {
        let area = anchor.rect_area;
        let width = anchor.rect.width as f64;
        let height = anchor.rect.height as f64;
        Self {
            min_area: 0.47 * area,
            max_area: 1.25 * area,
            min_height: 0.9 * height,
            max_width: width,
            max_height: height,
            containment_pad: 0.25 * height,
            min_horizontal_run: (0.3 * width).round() as i32,
            min_vertical_run: (0.3 * height).round() as i32,
            vertical_thickness_threshold: (0.25 * height).round() as i32,
        }
    }

    pub fn classify(&self, c: &Contour) -> SizeClass {
        let area = c.rect_area;
        if area < self.min_area {
            SizeClass::Small
        } else if c.rect.height as f64 >= self.min_height && area <= self.max_area {
            SizeClass::Medium
        } else if area > self.max_area {
            SizeClass::Large
        } else {
            SizeClass::Small
        }
    }
}

pub struct Line {
    pub contours: Vec<Contour>,
    pub rect: Rect,
    pub overlap: bool,
    pub thresholds: LineThresholds,
    pub anchor_index: usize,
    pub image: RasterHandle,
}

/// How many projection-recovery iterations ran past the expected 1-3
/// typical count, logged for investigation per spec §9's Open Question.
const PROJECTION_RECOVERY_MAX_ITERATIONS: u32 = 10;
const PROJECTION_RECOVERY_WARN_THRESHOLD: u32 = 3;

pub fn build(
    image: RasterHandle,
    raster: &Raster,
    anchor_index: usize,
    mut contours: Vec<Contour>,
) -> Result<Line> {
    let thresholds = LineThresholds::from_anchor(&contours[anchor_index]);
    for c in &mut contours {
        c.size_class = thresholds.classify(c);
    }

    let (mut on_line, holding) = neighbour_sweep(&contours, anchor_index, &thresholds, raster);

    let overlap = projection_recovery(raster, &mut on_line, holding, &thresholds)?;

    on_line.sort_by_key(|c| c.rect.x);
    let rect = on_line
        .iter()
        .fold(None::<Rect>, |acc, c| match acc {
            None => Some(c.rect),
            Some(r) => Some(r.union(&c.rect)),
        })
        .unwrap_or(contours[anchor_index].rect);

    Ok(Line {
        contours: on_line,
        rect,
        overlap,
        thresholds,
        anchor_index,
        image,
    })
}

/// §4.5.1 neighbour sweep: walk left and right from the anchor, testing
/// Y-intersection then padded containment; returns the accepted on-line
/// contours plus a holding list of Y-intersecting rejects for projection
/// recovery.
fn neighbour_sweep(
    contours: &[Contour],
    anchor_index: usize,
    thresholds: &LineThresholds,
    raster: &Raster,
) -> (Vec<Contour>, Vec<Contour>) {
    let mut by_x: Vec<&Contour> = contours.iter().collect();
    by_x.sort_by_key(|c| c.rect.x);
    let anchor_pos = by_x
        .iter()
        .position(|c| c.index == contours[anchor_index].index)
        .unwrap_or(0);

    let mut accepted: Vec<Contour> = vec![contours[anchor_index].clone()];
    let mut holding: Vec<Contour> = Vec::new();

    let mut sweep_direction = |range: Box<dyn Iterator<Item = usize>>,
                                accepted: &mut Vec<Contour>,
                                holding: &mut Vec<Contour>| {
        let mut lc = contours[anchor_index].clone();
        for i in range {
            let c = by_x[i];
            if !c.rect.y_intersects(&lc.rect.y_range()) {
                continue;
            }
            let padded = lc
                .rect
                .y_range()
                .pad(thresholds.containment_pad.round() as i32)
                .clamp_y(raster.height() - 1);

            if (c.rect.width as f64) <= 1.25 * thresholds.max_width && padded.contains(c.rect.y_range().min)
                && padded.contains(c.rect.y_range().max)
            {
                let mut accepted_c = c.clone();
                accepted_c.in_line = true;
                if matches!(thresholds.classify(c), SizeClass::Medium) {
                    lc = accepted_c.clone();
                }
                accepted.push(accepted_c);
            } else {
                holding.push(c.clone());
            }
        }
    };

    sweep_direction(
        Box::new((anchor_pos + 1..by_x.len()).into_iter()),
        &mut accepted,
        &mut holding,
    );
    sweep_direction(
        Box::new((0..anchor_pos).rev()),
        &mut accepted,
        &mut holding,
    );

    (accepted, holding)
}

struct Projection {
    rect: Rect,
}

/// §4.5.2 projection recovery loop.
fn projection_recovery(
    raster: &Raster,
    on_line: &mut Vec<Contour>,
    mut holding: Vec<Contour>,
    thresholds: &LineThresholds,
) -> Result<bool> {
    let mut any_insertion = false;
    let mut min_x_gap = min_gap_between_medium(on_line);

    for iteration in 0..PROJECTION_RECOVERY_MAX_ITERATIONS {
        if iteration >= PROJECTION_RECOVERY_WARN_THRESHOLD {
            tracing::debug!(iteration, "projection recovery exceeded typical bound of 1-3");
        }

        on_line.sort_by_key(|c| c.rect.x);
        let projections = emit_projections(on_line, thresholds, min_x_gap, raster);
        if projections.is_empty() {
            break;
        }

        let mut inserted_this_round = false;
        let mut remaining_holding = Vec::new();

        for c in holding.drain(..) {
            let mut matched = false;
            for p in &projections {
                if c.rect.intersects(&p.rect) {
                    let restricted = contour::restrict_to_rect(raster, &c, &p.rect)?;
                    let mut restricted = restricted;
                    restricted.size_class = thresholds.classify(&restricted);
                    restricted.in_line = true;
                    on_line.push(restricted);
                    inserted_this_round = true;
                    matched = true;
                    break;
                }
            }
            if !matched {
                remaining_holding.push(c);
            }
        }
        holding = remaining_holding;

        if inserted_this_round {
            any_insertion = true;
            min_x_gap = min_gap_between_medium(on_line);
        } else {
            break;
        }
    }

    Ok(any_insertion)
}

fn min_gap_between_medium(contours: &[Contour]) -> i32 {
    let mut medium: Vec<&Contour> = contours
        .iter()
        .filter(|c| matches!(c.size_class, SizeClass::Medium))
        .collect();
    medium.sort_by_key(|c| c.rect.x);
    let mut min_gap = i32::MAX;
    for w in medium.windows(2) {
        let gap = w[1].rect.x - w[0].rect.right();
        if gap > 0 {
            min_gap = min_gap.min(gap);
        }
    }
    if min_gap == i32::MAX {
        0
    } else {
        min_gap
    }
}

fn emit_projections(
    on_line: &[Contour],
    thresholds: &LineThresholds,
    min_x_gap: i32,
    raster: &Raster,
) -> Vec<Projection> {
    let mut sorted: Vec<&Contour> = on_line.iter().collect();
    sorted.sort_by_key(|c| c.rect.x);
    if sorted.is_empty() {
        return Vec::new();
    }

    let max_width = thresholds.max_width.round() as i32;
    let max_height = thresholds.max_height.round() as i32;
    let gap_threshold = max_width + min_x_gap;
    let offset = (1.3 * min_x_gap as f64).round() as i32;

    let mut projections = Vec::new();

    // left-to-right
    for w in sorted.windows(2) {
        let gap = w[1].rect.x - w[0].rect.right();
        if gap > gap_threshold {
            let rect = Rect::new(w[0].rect.right() + offset, w[0].rect.y, max_width, max_height);
            try_add_projection(&mut projections, rect, raster);
        }
    }
    // right-to-left
    for w in sorted.windows(2).rev() {
        let gap = w[1].rect.x - w[0].rect.right();
        if gap > gap_threshold {
            let rect = Rect::new(
                w[1].rect.x - offset - max_width,
                w[1].rect.y,
                max_width,
                max_height,
            );
            try_add_projection(&mut projections, rect, raster);
        }
    }

    projections
}

fn try_add_projection(projections: &mut Vec<Projection>, rect: Rect, raster: &Raster) {
    if rect.x < 0 || rect.y < 0 || rect.right() > raster.width() || rect.bottom() > raster.height() {
        return;
    }
    if projections.iter().any(|p| p.rect.intersects(&rect)) {
        return;
    }
    projections.push(Projection { rect });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contour_at(index: usize, x: i32, y: i32, w: i32, h: i32) -> Contour {
        Contour {
            polyline: vec![],
            rect: Rect::new(x, y, w, h),
            filled_area: (w * h) as f64 * 0.8,
            rect_area: (w * h) as f64,
            size_class: SizeClass::Unknown,
            index,
            in_line: false,
            overlap_adjusted: false,
            orig_rect: None,
        }
    }

    #[test]
    fn thresholds_match_formulas() {
        let anchor = contour_at(0, 0, 0, 20, 30);
        let t = LineThresholds::from_anchor(&anchor);
        assert!((t.min_area - 0.47 * 600.0).abs() < 1e-9);
        assert!((t.max_area - 1.25 * 600.0).abs() < 1e-9);
        assert!((t.min_height - 27.0).abs() < 1e-9);
        assert_eq!(t.max_width, 20.0);
        assert_eq!(t.max_height, 30.0);
        assert!((t.containment_pad - 7.5).abs() < 1e-9);
        assert_eq!(t.min_horizontal_run, 6);
        assert_eq!(t.min_vertical_run, 9);
        assert_eq!(t.vertical_thickness_threshold, 8);
    }
}
