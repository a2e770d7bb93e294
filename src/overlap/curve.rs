//! Curve following (spec §4.6.1) and intersection crossing (spec
//! §4.6.2): the engine that traces ink reaching down from the top of the
//! overlap ROI and erases it up to the first character-body
//! intersection it cannot cross.

use super::edge::{Edge, Side};
use super::point::{self, PointId, PointRecord};
use crate::config::Config;
use crate::error::Result;
use crate::geometry::{average_degree, compute_degree, degree_delta, Point, Rect};
use crate::raster::Raster;
use opencv::core::{Mat, Point as CvPoint, Scalar, Vector, CV_8UC1};
use opencv::imgproc;

/// Window used to estimate a point's direction: one point before, three
/// after, per spec §4.6.1.
const DEGREE_WINDOW_BEFORE: usize = 1;
const DEGREE_WINDOW_AFTER: usize = 3;

pub struct Curve {
    arena: Vec<PointRecord>,
    pub left: Edge,
    pub right: Edge,
}

impl Curve {
    /// Seed a Curve from the two ends of one top-border ink run.
    pub fn seed(left_end: Point, right_end: Point) -> Self {
        let mut arena = Vec::new();
        let left_id = push(&mut arena, left_end, 90.0);
        let right_id = push(&mut arena, right_end, 90.0);
        Curve {
            arena,
            left: Edge::new(Side::CounterClockwise, left_id),
            right: Edge::new(Side::Clockwise, right_id),
        }
    }

    pub fn point(&self, id: PointId) -> &PointRecord {
        &self.arena[id.0]
    }

    /// Run the alternating follow loop until both Edges stop, erasing
    /// nothing itself — erasure happens in `clear` once the enclosing
    /// region is known. Returns `true` if the two Edges met (a clean
    /// stroke boundary) or `false` if following halted on an
    /// intersection that needs `cross_intersection`.
    pub fn follow(&mut self, raster: &Raster, roi: &Rect, config: &Config) -> bool {
        loop {
            if self.left.stopped && self.right.stopped {
                return true;
            }

            let advanced_left = self.step_edge(true, raster, roi, config);
            let advanced_right = self.step_edge(false, raster, roi, config);

            if !advanced_left && !advanced_right {
                return false;
            }
        }
    }

    fn step_edge(&mut self, is_left: bool, raster: &Raster, roi: &Rect, config: &Config) -> bool {
        let (edge, other) = if is_left {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };
        if edge.stopped || edge.paused {
            return false;
        }

        let last_id = edge.last();
        let last = self.arena[last_id.0].clone();
        let came_from_dir = direction_from_prev(edge, &self.arena);
        let sense = edge.side.step();

        let came_from_index = nearest_offset_index(came_from_dir);
        let start_index = point::opposite(came_from_index);

        let mut next: Option<(usize, Point)> = None;
        for step in 0..8 {
            let idx = point::rotate(start_index, sense * step);
            let (dx, dy) = point::NEIGHBOR_OFFSETS[idx];
            let candidate = Point::new(last.pos.x + dx, last.pos.y + dy);
            if !roi.contains_rect(&Rect::new(candidate.x, candidate.y, 1, 1)) {
                continue;
            }
            if raster.is_set(candidate.x, candidate.y).unwrap_or(false)
                && is_edge_point(raster, roi, candidate)
            {
                next = Some((idx, candidate));
                break;
            }
        }

        let Some((dir_idx, next_pos)) = next else {
            let edge = if is_left { &mut self.left } else { &mut self.right };
            edge.stopped = true;
            return false;
        };

        if other.points.iter().any(|&id| self.arena[id.0].pos == next_pos) {
            let edge = if is_left { &mut self.left } else { &mut self.right };
            edge.stopped = true;
            return false;
        }

        let degree_here = point::neighbor_degree(dir_idx);
        let new_id = push(&mut self.arena, next_pos, degree_here);

        let other_last = self.point(other.last()).pos;
        let delta = degree_delta(degree_here, self.point(other.last()).direction_into_point);
        if !in_learning_region(roi, next_pos) && delta > config.curve_max_delta {
            let edge = if is_left { &mut self.left } else { &mut self.right };
            edge.points.push(new_id);
            edge.stopped = true;
            return false;
        }

        let prev_distance = distance(last.pos, other_last);
        let new_distance = distance(next_pos, other_last);

        let edge = if is_left { &mut self.left } else { &mut self.right };
        edge.points.push(new_id);
        edge.paused = new_distance > prev_distance;
        // The other Edge gets its pause cleared once this Edge caught up.
        let other_mut = if is_left { &mut self.right } else { &mut self.left };
        if !edge.paused {
            other_mut.paused = false;
        }
        true
    }

    /// §4.6.2's four-step intersection crossing. Returns the seed points
    /// for the next Curve section on success.
    pub fn cross_intersection(
        &self,
        raster: &Raster,
        config: &Config,
    ) -> Option<(Point, Point)> {
        let (best_id, best_delta) = self.backward_search(&self.left, config)?;
        let nearest = self.point(best_id).nearest_other.unwrap_or(self.right.last());
        let anchor = self.point(best_id).pos;
        let nearest_pos = self.point(nearest).pos;

        let direction = if best_delta < config.curve_good_small_delta {
            self.point(best_id).direction_into_point
        } else {
            average_degree(
                self.point(best_id).direction_into_point,
                self.point(nearest).direction_into_point,
            )
        };

        let midpoint = Point::new(
            (anchor.x + nearest_pos.x) / 2,
            (anchor.y + nearest_pos.y) / 2,
        );

        let forward_steps = config.curve_max_steps_back.min(8) + config.curve_probe_start_steps;
        let mut cursor = midpoint;
        for _ in 0..forward_steps {
            let idx = point::closest_direction_index(direction);
            let (dx, dy) = point::NEIGHBOR_OFFSETS[idx];
            let next = Point::new(cursor.x + dx, cursor.y + dy);
            if !raster.is_set(next.x, next.y).unwrap_or(false) {
                return None;
            }
            cursor = next;
        }

        let perp_a = direction + 90.0;
        let perp_b = direction - 90.0;
        let max_probe = ((raster.width().max(raster.height()) as f64) * 1.1).ceil() as i32;

        for _ in 0..config.curve_max_forward_probes {
            let idx_f = point::closest_direction_index(direction);
            let (dxf, dyf) = point::NEIGHBOR_OFFSETS[idx_f];
            cursor = Point::new(cursor.x + dxf, cursor.y + dyf);

            let left_hit = probe_until_unset(raster, cursor, perp_a, max_probe);
            let right_hit = probe_until_unset(raster, cursor, perp_b, max_probe);
            if let (Some(l), Some(r)) = (left_hit, right_hit) {
                return Some((l, r));
            }
        }

        None
    }

    fn backward_search(&self, edge: &Edge, config: &Config) -> Option<(PointId, f64)> {
        let steps = config.curve_max_steps_back.max(0) as usize;
        let mut best: Option<(PointId, f64)> = None;
        for &id in edge.points.iter().rev().take(steps.max(1)) {
            let delta = degree_delta(
                self.point(id).direction_into_point,
                self.point(id).nearest_other.map(|n| self.point(n).direction_into_point).unwrap_or(0.0),
            );
            if best.map(|(_, d)| delta < d).unwrap_or(true) {
                best = Some((id, delta));
            }
            if delta < config.curve_good_small_delta {
                return Some((id, delta));
            }
        }
        best
    }

    /// Erase the region enclosed by the forward run of `left` and the
    /// reverse run of `right` (a closed polygon): fill it on a mask,
    /// invert, and AND it onto the ROI. Erasure only clears pixels, as
    /// required by spec §3's "never adds foreground" invariant.
    pub fn clear(&self, raster: &mut Raster, roi: &Rect) -> Result<()> {
        let mut polygon: Vec<CvPoint> = self
            .left
            .points
            .iter()
            .map(|id| self.point(*id).pos)
            .map(|p| CvPoint::new(p.x, p.y))
            .collect();
        polygon.extend(
            self.right
                .points
                .iter()
                .rev()
                .map(|id| self.point(*id).pos)
                .map(|p| CvPoint::new(p.x, p.y)),
        );
        if polygon.len() < 3 {
            return Ok(());
        }

        let mut mask = Mat::new_rows_cols_with_default(
            raster.height(),
            raster.width(),
            CV_8UC1,
            Scalar::all(0.0),
        )?;
        let contours: Vector<Vector<CvPoint>> = Vector::from(vec![Vector::from(polygon)]);
        imgproc::fill_poly(
            &mut mask,
            &contours,
            Scalar::all(255.0),
            imgproc::LINE_8,
            0,
            CvPoint::new(0, 0),
        )?;

        let mut inverted = Mat::default();
        opencv::core::bitwise_not(&mask, &mut inverted, &opencv::core::no_array())?;

        let mut result = Mat::default();
        opencv::core::bitwise_and(&raster.mat, &inverted, &mut result, &opencv::core::no_array())?;
        raster.mat = result;
        let _ = roi;
        Ok(())
    }
}

fn push(arena: &mut Vec<PointRecord>, pos: Point, direction: f64) -> PointId {
    arena.push(PointRecord {
        pos,
        direction_into_point: direction,
        width_to_other: None,
        nearest_other: None,
    });
    PointId(arena.len() - 1)
}

fn direction_from_prev(edge: &Edge, arena: &[PointRecord]) -> f64 {
    if edge.points.len() < 2 {
        return arena[edge.last().0].direction_into_point;
    }
    let window_start = edge.points.len().saturating_sub(DEGREE_WINDOW_BEFORE + 1);
    let window_end = (edge.points.len() + DEGREE_WINDOW_AFTER).min(edge.points.len());
    let pts: Vec<Point> = edge.points[window_start..window_end]
        .iter()
        .map(|id| arena[id.0].pos)
        .collect();
    compute_degree(&pts)
}

fn nearest_offset_index(degree: f64) -> usize {
    point::closest_direction_index(degree)
}

/// A set pixel with at least one unset 4-neighbour inside the ROI
/// counts as an edge point (spec §4.6.1).
fn is_edge_point(raster: &Raster, roi: &Rect, p: Point) -> bool {
    const FOUR_NEIGHBORS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    for (dx, dy) in FOUR_NEIGHBORS {
        let n = Point::new(p.x + dx, p.y + dy);
        if !roi.contains_rect(&Rect::new(n.x, n.y, 1, 1)) {
            continue;
        }
        if !raster.is_set(n.x, n.y).unwrap_or(false) {
            return true;
        }
    }
    false
}

/// Whether `p` is still inside the top-border "learning region" where
/// the follow loop tolerates larger direction swings (near the seed it
/// hasn't yet committed to a direction).
fn in_learning_region(roi: &Rect, p: Point) -> bool {
    p.y - roi.top() < (roi.height / 4).max(1)
}

fn distance(a: Point, b: Point) -> f64 {
    (((a.x - b.x).pow(2) + (a.y - b.y).pow(2)) as f64).sqrt()
}

fn probe_until_unset(raster: &Raster, from: Point, degree: f64, max_steps: i32) -> Option<Point> {
    let idx = point::closest_direction_index(degree);
    let (dx, dy) = point::NEIGHBOR_OFFSETS[idx];
    let mut cursor = from;
    for _ in 0..max_steps {
        cursor = Point::new(cursor.x + dx, cursor.y + dy);
        if !raster.is_set(cursor.x, cursor.y).unwrap_or(false) {
            return Some(cursor);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_creates_two_edges_at_90_degrees() {
        let curve = Curve::seed(Point::new(0, 0), Point::new(10, 0));
        assert_eq!(curve.left.points.len(), 1);
        assert_eq!(curve.right.points.len(), 1);
        assert_eq!(curve.point(curve.left.last()).direction_into_point, 90.0);
    }

    #[test]
    fn in_learning_region_is_true_near_roi_top() {
        let roi = Rect::new(0, 0, 100, 40);
        assert!(in_learning_region(&roi, Point::new(5, 2)));
        assert!(!in_learning_region(&roi, Point::new(5, 39)));
    }
}
