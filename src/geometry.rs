//! Shared geometric value types used by every pipeline stage.
//!
//! Rectangles are half-inclusive on the right/bottom: a `Rect` with
//! `x=0, width=10` covers columns `0..10`. The closed min/max form used
//! by a few call sites (`MinMaxRect`) round-trips exactly:
//! `width == x_max - x_min + 1`.

use serde::{Deserialize, Serialize};

/// Integer pixel point, origin top-left, X rightward, Y downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Half-inclusive axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    /// Exclusive right edge (`x + width`).
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge (`y + height`).
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn mid_x(&self) -> i32 {
        self.x + self.width / 2
    }

    pub fn mid_y(&self) -> i32 {
        self.y + self.height / 2
    }

    pub fn y_range(&self) -> MinMax {
        MinMax::new(self.y, self.bottom() - 1)
    }

    pub fn x_range(&self) -> MinMax {
        MinMax::new(self.x, self.right() - 1)
    }

    /// Build from a closed min/max rectangle (`MinMaxRect`), preserving
    /// the `width = x_max - x_min + 1` round-trip.
    pub fn from_minmax(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self::new(x_min, y_min, x_max - x_min + 1, y_max - y_min + 1)
    }

    pub fn to_minmax(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.right() - 1, self.bottom() - 1)
    }

    /// Clamp this rectangle so it lies fully inside `[0, width) x [0, height)`.
    pub fn clamp_to(&self, width: i32, height: i32) -> Rect {
        let x0 = self.x.clamp(0, width.max(1) - 1);
        let y0 = self.y.clamp(0, height.max(1) - 1);
        let x1 = (self.right() - 1).clamp(x0, width.max(1) - 1);
        let y1 = (self.bottom() - 1).clamp(y0, height.max(1) - 1);
        Rect::from_minmax(x0, y0, x1, y1)
    }

    /// Pad on all four sides independently, without clamping.
    pub fn pad(&self, left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        Rect::from_minmax(
            self.x - left,
            self.y - top,
            self.right() - 1 + right,
            self.bottom() - 1 + bottom,
        )
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        rect_contains(self, other)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        rect_intersects(self, other)
    }

    pub fn y_intersects(&self, range: &MinMax) -> bool {
        self.y_range().intersects(range)
    }

    pub fn touches_border(&self, image_width: i32, image_height: i32, border: Border) -> bool {
        match border {
            Border::Left => self.x <= 0,
            Border::Top => self.y <= 0,
            Border::Right => self.right() >= image_width,
            Border::Bottom => self.bottom() >= image_height,
        }
    }

    /// Intersection rectangle, or `None` if the rectangles don't overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 > x0 && y1 > y0 {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        } else {
            None
        }
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    Left,
    Top,
    Right,
    Bottom,
}

/// `rectContains` — reflexive containment test.
pub fn rect_contains(outer: &Rect, inner: &Rect) -> bool {
    inner.x >= outer.x
        && inner.y >= outer.y
        && inner.right() <= outer.right()
        && inner.bottom() <= outer.bottom()
}

/// `rectIntersects` — symmetric overlap test.
pub fn rect_intersects(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && b.x < a.right() && a.y < b.bottom() && b.y < a.bottom()
}

/// Closed integer interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinMax {
    pub min: i32,
    pub max: i32,
}

impl MinMax {
    pub fn new(min: i32, max: i32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn len(&self) -> i32 {
        self.max - self.min + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    pub fn contains(&self, v: i32) -> bool {
        v >= self.min && v <= self.max
    }

    pub fn intersects(&self, other: &MinMax) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    pub fn pad(&self, amount: i32) -> MinMax {
        MinMax::new(self.min - amount, self.max + amount)
    }

    /// Clamp the upper bound to `max_y`; the lower bound is clamped to 0.
    ///
    /// spec's observed source only clamps the upper bound against the
    /// image height. Symmetrically clamping the lower bound to 0 too is
    /// a strict generalization: it only ever changes already-invalid
    /// (negative) ranges, never one that was in bounds. See DESIGN.md.
    pub fn clamp_y(&self, max_y: i32) -> MinMax {
        MinMax::new(self.min.max(0), self.max.min(max_y))
    }

    /// Fraction of `self` covered by `other`, in `[0, 1]`.
    pub fn fraction_intersects(&self, other: &MinMax) -> f64 {
        let overlap = self.max.min(other.max) - self.min.max(other.min);
        let span = self.max - self.min;
        if overlap <= 0 || span <= 0 {
            0.0
        } else {
            overlap as f64 / span as f64
        }
    }
}

/// Closed-interval floating point range, used for the preprocessor's
/// configurable crop fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxF {
    pub min: f64,
    pub max: f64,
}

impl MinMaxF {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Horizontal pixel distance between the closer edges of two rectangles
/// that do not overlap on X; 0 if they overlap.
pub fn x_distance(a: &Rect, b: &Rect) -> i32 {
    if a.right() <= b.x {
        b.x - a.right()
    } else if b.right() <= a.x {
        a.x - b.right()
    } else {
        0
    }
}

/// Direction of a short pixel chain, 0..360, 0° = right, 90° = up.
///
/// Computed as a least-squares fit of the supplied points (in the order
/// they were visited), converting the fitted slope to the upward-Y
/// convention used throughout the overlap corrector.
pub fn compute_degree(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as f64;
    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
    for p in points {
        let x = p.x as f64;
        let y = -(p.y as f64); // flip to mathematical (upward-Y) convention
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
    }
    let dx = points.last().unwrap().x as f64 - points.first().unwrap().x as f64;
    let denom = n * sxx - sx * sx;

    let angle_rad = if dx.abs() < 1e-9 {
        // Vertical chain: slope is undefined, use the endpoint direction directly.
        let dy = -(points.last().unwrap().y as f64) - -(points.first().unwrap().y as f64);
        if dy >= 0.0 {
            std::f64::consts::FRAC_PI_2
        } else {
            -std::f64::consts::FRAC_PI_2
        }
    } else if denom.abs() < 1e-9 {
        (-(points.last().unwrap().y as f64) - -(points.first().unwrap().y as f64)).atan2(dx)
    } else {
        let slope = (n * sxy - sx * sy) / denom;
        slope.atan()
    };

    let mut degrees = angle_rad.to_degrees();
    // Orient using the endpoint-to-endpoint direction so the fit picks
    // the correct one of the two antipodal angles the slope admits.
    let end_dx = points.last().unwrap().x - points.first().unwrap().x;
    let end_dy = -(points.last().unwrap().y - points.first().unwrap().y);
    let forward = (end_dy as f64).atan2(end_dx as f64).to_degrees();
    if angle_diff(degrees, forward) > 90.0 {
        degrees += 180.0;
    }
    normalize_degrees(degrees)
}

fn angle_diff(a: f64, b: f64) -> f64 {
    let mut d = (a - b).abs() % 360.0;
    if d > 180.0 {
        d = 360.0 - d;
    }
    d
}

pub fn normalize_degrees(d: f64) -> f64 {
    let mut v = d % 360.0;
    if v < 0.0 {
        v += 360.0;
    }
    v
}

/// Symmetric angular distance wrapped to `[0, 180]`.
pub fn degree_delta(a: f64, b: f64) -> f64 {
    let raw = (normalize_degrees(a) - normalize_degrees(b)).abs();
    if raw > 180.0 {
        360.0 - raw
    } else {
        raw
    }
}

/// Average of two directions, handling wraparound: if the raw difference
/// exceeds 180°, the mean is rotated by 180° so it sits between the two
/// inputs along the short way around the circle.
pub fn average_degree(a: f64, b: f64) -> f64 {
    let a = normalize_degrees(a);
    let b = normalize_degrees(b);
    let mut mean = (a + b) / 2.0;
    if (a - b).abs() > 180.0 {
        mean += 180.0;
    }
    normalize_degrees(mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_minmax_roundtrip() {
        let r = Rect::new(10, 20, 5, 8);
        let (xmin, ymin, xmax, ymax) = r.to_minmax();
        assert_eq!(xmax - xmin + 1, r.width);
        assert_eq!(ymax - ymin + 1, r.height);
        let r2 = Rect::from_minmax(xmin, ymin, xmax, ymax);
        assert_eq!(r, r2);
    }

    #[test]
    fn rect_contains_is_reflexive() {
        let r = Rect::new(0, 0, 10, 10);
        assert!(rect_contains(&r, &r));
    }

    #[test]
    fn rect_intersects_is_symmetric() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        let c = Rect::new(100, 100, 10, 10);
        assert_eq!(rect_intersects(&a, &b), rect_intersects(&b, &a));
        assert_eq!(rect_intersects(&a, &c), rect_intersects(&c, &a));
        assert!(rect_intersects(&a, &b));
        assert!(!rect_intersects(&a, &c));
    }

    #[test]
    fn fraction_intersects_example() {
        let a = MinMax::new(0, 100);
        let b = MinMax::new(50, 150);
        assert!((a.fraction_intersects(&b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn x_distance_example() {
        let a = Rect::new(26, 33, 15, 8);
        let b = Rect::new(105, 28, 9, 10);
        assert_eq!(x_distance(&a, &b), 64);
    }

    #[test]
    fn degree_delta_is_symmetric_and_bounded() {
        for (a, b) in [(10.0, 350.0), (0.0, 180.0), (45.0, 46.0)] {
            let d1 = degree_delta(a, b);
            let d2 = degree_delta(b, a);
            assert!((d1 - d2).abs() < 1e-9);
            assert!((0.0..=180.0).contains(&d1));
        }
    }

    #[test]
    fn compute_degree_round_trips_cardinal_directions() {
        let cases: &[(f64, Point, Point, Point)] = &[
            (0.0, Point::new(0, 0), Point::new(50, 0), Point::new(100, 0)),
            (90.0, Point::new(0, 0), Point::new(0, -50), Point::new(0, -100)),
            (180.0, Point::new(0, 0), Point::new(-50, 0), Point::new(-100, 0)),
            (270.0, Point::new(0, 0), Point::new(0, 50), Point::new(0, 100)),
        ];
        for (expected, p0, p1, p2) in cases {
            let got = compute_degree(&[*p0, *p1, *p2]);
            let diff = degree_delta(got, *expected);
            assert!(diff <= 1.0, "expected {expected}, got {got}");
        }
    }

    #[test]
    fn compute_degree_near_horizontal() {
        let got = compute_degree(&[Point::new(0, 0), Point::new(50, -1), Point::new(100, -2)]);
        assert!(degree_delta(got, 1.0) <= 1.5, "got {got}");
    }

    #[test]
    fn compute_degree_near_vertical() {
        let got = compute_degree(&[Point::new(0, 0), Point::new(1, -50), Point::new(2, -100)]);
        assert!(degree_delta(got, 89.0) <= 1.5, "got {got}");
    }

    #[test]
    fn average_degree_handles_wrap() {
        let avg = average_degree(350.0, 10.0);
        assert!(degree_delta(avg, 0.0) < 1e-6, "avg={avg}");
    }
}
