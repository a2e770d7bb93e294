//! `Edge` — one of a Curve's two pixel-trails (spec §4.6.1). Stores an
//! ordered list of point ids into the owning Curve's arena; no owning or
//! back reference to the Curve or the other Edge.

use super::point::PointId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Clockwise,
    CounterClockwise,
}

impl Side {
    pub fn step(&self) -> i32 {
        match self {
            Side::Clockwise => 1,
            Side::CounterClockwise => -1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub side: Side,
    pub points: Vec<PointId>,
    pub stopped: bool,
    /// Set when this Edge's last step increased its distance to the
    /// other Edge's last point; the follow loop skips a paused Edge's
    /// turn so the other Edge can catch up (spec §4.6.1).
    pub paused: bool,
}

impl Edge {
    pub fn new(side: Side, seed: PointId) -> Self {
        Self {
            side,
            points: vec![seed],
            stopped: false,
            paused: false,
        }
    }

    pub fn last(&self) -> PointId {
        *self.points.last().expect("edge always has a seed point")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_matches_side() {
        assert_eq!(Side::Clockwise.step(), 1);
        assert_eq!(Side::CounterClockwise.step(), -1);
    }
}
