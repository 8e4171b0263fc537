use serde::{Deserialize, Serialize};

use crate::{Heading, Position};

/// An axis-aligned bounding box in world coordinates.
///
/// Every proximity check in the simulation (pickup reach, sensor range,
/// collision) is an overlap test between two of these, optionally grown
/// by a margin, so edge behavior stays consistent across all of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub top_left: Position,
    pub bottom_right: Position,
}

impl Bounds {
    /// Builds the box centered on `center` extending `half_extent` in
    /// each direction.
    pub fn around(center: Position, half_extent: f64) -> Self {
        Bounds {
            top_left: Position::new(center.x - half_extent, center.y - half_extent),
            bottom_right: Position::new(center.x + half_extent, center.y + half_extent),
        }
    }

    /// True iff the two boxes, each expanded by `margin` on all sides,
    /// intersect on both axes. `margin` must be non-negative. Touching
    /// edges count as overlapping.
    pub fn overlaps(&self, other: &Bounds, margin: f64) -> bool {
        self.top_left.x - margin <= other.bottom_right.x + margin
            && other.top_left.x - margin <= self.bottom_right.x + margin
            && self.top_left.y - margin <= other.bottom_right.y + margin
            && other.top_left.y - margin <= self.bottom_right.y + margin
    }

    /// True iff the box lies fully within `[0, width] x [0, height]`.
    pub fn in_world(&self, width: f64, height: f64) -> bool {
        self.top_left.x >= 0.0
            && self.top_left.y >= 0.0
            && self.bottom_right.x <= width
            && self.bottom_right.y <= height
    }
}

/// Scales `(dx, dy)` to a vector of length `speed` in the same direction.
///
/// The zero vector has no direction; it normalizes to the zero heading,
/// so an agent steering along it simply stays put that tick.
pub fn normalize(dx: f64, dy: f64, speed: f64) -> Heading {
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return Heading::ZERO;
    }
    Heading::new(dx / length * speed, dy / length * speed)
}

/// Heading of length `speed` pointing from `from` towards `to`.
pub fn heading_towards(from: Position, to: Position, speed: f64) -> Heading {
    normalize(to.x - from.x, to.y - from.y, speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: f64, y: f64, half: f64) -> Bounds {
        Bounds::around(Position::new(x, y), half)
    }

    #[test]
    fn overlap_is_reflexive() {
        let b = boxed(10.0, 10.0, 3.0);
        assert!(b.overlaps(&b, 0.0));
    }

    #[test]
    fn overlap_is_monotone_in_margin() {
        let a = boxed(0.0, 0.0, 2.0);
        let b = boxed(10.0, 0.0, 2.0);
        // Separated by 6: only a big enough margin bridges the gap.
        assert!(!a.overlaps(&b, 0.0));
        assert!(!a.overlaps(&b, 2.0));
        assert!(a.overlaps(&b, 3.0));
        assert!(a.overlaps(&b, 50.0));
    }

    #[test]
    fn touching_edges_overlap() {
        let a = boxed(0.0, 0.0, 5.0);
        let b = boxed(10.0, 0.0, 5.0);
        assert!(a.overlaps(&b, 0.0));
    }

    #[test]
    fn disjoint_on_one_axis_is_enough() {
        let a = boxed(0.0, 0.0, 1.0);
        let b = boxed(0.0, 100.0, 1.0);
        assert!(!a.overlaps(&b, 0.0));
    }

    #[test]
    fn in_world_checks_all_edges() {
        assert!(boxed(50.0, 50.0, 10.0).in_world(100.0, 100.0));
        assert!(!boxed(5.0, 50.0, 10.0).in_world(100.0, 100.0));
        assert!(!boxed(50.0, 5.0, 10.0).in_world(100.0, 100.0));
        assert!(!boxed(98.0, 50.0, 10.0).in_world(100.0, 100.0));
        assert!(!boxed(50.0, 98.0, 10.0).in_world(100.0, 100.0));
        // Exactly flush with the edge still counts as inside.
        assert!(boxed(10.0, 10.0, 10.0).in_world(100.0, 100.0));
    }

    #[test]
    fn normalize_scales_to_speed() {
        let h = normalize(3.0, 4.0, 1.3);
        let length = (h.dx * h.dx + h.dy * h.dy).sqrt();
        assert!((length - 1.3).abs() < 1e-9);
        assert!(h.dx > 0.0 && h.dy > 0.0);
    }

    #[test]
    fn normalize_zero_vector_is_zero_heading() {
        let h = normalize(0.0, 0.0, 1.3);
        assert_eq!(h, Heading::ZERO);
    }

    #[test]
    fn heading_towards_points_at_target() {
        let h = heading_towards(Position::new(0.0, 0.0), Position::new(-10.0, 0.0), 2.0);
        assert!((h.dx + 2.0).abs() < 1e-9);
        assert!(h.dy.abs() < 1e-9);
    }
}
