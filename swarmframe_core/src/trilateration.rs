//! Circle-intersection trilateration primitives.
//!
//! These are the geometric building blocks of frame seeding and joining:
//! intersecting two circles (0, 1 or 2 solutions, with explicit degeneracy
//! detection) and locating a point from three landmark circles.

use nalgebra::Vector2;
use thiserror::Error;

/// Outcome of intersecting two circles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircleIntersection {
    /// The circles are disjoint, nested, or coincident: no usable solution.
    Degenerate,

    /// The circles touch at exactly one point.
    Tangent(Vector2<f64>),

    /// The circles cross at two points.
    Crossing(Vector2<f64>, Vector2<f64>),
}

impl CircleIntersection {
    /// Number of intersection points.
    pub fn solutions(&self) -> usize {
        match self {
            CircleIntersection::Degenerate => 0,
            CircleIntersection::Tangent(_) => 1,
            CircleIntersection::Crossing(..) => 2,
        }
    }

    /// Both candidate points, with a tangency counted twice.
    fn candidates(&self) -> Option<[Vector2<f64>; 2]> {
        match *self {
            CircleIntersection::Degenerate => None,
            CircleIntersection::Tangent(p) => Some([p, p]),
            CircleIntersection::Crossing(p, q) => Some([p, q]),
        }
    }
}

/// Failure of a three-circle localization attempt.
///
/// Always recoverable: the caller abandons the operation for the current
/// tick and may retry on a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrilaterationError {
    /// A pair of the three landmark circles had no usable intersection.
    #[error("landmark circles {0} and {1} have no usable intersection")]
    DegeneratePair(usize, usize),
}

/// Intersects two circles.
///
/// Returns [`CircleIntersection::Degenerate`] when the circles are too far
/// apart, one contains the other, or they coincide (infinitely many
/// solutions, so none is usable).
pub fn intersect_two_circles(
    center0: Vector2<f64>,
    radius0: f64,
    center1: Vector2<f64>,
    radius1: f64,
) -> CircleIntersection {
    let delta = center1 - center0;
    let dist = delta.norm();

    if dist > radius0 + radius1 {
        // Too far apart.
        return CircleIntersection::Degenerate;
    }
    if dist < (radius0 - radius1).abs() {
        // One circle contains the other.
        return CircleIntersection::Degenerate;
    }
    if dist == 0.0 && radius0 == radius1 {
        // Coincident circles.
        return CircleIntersection::Degenerate;
    }

    let a = (radius0 * radius0 - radius1 * radius1 + dist * dist) / (2.0 * dist);
    // Rounding can push the half-chord discriminant slightly negative;
    // clamp instead of producing NaN.
    let h = (radius0 * radius0 - a * a).max(0.0).sqrt();

    let mid = center0 + delta * (a / dist);
    let offset = Vector2::new(delta.y, -delta.x) * (h / dist);

    if dist == radius0 + radius1 {
        CircleIntersection::Tangent(mid + offset)
    } else {
        CircleIntersection::Crossing(mid + offset, mid - offset)
    }
}

/// Locates a point from three landmark circles.
///
/// Each pairwise intersection is ambiguous (two candidate points); only
/// one of the 2x2x2 combinations is geometrically consistent with all
/// three circles at once. Minimizing the mutual spread of the three chosen
/// points is the consistency criterion; the centroid of the winning triple
/// is returned.
pub fn locate_from_three(
    center0: Vector2<f64>,
    radius0: f64,
    center1: Vector2<f64>,
    radius1: f64,
    center2: Vector2<f64>,
    radius2: f64,
) -> Result<Vector2<f64>, TrilaterationError> {
    let pair01 = intersect_two_circles(center0, radius0, center1, radius1)
        .candidates()
        .ok_or(TrilaterationError::DegeneratePair(0, 1))?;
    let pair02 = intersect_two_circles(center0, radius0, center2, radius2)
        .candidates()
        .ok_or(TrilaterationError::DegeneratePair(0, 2))?;
    let pair12 = intersect_two_circles(center1, radius1, center2, radius2)
        .candidates()
        .ok_or(TrilaterationError::DegeneratePair(1, 2))?;

    let mut best = [pair01[0], pair02[0], pair12[0]];
    let mut best_spread = f64::MAX;
    for mask in 0..8usize {
        let p01 = pair01[mask & 1];
        let p02 = pair02[(mask >> 1) & 1];
        let p12 = pair12[(mask >> 2) & 1];

        let spread = (p01 - p02).norm() + (p01 - p12).norm() + (p02 - p12).norm();
        if spread < best_spread {
            best_spread = spread;
            best = [p01, p02, p12];
        }
    }

    Ok((best[0] + best[1] + best[2]) / 3.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_two_circles_tangent() {
        let result = intersect_two_circles(
            Vector2::new(0.0, 0.0),
            5.0,
            Vector2::new(10.0, 0.0),
            5.0,
        );

        match result {
            CircleIntersection::Tangent(p) => {
                assert_relative_eq!(p.x, 5.0, epsilon = 1e-9);
                assert_relative_eq!(p.y, 0.0, epsilon = 1e-9);
            }
            other => panic!("expected a tangency, got {:?}", other),
        }
        assert_eq!(result.solutions(), 1);
    }

    #[test]
    fn test_two_circles_disjoint() {
        let result = intersect_two_circles(
            Vector2::new(0.0, 0.0),
            1.0,
            Vector2::new(10.0, 0.0),
            1.0,
        );

        assert_eq!(result, CircleIntersection::Degenerate);
    }

    #[test]
    fn test_two_circles_coincident() {
        let result = intersect_two_circles(
            Vector2::new(3.0, 4.0),
            2.0,
            Vector2::new(3.0, 4.0),
            2.0,
        );

        assert_eq!(result, CircleIntersection::Degenerate);
    }

    #[test]
    fn test_two_circles_nested() {
        let result = intersect_two_circles(
            Vector2::new(0.0, 0.0),
            10.0,
            Vector2::new(1.0, 0.0),
            2.0,
        );

        assert_eq!(result, CircleIntersection::Degenerate);
    }

    #[test]
    fn test_two_circles_crossing() {
        let result = intersect_two_circles(
            Vector2::new(0.0, 0.0),
            2.0,
            Vector2::new(2.0, 0.0),
            2.0,
        );

        match result {
            CircleIntersection::Crossing(p, q) => {
                let expected_y = 3.0_f64.sqrt();
                assert_relative_eq!(p.x, 1.0, epsilon = 1e-9);
                assert_relative_eq!(q.x, 1.0, epsilon = 1e-9);
                assert_relative_eq!(p.y.abs(), expected_y, epsilon = 1e-9);
                assert_relative_eq!(q.y.abs(), expected_y, epsilon = 1e-9);
                assert_relative_eq!(p.y, -q.y, epsilon = 1e-9);
            }
            other => panic!("expected two crossings, got {:?}", other),
        }
    }

    #[test]
    fn test_three_circles_recover_point() {
        let truth = Vector2::new(3.0, 4.0);
        let l0 = Vector2::new(0.0, 0.0);
        let l1 = Vector2::new(10.0, 0.0);
        let l2 = Vector2::new(5.0, 8.0);

        let located = locate_from_three(
            l0,
            (truth - l0).norm(),
            l1,
            (truth - l1).norm(),
            l2,
            (truth - l2).norm(),
        )
        .unwrap();

        assert_relative_eq!(located.x, truth.x, epsilon = 1e-9);
        assert_relative_eq!(located.y, truth.y, epsilon = 1e-9);
    }

    #[test]
    fn test_three_circles_degenerate_pair_fails() {
        let err = locate_from_three(
            Vector2::new(0.0, 0.0),
            1.0,
            Vector2::new(100.0, 0.0),
            1.0,
            Vector2::new(50.0, 50.0),
            1.0,
        )
        .unwrap_err();

        assert_eq!(err, TrilaterationError::DegeneratePair(0, 1));
    }

    proptest! {
        /// Circles built from exact ranges to a true point always intersect
        /// pairwise (triangle inequality), so localization must recover it.
        #[test]
        fn prop_three_circles_consistent(x in 0.5f64..9.5, y in 0.5f64..8.5) {
            let truth = Vector2::new(x, y);
            let l0 = Vector2::new(0.0, 0.0);
            let l1 = Vector2::new(10.0, 0.0);
            let l2 = Vector2::new(4.0, 9.0);

            let located = locate_from_three(
                l0,
                (truth - l0).norm(),
                l1,
                (truth - l1).norm(),
                l2,
                (truth - l2).norm(),
            )
            .unwrap();

            prop_assert!((located - truth).norm() < 1e-6);
        }
    }
}
