//! Polygon helpers behind the island outlines.
//!
//! Everything here is pure and total: non-finite coordinates are dropped
//! before any computation and empty input yields empty output.

use std::f32::consts::TAU;

use eframe::egui::{Pos2, Vec2, pos2, vec2};

const MITER_LIMIT: f32 = 4.0;

pub fn is_finite_point(point: Pos2) -> bool {
    point.x.is_finite() && point.y.is_finite()
}

pub fn finite_points(points: &[Pos2]) -> Vec<Pos2> {
    points
        .iter()
        .copied()
        .filter(|point| is_finite_point(*point))
        .collect()
}

fn cross(origin: Pos2, a: Pos2, b: Pos2) -> f32 {
    let oa = a - origin;
    let ob = b - origin;
    (oa.x * ob.y) - (oa.y * ob.x)
}

/// Monotone chain. With fewer than three distinct points the (finite) input
/// comes back unchanged; collinear input collapses to its two extremes.
pub fn convex_hull(points: &[Pos2]) -> Vec<Pos2> {
    let finite = finite_points(points);

    let mut sorted = finite.clone();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    sorted.dedup();
    if sorted.len() < 3 {
        return finite;
    }

    let mut lower: Vec<Pos2> = Vec::with_capacity(sorted.len());
    for &point in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], point) <= 0.0
        {
            lower.pop();
        }
        lower.push(point);
    }

    let mut upper: Vec<Pos2> = Vec::with_capacity(sorted.len());
    for &point in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], point) <= 0.0
        {
            upper.pop();
        }
        upper.push(point);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Shoelace area; positive for counter-clockwise rings in y-up terms.
pub fn signed_area(polygon: &[Pos2]) -> f32 {
    if polygon.len() < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for (index, current) in polygon.iter().enumerate() {
        let next = polygon[(index + 1) % polygon.len()];
        twice_area += (current.x * next.y) - (next.x * current.y);
    }
    twice_area * 0.5
}

pub fn polygon_area(polygon: &[Pos2]) -> f32 {
    signed_area(polygon).abs()
}

fn outward_normal(from: Pos2, to: Pos2, orientation: f32) -> Vec2 {
    let edge = to - from;
    let length = edge.length();
    if length <= f32::EPSILON {
        return Vec2::ZERO;
    }
    vec2(edge.y, -edge.x) / length * orientation
}

/// Offsets every edge by `padding` along its outward normal, keeping vertex
/// order. Negative padding insets the ring. Corners whose normals nearly
/// cancel get a three-point cap instead of a miter, so the ring may grow by
/// two points per such corner.
pub fn expand_hull(hull: &[Pos2], padding: f32) -> Vec<Pos2> {
    let points = finite_points(hull);
    if points.len() < 3 || !padding.is_finite() || padding == 0.0 {
        return points;
    }

    let orientation = if signed_area(&points) >= 0.0 { 1.0 } else { -1.0 };
    let count = points.len();

    let mut expanded = Vec::with_capacity(count + 4);
    for index in 0..count {
        let previous = points[(index + count - 1) % count];
        let current = points[index];
        let next = points[(index + 1) % count];

        let incoming = outward_normal(previous, current, orientation);
        let outgoing = outward_normal(current, next, orientation);
        let denominator = 1.0 + incoming.dot(outgoing);
        if denominator <= 1.0e-4 {
            let tangent = (current - previous).normalized();
            if padding > 0.0 {
                expanded.push(current + incoming * padding);
                expanded.push(current + tangent * padding);
                expanded.push(current + outgoing * padding);
            } else {
                expanded.push(current + tangent * padding);
            }
            continue;
        }

        let mut miter = (incoming + outgoing) / denominator;
        let miter_length = miter.length();
        if miter_length > MITER_LIMIT {
            miter *= MITER_LIMIT / miter_length;
        }
        expanded.push(current + miter * padding);
    }
    expanded
}

/// One corner-cutting pass: each edge contributes two points at
/// `factor / 4` from either end, so the ring doubles in size.
pub fn smooth_hull(hull: &[Pos2], factor: f32) -> Vec<Pos2> {
    let points = finite_points(hull);
    let factor = if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    };
    if points.len() < 3 || factor <= 0.0 {
        return points;
    }

    let cut = factor * 0.25;
    let mut smoothed = Vec::with_capacity(points.len() * 2);
    for (index, &current) in points.iter().enumerate() {
        let next = points[(index + 1) % points.len()];
        let edge = next - current;
        smoothed.push(current + edge * cut);
        smoothed.push(current + edge * (1.0 - cut));
    }
    smoothed
}

pub fn calculate_centroid(points: &[Pos2]) -> Option<Pos2> {
    let points = finite_points(points);
    if points.is_empty() {
        return None;
    }

    let sum = points
        .iter()
        .fold(Vec2::ZERO, |sum, point| sum + point.to_vec2());
    Some((sum / points.len() as f32).to_pos2())
}

pub fn create_circular_hull(center: Pos2, radius: f32, point_count: usize) -> Vec<Pos2> {
    if !is_finite_point(center) || !radius.is_finite() || point_count == 0 {
        return Vec::new();
    }

    let count = point_count.max(3);
    let radius = radius.abs();
    (0..count)
        .map(|index| {
            let angle = (index as f32 / count as f32) * TAU;
            pos2(
                center.x + angle.cos() * radius,
                center.y + angle.sin() * radius,
            )
        })
        .collect()
}

/// Even-odd containment test. Points on the boundary may land either side.
pub fn polygon_contains(polygon: &[Pos2], point: Pos2) -> bool {
    if polygon.len() < 3 || !is_finite_point(point) {
        return false;
    }

    let mut inside = false;
    let mut previous = polygon[polygon.len() - 1];
    for &current in polygon {
        let crosses = (current.y > point.y) != (previous.y > point.y);
        if crosses {
            let intersect_x = current.x
                + (point.y - current.y) * (previous.x - current.x) / (previous.y - current.y);
            if point.x < intersect_x {
                inside = !inside;
            }
        }
        previous = current;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Pos2> {
        vec![
            pos2(0.0, 0.0),
            pos2(100.0, 0.0),
            pos2(100.0, 100.0),
            pos2(0.0, 100.0),
        ]
    }

    fn contains_or_touches(polygon: &[Pos2], point: Pos2) -> bool {
        if polygon.contains(&point) {
            return true;
        }
        let orientation = signed_area(polygon).signum();
        (0..polygon.len()).all(|index| {
            let next = polygon[(index + 1) % polygon.len()];
            cross(polygon[index], next, point) * orientation >= -1.0e-3
        })
    }

    #[test]
    fn test_convex_hull_encloses_all_points() {
        let points = vec![
            pos2(0.0, 0.0),
            pos2(10.0, 0.0),
            pos2(10.0, 10.0),
            pos2(0.0, 10.0),
            pos2(5.0, 5.0),
            pos2(2.0, 7.0),
            pos2(9.0, 1.0),
        ];

        let hull = convex_hull(&points);

        assert_eq!(hull.len(), 4);
        assert!(hull.iter().all(|vertex| points.contains(vertex)));
        assert!(points.iter().all(|point| contains_or_touches(&hull, *point)));
        assert!(signed_area(&hull) > 0.0);
    }

    #[test]
    fn test_convex_hull_degenerate_inputs() {
        assert!(convex_hull(&[]).is_empty());

        let pair = vec![pos2(1.0, 1.0), pos2(4.0, 2.0)];
        assert_eq!(convex_hull(&pair), pair);

        let duplicates = vec![pos2(1.0, 1.0), pos2(1.0, 1.0), pos2(3.0, 3.0)];
        assert_eq!(convex_hull(&duplicates), duplicates);

        let collinear = vec![pos2(0.0, 0.0), pos2(1.0, 1.0), pos2(2.0, 2.0)];
        assert_eq!(convex_hull(&collinear).len(), 2);
    }

    #[test]
    fn test_convex_hull_drops_non_finite_points() {
        let points = vec![
            pos2(0.0, 0.0),
            pos2(f32::NAN, 3.0),
            pos2(4.0, 0.0),
            pos2(0.0, f32::INFINITY),
            pos2(0.0, 4.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 3);
        assert!(hull.iter().all(|point| is_finite_point(*point)));
    }

    #[test]
    fn test_expand_hull_grows_and_shrinks_area() {
        let hull = convex_hull(&square());
        let base = polygon_area(&hull);

        let grown = expand_hull(&hull, 10.0);
        let shrunk = expand_hull(&hull, -10.0);

        assert_eq!(grown.len(), hull.len());
        assert!((polygon_area(&grown) - 120.0 * 120.0).abs() < 1.0);
        assert!(polygon_area(&shrunk) < base);
        assert!((polygon_area(&shrunk) - 80.0 * 80.0).abs() < 1.0);
        assert!(signed_area(&shrunk) > 0.0);
        assert!(hull.iter().all(|point| contains_or_touches(&grown, *point)));
    }

    #[test]
    fn test_expand_hull_handles_clockwise_rings() {
        let mut clockwise = square();
        clockwise.reverse();
        let grown = expand_hull(&clockwise, 5.0);
        assert!(polygon_area(&grown) > polygon_area(&clockwise));
    }

    #[test]
    fn test_expand_hull_miter_is_limited_on_sharp_corners() {
        let needle = vec![pos2(0.0, 0.0), pos2(200.0, 1.0), pos2(0.0, 2.0)];
        let grown = expand_hull(&needle, 10.0);
        for offset in &grown {
            let nearest = needle
                .iter()
                .map(|original| original.distance(*offset))
                .fold(f32::INFINITY, f32::min);
            assert!(nearest <= 10.0 * MITER_LIMIT + 1.0e-3);
        }
        assert!(polygon_area(&grown) >= polygon_area(&needle));
        assert!(needle.iter().all(|point| polygon_contains(&grown, *point)));
    }

    #[test]
    fn test_expand_hull_keeps_needle_tips_inside() {
        let hull = convex_hull(&[pos2(0.0, 0.0), pos2(200.0, 1.0), pos2(0.0, 2.0)]);
        for padding in [1.0, 10.0, 30.0, 45.0] {
            let grown = expand_hull(&hull, padding);
            assert_eq!(grown.len(), hull.len() + 2);
            for vertex in &hull {
                assert!(
                    polygon_contains(&grown, *vertex),
                    "{vertex:?} outside ring padded by {padding}"
                );
            }
        }

        let wedge = convex_hull(&[pos2(200.0, 1.0), pos2(400.0, 2.0), pos2(600.0, 4.0)]);
        let grown = expand_hull(&wedge, 30.0);
        for vertex in &wedge {
            let clearance = (0..grown.len())
                .map(|index| {
                    let from = grown[index];
                    let to = grown[(index + 1) % grown.len()];
                    cross(from, to, *vertex).abs() / from.distance(to)
                })
                .fold(f32::INFINITY, f32::min);
            assert!(polygon_contains(&grown, *vertex));
            assert!(clearance > 15.0, "{vertex:?} only {clearance} from the edge");
        }
    }

    #[test]
    fn test_smooth_hull_doubles_points_and_stays_inside() {
        let hull = convex_hull(&square());
        let smoothed = smooth_hull(&hull, 1.0);

        assert_eq!(smoothed.len(), hull.len() * 2);
        assert!(polygon_area(&smoothed) <= polygon_area(&hull));
        assert!(smoothed.iter().all(|point| contains_or_touches(&hull, *point)));
        assert_eq!(smooth_hull(&hull, 0.0), hull);
    }

    #[test]
    fn test_smoothing_padded_hull_keeps_original_vertices() {
        let points = vec![
            pos2(0.0, 0.0),
            pos2(60.0, 10.0),
            pos2(80.0, 70.0),
            pos2(20.0, 90.0),
        ];
        let hull = convex_hull(&points);
        let padding = 20.0;
        let outline = smooth_hull(&expand_hull(&hull, padding), 0.6);

        assert!(points.iter().all(|point| polygon_contains(&outline, *point)));
    }

    #[test]
    fn test_centroid_and_circle() {
        assert_eq!(calculate_centroid(&[]), None);
        let centroid = calculate_centroid(&[pos2(0.0, 0.0), pos2(10.0, 0.0), pos2(f32::NAN, 1.0)]);
        assert_eq!(centroid, Some(pos2(5.0, 0.0)));

        let circle = create_circular_hull(pos2(5.0, 5.0), 10.0, 16);
        assert_eq!(circle.len(), 16);
        assert!(
            circle
                .iter()
                .all(|point| (point.distance(pos2(5.0, 5.0)) - 10.0).abs() < 1.0e-3)
        );
        assert!(create_circular_hull(pos2(f32::NAN, 0.0), 10.0, 16).is_empty());
    }

    #[test]
    fn test_polygon_contains() {
        let ring = square();
        assert!(polygon_contains(&ring, pos2(50.0, 50.0)));
        assert!(!polygon_contains(&ring, pos2(150.0, 50.0)));
        assert!(!polygon_contains(&ring[..2], pos2(50.0, 0.0)));
    }
}
