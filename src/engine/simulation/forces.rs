use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

const COINCIDENT_EPSILON: f32 = 1.0e-4;

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    /// Already multiplied by alpha.
    pub(super) strength: f32,
    pub(super) distance_max_sq: f32,
    pub(super) softening: f32,
    pub(super) theta: f32,
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) padding: f32,
    pub(super) max_reach_sq: f32,
}

/// Fixed fallback direction for points sitting on top of each other.
pub(in crate::engine) fn separation_direction(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * TAU;
    vec2(angle.cos(), angle.sin())
}

/// Magnitude falls off as `strength / distance`.
fn repulsion_between(point: Vec2, other: Vec2, mass: f32, params: ChargeParams) -> Vec2 {
    let delta = point - other;
    let distance_sq = delta.length_sq();
    if distance_sq > params.distance_max_sq {
        return Vec2::ZERO;
    }
    delta * (params.strength * mass / (distance_sq + params.softening))
}

pub(super) fn accumulate_repulsion_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];
    if node.bounds.distance_sq_to_point(point) > params.distance_max_sq {
        return;
    }

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }

            let delta = point - positions[other];
            if delta.length_sq() < COINCIDENT_EPSILON {
                *velocity += separation_direction(index, other) * params.strength.abs().sqrt();
                continue;
            }
            *velocity += repulsion_between(point, positions[other], 1.0, params);
        }
        return;
    }

    let distance = (point - node.center_of_mass).length().max(COINCIDENT_EPSILON);
    let can_approximate = !node.bounds.contains(point)
        && (node.bounds.side_length() / distance) < params.theta
        && node.mass > 1.0;

    if can_approximate {
        *velocity += repulsion_between(point, node.center_of_mass, node.mass, params);
        return;
    }

    for child in node.children() {
        accumulate_repulsion_for_node(child, index, positions, params, velocity);
    }
}

fn collide_pair(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    let delta = positions[from] - positions[to];
    let distance = delta.length();
    let min_distance = radii[from] + radii[to] + params.padding;
    if distance >= min_distance {
        return;
    }

    let direction = if distance > COINCIDENT_EPSILON {
        delta / distance
    } else {
        separation_direction(from, to)
    };
    let push = direction * ((min_distance - distance) * params.strength * 0.5);
    velocities[from] += push;
    velocities[to] -= push;
}

/// Walks pairs of quadtree cells, skipping any pair whose bounds are too far
/// apart for their members to touch.
pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.max_reach_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    collide_pair(from, to, positions, radii, params, velocities);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    collide_pair(from, to, positions, radii, params, velocities);
                }
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children().collect::<Vec<_>>();
        for (offset, child_a) in children.iter().enumerate() {
            accumulate_collision_pairs(child_a, child_a, true, positions, radii, params, velocities);
            for child_b in &children[offset + 1..] {
                accumulate_collision_pairs(
                    child_a, child_b, false, positions, radii, params, velocities,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children() {
            accumulate_collision_pairs(child, node_b, false, positions, radii, params, velocities);
        }
    } else {
        for child in node_b.children() {
            accumulate_collision_pairs(node_a, child, false, positions, radii, params, velocities);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charge() -> ChargeParams {
        ChargeParams {
            strength: 30.0,
            distance_max_sq: 100.0 * 100.0,
            softening: 1.0,
            theta: 0.9,
        }
    }

    #[test]
    fn test_repulsion_pushes_apart_within_range_only() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(500.0, 0.0)];
        let tree = QuadNode::build(&positions).unwrap();

        let mut velocity = Vec2::ZERO;
        accumulate_repulsion_for_node(&tree, 0, &positions, charge(), &mut velocity);
        assert!(velocity.x < 0.0);

        let mut far = Vec2::ZERO;
        let isolated = vec![vec2(0.0, 0.0), vec2(500.0, 0.0)];
        let tree = QuadNode::build(&isolated).unwrap();
        accumulate_repulsion_for_node(&tree, 0, &isolated, charge(), &mut far);
        assert_eq!(far, Vec2::ZERO);
    }

    #[test]
    fn test_collision_matches_brute_force() {
        let positions = (0..60)
            .map(|index| vec2((index % 10) as f32 * 7.0, (index / 10) as f32 * 7.0))
            .collect::<Vec<_>>();
        let radii = vec![4.0; positions.len()];
        let params = CollisionParams {
            strength: 0.5,
            padding: 2.0,
            max_reach_sq: (4.0 + 4.0 + 2.0) * (4.0 + 4.0 + 2.0),
        };

        let tree = QuadNode::build(&positions).unwrap();
        let mut pruned = vec![Vec2::ZERO; positions.len()];
        accumulate_collision_pairs(&tree, &tree, true, &positions, &radii, params, &mut pruned);

        let mut brute = vec![Vec2::ZERO; positions.len()];
        for from in 0..positions.len() {
            for to in (from + 1)..positions.len() {
                collide_pair(from, to, &positions, &radii, params, &mut brute);
            }
        }

        for (a, b) in pruned.iter().zip(&brute) {
            assert!((*a - *b).length() < 1.0e-3);
        }
        assert!(brute.iter().any(|velocity| velocity.length() > 0.0));
    }
}
