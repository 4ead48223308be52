use std::f32::consts::PI;

use eframe::egui::{Pos2, vec2};

use crate::content::NodeId;
use crate::util::stable_pair;

use super::model::GraphNode;

const GOLDEN_ANGLE: f32 = PI * (3.0 - 2.236_068);
const JITTER: f32 = 0.35;

/// Spiral seat for the `index`-th new node, nudged by a per-id jitter so
/// rebuilding the same dataset lands nodes in the same places.
pub fn phyllotaxis_position(index: usize, id: NodeId, center: Pos2, spacing: f32) -> Pos2 {
    let ring = ((index as f32) + 0.5).sqrt() * spacing;
    let angle = (index as f32) * GOLDEN_ANGLE;
    let (jx, jy) = stable_pair(id);
    let jitter = vec2(jx, jy) * spacing * JITTER;
    center + vec2(angle.cos(), angle.sin()) * ring + jitter
}

/// Seats nodes the caller could not place from a prior layout or a saved position.
pub fn place_unseated(nodes: &mut [GraphNode], seated: &[bool], center: Pos2, spacing: f32) {
    let mut slot = 0;
    for (node, &already) in nodes.iter_mut().zip(seated) {
        if already && node.has_finite_position() {
            continue;
        }

        let position = phyllotaxis_position(slot, node.id, center, spacing);
        node.x = position.x;
        node.y = position.y;
        node.vx = 0.0;
        node.vy = 0.0;
        slot += 1;
    }
}

pub fn layout_spacing(node_size: f32, collision_padding: f32) -> f32 {
    ((node_size * 2.0) + collision_padding).max(4.0) * 1.6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::content::NodeRecord;
    use eframe::egui::pos2;

    #[test]
    fn test_phyllotaxis_is_deterministic_and_spread() {
        let center = pos2(400.0, 300.0);
        let first = phyllotaxis_position(0, 10, center, 20.0);
        assert_eq!(first, phyllotaxis_position(0, 10, center, 20.0));

        let positions = (0..40)
            .map(|index| phyllotaxis_position(index, index as u64, center, 20.0))
            .collect::<Vec<_>>();
        for (index, a) in positions.iter().enumerate() {
            for b in &positions[index + 1..] {
                assert!(a.distance(*b) > 1.0);
            }
        }
    }

    #[test]
    fn test_place_unseated_keeps_seated_nodes() {
        let settings = Settings::default();
        let mut nodes = vec![
            GraphNode::from_record(&NodeRecord::new(1, "a"), &[], &settings),
            GraphNode::from_record(&NodeRecord::new(2, "b"), &[], &settings),
        ];
        nodes[0].x = 5.0;
        nodes[0].y = 6.0;

        place_unseated(&mut nodes, &[true, false], pos2(100.0, 100.0), 20.0);

        assert_eq!(nodes[0].position(), pos2(5.0, 6.0));
        assert!(nodes[1].position().distance(pos2(100.0, 100.0)) < 40.0);
    }
}
