mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::{Pos2, Vec2, pos2, vec2};

use crate::config::Settings;
use crate::content::NodeId;
use crate::util::stable_pair;

use super::links::{Link, MAX_SCORE};
use super::model::GraphNode;
use forces::{ChargeParams, CollisionParams, accumulate_collision_pairs, accumulate_repulsion_for_node};
use quadtree::QuadNode;

pub(in crate::engine) use forces::separation_direction;

const BARNES_HUT_THETA: f32 = 0.9;
const CHARGE_SOFTENING: f32 = 1.0;
const MAX_LINK_DISTANCE_FACTOR: f32 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationParams {
    pub charge_strength: f32,
    pub charge_distance_max: f32,
    pub center_strength: f32,
    pub collision_padding: f32,
    pub collision_strength: f32,
    pub cluster_strength: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub show_links: bool,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub velocity_decay: f32,
}

impl SimulationParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            charge_strength: settings.charge_strength,
            charge_distance_max: settings.charge_distance_max.max(0.0),
            center_strength: settings.center_strength,
            collision_padding: settings.collision_padding.max(0.0),
            collision_strength: settings.collision_strength.clamp(0.0, 1.0),
            cluster_strength: settings.cluster_strength.clamp(0.0, 1.0),
            link_distance: settings.link_distance.max(1.0),
            link_strength: settings.link_strength.max(0.0),
            show_links: settings.show_links,
            alpha_decay: settings.alpha_decay.clamp(0.0, 1.0),
            alpha_min: settings.alpha_min.max(0.0),
            velocity_decay: settings.velocity_decay.clamp(0.0, 1.0),
        }
    }
}

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    radii: Vec<f32>,
    velocities: Vec<Vec2>,
}

/// Discrete-time layout solver. It never stops on its own: once alpha
/// falls below `alpha_min` it idles until reheated.
pub struct Simulation {
    nodes: Vec<GraphNode>,
    links: Vec<Link>,
    degree: Vec<usize>,
    index_by_id: HashMap<NodeId, usize>,
    params: SimulationParams,
    center: Pos2,
    alpha: f32,
    alpha_target: f32,
    ticks: u64,
    scratch: Scratch,
}

impl Simulation {
    pub fn new(nodes: Vec<GraphNode>, links: Vec<Link>, params: SimulationParams, center: Pos2) -> Self {
        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id, index))
            .collect();

        let mut degree = vec![0; nodes.len()];
        let links = links
            .into_iter()
            .filter(|link| {
                link.source < nodes.len() && link.target < nodes.len() && link.source != link.target
            })
            .inspect(|link| {
                degree[link.source] += 1;
                degree[link.target] += 1;
            })
            .collect();

        Self {
            nodes,
            links,
            degree,
            index_by_id,
            params,
            center,
            alpha: 1.0,
            alpha_target: 0.0,
            ticks: 0,
            scratch: Scratch::default(),
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [GraphNode] {
        &mut self.nodes
    }

    pub fn into_nodes(self) -> Vec<GraphNode> {
        self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.index_by_id.get(&id).copied()
    }

    pub fn params(&self) -> SimulationParams {
        self.params
    }

    pub fn center(&self) -> Pos2 {
        self.center
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_idle(&self) -> bool {
        self.alpha < self.params.alpha_min && self.alpha_target < self.params.alpha_min
    }

    pub fn reheat(&mut self, alpha: f32, alpha_target: f32) {
        self.alpha = self.alpha.max(alpha.clamp(0.0, 1.0));
        self.alpha_target = alpha_target.clamp(0.0, 1.0);
    }

    pub fn cool(&mut self) {
        self.alpha_target = 0.0;
    }

    pub fn set_center(&mut self, center: Pos2) {
        if center.x.is_finite() && center.y.is_finite() {
            self.center = center;
        }
    }

    /// Pins a node where it currently is.
    pub fn pin(&mut self, id: NodeId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let node = &mut self.nodes[index];
        node.fx = Some(node.x);
        node.fy = Some(node.y);
        true
    }

    pub fn set_pin(&mut self, id: NodeId, position: Pos2) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if !position.x.is_finite() || !position.y.is_finite() {
            return false;
        }

        let node = &mut self.nodes[index];
        node.fx = Some(position.x);
        node.fy = Some(position.y);
        node.x = position.x;
        node.y = position.y;
        node.vx = 0.0;
        node.vy = 0.0;
        true
    }

    pub fn unpin(&mut self, id: NodeId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let node = &mut self.nodes[index];
        let was_pinned = node.is_pinned();
        node.fx = None;
        node.fy = None;
        was_pinned
    }

    /// Advances one step. Returns `false` once the layout has gone idle.
    pub fn tick(&mut self) -> bool {
        if self.is_idle() {
            return false;
        }

        self.repair_positions();
        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
        self.ticks += 1;

        let node_count = self.nodes.len();
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.radii.clear();
        scratch.velocities.clear();
        let mut max_radius = 0.0_f32;
        for node in &self.nodes {
            scratch.positions.push(vec2(node.x, node.y));
            scratch.radii.push(node.radius);
            scratch.velocities.push(vec2(node.vx, node.vy));
            max_radius = max_radius.max(node.radius);
        }

        if node_count > 1 {
            self.apply_links();
            self.apply_quadtree_forces(max_radius);
        }
        self.apply_centering();
        self.integrate();

        if self.is_idle() {
            tracing::debug!(ticks = self.ticks, alpha = self.alpha, "simulation idle");
            return false;
        }
        true
    }

    fn repair_positions(&mut self) {
        for node in &mut self.nodes {
            if node.has_finite_position() && node.vx.is_finite() && node.vy.is_finite() {
                continue;
            }

            tracing::warn!(id = node.id, "non-finite node position; re-seeding near center");
            let (jx, jy) = stable_pair(node.id);
            node.x = self.center.x + jx * node.radius * 4.0;
            node.y = self.center.y + jy * node.radius * 4.0;
            node.vx = 0.0;
            node.vy = 0.0;
            if node.fx.is_some_and(|fx| !fx.is_finite()) || node.fy.is_some_and(|fy| !fy.is_finite()) {
                node.fx = None;
                node.fy = None;
            }
        }
    }

    fn apply_links(&mut self) {
        if !self.params.show_links {
            return;
        }

        let alpha = self.alpha;
        let scratch = &mut self.scratch;
        for link in &self.links {
            let (source, target) = (link.source, link.target);
            let score = link.score.clamp(1.0, MAX_SCORE);
            let distance = (self.params.link_distance * MAX_SCORE / score)
                .min(self.params.link_distance * MAX_LINK_DISTANCE_FACTOR);
            let strength = self.params.link_strength * score / MAX_SCORE;

            let mut delta = (scratch.positions[target] + scratch.velocities[target])
                - (scratch.positions[source] + scratch.velocities[source]);
            let mut length = delta.length();
            if length <= f32::EPSILON {
                let (jx, jy) = stable_pair(link.id.low ^ link.id.high);
                delta = vec2(jx, jy) * 1.0e-3;
                length = delta.length().max(f32::EPSILON);
            }

            let pull = delta * ((length - distance) / length * alpha * strength);
            let source_degree = self.degree[source] as f32;
            let target_degree = self.degree[target] as f32;
            let bias = source_degree / (source_degree + target_degree);

            scratch.velocities[target] -= pull * bias;
            scratch.velocities[source] += pull * (1.0 - bias);
        }
    }

    fn apply_quadtree_forces(&mut self, max_radius: f32) {
        let scratch = &mut self.scratch;
        let Some(tree) = QuadNode::build(&scratch.positions) else {
            return;
        };

        let charge = ChargeParams {
            strength: self.params.charge_strength * self.alpha,
            distance_max_sq: self.params.charge_distance_max * self.params.charge_distance_max,
            softening: CHARGE_SOFTENING,
            theta: BARNES_HUT_THETA,
        };
        if charge.strength != 0.0 && charge.distance_max_sq > 0.0 {
            for (index, velocity) in scratch.velocities.iter_mut().enumerate() {
                accumulate_repulsion_for_node(&tree, index, &scratch.positions, charge, velocity);
            }
        }

        let collision = CollisionParams {
            strength: self.params.collision_strength * self.params.cluster_strength,
            padding: self.params.collision_padding,
            max_reach_sq: ((max_radius * 2.0) + self.params.collision_padding).powi(2),
        };
        if collision.strength > 0.0 {
            accumulate_collision_pairs(
                &tree,
                &tree,
                true,
                &scratch.positions,
                &scratch.radii,
                collision,
                &mut scratch.velocities,
            );
        }
    }

    fn apply_centering(&mut self) {
        let pull = self.params.center_strength * self.alpha;
        if pull == 0.0 {
            return;
        }

        let center = self.center.to_vec2();
        let scratch = &mut self.scratch;
        for (position, velocity) in scratch.positions.iter().zip(scratch.velocities.iter_mut()) {
            *velocity += (center - *position) * pull;
        }
    }

    fn integrate(&mut self) {
        let retain = 1.0 - self.params.velocity_decay;
        for (node, velocity) in self.nodes.iter_mut().zip(&self.scratch.velocities) {
            if let (Some(fx), Some(fy)) = (node.fx, node.fy) {
                node.x = fx;
                node.y = fy;
                node.vx = 0.0;
                node.vy = 0.0;
                continue;
            }

            let velocity = *velocity * retain;
            if !velocity.x.is_finite() || !velocity.y.is_finite() {
                node.vx = 0.0;
                node.vy = 0.0;
                continue;
            }
            node.vx = velocity.x;
            node.vy = velocity.y;
            node.x += velocity.x;
            node.y += velocity.y;
        }
    }

    pub fn centroid(&self) -> Option<Pos2> {
        if self.nodes.is_empty() {
            return None;
        }
        let sum = self
            .nodes
            .iter()
            .fold(Vec2::ZERO, |sum, node| sum + vec2(node.x, node.y));
        let mean = sum / self.nodes.len() as f32;
        Some(pos2(mean.x, mean.y))
    }
}
