use std::time::Duration;

use eframe::egui::{Vec2, vec2};

use crate::config::Settings;

use super::model::GraphNode;
use super::simulation::separation_direction;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepulsionParams {
    pub force: f32,
    pub min_distance: f32,
    pub damping: f32,
    pub max_duration: Duration,
    pub max_iterations: u32,
    pub threshold: f32,
}

impl RepulsionParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            force: settings.drag_repulsion_force.max(0.0),
            min_distance: settings.drag_repulsion_min_distance.max(0.0),
            damping: settings.drag_repulsion_damping.clamp(0.0, 1.0),
            max_duration: Duration::from_millis(settings.drag_repulsion_max_ms),
            max_iterations: settings.drag_repulsion_max_iterations,
            threshold: settings.drag_repulsion_threshold.max(0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Deadline,
    IterationCeiling,
    Settled,
    Empty,
}

/// Short-range separation pass run while a node is dragged. Each `step` is
/// one frame; the owner keeps calling it until it reports a stop reason.
#[derive(Debug)]
pub struct RepulsionOverlay {
    params: RepulsionParams,
    started_at: Option<Duration>,
    iterations: u32,
    velocities: Vec<Vec2>,
}

impl RepulsionOverlay {
    pub fn new(params: RepulsionParams) -> Self {
        Self {
            params,
            started_at: None,
            iterations: 0,
            velocities: Vec::new(),
        }
    }

    pub fn params(&self) -> RepulsionParams {
        self.params
    }

    pub fn set_params(&mut self, params: RepulsionParams) {
        self.params = params;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Starting always discards any run already in progress.
    pub fn start(&mut self, now: Duration) {
        self.reset();
        self.started_at = Some(now);
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.iterations = 0;
        self.velocities.clear();
    }

    pub fn step(&mut self, nodes: &mut [GraphNode], now: Duration) -> Option<StopReason> {
        let Some(started_at) = self.started_at else {
            return Some(StopReason::Empty);
        };

        let elapsed = now.saturating_sub(started_at);
        if elapsed >= self.params.max_duration {
            return Some(self.stop(StopReason::Deadline, elapsed));
        }
        if self.iterations >= self.params.max_iterations {
            return Some(self.stop(StopReason::IterationCeiling, elapsed));
        }
        if nodes.len() < 2 {
            return Some(self.stop(StopReason::Empty, elapsed));
        }

        self.iterations += 1;
        self.velocities.resize(nodes.len(), Vec2::ZERO);

        let min_distance = self.params.min_distance;
        for from in 0..nodes.len() {
            for to in (from + 1)..nodes.len() {
                let delta = vec2(nodes[from].x - nodes[to].x, nodes[from].y - nodes[to].y);
                let distance = delta.length();
                if distance >= min_distance || !distance.is_finite() {
                    continue;
                }

                let direction = if distance > 1.0e-4 {
                    delta / distance
                } else {
                    separation_direction(from, to)
                };
                let push = direction * ((min_distance - distance) / min_distance.max(1.0)) * self.params.force;
                self.velocities[from] += push;
                self.velocities[to] -= push;
            }
        }

        let mut largest_step = 0.0_f32;
        for (node, velocity) in nodes.iter_mut().zip(self.velocities.iter_mut()) {
            *velocity *= self.params.damping;
            if node.is_pinned() || !node.has_finite_position() {
                *velocity = Vec2::ZERO;
                continue;
            }

            node.x += velocity.x;
            node.y += velocity.y;
            largest_step = largest_step.max(velocity.length());
        }

        if largest_step <= self.params.threshold {
            return Some(self.stop(StopReason::Settled, elapsed));
        }
        None
    }

    fn stop(&mut self, reason: StopReason, elapsed: Duration) -> StopReason {
        tracing::debug!(
            ?reason,
            iterations = self.iterations,
            elapsed_ms = elapsed.as_millis() as u64,
            "drag repulsion stopped"
        );
        self.reset();
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::NodeRecord;

    fn crowd(count: u64) -> Vec<GraphNode> {
        let settings = Settings::default();
        (0..count)
            .map(|id| {
                let mut node = GraphNode::from_record(&NodeRecord::new(id, "n"), &[], &settings);
                node.x = (id % 5) as f32 * 2.0;
                node.y = (id / 5) as f32 * 2.0;
                node
            })
            .collect()
    }

    fn params() -> RepulsionParams {
        RepulsionParams::from_settings(&Settings::default())
    }

    #[test]
    fn test_halts_at_iteration_ceiling() {
        let mut params = params();
        params.max_iterations = 5;
        params.threshold = 0.0;
        params.max_duration = Duration::from_secs(60);
        let mut overlay = RepulsionOverlay::new(params);
        let mut nodes = crowd(200);

        overlay.start(Duration::ZERO);
        let mut frames = 0;
        let reason = loop {
            if let Some(reason) = overlay.step(&mut nodes, Duration::from_millis(frames)) {
                break reason;
            }
            frames += 1;
        };

        assert_eq!(reason, StopReason::IterationCeiling);
        assert_eq!(frames, 5);
        assert!(!overlay.is_running());
        assert_eq!(overlay.iterations(), 0);
    }

    #[test]
    fn test_halts_at_deadline() {
        let mut params = params();
        params.max_iterations = u32::MAX;
        params.threshold = 0.0;
        params.max_duration = Duration::from_millis(100);
        let mut overlay = RepulsionOverlay::new(params);
        let mut nodes = crowd(50);

        overlay.start(Duration::from_millis(1_000));
        assert_eq!(overlay.step(&mut nodes, Duration::from_millis(1_016)), None);
        assert_eq!(
            overlay.step(&mut nodes, Duration::from_millis(1_100)),
            Some(StopReason::Deadline)
        );
    }

    #[test]
    fn test_settles_when_nodes_are_apart() {
        let mut overlay = RepulsionOverlay::new(params());
        let mut nodes = crowd(3);
        for (index, node) in nodes.iter_mut().enumerate() {
            node.x = index as f32 * 500.0;
        }

        overlay.start(Duration::ZERO);
        assert_eq!(overlay.step(&mut nodes, Duration::ZERO), Some(StopReason::Settled));
    }

    #[test]
    fn test_pushes_neighbors_but_not_pinned_node() {
        let mut overlay = RepulsionOverlay::new(params());
        let mut nodes = crowd(2);
        nodes[0].fx = Some(nodes[0].x);
        nodes[0].fy = Some(nodes[0].y);
        let pinned = nodes[0].position();
        let before = nodes[1].position().distance(pinned);

        overlay.start(Duration::ZERO);
        overlay.step(&mut nodes, Duration::from_millis(16));

        assert_eq!(nodes[0].position(), pinned);
        assert!(nodes[1].position().distance(pinned) > before);
    }

    #[test]
    fn test_restart_clears_counters() {
        let mut overlay = RepulsionOverlay::new(params());
        let mut nodes = crowd(10);
        overlay.start(Duration::ZERO);
        overlay.step(&mut nodes, Duration::from_millis(16));
        assert_eq!(overlay.iterations(), 1);

        overlay.start(Duration::from_millis(20));
        assert_eq!(overlay.iterations(), 0);
        assert!(overlay.is_running());
    }

    #[test]
    fn test_step_without_start_is_a_no_op() {
        let mut overlay = RepulsionOverlay::new(params());
        let mut nodes = crowd(4);
        let before = nodes.iter().map(GraphNode::position).collect::<Vec<_>>();
        assert_eq!(overlay.step(&mut nodes, Duration::ZERO), Some(StopReason::Empty));
        assert_eq!(nodes.iter().map(GraphNode::position).collect::<Vec<_>>(), before);
    }
}
