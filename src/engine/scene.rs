use std::collections::HashMap;
use std::time::Duration;

use eframe::egui::{Color32, Pos2};

use crate::content::{NodeId, PriorityLevel};

use super::geometry::polygon_contains;
use super::interaction::Emphasis;
use super::islands::{Island, IslandKey};
use super::links::{Link, LinkId, LinkKind};
use super::model::GraphNode;
use super::reconcile::{Diff, Lifecycle, reconcile};
use super::scheduler::{Scheduler, TickHandle};

const SCALE_EASING_PER_SECOND: f32 = 12.0;

#[derive(Clone, Debug)]
pub struct NodeElement {
    pub position: Pos2,
    pub radius: f32,
    pub color: Color32,
    pub title: String,
    pub priority: PriorityLevel,
    pub scale: f32,
    pub target_scale: f32,
    pub emphasis: Emphasis,
    pub opacity: f32,
    pub pinned: bool,
    /// Pending pulse timer while the node is selected.
    pub animation: Option<TickHandle>,
    pub pulse_phase: f32,
}

impl NodeElement {
    pub fn display_radius(&self) -> f32 {
        self.radius * self.scale
    }
}

#[derive(Clone, Debug)]
pub struct LinkElement {
    pub source: NodeId,
    pub target: NodeId,
    pub from: Pos2,
    pub to: Pos2,
    pub score: f32,
    pub kind: LinkKind,
    pub opacity: f32,
}

#[derive(Clone, Debug)]
pub struct IslandElement {
    pub island: Island,
    pub opacity: f32,
}

/// What is left of an exited node while it fades out. Holds no timers.
#[derive(Clone, Debug)]
pub struct Ghost {
    pub id: NodeId,
    pub position: Pos2,
    pub radius: f32,
    pub color: Color32,
    pub opacity: f32,
}

struct NodeLifecycle<'a> {
    scheduler: &'a mut dyn Scheduler,
    ghosts: &'a mut Vec<Ghost>,
    animate: bool,
}

impl<'n> Lifecycle<NodeId, &'n GraphNode> for NodeLifecycle<'_> {
    type Element = NodeElement;

    fn enter(&mut self, _key: &NodeId, node: &&'n GraphNode) -> NodeElement {
        NodeElement {
            position: node.position(),
            radius: node.radius,
            color: node.color,
            title: node.title.clone(),
            priority: node.priority,
            scale: 1.0,
            target_scale: 1.0,
            emphasis: Emphasis::None,
            opacity: if self.animate { 0.0 } else { 1.0 },
            pinned: node.is_pinned(),
            animation: None,
            pulse_phase: 0.0,
        }
    }

    fn update(&mut self, _key: &NodeId, element: &mut NodeElement, node: &&'n GraphNode) {
        element.position = node.position();
        element.radius = node.radius;
        element.color = node.color;
        element.pinned = node.is_pinned();
        element.priority = node.priority;
        if element.title != node.title {
            element.title = node.title.clone();
        }
    }

    fn exit(&mut self, key: &NodeId, element: NodeElement) {
        if let Some(handle) = element.animation {
            self.scheduler.cancel_tick(handle);
        }
        if self.animate && element.opacity > 0.0 {
            self.ghosts.push(Ghost {
                id: *key,
                position: element.position,
                radius: element.display_radius(),
                color: element.color,
                opacity: element.opacity,
            });
        }
    }
}

struct LinkLifecycle<'a> {
    positions: &'a HashMap<NodeId, Pos2>,
    nodes: &'a [GraphNode],
    animate: bool,
}

impl LinkLifecycle<'_> {
    fn endpoints(&self, link: &Link) -> (NodeId, NodeId, Pos2, Pos2) {
        let source = self.nodes[link.source].id;
        let target = self.nodes[link.target].id;
        let from = self.positions.get(&source).copied().unwrap_or_default();
        let to = self.positions.get(&target).copied().unwrap_or_default();
        (source, target, from, to)
    }
}

impl<'l> Lifecycle<LinkId, &'l Link> for LinkLifecycle<'_> {
    type Element = LinkElement;

    fn enter(&mut self, _key: &LinkId, link: &&'l Link) -> LinkElement {
        let (source, target, from, to) = self.endpoints(link);
        LinkElement {
            source,
            target,
            from,
            to,
            score: link.score,
            kind: link.kind,
            opacity: if self.animate { 0.0 } else { 1.0 },
        }
    }

    fn update(&mut self, _key: &LinkId, element: &mut LinkElement, link: &&'l Link) {
        let (source, target, from, to) = self.endpoints(link);
        element.source = source;
        element.target = target;
        element.from = from;
        element.to = to;
        element.score = link.score;
    }

    fn exit(&mut self, _key: &LinkId, _element: LinkElement) {}
}

struct IslandLifecycle {
    animate: bool,
}

impl<'i> Lifecycle<IslandKey, &'i Island> for IslandLifecycle {
    type Element = IslandElement;

    fn enter(&mut self, _key: &IslandKey, island: &&'i Island) -> IslandElement {
        IslandElement {
            island: (*island).clone(),
            opacity: if self.animate { 0.0 } else { 1.0 },
        }
    }

    fn update(&mut self, _key: &IslandKey, element: &mut IslandElement, island: &&'i Island) {
        element.island.clone_from(island);
    }

    fn exit(&mut self, _key: &IslandKey, _element: IslandElement) {}
}

/// Retained render state for nodes, links and islands.
#[derive(Default)]
pub struct Scene {
    nodes: HashMap<NodeId, NodeElement>,
    links: HashMap<LinkId, LinkElement>,
    islands: HashMap<IslandKey, IslandElement>,
    ghosts: Vec<Ghost>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &HashMap<NodeId, NodeElement> {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeElement> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeElement> {
        self.nodes.get_mut(&id)
    }

    pub fn links(&self) -> &HashMap<LinkId, LinkElement> {
        &self.links
    }

    pub fn islands(&self) -> &HashMap<IslandKey, IslandElement> {
        &self.islands
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    pub fn sync_nodes(
        &mut self,
        nodes: &[GraphNode],
        scheduler: &mut dyn Scheduler,
        animate: bool,
    ) -> Diff<NodeId> {
        let mut lifecycle = NodeLifecycle {
            scheduler,
            ghosts: &mut self.ghosts,
            animate,
        };
        reconcile(
            &mut self.nodes,
            nodes.iter().map(|node| (node.id, node)),
            &mut lifecycle,
        )
    }

    /// `links` index into `nodes`, which must already be synced.
    pub fn sync_links(&mut self, links: &[Link], nodes: &[GraphNode], animate: bool) -> Diff<LinkId> {
        let positions = nodes
            .iter()
            .map(|node| (node.id, node.position()))
            .collect::<HashMap<_, _>>();
        let mut lifecycle = LinkLifecycle {
            positions: &positions,
            nodes,
            animate,
        };
        reconcile(
            &mut self.links,
            links
                .iter()
                .filter(|link| link.source < nodes.len() && link.target < nodes.len())
                .map(|link| (link.id, link)),
            &mut lifecycle,
        )
    }

    pub fn sync_islands(&mut self, islands: &[Island], animate: bool) -> Diff<IslandKey> {
        let mut lifecycle = IslandLifecycle { animate };
        reconcile(
            &mut self.islands,
            islands.iter().map(|island| (island.key, island)),
            &mut lifecycle,
        )
    }

    /// Per-tick refresh of positions only; membership is left alone.
    pub fn sync_positions(&mut self, nodes: &[GraphNode]) {
        for node in nodes {
            if let Some(element) = self.nodes.get_mut(&node.id) {
                element.position = node.position();
                element.pinned = node.is_pinned();
            }
        }

        for link in self.links.values_mut() {
            if let Some(source) = self.nodes.get(&link.source) {
                link.from = source.position;
            }
            if let Some(target) = self.nodes.get(&link.target) {
                link.to = target.position;
            }
        }
    }

    /// Exits every element, cancelling any timers they hold.
    pub fn clear(&mut self, scheduler: &mut dyn Scheduler) {
        self.sync_nodes(&[], scheduler, false);
        self.links.clear();
        self.islands.clear();
        self.ghosts.clear();
    }

    /// Steps fades and scale easing. Returns whether anything is still moving.
    pub fn advance_transitions(&mut self, dt: Duration, fade: Duration) -> bool {
        let fade_step = if fade.is_zero() {
            1.0
        } else {
            dt.as_secs_f32() / fade.as_secs_f32()
        };
        let ease = (dt.as_secs_f32() * SCALE_EASING_PER_SECOND).min(1.0);
        let mut active = false;

        for element in self.nodes.values_mut() {
            if element.opacity < 1.0 {
                element.opacity = (element.opacity + fade_step).min(1.0);
                active |= element.opacity < 1.0;
            }
            if (element.scale - element.target_scale).abs() > 1.0e-3 {
                element.scale += (element.target_scale - element.scale) * ease;
                active = true;
            } else {
                element.scale = element.target_scale;
            }
        }

        for link in self.links.values_mut() {
            if link.opacity < 1.0 {
                link.opacity = (link.opacity + fade_step).min(1.0);
                active |= link.opacity < 1.0;
            }
        }

        for island in self.islands.values_mut() {
            if island.opacity < 1.0 {
                island.opacity = (island.opacity + fade_step).min(1.0);
                active |= island.opacity < 1.0;
            }
        }

        for ghost in &mut self.ghosts {
            ghost.opacity -= fade_step;
        }
        self.ghosts.retain(|ghost| ghost.opacity > 0.0);
        active | !self.ghosts.is_empty()
    }

    pub fn has_transitions(&self) -> bool {
        !self.ghosts.is_empty()
            || self
                .nodes
                .values()
                .any(|element| element.opacity < 1.0 || (element.scale - element.target_scale).abs() > 1.0e-3)
            || self.links.values().any(|link| link.opacity < 1.0)
            || self.islands.values().any(|island| island.opacity < 1.0)
    }

    /// Closest node whose drawn disc covers `world`.
    pub fn node_at(&self, world: Pos2) -> Option<NodeId> {
        self.nodes
            .iter()
            .filter_map(|(id, element)| {
                let distance = element.position.distance(world);
                (distance <= element.display_radius()).then_some((*id, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(id, _)| id)
    }

    pub fn island_at(&self, world: Pos2) -> Option<IslandKey> {
        let mut hits = self
            .islands
            .iter()
            .filter(|(_, element)| polygon_contains(&element.island.hull, world))
            .map(|(key, _)| *key)
            .collect::<Vec<_>>();
        hits.sort();
        hits.into_iter().next()
    }
}
