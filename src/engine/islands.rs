use std::collections::BTreeMap;

use eframe::egui::{Color32, Pos2, pos2};

use crate::config::Settings;
use crate::content::{CategoryId, NodeKind};
use crate::util::parse_hex_color;

use super::geometry::{
    calculate_centroid, convex_hull, create_circular_hull, expand_hull, smooth_hull,
};
use super::model::{Category, GraphNode};

const LABEL_OFFSET: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IslandKey {
    Category(CategoryId),
    Pages,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Island {
    pub key: IslandKey,
    pub name: String,
    pub color: Color32,
    /// Closed ring; the last point connects back to the first.
    pub hull: Vec<Pos2>,
    /// Inset outline drawn inside the hull.
    pub texture: Vec<Pos2>,
    pub center: Pos2,
    pub member_count: usize,
    pub label_anchor: Pos2,
    pub synthetic_circle: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IslandParams {
    pub padding: f32,
    pub smoothing: f32,
    pub circle_points: usize,
    pub texture_inset: f32,
    pub pages_label: String,
    pub pages_color: Color32,
}

impl IslandParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            padding: settings.island_padding.max(0.0),
            smoothing: settings.island_smoothing,
            circle_points: settings.island_circle_points.max(3),
            texture_inset: settings.island_texture_inset.max(0.0),
            pages_label: settings.pages_island_label.clone(),
            pages_color: parse_hex_color(&settings.pages_island_color).unwrap_or(Color32::GRAY),
        }
    }
}

struct Group<'a> {
    members: Vec<&'a GraphNode>,
}

/// One island per category (and one for pages) with at least two members
/// sitting at finite coordinates. Output is ordered by key.
pub fn build_islands(nodes: &[GraphNode], categories: &[Category], params: &IslandParams) -> Vec<Island> {
    let mut groups: BTreeMap<IslandKey, Group<'_>> = BTreeMap::new();
    for node in nodes.iter().filter(|node| node.has_finite_position()) {
        if node.kind == NodeKind::Page {
            groups
                .entry(IslandKey::Pages)
                .or_insert_with(|| Group { members: Vec::new() })
                .members
                .push(node);
        }

        let mut seen = Vec::with_capacity(node.categories.len());
        for &category in &node.categories {
            if seen.contains(&category) || !categories.iter().any(|known| known.id == category) {
                continue;
            }
            seen.push(category);
            groups
                .entry(IslandKey::Category(category))
                .or_insert_with(|| Group { members: Vec::new() })
                .members
                .push(node);
        }
    }

    groups
        .into_iter()
        .filter(|(_, group)| group.members.len() >= 2)
        .filter_map(|(key, group)| {
            let (name, color) = match key {
                IslandKey::Pages => (params.pages_label.clone(), params.pages_color),
                IslandKey::Category(id) => {
                    let category = categories.iter().find(|category| category.id == id)?;
                    (category.name.clone(), category.color)
                }
            };
            island_for_group(key, name, color, &group.members, params)
        })
        .collect()
}

fn island_for_group(
    key: IslandKey,
    name: String,
    color: Color32,
    members: &[&GraphNode],
    params: &IslandParams,
) -> Option<Island> {
    let points = members.iter().map(|node| node.position()).collect::<Vec<_>>();
    let center = calculate_centroid(&points)?;
    let largest_radius = members.iter().fold(0.0_f32, |max, node| max.max(node.radius));
    let hull = convex_hull(&points);

    let (outline, synthetic_circle) = if hull.len() >= 3 {
        let padded = expand_hull(&hull, params.padding + largest_radius);
        (smooth_hull(&padded, params.smoothing), false)
    } else {
        let spread = points
            .iter()
            .fold(0.0_f32, |max, point| max.max(point.distance(center)));
        let radius = spread + params.padding + largest_radius;
        (create_circular_hull(center, radius, params.circle_points), true)
    };

    if outline.len() < 3 {
        return None;
    }

    let texture = expand_hull(&outline, -params.texture_inset);
    let top = outline.iter().fold(f32::INFINITY, |top, point| top.min(point.y));
    Some(Island {
        key,
        name,
        color,
        label_anchor: pos2(center.x, top - LABEL_OFFSET),
        hull: outline,
        texture,
        center,
        member_count: members.len(),
        synthetic_circle,
    })
}

/// Decides when islands are worth recomputing while the layout is moving.
#[derive(Clone, Debug)]
pub struct IslandCadence {
    interval: u32,
    threshold: f32,
    ticks_since: u32,
    settled: bool,
}

impl IslandCadence {
    pub fn new(interval: u32, threshold: f32) -> Self {
        Self {
            interval: interval.max(1),
            threshold,
            ticks_since: 0,
            settled: false,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.island_interval_ticks, settings.island_alpha_threshold)
    }

    /// Called once per tick with the post-tick alpha.
    pub fn observe_tick(&mut self, alpha: f32) -> bool {
        self.ticks_since += 1;

        if alpha < self.threshold {
            if self.settled {
                return false;
            }
            self.settled = true;
            self.ticks_since = 0;
            return true;
        }

        self.settled = false;
        if self.ticks_since >= self.interval {
            self.ticks_since = 0;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.ticks_since = 0;
        self.settled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{CategoryRecord, NodeRecord};
    use crate::engine::geometry::polygon_contains;

    fn categories() -> Vec<Category> {
        vec![
            Category::from_record(&CategoryRecord::new(1, "Reef", "#3388cc"), Color32::GRAY),
            Category::from_record(&CategoryRecord::new(2, "Kelp", "#22aa55"), Color32::GRAY),
        ]
    }

    fn node(id: u64, categories: &[u64], x: f32, y: f32) -> GraphNode {
        let record = NodeRecord::new(id, "n").with_categories(categories.iter().copied());
        let mut node = GraphNode::from_record(&record, &[], &Settings::default());
        node.x = x;
        node.y = y;
        node
    }

    fn params() -> IslandParams {
        IslandParams::from_settings(&Settings::default())
    }

    #[test]
    fn test_two_categories_produce_two_islands() {
        let nodes = vec![
            node(1, &[1], 0.0, 0.0),
            node(2, &[1], 100.0, 0.0),
            node(3, &[1], 50.0, 80.0),
            node(4, &[2], 300.0, 300.0),
            node(5, &[2], 360.0, 320.0),
            node(6, &[], 150.0, 150.0),
        ];

        let islands = build_islands(&nodes, &categories(), &params());

        assert_eq!(islands.len(), 2);
        assert_eq!(islands[0].key, IslandKey::Category(1));
        assert_eq!(islands[0].member_count, 3);
        assert!(!islands[0].synthetic_circle);
        assert_eq!(islands[1].member_count, 2);
        assert!(islands[1].synthetic_circle);
        for island in &islands {
            assert!(island.hull.len() >= 3);
            assert!(!polygon_contains(&island.hull, pos2(150.0, 150.0)));
        }
        for member in &nodes[..3] {
            assert!(polygon_contains(&islands[0].hull, member.position()));
        }
    }

    #[test]
    fn test_thin_wedge_island_encloses_every_member() {
        let nodes = vec![
            node(1, &[1], 200.0, 1.0),
            node(2, &[1], 400.0, 2.0),
            node(3, &[1], 600.0, 4.0),
        ];

        let islands = build_islands(&nodes, &categories(), &params());

        assert_eq!(islands.len(), 1);
        assert!(!islands[0].synthetic_circle);
        for member in &nodes {
            assert!(
                polygon_contains(&islands[0].hull, member.position()),
                "member {} outside its island",
                member.id
            );
        }
    }

    #[test]
    fn test_two_members_synthesize_circle_at_centroid() {
        let nodes = vec![node(1, &[1], 0.0, 0.0), node(2, &[1], 40.0, 0.0)];
        let params = params();
        let islands = build_islands(&nodes, &categories(), &params);

        assert_eq!(islands.len(), 1);
        let island = &islands[0];
        assert_eq!(island.hull.len(), params.circle_points);
        assert_eq!(island.center, pos2(20.0, 0.0));
        let radius = island.hull[0].distance(island.center);
        assert!(island.hull.iter().all(|point| (point.distance(island.center) - radius).abs() < 1.0e-2));
    }

    #[test]
    fn test_single_member_and_non_finite_members_are_skipped() {
        let nodes = vec![
            node(1, &[1], 0.0, 0.0),
            node(2, &[1], f32::NAN, 4.0),
            node(3, &[2], 10.0, 10.0),
        ];
        assert!(build_islands(&nodes, &categories(), &params()).is_empty());
    }

    #[test]
    fn test_pages_form_their_own_island() {
        let mut a = node(1, &[], 0.0, 0.0);
        let mut b = node(2, &[], 30.0, 30.0);
        a.kind = NodeKind::Page;
        b.kind = NodeKind::Page;

        let islands = build_islands(&[a, b], &categories(), &params());

        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].key, IslandKey::Pages);
        assert_eq!(islands[0].name, "Pages");
    }

    #[test]
    fn test_unknown_categories_do_not_form_islands() {
        let nodes = vec![node(1, &[42], 0.0, 0.0), node(2, &[42], 10.0, 0.0)];
        assert!(build_islands(&nodes, &categories(), &params()).is_empty());
    }

    #[test]
    fn test_cadence_fires_on_interval_and_once_below_threshold() {
        let mut cadence = IslandCadence::new(3, 0.05);
        let fired = (0..6).map(|_| cadence.observe_tick(0.5)).collect::<Vec<_>>();
        assert_eq!(fired, vec![false, false, true, false, false, true]);

        assert!(cadence.observe_tick(0.01));
        assert!(!cadence.observe_tick(0.009));
        assert!(!cadence.observe_tick(0.008));

        cadence.reset();
        assert!(cadence.observe_tick(0.001));
    }
}
