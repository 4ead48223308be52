use eframe::egui::{Color32, Pos2, pos2};

use crate::config::Settings;
use crate::content::{CategoryId, CategoryRecord, NodeId, NodeKind, NodeRecord, PriorityLevel};
use crate::util::parse_hex_color;

const FALLBACK_NODE_COLOR: Color32 = Color32::from_rgb(0x7f, 0x8e, 0xa3);

#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub color: Color32,
}

impl Category {
    pub fn from_record(record: &CategoryRecord, fallback: Color32) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            slug: record.slug.clone(),
            color: parse_hex_color(&record.color).unwrap_or(fallback),
        }
    }
}

/// A simulated node: record metadata plus physics state.
#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: NodeId,
    pub title: String,
    pub categories: Vec<CategoryId>,
    pub tags: Vec<String>,
    pub kind: NodeKind,
    pub priority: PriorityLevel,
    pub thumbnail: Option<String>,
    pub permalink: String,
    pub related: Vec<NodeId>,
    pub color: Color32,
    pub radius: f32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub fx: Option<f32>,
    pub fy: Option<f32>,
}

impl GraphNode {
    /// Position starts at the origin; the layout seeds it afterwards.
    pub fn from_record(record: &NodeRecord, categories: &[Category], settings: &Settings) -> Self {
        let fallback = parse_hex_color(&settings.default_node_color).unwrap_or(FALLBACK_NODE_COLOR);
        let color = record
            .categories
            .first()
            .and_then(|primary| categories.iter().find(|category| category.id == *primary))
            .map_or(fallback, |category| category.color);

        Self {
            id: record.id,
            title: record.title.clone(),
            categories: record.categories.clone(),
            tags: record.tags.clone(),
            kind: record.kind,
            priority: record.priority_level,
            thumbnail: record.thumbnail.clone(),
            permalink: record.permalink.clone(),
            related: record.related.clone(),
            color,
            radius: node_radius(record.priority_level, settings),
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            fx: None,
            fy: None,
        }
    }

    pub fn position(&self) -> Pos2 {
        pos2(self.x, self.y)
    }

    pub fn has_finite_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn is_pinned(&self) -> bool {
        self.fx.is_some() || self.fy.is_some()
    }

    pub fn primary_category(&self) -> Option<CategoryId> {
        self.categories.first().copied()
    }
}

pub fn node_radius(priority: PriorityLevel, settings: &Settings) -> f32 {
    let scale = match priority {
        PriorityLevel::None => 1.0,
        PriorityLevel::High => settings.high_priority_scale,
        PriorityLevel::Featured => settings.featured_scale,
    };
    (settings.node_size * scale).max(1.0)
}
