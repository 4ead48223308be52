mod bridge;

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use bridge::{ConfigBridge, SettingsPatch, SubscriptionId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for setting `{key}`: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings could not be encoded: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Every tunable the engine reads. Missing keys fall back to the defaults below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub charge_strength: f32,
    pub charge_distance_max: f32,
    pub center_strength: f32,
    pub collision_padding: f32,
    pub collision_strength: f32,
    pub cluster_strength: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub velocity_decay: f32,
    pub reheat_alpha: f32,
    pub reheat_alpha_target: f32,

    pub show_links: bool,
    pub min_proximity_score: f32,
    pub max_links_per_node: usize,
    pub category_weight: f32,
    pub tag_weight: f32,
    pub primary_category_bonus: f32,
    pub curated_links: bool,

    /// Base node radius. Priority multipliers are applied on top of it.
    pub node_size: f32,
    pub high_priority_scale: f32,
    pub featured_scale: f32,
    pub hover_scale: f32,
    pub selected_scale: f32,
    pub default_node_color: String,

    pub show_islands: bool,
    pub island_padding: f32,
    pub island_smoothing: f32,
    pub island_circle_points: usize,
    pub island_texture_inset: f32,
    pub island_interval_ticks: u32,
    pub island_alpha_threshold: f32,
    pub island_opacity: f32,
    pub pages_island_label: String,
    pub pages_island_color: String,

    pub drag_repulsion_force: f32,
    pub drag_repulsion_min_distance: f32,
    pub drag_repulsion_damping: f32,
    pub drag_repulsion_max_ms: u64,
    pub drag_repulsion_max_iterations: u32,
    pub drag_repulsion_threshold: f32,

    pub tick_interval_ms: u64,
    pub rebuild_debounce_ms: u64,
    pub double_click_ms: u64,
    pub fade_ms: u64,

    pub animations_enabled: bool,
    pub persist_positions: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            charge_strength: 30.0,
            charge_distance_max: 420.0,
            center_strength: 0.04,
            collision_padding: 6.0,
            collision_strength: 0.8,
            cluster_strength: 0.7,
            link_distance: 70.0,
            link_strength: 0.35,
            alpha_decay: 0.0228,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            reheat_alpha: 0.3,
            reheat_alpha_target: 0.3,

            show_links: true,
            min_proximity_score: 30.0,
            max_links_per_node: 4,
            category_weight: 30.0,
            tag_weight: 15.0,
            primary_category_bonus: 20.0,
            curated_links: true,

            node_size: 8.0,
            high_priority_scale: 1.3,
            featured_scale: 1.6,
            hover_scale: 1.25,
            selected_scale: 1.5,
            default_node_color: "#7f8ea3".to_owned(),

            show_islands: true,
            island_padding: 22.0,
            island_smoothing: 0.6,
            island_circle_points: 24,
            island_texture_inset: 10.0,
            island_interval_ticks: 15,
            island_alpha_threshold: 0.05,
            island_opacity: 0.16,
            pages_island_label: "Pages".to_owned(),
            pages_island_color: "#8a94a6".to_owned(),

            drag_repulsion_force: 0.6,
            drag_repulsion_min_distance: 36.0,
            drag_repulsion_damping: 0.82,
            drag_repulsion_max_ms: 1200,
            drag_repulsion_max_iterations: 90,
            drag_repulsion_threshold: 0.05,

            tick_interval_ms: 16,
            rebuild_debounce_ms: 200,
            double_click_ms: 250,
            fade_ms: 280,

            animations_enabled: true,
            persist_positions: false,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid settings file {}", path.display()))
    }

    /// Shallow per-key merge. Unknown keys are skipped; one bad value rejects the whole patch.
    pub fn merge(&mut self, patch: &Map<String, Value>) -> Result<Vec<String>, ConfigError> {
        let Value::Object(mut merged) = serde_json::to_value(&*self)? else {
            return Ok(Vec::new());
        };

        let mut applied = Vec::with_capacity(patch.len());
        for (key, value) in patch {
            if !merged.contains_key(key) {
                tracing::warn!(key = key.as_str(), "ignoring unknown setting");
                continue;
            }

            let mut candidate = merged.clone();
            candidate.insert(key.clone(), value.clone());
            serde_json::from_value::<Settings>(Value::Object(candidate)).map_err(|source| {
                ConfigError::InvalidValue {
                    key: key.clone(),
                    source,
                }
            })?;

            merged.insert(key.clone(), value.clone());
            applied.push(key.clone());
        }

        *self = serde_json::from_value(Value::Object(merged))?;
        Ok(applied)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn rebuild_debounce(&self) -> Duration {
        Duration::from_millis(self.rebuild_debounce_ms)
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }
}
