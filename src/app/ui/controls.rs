use std::ops::RangeInclusive;

use eframe::egui::{self, Color32, RichText, Ui};
use serde_json::Value;

use content_islands::config::{Settings, SettingsPatch};

use super::super::ViewModel;

/// Collects edited settings into a patch published once per frame.
struct PatchBuilder {
    draft: Settings,
    patch: SettingsPatch,
}

impl PatchBuilder {
    fn slider_f32(
        &mut self,
        ui: &mut Ui,
        key: &str,
        label: &str,
        range: RangeInclusive<f32>,
        hover: &str,
        value: impl Fn(&mut Settings) -> &mut f32,
    ) {
        let field = value(&mut self.draft);
        let response = ui
            .add(
                egui::Slider::new(field, range)
                    .text(label)
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text(hover);
        if response.changed() {
            self.patch.insert(key.to_owned(), Value::from(*value(&mut self.draft)));
        }
    }

    fn slider_usize(
        &mut self,
        ui: &mut Ui,
        key: &str,
        label: &str,
        range: RangeInclusive<usize>,
        hover: &str,
        value: impl Fn(&mut Settings) -> &mut usize,
    ) {
        let response = ui
            .add(egui::Slider::new(value(&mut self.draft), range).text(label))
            .on_hover_text(hover);
        if response.changed() {
            self.patch.insert(key.to_owned(), Value::from(*value(&mut self.draft)));
        }
    }

    fn checkbox(
        &mut self,
        ui: &mut Ui,
        key: &str,
        label: &str,
        hover: &str,
        value: impl Fn(&mut Settings) -> &mut bool,
    ) {
        let response = ui.checkbox(value(&mut self.draft), label).on_hover_text(hover);
        if response.changed() {
            self.patch.insert(key.to_owned(), Value::from(*value(&mut self.draft)));
        }
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.add_space(4.0);

        ui.label("Search titles")
            .on_hover_text("Fuzzy-highlight matching nodes without changing the graph.");
        ui.text_edit_singleline(&mut self.search);

        ui.separator();

        let mut builder = PatchBuilder {
            draft: self.bridge.settings(),
            patch: SettingsPatch::new(),
        };

        builder.checkbox(ui, "show_links", "Show links", "Draw proximity and curated links.", |s| {
            &mut s.show_links
        });
        builder.checkbox(ui, "show_islands", "Show islands", "Draw category islands.", |s| {
            &mut s.show_islands
        });
        builder.checkbox(
            ui,
            "animations_enabled",
            "Animations",
            "Fade elements in and out and pulse the selected node.",
            |s| &mut s.animations_enabled,
        );

        ui.collapsing("Physics", |ui| {
            builder.slider_f32(
                ui,
                "charge_strength",
                "Repulsion",
                0.0..=200.0,
                "How strongly nodes push each other apart.",
                |s| &mut s.charge_strength,
            );
            builder.slider_f32(
                ui,
                "center_strength",
                "Centering",
                0.0..=0.3,
                "Pull toward the middle of the viewport.",
                |s| &mut s.center_strength,
            );
            builder.slider_f32(
                ui,
                "collision_padding",
                "Collision padding",
                0.0..=40.0,
                "Extra space kept between node discs.",
                |s| &mut s.collision_padding,
            );
            builder.slider_f32(
                ui,
                "cluster_strength",
                "Cluster strength",
                0.0..=1.0,
                "Scales the collision force.",
                |s| &mut s.cluster_strength,
            );
            builder.slider_f32(
                ui,
                "link_distance",
                "Link distance",
                10.0..=300.0,
                "Rest length of a full-score link.",
                |s| &mut s.link_distance,
            );
            builder.slider_f32(
                ui,
                "link_strength",
                "Link strength",
                0.0..=1.0,
                "Spring stiffness of a full-score link.",
                |s| &mut s.link_strength,
            );
            builder.slider_f32(
                ui,
                "velocity_decay",
                "Velocity decay",
                0.05..=0.9,
                "Fraction of velocity lost each tick.",
                |s| &mut s.velocity_decay,
            );
        });

        ui.collapsing("Links", |ui| {
            builder.slider_f32(
                ui,
                "min_proximity_score",
                "Minimum score",
                0.0..=100.0,
                "Pairs scoring below this are not linked.",
                |s| &mut s.min_proximity_score,
            );
            builder.slider_usize(
                ui,
                "max_links_per_node",
                "Max links per node",
                0..=12,
                "Upper bound on links touching one node.",
                |s| &mut s.max_links_per_node,
            );
            builder.checkbox(
                ui,
                "curated_links",
                "Curated links",
                "Link nodes that list each other as related.",
                |s| &mut s.curated_links,
            );
        });

        ui.collapsing("Nodes", |ui| {
            builder.slider_f32(
                ui,
                "node_size",
                "Node size",
                2.0..=24.0,
                "Base radius before priority scaling.",
                |s| &mut s.node_size,
            );
            builder.slider_f32(
                ui,
                "hover_scale",
                "Hover scale",
                1.0..=2.0,
                "Growth of a hovered node.",
                |s| &mut s.hover_scale,
            );
            builder.slider_f32(
                ui,
                "selected_scale",
                "Selected scale",
                1.0..=2.5,
                "Growth of the selected node.",
                |s| &mut s.selected_scale,
            );
        });

        ui.collapsing("Islands", |ui| {
            builder.slider_f32(
                ui,
                "island_padding",
                "Padding",
                0.0..=80.0,
                "Space between members and the island edge.",
                |s| &mut s.island_padding,
            );
            builder.slider_f32(
                ui,
                "island_smoothing",
                "Smoothing",
                0.0..=1.0,
                "Corner rounding of island outlines.",
                |s| &mut s.island_smoothing,
            );
            builder.slider_f32(
                ui,
                "island_opacity",
                "Opacity",
                0.0..=0.6,
                "Fill opacity of islands.",
                |s| &mut s.island_opacity,
            );
        });

        ui.collapsing("Drag repulsion", |ui| {
            builder.slider_f32(
                ui,
                "drag_repulsion_force",
                "Force",
                0.0..=3.0,
                "Push applied to overlapping nodes while dragging.",
                |s| &mut s.drag_repulsion_force,
            );
            builder.slider_f32(
                ui,
                "drag_repulsion_min_distance",
                "Minimum distance",
                0.0..=120.0,
                "Nodes closer than this are pushed apart.",
                |s| &mut s.drag_repulsion_min_distance,
            );
            builder.slider_f32(
                ui,
                "drag_repulsion_damping",
                "Damping",
                0.1..=0.99,
                "Velocity kept between repulsion frames.",
                |s| &mut s.drag_repulsion_damping,
            );
        });

        if !builder.patch.is_empty() {
            match self.bridge.publish(&builder.patch) {
                Ok(()) => self.settings_error = None,
                Err(error) => {
                    tracing::warn!("rejected settings patch: {error}");
                    self.settings_error = Some(error.to_string());
                }
            }
        }

        if let Some(error) = &self.settings_error {
            ui.add_space(6.0);
            ui.label(RichText::new(error).color(Color32::from_rgb(235, 110, 100)));
        }

        ui.separator();
        if ui
            .button("Restore defaults")
            .on_hover_text("Reset every setting to its default value.")
            .clicked()
        {
            let persist_positions = self.bridge.read(|settings| settings.persist_positions);
            self.bridge.replace(Settings {
                persist_positions,
                ..Settings::default()
            });
        }
    }
}
