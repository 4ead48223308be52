use std::path::Path;

use eframe::egui::{self, Align, Color32, Context, Layout, RichText, Sense, Ui, vec2};

use content_islands::config::ConfigBridge;
use content_islands::engine::GraphEngine;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn new(engine: GraphEngine, bridge: ConfigBridge) -> Self {
        Self {
            engine,
            bridge,
            search: String::new(),
            search_match_cache: None,
            drag_node: None,
            settings_error: None,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        data_dir: &Path,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("content-islands");
                    ui.separator();
                    ui.label(format!("source: {}", data_dir.display()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload content"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui
                        .add_enabled(!self.engine.transform().is_identity(), egui::Button::new("Reset view"))
                        .clicked()
                    {
                        self.engine.reset_zoom();
                    }
                    if ui
                        .add_enabled(!self.engine.filters().is_empty(), egui::Button::new("Clear filters"))
                        .clicked()
                    {
                        self.engine.clear_filters();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.graph_summary_text());
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.draw_legend(ui);
                    ui.separator();
                    self.draw_controls(ui);
                });
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }

    fn graph_summary_text(&self) -> String {
        let shown = self
            .engine
            .simulation()
            .map_or(0, |simulation| simulation.nodes().len());
        let alpha = self
            .engine
            .simulation()
            .map_or(0.0, |simulation| simulation.alpha());
        format!(
            "nodes {shown}/{}  |  links {}  |  islands {}  |  zoom {:.2}  |  alpha {alpha:.3}",
            self.engine.total_nodes(),
            self.engine.scene().links().len(),
            self.engine.scene().islands().len(),
            self.engine.transform().zoom,
        )
    }

    /// Category swatches double as filter toggles.
    pub(in crate::app) fn draw_legend(&mut self, ui: &mut Ui) {
        ui.heading("Categories");
        ui.add_space(4.0);

        if self.engine.categories().is_empty() {
            ui.label("No categories in this dataset.");
            return;
        }

        let filtering = !self.engine.filters().is_empty();
        let mut toggled = None;
        for category in self.engine.categories() {
            let active = self.engine.filters().contains(&category.id);
            ui.horizontal(|ui| {
                let (swatch, _) = ui.allocate_exact_size(vec2(12.0, 12.0), Sense::hover());
                let color = if filtering && !active {
                    category.color.gamma_multiply(0.35)
                } else {
                    category.color
                };
                ui.painter().circle_filled(swatch.center(), 6.0, color);

                let text = if active {
                    RichText::new(&category.name).strong()
                } else {
                    RichText::new(&category.name)
                };
                if ui
                    .selectable_label(active, text)
                    .on_hover_text("Show only nodes in the selected categories.")
                    .clicked()
                {
                    toggled = Some(category.id);
                }
            });
        }

        if let Some(id) = toggled {
            self.engine.toggle_category(id);
        }

        if filtering {
            ui.add_space(4.0);
            ui.label(
                RichText::new(format!("{} filter(s) active", self.engine.filters().len()))
                    .color(Color32::from_gray(170)),
            );
        }
    }
}
