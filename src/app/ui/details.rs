use eframe::egui::{self, RichText, Ui};

use content_islands::content::NodeKind;
use content_islands::engine::PointerEvent;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.engine.selected() else {
            ui.label("Click a node to select it. Click it again or double-click to open it.");
            return;
        };

        let Some(node) = self.engine.node(selected_id) else {
            ui.label("Selected node is no longer part of the graph.");
            return;
        };

        let title = node.title.clone();
        let permalink = node.permalink.clone();
        let kind = match node.kind {
            NodeKind::Post => "post",
            NodeKind::Page => "page",
        };
        let priority = node.priority.label();
        let tags = node.tags.join(", ");
        let thumbnail = node.thumbnail.clone();
        let pinned = node.is_pinned();
        let categories = node
            .categories
            .iter()
            .filter_map(|id| self.engine.category(*id))
            .map(|category| (category.name.clone(), category.color))
            .collect::<Vec<_>>();
        let related = node
            .related
            .iter()
            .filter_map(|id| self.engine.node(*id))
            .map(|related| (related.id, related.title.clone()))
            .collect::<Vec<_>>();
        let neighbours = self
            .engine
            .scene()
            .links()
            .values()
            .filter_map(|link| {
                if link.source == selected_id {
                    Some(link.target)
                } else if link.target == selected_id {
                    Some(link.source)
                } else {
                    None
                }
            })
            .filter_map(|id| self.engine.node(id).map(|other| (id, other.title.clone())))
            .collect::<Vec<_>>();

        ui.label(RichText::new(title).strong());
        ui.small(format!("#{selected_id}  |  {kind}  |  priority {priority}"));
        ui.add_space(6.0);

        if permalink.is_empty() {
            ui.label("No permalink.");
        } else {
            ui.horizontal(|ui| {
                ui.label(permalink.as_str());
                if ui.button("Open").clicked() {
                    ui.ctx().open_url(egui::OpenUrl::new_tab(permalink.as_str()));
                }
            });
        }

        if let Some(thumbnail) = thumbnail {
            ui.small(format!("Thumbnail: {thumbnail}"));
        }
        if pinned {
            ui.small("Pinned while dragging.");
        }

        ui.separator();
        ui.label(RichText::new("Categories").strong());
        if categories.is_empty() {
            ui.label("Uncategorised");
        }
        for (name, color) in categories {
            ui.label(RichText::new(name).color(color));
        }

        if !tags.is_empty() {
            ui.add_space(4.0);
            ui.label(RichText::new("Tags").strong());
            ui.label(tags);
        }

        let mut focus = None;
        ui.separator();
        ui.label(RichText::new("Linked nodes").strong());
        if neighbours.is_empty() {
            ui.label("No links from this node.");
        }
        for (id, title) in neighbours {
            if ui.link(title).clicked() {
                focus = Some(id);
            }
        }

        if !related.is_empty() {
            ui.add_space(4.0);
            ui.label(RichText::new("Related").strong());
            for (id, title) in related {
                if ui.link(title).clicked() {
                    focus = Some(id);
                }
            }
        }

        if let Some(id) = focus {
            self.engine.pointer(PointerEvent::Click(id));
        }
    }
}
