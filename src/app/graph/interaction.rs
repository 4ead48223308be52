use eframe::egui::{self, Rect, Ui};

use content_islands::content::NodeId;
use content_islands::engine::PointerEvent;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.engine
            .zoom_at((pointer - rect.min).to_pos2(), zoom_factor);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.engine.pan_by(response.drag_delta());
        }
    }

    pub(in crate::app) fn hovered_node(&self, ui: &Ui, rect: Rect) -> Option<NodeId> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        if !rect.contains(pointer) {
            return None;
        }
        self.engine.node_at_screen((pointer - rect.min).to_pos2())
    }

    /// Turns egui pointer state into engine events.
    pub(in crate::app) fn route_pointer(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        hovered: Option<NodeId>,
    ) {
        if let Some(node) = self.drag_node {
            if response.dragged_by(egui::PointerButton::Primary)
                && let Some(pointer) = response.interact_pointer_pos()
            {
                let world = self
                    .engine
                    .transform()
                    .screen_to_world((pointer - rect.min).to_pos2());
                self.engine.pointer(PointerEvent::DragMove(world));
            }
            if response.drag_stopped() || !ui.input(|input| input.pointer.primary_down()) {
                self.engine.pointer(PointerEvent::DragEnd);
                self.drag_node = None;
                tracing::debug!(node, "drag finished");
            }
            return;
        }

        match hovered {
            Some(id) if self.engine.hovered() != Some(id) => {
                self.engine.pointer(PointerEvent::HoverEnter(id));
            }
            None if self.engine.hovered().is_some() => {
                self.engine.pointer(PointerEvent::HoverLeave);
            }
            _ => {}
        }

        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(id) = hovered
        {
            self.drag_node = Some(id);
            self.engine.pointer(PointerEvent::DragStart(id));
            return;
        }

        if response.double_clicked_by(egui::PointerButton::Primary) {
            if let Some(id) = hovered {
                self.engine.pointer(PointerEvent::DoubleActivate(id));
            }
        } else if response.clicked_by(egui::PointerButton::Primary) {
            let event = hovered.map_or(PointerEvent::BackgroundClick, PointerEvent::Click);
            self.engine.pointer(event);
        }
    }
}
