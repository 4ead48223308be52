use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{self, Align2, Color32, FontId, Sense, Shape, Stroke, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use content_islands::content::NodeId;
use content_islands::engine::{EngineEvent, Emphasis, LinkKind};
use content_islands::util::truncate_label;

use super::super::render_utils::{
    blend_color, circle_visible, dim_color, draw_background, edge_visible, fade_color,
    polygon_visible, to_screen,
};
use super::super::{SearchMatchCache, ViewModel};

const LABEL_MAX_CHARS: usize = 36;
const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
const HOVER_COLOR: Color32 = Color32::from_rgb(255, 164, 101);
const SEARCH_COLOR: Color32 = Color32::from_rgb(103, 196, 255);

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

impl ViewModel {
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<NodeId>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        let rebuild_count = self.engine.rebuild_count();
        if let Some(cached) = &self.search_match_cache
            && cached.rebuild_count == rebuild_count
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .engine
            .scene()
            .nodes()
            .iter()
            .filter(|(_, element)| fuzzy_match_score(&matcher, &element.title, query).is_some())
            .map(|(id, _)| *id)
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            rebuild_count,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.engine.resize(rect.width(), rect.height());
        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        let hovered = self.hovered_node(ui, rect);
        self.route_pointer(ui, rect, &response, hovered);
        self.engine.pump();
        self.open_navigations(ui.ctx());

        if hovered.is_some() || self.drag_node.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = if self.drag_node.is_some() {
                    egui::CursorIcon::Grabbing
                } else {
                    egui::CursorIcon::PointingHand
                };
            });
        }

        let transform = self.engine.transform();
        draw_background(&painter, rect, transform);

        let search_matches = self.cached_search_matches();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let settings = self.engine.settings();
        let island_opacity = settings.island_opacity;
        let zoom = transform.zoom;
        let zoom_sqrt = zoom.sqrt();
        let scene = self.engine.scene();

        let mut islands = scene.islands().values().collect::<Vec<_>>();
        islands.sort_by_key(|element| element.island.key);
        for element in islands {
            let island = &element.island;
            let hull = island
                .hull
                .iter()
                .map(|point| to_screen(rect, transform, *point))
                .collect::<Vec<_>>();
            if hull.len() < 3 || !polygon_visible(rect, &hull) {
                continue;
            }

            let fill = fade_color(island.color, island_opacity * element.opacity);
            let outline = fade_color(island.color, 0.55 * element.opacity);
            painter.add(Shape::convex_polygon(hull, fill, Stroke::new(1.4, outline)));

            if island.texture.len() >= 3 {
                let mut texture = island
                    .texture
                    .iter()
                    .map(|point| to_screen(rect, transform, *point))
                    .collect::<Vec<_>>();
                texture.push(texture[0]);
                painter.extend(Shape::dashed_line(
                    &texture,
                    Stroke::new(1.0, fade_color(island.color, 0.35 * element.opacity)),
                    6.0,
                    5.0,
                ));
            }

            painter.text(
                to_screen(rect, transform, island.label_anchor),
                Align2::CENTER_BOTTOM,
                &island.name,
                FontId::proportional((13.0 * zoom_sqrt).clamp(10.0, 22.0)),
                fade_color(blend_color(island.color, Color32::WHITE, 0.55), element.opacity),
            );
        }

        let selected = self.engine.selected();
        let focus = selected.or(hovered);
        for link in scene.links().values() {
            let start = to_screen(rect, transform, link.from);
            let end = to_screen(rect, transform, link.to);
            if !edge_visible(rect, start, end, 2.5) {
                continue;
            }

            let touches_focus =
                focus.is_some_and(|id| link.source == id || link.target == id);
            let strength = (link.score / 100.0).clamp(0.15, 1.0);
            let base = match link.kind {
                LinkKind::Proximity => Color32::from_rgba_unmultiplied(120, 132, 150, 150),
                LinkKind::Curated => Color32::from_rgba_unmultiplied(186, 160, 232, 190),
            };
            let color = if touches_focus {
                blend_color(base, SELECTED_COLOR, 0.6)
            } else if focus.is_some() || search_active {
                dim_color(base, 0.45)
            } else {
                base
            };
            let width = ((0.6 + strength * 1.6) * zoom_sqrt).clamp(0.4, 3.6);
            painter.line_segment(
                [start, end],
                Stroke::new(width, fade_color(color, link.opacity * (0.4 + strength * 0.6))),
            );
        }

        for ghost in scene.ghosts() {
            let position = to_screen(rect, transform, ghost.position);
            let radius = ghost.radius * zoom;
            if circle_visible(rect, position, radius) {
                painter.circle_filled(position, radius, fade_color(ghost.color, ghost.opacity));
            }
        }

        let mut order = scene.nodes().iter().collect::<Vec<_>>();
        order.sort_by(|a, b| {
            a.1.emphasis
                .cmp(&b.1.emphasis)
                .then_with(|| a.1.priority.cmp(&b.1.priority))
                .then_with(|| a.0.cmp(b.0))
        });

        for (id, element) in order {
            let position = to_screen(rect, transform, element.position);
            let radius = (element.display_radius() * zoom).max(2.0);
            if !circle_visible(rect, position, radius + 8.0) {
                continue;
            }

            let is_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(id));
            let color = match element.emphasis {
                Emphasis::Selected => blend_color(element.color, SELECTED_COLOR, 0.35),
                Emphasis::Hover => blend_color(element.color, HOVER_COLOR, 0.3),
                Emphasis::None if is_match => blend_color(element.color, SEARCH_COLOR, 0.55),
                Emphasis::None if search_active => dim_color(element.color, 0.38),
                Emphasis::None if selected.is_some() => dim_color(element.color, 0.6),
                Emphasis::None => element.color,
            };

            painter.circle_filled(position, radius, fade_color(color, element.opacity));

            if element.emphasis == Emphasis::Selected {
                let pulse = (element.pulse_phase.sin() + 1.0) * 0.5;
                painter.circle_stroke(
                    position,
                    radius + 4.0 + pulse * 4.0,
                    Stroke::new(
                        1.2 + pulse,
                        Color32::from_rgba_unmultiplied(245, 206, 93, (80.0 + pulse * 120.0) as u8),
                    ),
                );
            }

            let stroke_width = if element.pinned { 2.0 } else if is_match { 1.55 } else { 1.0 };
            painter.circle_stroke(
                position,
                radius,
                Stroke::new(
                    stroke_width,
                    fade_color(Color32::from_rgba_unmultiplied(12, 14, 18, 200), element.opacity),
                ),
            );

            let should_draw_label = element.emphasis != Emphasis::None
                || (is_match && zoom > 0.35)
                || zoom > 1.35;
            if should_draw_label {
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    truncate_label(&element.title, LABEL_MAX_CHARS),
                    FontId::proportional(12.0),
                    fade_color(Color32::from_gray(238), element.opacity),
                );
            }
        }

        if let Some(id) = hovered
            && let Some(node) = self.engine.node(id)
        {
            let categories = node
                .categories
                .iter()
                .filter_map(|category| self.engine.category(*category))
                .map(|category| category.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let mut panel_text = node.title.clone();
            if !categories.is_empty() {
                panel_text.push_str(&format!("  |  {categories}"));
            }
            if !node.tags.is_empty() {
                panel_text.push_str(&format!("  |  #{}", node.tags.join(" #")));
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        match self.engine.next_wakeup() {
            Some(delay) if delay.is_zero() => ui.ctx().request_repaint(),
            Some(delay) => ui.ctx().request_repaint_after(delay.max(Duration::from_millis(1))),
            None => {}
        }
        if response.dragged() {
            ui.ctx().request_repaint();
        }
    }

    pub(in crate::app) fn open_navigations(&mut self, ctx: &egui::Context) {
        for event in self.engine.drain_events() {
            match event {
                EngineEvent::Navigate { id, permalink } => {
                    if permalink.is_empty() {
                        tracing::warn!(id, "node has no permalink to open");
                        continue;
                    }
                    ctx.open_url(egui::OpenUrl::new_tab(permalink));
                }
                EngineEvent::Rebuilt { nodes, links, islands } => {
                    tracing::debug!(nodes, links, islands, "scene refreshed");
                }
            }
        }
    }
}
