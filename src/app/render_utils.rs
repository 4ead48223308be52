use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

use content_islands::engine::ViewTransform;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Scales a color's alpha, leaving rgb alone.
pub(super) fn fade_color(color: Color32, opacity: f32) -> Color32 {
    let opacity = opacity.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        (color.a() as f32 * opacity) as u8,
    )
}

pub(super) fn to_screen(rect: Rect, transform: ViewTransform, world: Pos2) -> Pos2 {
    rect.min + transform.world_to_screen(world).to_vec2()
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, transform: ViewTransform) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(17, 22, 30));

    let step = (64.0 * transform.zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.min + transform.pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(58, 70, 86, 60));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

/// Bounding-box test; long links crossing the viewport still count as visible.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    !(max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom())
}

pub(super) fn polygon_visible(rect: Rect, points: &[Pos2]) -> bool {
    let Some(first) = points.first() else {
        return false;
    };
    let bounds = points
        .iter()
        .fold(Rect::from_min_max(*first, *first), |bounds, point| {
            bounds.union(Rect::from_min_max(*point, *point))
        });
    bounds.intersects(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2};

    #[test]
    fn test_fade_color_scales_alpha_only() {
        let faded = fade_color(Color32::from_rgba_unmultiplied(200, 100, 50, 200), 0.5);
        assert_eq!(faded.a(), 100);
    }

    #[test]
    fn test_to_screen_offsets_by_rect_origin() {
        let rect = Rect::from_min_size(pos2(100.0, 50.0), vec2(400.0, 300.0));
        let transform = ViewTransform {
            pan: vec2(10.0, 20.0),
            zoom: 2.0,
        };
        assert_eq!(to_screen(rect, transform, pos2(5.0, 5.0)), pos2(120.0, 80.0));
    }

    #[test]
    fn test_visibility_checks() {
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(100.0, 100.0));
        assert!(circle_visible(rect, pos2(-5.0, 50.0), 10.0));
        assert!(!circle_visible(rect, pos2(-50.0, 50.0), 10.0));
        assert!(edge_visible(rect, pos2(-50.0, 50.0), pos2(150.0, 50.0), 1.0));
        assert!(!edge_visible(rect, pos2(-50.0, -50.0), pos2(-10.0, -20.0), 1.0));
        assert!(polygon_visible(rect, &[pos2(-10.0, -10.0), pos2(10.0, -10.0), pos2(0.0, 10.0)]));
        assert!(!polygon_visible(rect, &[]));
    }
}
