use eframe::egui::{Pos2, Vec2};

pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 6.0;

/// Maps world coordinates to viewport-local screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        (world.to_vec2() * self.zoom + self.pan).to_pos2()
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.pan) / self.zoom).to_pos2()
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        if delta.x.is_finite() && delta.y.is_finite() {
            self.pan += delta;
        }
    }

    /// Zooms while keeping the world point under `anchor` fixed on screen.
    pub fn zoom_at(&mut self, anchor: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        let world = self.screen_to_world(anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = anchor.to_vec2() - world.to_vec2() * self.zoom;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2};

    #[test]
    fn test_round_trip_and_anchor() {
        let mut transform = ViewTransform::default();
        transform.pan_by(vec2(30.0, -10.0));
        transform.zoom_at(pos2(200.0, 150.0), 2.0);

        let world = pos2(12.0, 34.0);
        let back = transform.screen_to_world(transform.world_to_screen(world));
        assert!(back.distance(world) < 1.0e-3);

        let anchored = transform.screen_to_world(pos2(200.0, 150.0));
        transform.zoom_at(pos2(200.0, 150.0), 1.5);
        assert!(transform.world_to_screen(anchored).distance(pos2(200.0, 150.0)) < 1.0e-3);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut transform = ViewTransform::default();
        transform.zoom_at(Pos2::ZERO, 1_000.0);
        assert_eq!(transform.zoom, MAX_ZOOM);
        transform.zoom_at(Pos2::ZERO, 0.0);
        assert_eq!(transform.zoom, MAX_ZOOM);
        transform.zoom_at(Pos2::ZERO, 1.0e-6);
        assert_eq!(transform.zoom, MIN_ZOOM);
    }
}
