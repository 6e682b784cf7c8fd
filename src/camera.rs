//! Viewport that follows the actor and stays inside the map.

use macroquad::math::Affine2;
use macroquad::prelude::*;
use tracing::warn;

use crate::config::CameraConfig;
use crate::geometry::Aabb;

/// Top-left origin in world pixels, viewport size in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Left edge of the view in world pixels.
    pub x: f32,
    /// Top edge of the view in world pixels.
    pub y: f32,
    /// Viewport width in screen pixels.
    pub width: f32,
    /// Viewport height in screen pixels.
    pub height: f32,
    zoom: f32,
}

impl Camera {
    /// Camera at the origin. A non-positive zoom falls back to 1.
    pub fn new(width: f32, height: f32, zoom: f32) -> Self {
        let mut cam = Camera {
            x: 0.0,
            y: 0.0,
            width,
            height,
            zoom: 1.0,
        };
        cam.set_zoom(zoom);
        cam
    }

    /// Camera sized from the engine config.
    pub fn from_config(cfg: &CameraConfig) -> Self {
        Self::new(cfg.viewport_width, cfg.viewport_height, cfg.zoom)
    }

    /// Current zoom.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Changes the zoom; non-positive or non-finite values are ignored.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom > 0.0 && zoom.is_finite() {
            self.zoom = zoom;
        } else {
            warn!(zoom, kept = self.zoom, "camera_zoom_rejected");
        }
    }

    /// View size in world pixels.
    pub fn world_size(&self) -> Vec2 {
        vec2(self.width / self.zoom, self.height / self.zoom)
    }

    /// Centres on the actor, then clamps to `[0, map - view]` per axis. A map
    /// smaller than the view pins that axis to 0.
    pub fn update(&mut self, actor_x: f32, actor_y: f32, map_w_px: f32, map_h_px: f32) {
        let view = self.world_size();
        let x = actor_x - self.width / (2.0 * self.zoom);
        let y = actor_y - self.height / (2.0 * self.zoom);
        self.x = x.min(map_w_px - view.x).max(0.0);
        self.y = y.min(map_h_px - view.y).max(0.0);
    }

    /// World to screen: scale by zoom after translating by `(-x, -y)`.
    pub fn view_transform(&self) -> Affine2 {
        Affine2::from_scale(Vec2::splat(self.zoom)) * Affine2::from_translation(vec2(-self.x, -self.y))
    }

    /// Screen position of a world point.
    pub fn world_to_screen(&self, p: Vec2) -> Vec2 {
        self.view_transform().transform_point2(p)
    }

    /// World rectangle the camera shows.
    pub fn visible_rect(&self) -> Rect {
        let size = self.world_size();
        Rect::new(self.x, self.y, size.x, size.y)
    }

    /// [`visible_rect`](Self::visible_rect) in object geometry.
    pub fn visible_bounds(&self) -> Aabb {
        Aabb::from_rect(self.visible_rect())
    }

    /// Macroquad camera showing exactly [`visible_rect`](Self::visible_rect).
    pub fn to_camera2d(&self) -> Camera2D {
        let mut cam = Camera2D::from_display_rect(self.visible_rect());
        // y grows downwards on screen.
        cam.zoom.y = -cam.zoom.y;
        cam
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centres_on_actor_inside_the_map() {
        let mut cam = Camera::new(700.0, 700.0, 3.0);
        cam.update(500.0, 400.0, 2000.0, 2000.0);
        let half = 700.0 / 6.0;
        assert!((cam.x - (500.0 - half)).abs() < 1e-3);
        assert!((cam.y - (400.0 - half)).abs() < 1e-3);
    }

    #[test]
    fn clamps_to_map_edges() {
        let mut cam = Camera::new(100.0, 100.0, 2.0);
        cam.update(0.0, 0.0, 400.0, 400.0);
        assert_eq!((cam.x, cam.y), (0.0, 0.0));

        cam.update(399.0, 399.0, 400.0, 400.0);
        assert_eq!((cam.x, cam.y), (350.0, 350.0));
    }

    #[test]
    fn small_map_pins_to_origin() {
        let mut cam = Camera::new(700.0, 700.0, 1.0);
        cam.update(100.0, 50.0, 320.0, 320.0);
        assert_eq!((cam.x, cam.y), (0.0, 0.0));
    }

    #[test]
    fn visible_bounds_scale_with_zoom() {
        let mut cam = Camera::new(700.0, 350.0, 2.0);
        cam.x = 10.0;
        cam.y = 20.0;
        assert_eq!(cam.visible_bounds(), Aabb::new(10.0, 20.0, 350.0, 175.0));
    }

    #[test]
    fn view_transform_maps_origin_to_screen_corner() {
        let mut cam = Camera::new(700.0, 700.0, 3.0);
        cam.x = 10.0;
        cam.y = 20.0;
        assert_eq!(cam.world_to_screen(vec2(10.0, 20.0)), Vec2::ZERO);
        assert_eq!(cam.world_to_screen(vec2(11.0, 22.0)), vec2(3.0, 6.0));
    }

    #[test]
    fn rejects_non_positive_zoom() {
        let mut cam = Camera::new(700.0, 700.0, 3.0);
        cam.set_zoom(0.0);
        cam.set_zoom(-2.0);
        assert_eq!(cam.zoom(), 3.0);
        assert_eq!(Camera::new(10.0, 10.0, 0.0).zoom(), 1.0);
    }
}
