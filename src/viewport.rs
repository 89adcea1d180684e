//! Viewport transform state: zoom, pan, and drag-based panning.

use crate::geometry::{Point, ViewTransform};

/// Minimum zoom level.
pub const ZOOM_MIN: f32 = 0.2;

/// Maximum zoom level.
pub const ZOOM_MAX: f32 = 5.0;

/// Zoom factor for keyboard and button zoom.
pub const ZOOM_STEP: f32 = 1.2;

/// Zoom factor for scroll-wheel zoom.
pub const WHEEL_ZOOM_STEP: f32 = 1.1;

/// Keyboard arrow pan step, in display units.
pub const PAN_STEP: f32 = 20.0;

#[derive(Debug, Clone, Copy)]
struct DragState {
    origin: Point,
    pan_at_start: Point,
}

/// Pan/zoom state machine for the map viewport.
///
/// The only states are idle and dragging; starting a drag while one is active
/// is a no-op, and ending one twice is harmless.
#[derive(Debug, Default)]
pub struct Viewport {
    transform: ViewTransform,
    drag: Option<DragState>,
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn zoom(&self) -> f32 {
        self.transform.zoom
    }

    pub fn pan(&self) -> Point {
        self.transform.pan
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Zooms in by one step. Out-of-range requests are silently clamped.
    pub fn zoom_in(&mut self) {
        self.transform.zoom = (self.transform.zoom * ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    /// Zooms out by one step. Out-of-range requests are silently clamped.
    pub fn zoom_out(&mut self) {
        self.transform.zoom = (self.transform.zoom / ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    /// Scroll-wheel zoom anchored at `cursor` (display coordinates). A
    /// negative `delta_sign` zooms in. Pan is updated so the world point
    /// under the cursor stays under the cursor.
    pub fn zoom_at(&mut self, cursor: Point, delta_sign: f32) {
        let factor = if delta_sign < 0.0 {
            WHEEL_ZOOM_STEP
        } else {
            1.0 / WHEEL_ZOOM_STEP
        };
        let new_zoom = (self.transform.zoom * factor).clamp(ZOOM_MIN, ZOOM_MAX);
        let k = new_zoom / self.transform.zoom;

        let pan = self.transform.pan;
        self.transform.pan = cursor - (cursor - pan) * k;
        self.transform.zoom = new_zoom;
    }

    /// Unconditional translate, used by keyboard arrows and drag deltas.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.transform.pan = self.transform.pan + Point::new(dx, dy);
    }

    /// Starts a drag at `origin`. No-op while a drag is already active.
    pub fn begin_drag(&mut self, origin: Point) {
        if self.drag.is_none() {
            self.drag = Some(DragState {
                origin,
                pan_at_start: self.transform.pan,
            });
        }
    }

    /// Pan tracks the cursor delta from the drag origin exactly, with no
    /// smoothing or inertia. No-op outside a drag.
    pub fn drag_to(&mut self, point: Point) {
        if let Some(drag) = self.drag {
            self.transform.pan = drag.pan_at_start + (point - drag.origin);
        }
    }

    /// Ends the active drag. Must also be called when the pointer leaves the
    /// interactive surface so the panning mode cannot get stuck.
    pub fn end_drag(&mut self) {
        self.drag = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_under(viewport: &Viewport, cursor: Point) -> Point {
        viewport.transform().to_world(cursor)
    }

    #[test]
    fn anchor_zoom_keeps_cursor_point_fixed() {
        let cursors = [
            Point::new(400.0, 200.0),
            Point::new(0.0, 0.0),
            Point::new(-35.0, 512.0),
        ];
        for cursor in cursors {
            for delta_sign in [-1.0, 1.0] {
                let mut viewport = Viewport::new();
                viewport.pan_by(33.0, -80.0);
                viewport.zoom_at(cursor, -1.0);

                let before = world_under(&viewport, cursor);
                viewport.zoom_at(cursor, delta_sign);
                let after = world_under(&viewport, cursor);

                assert!((before.x - after.x).abs() < 1e-3);
                assert!((before.y - after.y).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn zoom_clamps_and_converges() {
        let mut viewport = Viewport::new();
        for _ in 0..50 {
            viewport.zoom_in();
        }
        assert_eq!(viewport.zoom(), ZOOM_MAX);
        viewport.zoom_in();
        assert_eq!(viewport.zoom(), ZOOM_MAX);

        for _ in 0..50 {
            viewport.zoom_out();
        }
        assert_eq!(viewport.zoom(), ZOOM_MIN);
        viewport.zoom_out();
        assert_eq!(viewport.zoom(), ZOOM_MIN);
    }

    #[test]
    fn wheel_zoom_clamps_too() {
        let mut viewport = Viewport::new();
        for _ in 0..100 {
            viewport.zoom_at(Point::new(10.0, 10.0), -1.0);
        }
        assert_eq!(viewport.zoom(), ZOOM_MAX);
    }

    #[test]
    fn triple_zoom_in_at_anchor() {
        let mut viewport = Viewport::new();
        let anchor = Point::new(400.0, 200.0);
        for _ in 0..3 {
            viewport.zoom_at(anchor, -1.0);
            let world = world_under(&viewport, anchor);
            assert!((world.x - 400.0).abs() < 1e-2);
            assert!((world.y - 200.0).abs() < 1e-2);
        }
        assert!((viewport.zoom() - 1.1f32.powi(3)).abs() < 1e-4);
    }

    #[test]
    fn drag_tracks_cursor_delta() {
        let mut viewport = Viewport::new();
        viewport.pan_by(10.0, 20.0);

        viewport.begin_drag(Point::new(100.0, 100.0));
        assert!(viewport.is_dragging());
        viewport.drag_to(Point::new(130.0, 90.0));
        assert_eq!(viewport.pan(), Point::new(40.0, 10.0));

        // re-entering a drag keeps the original origin
        viewport.begin_drag(Point::new(0.0, 0.0));
        viewport.drag_to(Point::new(160.0, 80.0));
        assert_eq!(viewport.pan(), Point::new(70.0, 0.0));

        viewport.end_drag();
        assert!(!viewport.is_dragging());

        // dragging without an active drag does nothing
        viewport.drag_to(Point::new(0.0, 0.0));
        assert_eq!(viewport.pan(), Point::new(70.0, 0.0));
    }

    #[test]
    fn keyboard_pan_is_unconditional() {
        let mut viewport = Viewport::new();
        viewport.pan_by(-PAN_STEP, 0.0);
        viewport.pan_by(0.0, PAN_STEP);
        assert_eq!(viewport.pan(), Point::new(-20.0, 20.0));
    }
}
