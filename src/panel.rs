//! The mounted component instance.
//!
//! A [`MapPanel`] owns all per-mount mutable state: view transform, markers,
//! selection, hover, the announcement slot, and the render strategy. It is
//! constructed on mount, dropped on unmount, and never shared between
//! instances; access is strictly single-threaded.

use crate::announce::Announcer;
use crate::augment::{AugmentContext, augment};
use crate::bridge::{AssetRef, BridgeError, HostBridge, upload_and_insert};
use crate::export::{ExportError, ExportPipeline, ExportedImage};
use crate::geometry::Point;
use crate::markers::MarkerStore;
use crate::scene::Scene;
use crate::viewport::Viewport;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// How the scene is currently rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Interactive augmented vector tree.
    Vector,
    /// Pristine, unaugmented tree; entered permanently after the augmented
    /// tree fails to render.
    Pristine,
    /// Plain bitmap with the view transform applied ("safe mode"). No
    /// per-region interactivity.
    Bitmap,
}

/// Failure of the whole export action: rendering or either host call.
#[derive(Error, Debug)]
pub enum ExportFlowError {
    #[error(transparent)]
    Render(#[from] ExportError),
    #[error(transparent)]
    Host(#[from] BridgeError),
}

pub struct MapPanel {
    scene: Scene,
    viewport: Viewport,
    markers: MarkerStore,
    announcer: Announcer,
    selected_region: Option<String>,
    hovered_region: Option<String>,
    render_mode: RenderMode,
    /// Slot the augmented tree's selection callback writes into; applied by
    /// [`MapPanel::click_at`] once the handler chain has run.
    selection_slot: Rc<RefCell<Option<String>>>,
}

impl MapPanel {
    pub fn new(scene: Scene, safe_mode: bool) -> Self {
        Self {
            scene,
            viewport: Viewport::new(),
            markers: MarkerStore::new(),
            announcer: Announcer::new(),
            selected_region: None,
            hovered_region: None,
            render_mode: if safe_mode {
                RenderMode::Bitmap
            } else {
                RenderMode::Vector
            },
            selection_slot: Rc::new(RefCell::new(None)),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn markers(&self) -> &MarkerStore {
        &self.markers
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn selected_region(&self) -> Option<&str> {
        self.selected_region.as_deref()
    }

    pub fn hovered_region(&self) -> Option<&str> {
        self.hovered_region.as_deref()
    }

    /// Current live-region message.
    pub fn announcement(&self) -> Option<&str> {
        self.announcer.current()
    }

    pub fn announce(&mut self, message: impl Into<String>) {
        self.announcer.announce(message);
    }

    // ------------------------------------------------------------------
    // Viewport interactions
    // ------------------------------------------------------------------

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
        self.announcer.announce("Zoom in");
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
        self.announcer.announce("Zoom out");
    }

    pub fn zoom_at(&mut self, cursor: Point, delta_sign: f32) {
        self.viewport.zoom_at(cursor, delta_sign);
        self.announcer.announce(if delta_sign < 0.0 {
            "Zoom in"
        } else {
            "Zoom out"
        });
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.viewport.pan_by(dx, dy);
    }

    pub fn begin_drag(&mut self, origin: Point) {
        self.viewport.begin_drag(origin);
    }

    pub fn drag_to(&mut self, point: Point) {
        self.viewport.drag_to(point);
    }

    pub fn end_drag(&mut self) {
        self.viewport.end_drag();
    }

    // ------------------------------------------------------------------
    // Markers and selection
    // ------------------------------------------------------------------

    /// Drops a marker at the intrinsic point currently shown at the center
    /// of a viewport of the given display size.
    pub fn add_marker(&mut self, viewport_size: Point) {
        let center = self
            .viewport
            .transform()
            .to_world(Point::new(viewport_size.x / 2.0, viewport_size.y / 2.0));
        let marker = self.markers.add_at_center(center);
        self.announcer.announce(format!("{} added", marker.name));
    }

    pub fn select_region(&mut self, name: &str) {
        self.selected_region = Some(name.to_string());
        self.announcer.announce(format!("{name} selected"));
    }

    pub fn set_hovered_region(&mut self, name: Option<String>) {
        self.hovered_region = name;
    }

    /// Resolved name of the region shown at a display-space point, if any.
    pub fn region_name_at(&self, screen: Point) -> Option<String> {
        let world = self.viewport.transform().to_world(screen);
        self.scene
            .region_at(world)
            .map(|path| path.display_name().to_string())
    }

    /// Dispatches a click at a display-space point through the augmented
    /// tree's handler chain, then applies the selection it produced.
    pub fn click_at(&mut self, screen: Point) -> Option<String> {
        let world = self.viewport.transform().to_world(screen);
        let augmented = self.augmented();
        if let Some(path) = augmented.region_at(world) {
            // the topmost region consumes the click; nothing underneath sees it
            path.on_click.invoke(path.display_name());
        }

        let selected = self.selection_slot.borrow_mut().take();
        if let Some(name) = &selected {
            self.select_region(name);
        }
        selected
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Runs the augmentation pass against the current state.
    pub fn augmented(&self) -> Scene {
        let slot = Rc::clone(&self.selection_slot);
        let ctx = AugmentContext {
            transform: self.viewport.transform(),
            markers: self.markers.list(),
            hovered: self.hovered_region.as_deref(),
            on_select: Rc::new(move |name: &str| {
                *slot.borrow_mut() = Some(name.to_string());
            }),
        };
        augment(&self.scene, &ctx)
    }

    /// Records that the augmented tree failed to render. The fallback to the
    /// pristine artwork is permanent for this mount; there is no retry, and
    /// the failure is logged rather than surfaced to the user.
    pub fn mark_render_failure(&mut self) {
        if self.render_mode == RenderMode::Vector {
            log::warn!("augmented scene failed to render; showing the pristine artwork instead");
            self.render_mode = RenderMode::Pristine;
        }
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Alt text describing the exported view for the inserted element.
    pub fn export_alt_text(&self) -> String {
        match self.markers.len() {
            1 => "World map view with 1 marker".to_string(),
            n => format!("World map view with {n} markers"),
        }
    }

    /// Renders the export payload for the current state without touching the
    /// host bridge.
    pub fn export_view(
        &self,
        pipeline: &ExportPipeline,
        viewport: (u32, u32),
    ) -> Result<ExportedImage, ExportError> {
        match self.render_mode {
            RenderMode::Vector => ExportPipeline::export_scene(&self.augmented(), viewport),
            RenderMode::Pristine | RenderMode::Bitmap => {
                pipeline.export_view(self.viewport.transform(), viewport)
            }
        }
    }

    /// Full export action: render, upload, insert. Aborts before any host
    /// call when rendering fails; a host failure leaves no local state.
    pub fn export_and_insert(
        &mut self,
        pipeline: &ExportPipeline,
        bridge: &dyn HostBridge,
        viewport: (u32, u32),
    ) -> Result<AssetRef, ExportFlowError> {
        let image = self.export_view(pipeline, viewport)?;
        let asset = upload_and_insert(bridge, &image, &self.export_alt_text())?;
        self.announcer.announce("Map image added to document");
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::scene::{Group, HandlerChain, PaintStyle, Path, SceneNode};
    use crate::viewport::ZOOM_STEP;

    const WORLD_PNG: &[u8] = include_bytes!("../assets/world.png");

    fn test_scene() -> Scene {
        let region = |id: &str, data_name: Option<&str>, bounds: Rect| {
            SceneNode::Path(Path {
                id: Some(id.to_string()),
                data_name: data_name.map(str::to_string),
                d: "M0,0 L10,0 L10,10 Z".to_string(),
                bounds,
                style: PaintStyle::default(),
                title: None,
                on_click: HandlerChain::new(),
            })
        };
        Scene {
            width: 800.0,
            height: 400.0,
            root: SceneNode::Group(Group {
                id: Some("world".to_string()),
                transform: None,
                children: vec![
                    region("ocean", Some("Ocean"), Rect::new(0.0, 0.0, 800.0, 400.0)),
                    region("europe", Some("Europe"), Rect::new(370.0, 50.0, 120.0, 80.0)),
                ],
            }),
        }
    }

    #[test]
    fn zoom_operations_announce() {
        let mut panel = MapPanel::new(test_scene(), false);
        panel.zoom_in();
        assert_eq!(panel.announcement(), Some("Zoom in"));
        assert!((panel.viewport().zoom() - ZOOM_STEP).abs() < 1e-6);

        panel.zoom_at(Point::new(100.0, 100.0), 1.0);
        assert_eq!(panel.announcement(), Some("Zoom out"));
    }

    #[test]
    fn add_marker_uses_view_center_in_intrinsic_coords() {
        let mut panel = MapPanel::new(test_scene(), false);
        panel.pan_by(100.0, 50.0);
        panel.add_marker(Point::new(800.0, 400.0));

        let markers = panel.markers().list();
        assert_eq!(markers.len(), 1);
        assert_eq!((markers[0].x, markers[0].y), (300.0, 150.0));
        assert_eq!(panel.announcement(), Some("Marker 1 added"));

        // zoom changes where the view center lands in intrinsic space
        panel.zoom_in();
        panel.add_marker(Point::new(800.0, 400.0));
        let second = &panel.markers().list()[1];
        assert!((second.x - (400.0 - 100.0) / ZOOM_STEP).abs() < 1e-3);
        assert!((second.y - (200.0 - 50.0) / ZOOM_STEP).abs() < 1e-3);
    }

    #[test]
    fn click_selects_region_through_handler_chain() {
        let mut panel = MapPanel::new(test_scene(), false);
        let selected = panel.click_at(Point::new(400.0, 80.0));
        assert_eq!(selected.as_deref(), Some("Europe"));
        assert_eq!(panel.selected_region(), Some("Europe"));
        assert_eq!(panel.announcement(), Some("Europe selected"));

        // pan so the same display point now shows the ocean
        panel.pan_by(300.0, 0.0);
        let selected = panel.click_at(Point::new(400.0, 80.0));
        assert_eq!(selected.as_deref(), Some("Ocean"));
    }

    #[test]
    fn render_failure_fallback_is_permanent() {
        let mut panel = MapPanel::new(test_scene(), false);
        assert_eq!(panel.render_mode(), RenderMode::Vector);

        panel.mark_render_failure();
        assert_eq!(panel.render_mode(), RenderMode::Pristine);
        panel.mark_render_failure();
        assert_eq!(panel.render_mode(), RenderMode::Pristine);

        // safe mode is untouched by render failures
        let mut safe = MapPanel::new(test_scene(), true);
        safe.mark_render_failure();
        assert_eq!(safe.render_mode(), RenderMode::Bitmap);
    }

    #[test]
    fn export_and_insert_uploads_then_inserts() {
        use crate::bridge::RecordingBridge;

        let pipeline = ExportPipeline::new(WORLD_PNG).expect("background decodes");
        let bridge = RecordingBridge::default();

        let mut panel = MapPanel::new(test_scene(), true);
        panel.add_marker(Point::new(800.0, 400.0));
        panel
            .export_and_insert(&pipeline, &bridge, (800, 300))
            .expect("export flow succeeds");

        let uploads = bridge.uploads.borrow();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].kind, "image");
        assert_eq!(uploads[0].mime_type, "image/png");
        assert!(uploads[0].data.starts_with("data:image/png;base64,"));

        let inserts = bridge.inserts.borrow();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].1, "World map view with 1 marker");

        assert_eq!(panel.announcement(), Some("Map image added to document"));
    }

    #[test]
    fn failed_render_makes_no_host_calls() {
        use crate::bridge::RecordingBridge;

        let pipeline = ExportPipeline::new(WORLD_PNG).expect("background decodes");
        let bridge = RecordingBridge::default();

        let mut panel = MapPanel::new(test_scene(), true);
        let result = panel.export_and_insert(&pipeline, &bridge, (0, 300));
        assert!(matches!(
            result,
            Err(ExportFlowError::Render(ExportError::RenderingUnavailable))
        ));
        assert!(bridge.uploads.borrow().is_empty());
        assert!(bridge.inserts.borrow().is_empty());
    }

    #[test]
    fn vector_mode_export_matches_viewport_size() {
        let pipeline = ExportPipeline::new(WORLD_PNG).expect("background decodes");
        let mut panel = MapPanel::new(test_scene(), false);
        panel.zoom_in();
        panel.pan_by(-50.0, 25.0);

        let exported = panel
            .export_view(&pipeline, (640, 480))
            .expect("vector export succeeds");
        assert_eq!((exported.width, exported.height), (640, 480));
    }
}
