//! UI rendering methods for the pinmap panel.

use crate::PinmapApp;
use crate::colors;
use crate::constants::SIDEBAR_WIDTH;
use crate::export_task::{ExportSource, ExportTask};
use eframe::egui;
use pinmap::augment::MARKER_RADIUS;
use pinmap::export::{INTRINSIC_HEIGHT, INTRINSIC_WIDTH, rasterize_svg};
use pinmap::geometry::Point;
use pinmap::panel::RenderMode;
use pinmap::viewport::PAN_STEP;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

impl PinmapApp {
    /// Handles keyboard shortcuts for zoom and pan.
    pub fn handle_keyboard_input(&mut self, ctx: &egui::Context) {
        ctx.input(|i| {
            if i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals) {
                self.panel.zoom_in();
            }
            if i.key_pressed(egui::Key::Minus) {
                self.panel.zoom_out();
            }
            if i.key_pressed(egui::Key::ArrowLeft) {
                self.panel.pan_by(PAN_STEP, 0.0);
            }
            if i.key_pressed(egui::Key::ArrowRight) {
                self.panel.pan_by(-PAN_STEP, 0.0);
            }
            if i.key_pressed(egui::Key::ArrowUp) {
                self.panel.pan_by(0.0, PAN_STEP);
            }
            if i.key_pressed(egui::Key::ArrowDown) {
                self.panel.pan_by(0.0, -PAN_STEP);
            }
        });
    }

    /// Renders the bottom status bar: controls hint plus the announcement
    /// live region.
    pub fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Scroll: Zoom | Drag: Pan | +/-: Zoom | Arrows: Pan");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(message) = self.panel.announcement() {
                        ui.colored_label(colors::ANNOUNCEMENT_TEXT, message);
                    }
                });
            });
        });
    }

    /// Renders the left sidebar panel.
    pub fn show_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("sidebar")
            .exact_width(SIDEBAR_WIDTH)
            .resizable(false)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.show_sidebar_content(ui, ctx);
                });
            });
    }

    fn show_sidebar_content(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.add_space(4.0);

        ui.strong("Markers");
        ui.separator();

        if ui.button("Add marker at center").clicked() {
            let size = self.last_viewport;
            self.panel.add_marker(Point::new(size.x, size.y));
        }

        if self.panel.markers().is_empty() {
            ui.label("No markers yet");
        } else {
            for marker in self.panel.markers().list() {
                ui.label(format!(
                    "{} ({:.0}, {:.0})",
                    marker.name, marker.x, marker.y
                ));
            }
        }

        ui.add_space(12.0);

        ui.strong("Selection");
        ui.separator();
        match self.panel.selected_region() {
            Some(name) => ui.label(name),
            None => ui.label("Nothing selected"),
        };

        ui.add_space(12.0);

        ui.strong("Export");
        ui.separator();
        let mode = match self.panel.render_mode() {
            RenderMode::Vector => "vector",
            RenderMode::Pristine => "vector (static)",
            RenderMode::Bitmap => "bitmap",
        };
        ui.label(format!("Render mode: {mode}"));

        let exporting = self.export_task.is_some();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!exporting, egui::Button::new("Export to document"))
                .clicked()
            {
                self.start_export(ctx);
            }
            if exporting {
                ui.spinner();
            }
        });

        if let Some(path) = self.last_export.clone() {
            ui.label(format!("Last export: {}", path.display()));
            if ui.button("Open").clicked()
                && let Err(err) = open::that(&path)
            {
                log::warn!("failed to open {}: {err}", path.display());
            }
        }
    }

    /// Renders the central panel containing the map view.
    pub fn show_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let panel_rect = ui.max_rect();
            self.show_map(ui, ctx);
            self.show_zoom_controls(ctx, panel_rect);
        });
    }

    /// Renders the floating zoom controls.
    fn show_zoom_controls(&mut self, ctx: &egui::Context, panel_rect: egui::Rect) {
        let margin = 12.0;
        let panel_width = 120.0;
        let panel_height = 36.0;

        let anchor_pos = egui::pos2(
            panel_rect.right() - panel_width - margin,
            panel_rect.bottom() - panel_height - margin,
        );

        egui::Area::new(egui::Id::new("zoom_controls"))
            .fixed_pos(anchor_pos)
            .interactable(true)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .fill(ui.style().visuals.window_fill.gamma_multiply(0.95))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            if ui.button("\u{2212}").clicked() {
                                self.panel.zoom_out();
                            }
                            ui.label(format!("{:.0}%", self.panel.viewport().zoom() * 100.0));
                            if ui.button("+").clicked() {
                                self.panel.zoom_in();
                            }
                        });
                    });
            });
    }

    /// Renders the map viewport and forwards pointer interaction to the
    /// panel state machine.
    fn show_map(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (viewport_rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        self.last_viewport = viewport_rect.size();

        let local = |pos: egui::Pos2| -> Point {
            Point::new(pos.x - viewport_rect.min.x, pos.y - viewport_rect.min.y)
        };

        // Scroll wheel: anchor zoom at the cursor. A positive egui scroll
        // delta (scrolling up) zooms in, which is a negative wheel sign.
        let hover_pos = ui.input(|i| i.pointer.hover_pos());
        let scroll_delta = ui.input(|i| i.raw_scroll_delta.y);
        if scroll_delta != 0.0
            && let Some(hover) = hover_pos
            && viewport_rect.contains(hover)
        {
            self.panel.zoom_at(local(hover), -scroll_delta.signum());
        }

        // Drag panning: idle -> dragging -> idle. Losing the pointer ends
        // the drag so the panning mode cannot get stuck.
        if response.drag_started()
            && let Some(pos) = response.interact_pointer_pos()
        {
            self.panel.begin_drag(local(pos));
        }
        if response.dragged()
            && let Some(pos) = response.interact_pointer_pos()
        {
            self.panel.drag_to(local(pos));
        }
        if response.drag_stopped() || !hover_pos.is_some_and(|p| viewport_rect.contains(p)) {
            self.panel.end_drag();
        }

        // Hover and selection only exist in the interactive vector mode.
        if self.panel.render_mode() == RenderMode::Vector {
            let hovered = hover_pos
                .filter(|p| viewport_rect.contains(*p))
                .and_then(|p| self.panel.region_name_at(local(p)));
            if hovered.is_some() {
                ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
            }
            self.panel.set_hovered_region(hovered);

            if response.clicked()
                && let Some(pos) = response.interact_pointer_pos()
            {
                self.panel.click_at(local(pos));
            }
        } else {
            self.panel.set_hovered_region(None);
        }

        ui.set_clip_rect(viewport_rect);

        match self.panel.render_mode() {
            RenderMode::Bitmap => self.draw_bitmap_view(ui, viewport_rect),
            RenderMode::Vector | RenderMode::Pristine => {
                if let Some(texture_id) = self.scene_texture(ctx, viewport_rect) {
                    ui.painter().image(
                        texture_id,
                        viewport_rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                } else {
                    // rasterization just failed; show the bitmap this frame
                    self.draw_bitmap_view(ui, viewport_rect);
                }
            }
        }
    }

    /// Safe-mode rendering: the pre-rendered bitmap through the view
    /// transform, markers painted on top.
    fn draw_bitmap_view(&self, ui: &mut egui::Ui, viewport_rect: egui::Rect) {
        let Some(texture) = &self.background_texture else {
            ui.centered_and_justified(|ui| {
                ui.label("Background artwork unavailable");
            });
            return;
        };

        let transform = self.panel.viewport().transform();
        let map_rect = egui::Rect::from_min_size(
            viewport_rect.min + egui::vec2(transform.pan.x, transform.pan.y),
            egui::vec2(INTRINSIC_WIDTH as f32, INTRINSIC_HEIGHT as f32) * transform.zoom,
        );

        ui.painter().image(
            texture.id(),
            map_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        for marker in self.panel.markers().list() {
            let screen = transform.to_screen(Point::new(marker.x, marker.y));
            let center = viewport_rect.min + egui::vec2(screen.x, screen.y);
            ui.painter().circle(
                center,
                MARKER_RADIUS * transform.zoom,
                colors::MARKER_FILL,
                egui::Stroke::new(1.5, colors::MARKER_STROKE),
            );
        }
    }

    /// Returns the rasterized scene texture, re-rendering it only when the
    /// relevant state changed. A rasterization failure trips the permanent
    /// pristine fallback and returns `None` for this frame.
    fn scene_texture(
        &mut self,
        ctx: &egui::Context,
        viewport_rect: egui::Rect,
    ) -> Option<egui::TextureId> {
        let width = viewport_rect.width().max(1.0) as u32;
        let height = viewport_rect.height().max(1.0) as u32;

        let generation = self.state_generation(width, height);
        if self.scene_generation != Some(generation) || self.scene_texture.is_none() {
            let svg = match self.panel.render_mode() {
                RenderMode::Vector => self.panel.augmented().to_svg(width, height),
                _ => self.panel.scene().to_svg(width, height),
            };

            match rasterize_svg(&svg, width, height) {
                Ok(raster) => {
                    let image = egui::ColorImage::from_rgba_unmultiplied(
                        [raster.width as usize, raster.height as usize],
                        &raster.pixels,
                    );
                    // replacing the handle releases the previous texture
                    self.scene_texture =
                        Some(ctx.load_texture("scene", image, egui::TextureOptions::LINEAR));
                    self.scene_generation = Some(generation);
                }
                Err(err) => {
                    log::warn!("scene rasterization failed: {err}");
                    self.panel.mark_render_failure();
                    self.scene_texture = None;
                    self.scene_generation = None;
                    return None;
                }
            }
        }

        self.scene_texture.as_ref().map(|texture| texture.id())
    }

    /// Hash of everything the rasterized scene depends on.
    fn state_generation(&self, width: u32, height: u32) -> u64 {
        let mut hasher = DefaultHasher::new();
        let transform = self.panel.viewport().transform();
        transform.zoom.to_bits().hash(&mut hasher);
        transform.pan.x.to_bits().hash(&mut hasher);
        transform.pan.y.to_bits().hash(&mut hasher);
        self.panel.markers().len().hash(&mut hasher);
        self.panel.hovered_region().hash(&mut hasher);
        (self.panel.render_mode() == RenderMode::Vector).hash(&mut hasher);
        width.hash(&mut hasher);
        height.hash(&mut hasher);
        hasher.finish()
    }

    /// Kicks off a background export of the current view. A second request
    /// while one is in flight is rejected.
    fn start_export(&mut self, ctx: &egui::Context) {
        if self.export_task.is_some() {
            self.toast_error("An export is already in progress".to_string());
            return;
        }
        let Some(pipeline) = self.pipeline.clone() else {
            self.toast_error("Export unavailable: background artwork failed to load".to_string());
            return;
        };

        let width = self.last_viewport.x.max(1.0) as u32;
        let height = self.last_viewport.y.max(1.0) as u32;
        let source = match self.panel.render_mode() {
            RenderMode::Vector => {
                ExportSource::Svg(self.panel.augmented().to_svg(width, height))
            }
            RenderMode::Pristine | RenderMode::Bitmap => {
                ExportSource::Bitmap(self.panel.viewport().transform())
            }
        };

        self.export_task = Some(ExportTask::start(
            source,
            (width, height),
            pipeline,
            Arc::clone(&self.bridge),
            self.panel.export_alt_text(),
            ctx.clone(),
        ));
    }
}
