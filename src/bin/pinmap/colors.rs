//! Color constants for overlays drawn with the egui painter (safe mode).

use eframe::egui::Color32;

// Marker glyphs (matches the vector layer's #e4572e / #ffffff)
pub const MARKER_FILL: Color32 = Color32::from_rgb(228, 87, 46);
pub const MARKER_STROKE: Color32 = Color32::WHITE;

// Live-region / status text
pub const ANNOUNCEMENT_TEXT: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 220);
