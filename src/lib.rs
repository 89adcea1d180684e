//! Interactive, pannable/zoomable world map panel with point markers and
//! raster export into a host document.
//!
//! This crate is the host-agnostic core: viewport transforms, the marker
//! store, scene-graph augmentation, the announcement live-region slot, the
//! export pipelines, and the host bridge contract. The `pinmap` binary mounts
//! a [`MapPanel`] inside an egui panel and wires a bridge implementation to
//! it.

pub mod announce;
pub mod augment;
pub mod bridge;
pub mod export;
pub mod geometry;
pub mod markers;
pub mod panel;
pub mod scene;
pub mod viewport;

pub use geometry::{Point, Rect, ViewTransform};
pub use panel::{MapPanel, RenderMode};
pub use scene::Scene;
