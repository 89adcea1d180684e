//! Append-only store of named point markers in intrinsic coordinates.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A dropped point marker. Never mutated or deleted after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Unique, time-derived id.
    pub id: String,
    /// Intrinsic x coordinate (not display coordinates).
    pub x: f32,
    /// Intrinsic y coordinate.
    pub y: f32,
    /// Sequential human-readable name ("Marker 1", "Marker 2", ...).
    pub name: String,
}

/// Insertion-ordered marker collection; order is render order, last on top.
#[derive(Debug, Default)]
pub struct MarkerStore {
    markers: Vec<Marker>,
    /// Numbers are handed out once and never reused.
    next_number: u64,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a marker at the given intrinsic-space position and returns it.
    /// Always succeeds.
    pub fn add_at_center(&mut self, center: Point) -> Marker {
        self.next_number += 1;
        let marker = Marker {
            id: fresh_id(self.next_number),
            x: center.x,
            y: center.y,
            name: format!("Marker {}", self.next_number),
        };
        self.markers.push(marker.clone());
        marker
    }

    /// Markers in insertion order.
    pub fn list(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

fn fresh_id(sequence: u64) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    // The sequence suffix keeps ids unique even when the clock does not tick
    // between two adds.
    format!("marker-{nanos:x}-{sequence}")
}
