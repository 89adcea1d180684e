//! Vector scene graph for the background artwork.
//!
//! The scene is supplied at build time as a RON document (`assets/world.ron`)
//! and is treated as immutable: the augmentation pass in [`crate::augment`]
//! rebuilds a fresh copy instead of mutating it. Serialization to SVG text is
//! what both the vector render mode and the vector export path consume.

use crate::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

/// Display name used for regions that carry neither a `data-name` nor an id.
pub const REGION_FALLBACK_NAME: &str = "Region";

/// A scene with its nominal intrinsic size in design units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    pub root: SceneNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneNode {
    Group(Group),
    Path(Path),
    Circle(Circle),
    /// Accessible title element.
    Title(String),
    /// Plain character data; passes through augmentation unchanged.
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub id: Option<String>,
    /// Translate-then-scale transform applied to all children.
    #[serde(default)]
    pub transform: Option<GroupTransform>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupTransform {
    pub translate: Point,
    pub scale: f32,
}

/// A selectable region of the artwork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    #[serde(default)]
    pub id: Option<String>,
    /// Authoring-tool display name; wins over `id` when resolving the
    /// region's name.
    #[serde(default)]
    pub data_name: Option<String>,
    /// SVG path data.
    pub d: String,
    /// Intrinsic-space hit box for pointer interaction.
    pub bounds: Rect,
    pub style: PaintStyle,
    /// Accessible title injected by augmentation; serialized as the
    /// element's first child.
    #[serde(default)]
    pub title: Option<String>,
    /// Click handlers, invoked front to back.
    #[serde(skip)]
    pub on_click: HandlerChain,
}

impl Path {
    /// Resolved display name: `data-name`, then id, then the localized
    /// fallback literal. Regions with equal names share identity.
    pub fn display_name(&self) -> &str {
        self.data_name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or(REGION_FALLBACK_NAME)
    }
}

/// Marker glyph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
    pub style: PaintStyle,
    /// Accessible label, serialized as a title child.
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintStyle {
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default)]
    pub stroke: Option<String>,
    #[serde(default)]
    pub stroke_width: f32,
    /// Brightness multiplier baked into emitted colors; 1.0 leaves them
    /// untouched. The hover highlight lowers this and nothing else.
    #[serde(default = "default_brightness")]
    pub brightness: f32,
}

fn default_brightness() -> f32 {
    1.0
}

impl Default for PaintStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            brightness: 1.0,
        }
    }
}

/// Region click callback; receives the resolved region name.
pub type RegionHandler = Rc<dyn Fn(&str)>;

/// Explicit ordered list of click handlers, invoked front to back.
///
/// Wrapping an existing handler is done by prepending, which keeps the
/// new-then-old invocation order an explicit, testable contract instead of
/// ad-hoc closure composition.
#[derive(Clone, Default)]
pub struct HandlerChain(Vec<RegionHandler>);

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_handler(handler: RegionHandler) -> Self {
        Self(vec![handler])
    }

    /// Inserts `handler` ahead of every existing one.
    pub fn prepend(&mut self, handler: RegionHandler) {
        self.0.insert(0, handler);
    }

    pub fn invoke(&self, region_name: &str) {
        for handler in &self.0 {
            handler(region_name);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerChain").field(&self.0.len()).finish()
    }
}

/// Handlers have no usable identity, so chains compare by length. This keeps
/// whole trees structurally comparable in tests.
impl PartialEq for HandlerChain {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
    }
}

impl Scene {
    /// The topmost path whose hit box contains `point` (intrinsic
    /// coordinates). Later siblings draw on top, so the last match wins.
    pub fn region_at(&self, point: Point) -> Option<&Path> {
        let mut hit = None;
        find_region(&self.root, point, &mut hit);
        hit
    }

    /// Serializes the scene as a standalone SVG document with explicit pixel
    /// dimensions stamped on the root element.
    pub fn to_svg(&self, pixel_width: u32, pixel_height: u32) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{pixel_width}\" \
             height=\"{pixel_height}\" viewBox=\"0 0 {pixel_width} {pixel_height}\">"
        );
        write_node(&mut out, &self.root);
        out.push_str("</svg>");
        out
    }
}

fn find_region<'a>(node: &'a SceneNode, point: Point, hit: &mut Option<&'a Path>) {
    match node {
        SceneNode::Group(group) => {
            for child in &group.children {
                find_region(child, point, hit);
            }
        }
        SceneNode::Path(path) => {
            if path.bounds.contains(point) {
                *hit = Some(path);
            }
        }
        SceneNode::Circle(_) | SceneNode::Title(_) | SceneNode::Text(_) => {}
    }
}

fn write_node(out: &mut String, node: &SceneNode) {
    match node {
        SceneNode::Group(group) => {
            out.push_str("<g");
            if let Some(id) = &group.id {
                let _ = write!(out, " id=\"{}\"", escape_xml(id));
            }
            if let Some(transform) = &group.transform {
                let _ = write!(
                    out,
                    " transform=\"translate({} {}) scale({})\"",
                    transform.translate.x, transform.translate.y, transform.scale
                );
            }
            out.push('>');
            for child in &group.children {
                write_node(out, child);
            }
            out.push_str("</g>");
        }
        SceneNode::Path(path) => {
            out.push_str("<path");
            if let Some(id) = &path.id {
                let _ = write!(out, " id=\"{}\"", escape_xml(id));
            }
            if let Some(data_name) = &path.data_name {
                let _ = write!(out, " data-name=\"{}\"", escape_xml(data_name));
            }
            let _ = write!(out, " d=\"{}\"", escape_xml(&path.d));
            write_paint(out, &path.style);
            match &path.title {
                Some(title) => {
                    let _ = write!(out, "><title>{}</title></path>", escape_xml(title));
                }
                None => out.push_str("/>"),
            }
        }
        SceneNode::Circle(circle) => {
            let _ = write!(
                out,
                "<circle cx=\"{}\" cy=\"{}\" r=\"{}\"",
                circle.cx, circle.cy, circle.r
            );
            write_paint(out, &circle.style);
            match &circle.label {
                Some(label) => {
                    let _ = write!(out, "><title>{}</title></circle>", escape_xml(label));
                }
                None => out.push_str("/>"),
            }
        }
        SceneNode::Title(title) => {
            let _ = write!(out, "<title>{}</title>", escape_xml(title));
        }
        SceneNode::Text(text) => out.push_str(&escape_xml(text)),
    }
}

fn write_paint(out: &mut String, style: &PaintStyle) {
    match &style.fill {
        Some(fill) => {
            let _ = write!(out, " fill=\"{}\"", shade(fill, style.brightness));
        }
        None => out.push_str(" fill=\"none\""),
    }
    if let Some(stroke) = &style.stroke {
        let _ = write!(
            out,
            " stroke=\"{}\" stroke-width=\"{}\"",
            shade(stroke, style.brightness),
            style.stroke_width
        );
    }
}

/// Applies a brightness multiplier to a `#rrggbb` color. Anything else is
/// passed through untouched.
fn shade(color: &str, brightness: f32) -> String {
    if (brightness - 1.0).abs() < f32::EPSILON {
        return color.to_string();
    }
    let Some(hex) = color.strip_prefix('#') else {
        return color.to_string();
    };
    if hex.len() != 6 {
        return color.to_string();
    }
    let Ok(rgb) = u32::from_str_radix(hex, 16) else {
        return color.to_string();
    };
    let scale = |channel: u32| -> u32 {
        ((channel as f32 * brightness).round() as u32).min(255)
    };
    format!(
        "#{:02x}{:02x}{:02x}",
        scale((rgb >> 16) & 0xff),
        scale((rgb >> 8) & 0xff),
        scale(rgb & 0xff)
    )
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
