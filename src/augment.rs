//! Recursive augmentation of the background scene graph.
//!
//! Each pass rebuilds a fresh tree from the immutable source scene: children
//! are fully augmented before their parent wraps them, so the root-level
//! wrapping sees an already-augmented subtree. Given the same inputs the pass
//! produces a structurally equivalent tree, which makes it safe to recompute
//! on every zoom, pan, marker, hover, or selection change.

use crate::geometry::ViewTransform;
use crate::markers::Marker;
use crate::scene::{
    Circle, Group, GroupTransform, PaintStyle, Path, RegionHandler, Scene, SceneNode,
};
use std::rc::Rc;

/// Marker glyph radius, in intrinsic units.
pub const MARKER_RADIUS: f32 = 6.0;

/// Marker glyph fill.
pub const MARKER_FILL: &str = "#e4572e";

/// Marker glyph stroke.
pub const MARKER_STROKE: &str = "#ffffff";

/// Brightness multiplier applied to the hovered region. Nothing else about
/// its style changes.
pub const HOVER_BRIGHTNESS: f32 = 0.8;

/// Inputs for one augmentation pass.
#[derive(Clone)]
pub struct AugmentContext<'a> {
    pub transform: ViewTransform,
    pub markers: &'a [Marker],
    /// Resolved name of the region currently under the pointer, if any.
    pub hovered: Option<&'a str>,
    /// Selection callback, prepended to each region's click handler chain.
    pub on_select: RegionHandler,
}

/// Produces the augmented scene: the original children wrapped in a view
/// transform group with a marker layer appended after them, and every region
/// decorated with its accessible title, click handler, and hover highlight.
pub fn augment(scene: &Scene, ctx: &AugmentContext) -> Scene {
    let root = match &scene.root {
        SceneNode::Group(group) => {
            let mut wrapped: Vec<SceneNode> = group
                .children
                .iter()
                .map(|child| augment_node(child, ctx))
                .collect();
            wrapped.push(SceneNode::Group(marker_layer(ctx.markers)));

            SceneNode::Group(Group {
                id: group.id.clone(),
                transform: group.transform,
                children: vec![SceneNode::Group(Group {
                    id: Some("view-transform".to_string()),
                    transform: Some(GroupTransform {
                        translate: ctx.transform.pan,
                        scale: ctx.transform.zoom,
                    }),
                    children: wrapped,
                })],
            })
        }
        other => augment_node(other, ctx),
    };

    Scene {
        width: scene.width,
        height: scene.height,
        root,
    }
}

fn augment_node(node: &SceneNode, ctx: &AugmentContext) -> SceneNode {
    match node {
        SceneNode::Group(group) => SceneNode::Group(Group {
            id: group.id.clone(),
            transform: group.transform,
            children: group
                .children
                .iter()
                .map(|child| augment_node(child, ctx))
                .collect(),
        }),
        SceneNode::Path(path) => SceneNode::Path(augment_region(path, ctx)),
        // not selectable regions; pass through unchanged
        other => other.clone(),
    }
}

fn augment_region(path: &Path, ctx: &AugmentContext) -> Path {
    let name = path.display_name().to_string();

    // The selection callback runs first and any pre-existing handlers after
    // it, preserving them.
    let mut on_click = path.on_click.clone();
    on_click.prepend(Rc::clone(&ctx.on_select));

    let mut style = path.style.clone();
    style.brightness = if ctx.hovered == Some(name.as_str()) {
        HOVER_BRIGHTNESS
    } else {
        1.0
    };

    Path {
        id: path.id.clone(),
        data_name: path.data_name.clone(),
        d: path.d.clone(),
        bounds: path.bounds,
        style,
        title: Some(name),
        on_click,
    }
}

fn marker_layer(markers: &[Marker]) -> Group {
    Group {
        id: Some("markers".to_string()),
        transform: None,
        children: markers
            .iter()
            .map(|marker| {
                SceneNode::Circle(Circle {
                    cx: marker.x,
                    cy: marker.y,
                    r: MARKER_RADIUS,
                    style: PaintStyle {
                        fill: Some(MARKER_FILL.to_string()),
                        stroke: Some(MARKER_STROKE.to_string()),
                        stroke_width: 1.5,
                        brightness: 1.0,
                    },
                    label: Some(marker.name.clone()),
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::markers::MarkerStore;
    use crate::scene::HandlerChain;
    use std::cell::RefCell;

    fn test_scene() -> Scene {
        let region = |id: &str, data_name: Option<&str>| {
            SceneNode::Path(Path {
                id: Some(id.to_string()),
                data_name: data_name.map(str::to_string),
                d: "M0,0 L10,0 L10,10 Z".to_string(),
                bounds: Rect::new(0.0, 0.0, 10.0, 10.0),
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
                    region("alpha", Some("Alpha")),
                    SceneNode::Group(Group {
                        id: None,
                        transform: None,
                        children: vec![region("beta", None)],
                    }),
                ],
            }),
        }
    }

    fn test_ctx<'a>(markers: &'a [Marker], hovered: Option<&'a str>) -> AugmentContext<'a> {
        AugmentContext {
            transform: ViewTransform {
                zoom: 2.0,
                pan: Point::new(15.0, -30.0),
            },
            markers,
            hovered,
            on_select: Rc::new(|_| {}),
        }
    }

    fn view_group(scene: &Scene) -> &Group {
        let SceneNode::Group(root) = &scene.root else {
            panic!("root is not a group");
        };
        let [SceneNode::Group(view)] = root.children.as_slice() else {
            panic!("root does not wrap a single transform group");
        };
        view
    }

    #[test]
    fn root_wraps_children_and_appends_marker_layer() {
        let mut store = MarkerStore::new();
        store.add_at_center(Point::new(100.0, 50.0));
        store.add_at_center(Point::new(200.0, 80.0));

        let scene = test_scene();
        let augmented = augment(&scene, &test_ctx(store.list(), None));

        let view = view_group(&augmented);
        assert_eq!(
            view.transform,
            Some(GroupTransform {
                translate: Point::new(15.0, -30.0),
                scale: 2.0,
            })
        );
        // original children first, marker layer last
        assert_eq!(view.children.len(), 3);
        let Some(SceneNode::Group(markers)) = view.children.last() else {
            panic!("marker layer missing");
        };
        assert_eq!(markers.id.as_deref(), Some("markers"));
        assert_eq!(markers.children.len(), 2);
        let SceneNode::Circle(first) = &markers.children[0] else {
            panic!("marker layer child is not a circle");
        };
        assert_eq!((first.cx, first.cy), (100.0, 50.0));
        assert_eq!(first.label.as_deref(), Some("Marker 1"));
    }

    #[test]
    fn regions_get_titles_and_handlers_at_every_depth() {
        let scene = test_scene();
        let augmented = augment(&scene, &test_ctx(&[], None));

        let view = view_group(&augmented);
        let SceneNode::Path(alpha) = &view.children[0] else {
            panic!("first child is not a path");
        };
        assert_eq!(alpha.title.as_deref(), Some("Alpha"));
        assert_eq!(alpha.on_click.len(), 1);

        let SceneNode::Group(inner) = &view.children[1] else {
            panic!("second child is not a group");
        };
        let SceneNode::Path(beta) = &inner.children[0] else {
            panic!("nested path missing");
        };
        // no data-name: falls back to the id
        assert_eq!(beta.title.as_deref(), Some("beta"));
        assert_eq!(beta.on_click.len(), 1);
    }

    #[test]
    fn augmentation_is_pure() {
        let mut store = MarkerStore::new();
        store.add_at_center(Point::new(10.0, 20.0));
        let scene = test_scene();
        let ctx = test_ctx(store.list(), Some("Alpha"));

        let first = augment(&scene, &ctx);
        let second = augment(&scene, &ctx);
        assert_eq!(first, second);
        // the source is untouched
        assert_eq!(scene, test_scene());
    }

    #[test]
    fn selection_callback_runs_before_preexisting_handlers() {
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut scene = test_scene();
        if let SceneNode::Group(root) = &mut scene.root {
            if let SceneNode::Path(path) = &mut root.children[0] {
                let old = Rc::clone(&log);
                path.on_click = HandlerChain::from_handler(Rc::new(move |name: &str| {
                    old.borrow_mut().push(format!("old:{name}"));
                }));
            }
        }

        let select = Rc::clone(&log);
        let ctx = AugmentContext {
            transform: ViewTransform::default(),
            markers: &[],
            hovered: None,
            on_select: Rc::new(move |name: &str| {
                select.borrow_mut().push(format!("select:{name}"));
            }),
        };

        let augmented = augment(&scene, &ctx);
        let view = view_group(&augmented);
        let SceneNode::Path(alpha) = &view.children[0] else {
            panic!("first child is not a path");
        };
        alpha.on_click.invoke(alpha.display_name());
        assert_eq!(*log.borrow(), ["select:Alpha", "old:Alpha"]);
    }

    #[test]
    fn hover_reduces_brightness_of_that_region_only() {
        let scene = test_scene();
        let augmented = augment(&scene, &test_ctx(&[], Some("Alpha")));

        let view = view_group(&augmented);
        let SceneNode::Path(alpha) = &view.children[0] else {
            panic!("first child is not a path");
        };
        assert_eq!(alpha.style.brightness, HOVER_BRIGHTNESS);
        assert_eq!(alpha.style.fill, PaintStyle::default().fill);

        let SceneNode::Group(inner) = &view.children[1] else {
            panic!("second child is not a group");
        };
        let SceneNode::Path(beta) = &inner.children[0] else {
            panic!("nested path missing");
        };
        assert_eq!(beta.style.brightness, 1.0);
    }
}
