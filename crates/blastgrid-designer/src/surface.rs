//! Retained-mode drawing surface
//!
//! The renderers issue draw calls against [`DrawingSurface`] only. A surface
//! is a tree of groups holding primitives (circle, line, polygon, text,
//! rectangle) plus a stage describing the viewport. [`MemorySurface`] keeps
//! the tree in memory; it backs the headless binary, the raster preview and
//! the tests.

use blastgrid_core::PatternError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Surface node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Viewport of the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageInfo {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub x: f64,
    pub y: f64,
}

impl StageInfo {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scale: 1.0,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// Drawable geometry, in coordinates relative to the owning group
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        x: f64,
        y: f64,
        radius: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    /// Regular polygon centred on `(x, y)`, first vertex straight up
    Polygon {
        x: f64,
        y: f64,
        sides: u32,
        radius: f64,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        font_size: f64,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

impl Shape {
    pub fn circle(x: f64, y: f64, radius: f64) -> Self {
        Shape::Circle { x, y, radius }
    }

    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Shape::Line { x1, y1, x2, y2 }
    }

    pub fn polygon(x: f64, y: f64, sides: u32, radius: f64) -> Self {
        Shape::Polygon {
            x,
            y,
            sides,
            radius,
        }
    }

    pub fn text(x: f64, y: f64, text: impl Into<String>, font_size: f64) -> Self {
        Shape::Text {
            x,
            y,
            text: text.into(),
            font_size,
        }
    }

    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Shape::Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Vertices of a [`Shape::Polygon`], empty for other shapes.
    pub fn polygon_vertices(&self) -> Vec<(f64, f64)> {
        match self {
            Shape::Polygon {
                x,
                y,
                sides,
                radius,
            } if *sides >= 3 => (0..*sides)
                .map(|i| {
                    let angle = std::f64::consts::TAU * i as f64 / *sides as f64
                        - std::f64::consts::FRAC_PI_2;
                    (x + radius * angle.cos(), y + radius * angle.sin())
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Fill and stroke, as CSS colour strings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f64,
}

impl Style {
    pub fn stroke(color: impl Into<String>, width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(color.into()),
            stroke_width: width,
        }
    }

    pub fn fill(color: impl Into<String>) -> Self {
        Self {
            fill: Some(color.into()),
            stroke: None,
            stroke_width: 0.0,
        }
    }

    pub fn with_stroke(mut self, color: impl Into<String>, width: f64) -> Self {
        self.stroke = Some(color.into());
        self.stroke_width = width;
        self
    }
}

/// A shape with its style and an optional lookup name
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub shape: Shape,
    pub style: Style,
    pub name: Option<String>,
}

impl Primitive {
    pub fn new(shape: Shape, style: Style) -> Self {
        Self {
            shape,
            style,
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Group attributes
#[derive(Debug, Clone, PartialEq)]
pub struct GroupAttrs {
    pub name: Option<String>,
    /// Offset from the parent group
    pub x: f64,
    pub y: f64,
    pub draggable: bool,
    pub visible: bool,
}

impl Default for GroupAttrs {
    fn default() -> Self {
        Self {
            name: None,
            x: 0.0,
            y: 0.0,
            draggable: false,
            visible: true,
        }
    }
}

impl GroupAttrs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Unknown surface node {0}")]
    UnknownNode(NodeId),

    #[error("Surface node {0} is not a group")]
    NotAGroup(NodeId),

    #[error("Surface backend error: {0}")]
    Backend(String),
}

impl From<SurfaceError> for PatternError {
    fn from(err: SurfaceError) -> Self {
        PatternError::rendering(err.to_string())
    }
}

pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

/// Retained-mode 2D scene
pub trait DrawingSurface: Send {
    /// Viewport, or `None` when the surface is not attached to a stage.
    fn stage(&self) -> Option<StageInfo>;

    /// Root group every other node descends from.
    fn root(&self) -> NodeId;

    fn create_group(&mut self, parent: NodeId, attrs: GroupAttrs) -> SurfaceResult<NodeId>;

    fn add(&mut self, group: NodeId, primitive: Primitive) -> SurfaceResult<NodeId>;

    /// Deep copy of the primitives directly inside `group`.
    fn snapshot(&self, group: NodeId) -> SurfaceResult<Vec<Primitive>>;

    /// Number of direct children of `group`.
    fn child_count(&self, group: NodeId) -> SurfaceResult<usize>;

    /// Remove every child of `group`, keeping the group.
    fn destroy_children(&mut self, group: NodeId) -> SurfaceResult<()>;

    /// Remove the direct children of `group` named `name`. Returns how many
    /// were removed.
    fn destroy_named(&mut self, group: NodeId, name: &str) -> SurfaceResult<usize>;

    /// Remove a node and its subtree.
    fn destroy(&mut self, node: NodeId) -> SurfaceResult<()>;

    fn set_visible(&mut self, node: NodeId, visible: bool) -> SurfaceResult<()>;

    fn set_draggable(&mut self, node: NodeId, draggable: bool) -> SurfaceResult<()>;

    fn contains(&self, node: NodeId) -> bool;

    /// Flush pending draws.
    fn batch_draw(&mut self);
}

/// Surface shared between renderers
pub type SharedSurface<S> = Arc<Mutex<S>>;

pub fn shared<S: DrawingSurface>(surface: S) -> SharedSurface<S> {
    Arc::new(Mutex::new(surface))
}

#[derive(Debug, Clone)]
enum NodeKind {
    Group {
        attrs: GroupAttrs,
        children: Vec<NodeId>,
    },
    Primitive(Primitive),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// Visitor item for [`MemorySurface::walk`]
#[derive(Debug, Clone, Copy)]
pub struct Placed<'a> {
    pub primitive: &'a Primitive,
    /// Accumulated group offset
    pub origin: (f64, f64),
}

/// In-memory scene tree
#[derive(Debug)]
pub struct MemorySurface {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    stage: Option<StageInfo>,
    draw_count: u64,
}

impl MemorySurface {
    /// Surface attached to a stage of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        let mut surface = Self::detached();
        surface.stage = Some(StageInfo::new(width, height));
        surface
    }

    /// Surface with no stage; the renderers refuse to initialize on it.
    pub fn detached() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                parent: None,
                kind: NodeKind::Group {
                    attrs: GroupAttrs::named("root"),
                    children: Vec::new(),
                },
            },
        );
        Self {
            nodes,
            root,
            next_id: 1,
            stage: None,
            draw_count: 0,
        }
    }

    pub fn set_stage(&mut self, stage: Option<StageInfo>) {
        self.stage = stage;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if let Some(stage) = self.stage.as_mut() {
            stage.width = width;
            stage.height = height;
        }
    }

    /// Number of `batch_draw` calls so far.
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    /// Total number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn group_attrs(&self, node: NodeId) -> SurfaceResult<&GroupAttrs> {
        match self.nodes.get(&node).map(|n| &n.kind) {
            Some(NodeKind::Group { attrs, .. }) => Ok(attrs),
            Some(NodeKind::Primitive(_)) => Err(SurfaceError::NotAGroup(node)),
            None => Err(SurfaceError::UnknownNode(node)),
        }
    }

    /// Direct child groups of `group` named `name`.
    pub fn find_groups(&self, group: NodeId, name: &str) -> SurfaceResult<Vec<NodeId>> {
        Ok(self
            .children(group)?
            .iter()
            .copied()
            .filter(|child| {
                matches!(
                    self.nodes.get(child).map(|n| &n.kind),
                    Some(NodeKind::Group { attrs, .. }) if attrs.name.as_deref() == Some(name)
                )
            })
            .collect())
    }

    /// Direct child primitives of `group`.
    pub fn primitives(&self, group: NodeId) -> SurfaceResult<Vec<&Primitive>> {
        Ok(self
            .children(group)?
            .iter()
            .filter_map(|child| match self.nodes.get(child).map(|n| &n.kind) {
                Some(NodeKind::Primitive(p)) => Some(p),
                _ => None,
            })
            .collect())
    }

    /// Visit every visible primitive in draw order with its absolute origin.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(Placed<'_>),
    {
        self.walk_from(self.root, (0.0, 0.0), &mut visit);
    }

    fn walk_from<F>(&self, node: NodeId, origin: (f64, f64), visit: &mut F)
    where
        F: FnMut(Placed<'_>),
    {
        match self.nodes.get(&node).map(|n| &n.kind) {
            Some(NodeKind::Group { attrs, children }) if attrs.visible => {
                let origin = (origin.0 + attrs.x, origin.1 + attrs.y);
                for child in children {
                    self.walk_from(*child, origin, visit);
                }
            }
            Some(NodeKind::Primitive(primitive)) => visit(Placed { primitive, origin }),
            _ => {}
        }
    }

    fn children(&self, group: NodeId) -> SurfaceResult<&Vec<NodeId>> {
        match self.nodes.get(&group).map(|n| &n.kind) {
            Some(NodeKind::Group { children, .. }) => Ok(children),
            Some(NodeKind::Primitive(_)) => Err(SurfaceError::NotAGroup(group)),
            None => Err(SurfaceError::UnknownNode(group)),
        }
    }

    fn children_mut(&mut self, group: NodeId) -> SurfaceResult<&mut Vec<NodeId>> {
        match self.nodes.get_mut(&group).map(|n| &mut n.kind) {
            Some(NodeKind::Group { children, .. }) => Ok(children),
            Some(NodeKind::Primitive(_)) => Err(SurfaceError::NotAGroup(group)),
            None => Err(SurfaceError::UnknownNode(group)),
        }
    }

    fn attrs_mut(&mut self, node: NodeId) -> SurfaceResult<&mut GroupAttrs> {
        match self.nodes.get_mut(&node).map(|n| &mut n.kind) {
            Some(NodeKind::Group { attrs, .. }) => Ok(attrs),
            Some(NodeKind::Primitive(_)) => Err(SurfaceError::NotAGroup(node)),
            None => Err(SurfaceError::UnknownNode(node)),
        }
    }

    fn insert(&mut self, parent: NodeId, kind: NodeKind) -> SurfaceResult<NodeId> {
        let id = NodeId(self.next_id);
        self.children_mut(parent)?.push(id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                parent: Some(parent),
                kind,
            },
        );
        Ok(id)
    }

    fn remove_subtree(&mut self, node: NodeId) {
        if let Some(removed) = self.nodes.remove(&node) {
            if let NodeKind::Group { children, .. } = removed.kind {
                for child in children {
                    self.remove_subtree(child);
                }
            }
        }
    }
}

impl DrawingSurface for MemorySurface {
    fn stage(&self) -> Option<StageInfo> {
        self.stage
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn create_group(&mut self, parent: NodeId, attrs: GroupAttrs) -> SurfaceResult<NodeId> {
        self.insert(
            parent,
            NodeKind::Group {
                attrs,
                children: Vec::new(),
            },
        )
    }

    fn add(&mut self, group: NodeId, primitive: Primitive) -> SurfaceResult<NodeId> {
        self.insert(group, NodeKind::Primitive(primitive))
    }

    fn snapshot(&self, group: NodeId) -> SurfaceResult<Vec<Primitive>> {
        Ok(self.primitives(group)?.into_iter().cloned().collect())
    }

    fn child_count(&self, group: NodeId) -> SurfaceResult<usize> {
        Ok(self.children(group)?.len())
    }

    fn destroy_children(&mut self, group: NodeId) -> SurfaceResult<()> {
        let children = std::mem::take(self.children_mut(group)?);
        for child in children {
            self.remove_subtree(child);
        }
        Ok(())
    }

    fn destroy_named(&mut self, group: NodeId, name: &str) -> SurfaceResult<usize> {
        let children = self.children(group)?.clone();
        let (doomed, kept): (Vec<NodeId>, Vec<NodeId>) =
            children.into_iter().partition(|child| {
                let node_name = match self.nodes.get(child).map(|n| &n.kind) {
                    Some(NodeKind::Group { attrs, .. }) => attrs.name.as_deref(),
                    Some(NodeKind::Primitive(p)) => p.name.as_deref(),
                    None => None,
                };
                node_name == Some(name)
            });

        *self.children_mut(group)? = kept;
        let removed = doomed.len();
        for child in doomed {
            self.remove_subtree(child);
        }
        Ok(removed)
    }

    fn destroy(&mut self, node: NodeId) -> SurfaceResult<()> {
        if node == self.root {
            return self.destroy_children(node);
        }
        let parent = self
            .nodes
            .get(&node)
            .ok_or(SurfaceError::UnknownNode(node))?
            .parent;
        if let Some(parent) = parent {
            self.children_mut(parent)?.retain(|child| *child != node);
        }
        self.remove_subtree(node);
        Ok(())
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) -> SurfaceResult<()> {
        self.attrs_mut(node)?.visible = visible;
        Ok(())
    }

    fn set_draggable(&mut self, node: NodeId, draggable: bool) -> SurfaceResult<()> {
        self.attrs_mut(node)?.draggable = draggable;
        Ok(())
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn batch_draw(&mut self) {
        self.draw_count += 1;
    }
}
