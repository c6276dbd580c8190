use std::fmt;

use crate::processing::{TrajectoryLine, TriangulatedSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Line,
    Fiber,
    Necrosis,
    Electrode,
    Contacts,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Line => "line",
            NodeKind::Fiber => "fiber",
            NodeKind::Necrosis => "necrosis",
            NodeKind::Electrode => "electrode",
            NodeKind::Contacts => "contacts",
        }
    }

    /// Slice-intersection outline width in pixels.
    pub fn intersection_thickness(&self) -> u32 {
        match self {
            NodeKind::Line | NodeKind::Contacts => 1,
            NodeKind::Fiber | NodeKind::Necrosis => 5,
            NodeKind::Electrode => 4,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a node is drawn in 3D and in the slice views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayProperties {
    pub color: [f64; 3],
    pub opacity: f64,
    pub visible: bool,
    pub slice_intersection_visible: bool,
    pub slice_intersection_thickness: u32,
}

impl DisplayProperties {
    /// Color channels and opacity are clamped to [0, 1].
    pub fn new(kind: NodeKind, color: [f64; 3], opacity: f64) -> Self {
        Self {
            color: color.map(|c| c.clamp(0.0, 1.0)),
            opacity: opacity.clamp(0.0, 1.0),
            visible: true,
            slice_intersection_visible: kind != NodeKind::Line,
            slice_intersection_thickness: kind.intersection_thickness(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Surface(TriangulatedSurface),
    Line(TrajectoryLine),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub handle: NodeHandle,
    pub name: String,
    pub kind: NodeKind,
    pub payload: NodePayload,
    pub display: DisplayProperties,
}

/// Receiver of the models produced by the planner.
///
/// With `overwrite` an existing node of the same name is replaced, otherwise
/// the new node gets a numbered name (see [`unique_name`]).
pub trait SceneSink {
    fn add_node(
        &mut self,
        name: &str,
        kind: NodeKind,
        payload: NodePayload,
        display: DisplayProperties,
        overwrite: bool,
    ) -> NodeHandle;

    /// Name the node actually received, suffix included.
    fn node_name(&self, handle: NodeHandle) -> Option<String>;

    fn add_surface(
        &mut self,
        name: &str,
        kind: NodeKind,
        surface: TriangulatedSurface,
        display: DisplayProperties,
        overwrite: bool,
    ) -> NodeHandle {
        self.add_node(name, kind, NodePayload::Surface(surface), display, overwrite)
    }

    fn add_line(
        &mut self,
        name: &str,
        line: TrajectoryLine,
        display: DisplayProperties,
        overwrite: bool,
    ) -> NodeHandle {
        self.add_node(name, NodeKind::Line, NodePayload::Line(line), display, overwrite)
    }
}

/// Returns `base` when it is free or `overwrite` is set, otherwise the first of
/// `"<base> (2)"`, `"<base> (3)"`, ... not taken.
pub fn unique_name(base: &str, overwrite: bool, exists: impl Fn(&str) -> bool) -> String {
    if overwrite || !exists(base) {
        return base.to_string();
    }
    let mut idx = 2;
    loop {
        let candidate = format!("{} ({})", base, idx);
        if !exists(&candidate) {
            return candidate;
        }
        idx += 1;
    }
}

pub fn default_base_name(entry_label: &str, target_label: &str) -> String {
    format!("Trajectory {}\u{2192}{}", entry_label, target_label)
}

pub fn fiber_name(base: &str, fiber_diameter: f64) -> String {
    format!("{} (fiber \u{d8}{:.2}mm)", base, fiber_diameter)
}

/// `index` is 1-based.
pub fn necrosis_name(base: &str, index: usize) -> String {
    format!("{} (necrosis {})", base, index)
}

fn custom_name(custom: Option<&str>) -> Option<&str> {
    custom.map(str::trim).filter(|s| !s.is_empty())
}

pub fn electrode_name(base: &str, contact_count: usize, custom: Option<&str>) -> String {
    match custom_name(custom) {
        Some(name) => name.to_string(),
        None => format!("{} (SEEG {}C)", base, contact_count),
    }
}

pub fn contacts_name(base: &str, custom: Option<&str>) -> String {
    format!("{} (contacts)", custom_name(custom).unwrap_or(base))
}

/// Scene kept in memory; stands in for the host scene in pipelines and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScene {
    nodes: Vec<SceneNode>,
    next_id: u64,
}

impl InMemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.name == name)
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.handle == handle)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Named surfaces, in insertion order, for export.
    pub fn surfaces(&self) -> Vec<(String, TriangulatedSurface)> {
        self.nodes
            .iter()
            .filter_map(|n| match &n.payload {
                NodePayload::Surface(s) => Some((n.name.clone(), s.clone())),
                NodePayload::Line(_) => None,
            })
            .collect()
    }

    pub fn remove(&mut self, handle: NodeHandle) -> Option<SceneNode> {
        let idx = self.nodes.iter().position(|n| n.handle == handle)?;
        Some(self.nodes.remove(idx))
    }
}

impl SceneSink for InMemoryScene {
    fn add_node(
        &mut self,
        name: &str,
        kind: NodeKind,
        payload: NodePayload,
        display: DisplayProperties,
        overwrite: bool,
    ) -> NodeHandle {
        if overwrite {
            let before = self.nodes.len();
            self.nodes.retain(|n| n.name != name);
            if self.nodes.len() != before {
                log::debug!("replaced existing node '{}'", name);
            }
        }
        let name = unique_name(name, overwrite, |candidate| self.contains(candidate));

        self.next_id += 1;
        let handle = NodeHandle(self.next_id);
        log::debug!("adding {} node '{}'", kind, name);
        self.nodes.push(SceneNode {
            handle,
            name,
            kind,
            payload,
            display,
        });
        handle
    }

    fn node_name(&self, handle: NodeHandle) -> Option<String> {
        self.node(handle).map(|n| n.name.clone())
    }
}
