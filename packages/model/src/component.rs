//! The concrete component tree.
//!
//! Components own their children outright, so a tree can never contain a cycle.
//! Upward navigation goes through [`ParentIndex`], a side table keyed by id.

use crate::ids::ComponentId;
use crate::style::{Layout, Style};
use crate::tags::tagged_enum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Tag of a plugin-provided component type. Always in `128..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ExtensionId(u8);

impl ExtensionId {
    pub const FIRST: u8 = 128;

    pub fn new(tag: u8) -> Option<Self> {
        (tag >= Self::FIRST).then_some(Self(tag))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ExtensionId {
    type Error = String;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::new(tag).ok_or_else(|| format!("extension tags start at {}, got {}", Self::FIRST, tag))
    }
}

impl From<ExtensionId> for u8 {
    fn from(id: ExtensionId) -> u8 {
        id.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Container,
    Row,
    Column,
    Center,
    Text,
    Button,
    Input,
    Checkbox,
    Dropdown,
    Image,
    Canvas,
    Modal,
    List,
    ListItem,
    Link,
    Heading,
    Paragraph,
    Span,
    TabGroup,
    TabBar,
    TabPanel,
    Table,
    TableRow,
    TableCell,
    ForEach,
    Conditional,
    Extension(ExtensionId),
}

const BUILTINS: [(ComponentType, &str); 26] = [
    (ComponentType::Container, "Container"),
    (ComponentType::Row, "Row"),
    (ComponentType::Column, "Column"),
    (ComponentType::Center, "Center"),
    (ComponentType::Text, "Text"),
    (ComponentType::Button, "Button"),
    (ComponentType::Input, "Input"),
    (ComponentType::Checkbox, "Checkbox"),
    (ComponentType::Dropdown, "Dropdown"),
    (ComponentType::Image, "Image"),
    (ComponentType::Canvas, "Canvas"),
    (ComponentType::Modal, "Modal"),
    (ComponentType::List, "List"),
    (ComponentType::ListItem, "ListItem"),
    (ComponentType::Link, "Link"),
    (ComponentType::Heading, "Heading"),
    (ComponentType::Paragraph, "Paragraph"),
    (ComponentType::Span, "Span"),
    (ComponentType::TabGroup, "TabGroup"),
    (ComponentType::TabBar, "TabBar"),
    (ComponentType::TabPanel, "TabPanel"),
    (ComponentType::Table, "Table"),
    (ComponentType::TableRow, "TableRow"),
    (ComponentType::TableCell, "TableCell"),
    (ComponentType::ForEach, "ForEach"),
    (ComponentType::Conditional, "Conditional"),
];

impl ComponentType {
    /// Highest tag reserved for built-in types. Tags between this and
    /// [`ExtensionId::FIRST`] are unassigned.
    pub const MAX_BUILTIN_TAG: u8 = 31;

    pub fn tag(self) -> u8 {
        match self {
            ComponentType::Extension(ext) => ext.get(),
            builtin => BUILTINS
                .iter()
                .position(|(kind, _)| *kind == builtin)
                .map(|index| index as u8)
                .unwrap_or(0),
        }
    }

    /// Decode a tag. Unassigned built-in tags (26..=31) and reserved tags (32..=127)
    /// yield `None`.
    pub fn from_tag(tag: u8) -> Option<Self> {
        if let Some(ext) = ExtensionId::new(tag) {
            return Some(ComponentType::Extension(ext));
        }
        BUILTINS.get(tag as usize).map(|(kind, _)| *kind)
    }

    /// Resolve a built-in element name such as `Column`.
    pub fn from_name(name: &str) -> Option<Self> {
        BUILTINS
            .iter()
            .find(|(_, builtin)| *builtin == name)
            .map(|(kind, _)| *kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            ComponentType::Extension(_) => "Extension",
            builtin => BUILTINS
                .iter()
                .find(|(kind, _)| *kind == builtin)
                .map(|(_, name)| *name)
                .unwrap_or("Container"),
        }
    }

    pub fn is_extension(self) -> bool {
        matches!(self, ComponentType::Extension(_))
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentType::Extension(ext) => write!(f, "Extension({})", ext.get()),
            builtin => f.write_str(builtin.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Click,
    Hover,
    Focus,
    Blur,
    TextChange,
    KeyPress,
    Scroll,
    Submit,
    Timer,
    Custom,
}

tagged_enum!(EventType {
    Click = 0,
    Hover = 1,
    Focus = 2,
    Blur = 3,
    TextChange = 4,
    KeyPress = 5,
    Scroll = 6,
    Submit = 7,
    Timer = 8,
    Custom = 9,
});

impl EventType {
    /// Map a handler property such as `onClick` to its event type.
    pub fn from_property(name: &str) -> Option<Self> {
        let event = name.strip_prefix("on")?;
        match event {
            "Click" => Some(EventType::Click),
            "Hover" => Some(EventType::Hover),
            "Focus" => Some(EventType::Focus),
            "Blur" => Some(EventType::Blur),
            "Change" | "TextChange" => Some(EventType::TextChange),
            "KeyPress" => Some(EventType::KeyPress),
            "Scroll" => Some(EventType::Scroll),
            "Submit" => Some(EventType::Submit),
            "Timer" => Some(EventType::Timer),
            other if other.starts_with(|c: char| c.is_ascii_uppercase()) => Some(EventType::Custom),
            _ => None,
        }
    }
}

/// An event binding. The handler is an opaque id resolved by the host runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHandler {
    pub kind: EventType,
    pub handler: String,
    pub data: Option<String>,
}

impl EventHandler {
    pub fn new(kind: EventType, handler: impl Into<String>) -> Self {
        Self {
            kind,
            handler: handler.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub kind: ComponentType,
    pub text: Option<String>,
    pub custom_data: Option<String>,
    pub style: Option<Box<Style>>,
    pub layout: Option<Layout>,
    pub events: Vec<EventHandler>,
    children: Vec<Component>,
}

impl Component {
    pub fn new(id: ComponentId, kind: ComponentType) -> Self {
        Self {
            id,
            kind,
            text: None,
            custom_data: None,
            style: None,
            layout: None,
            events: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_custom_data(mut self, data: impl Into<String>) -> Self {
        self.custom_data = Some(data.into());
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(Box::new(style));
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_event(mut self, event: EventHandler) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_child(mut self, child: Component) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child. Children are never reordered or removed once attached.
    pub fn push_child(&mut self, child: Component) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Component] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Component] {
        &mut self.children
    }

    pub fn into_children(self) -> Vec<Component> {
        self.children
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = Some(Box::new(style));
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = Some(layout);
    }

    pub fn add_event(&mut self, event: EventHandler) {
        self.events.push(event);
    }

    pub fn style_mut(&mut self) -> &mut Style {
        self.style.get_or_insert_with(Box::default)
    }

    pub fn layout_mut(&mut self) -> &mut Layout {
        self.layout.get_or_insert_with(Layout::default)
    }

    /// Depth-first preorder walk over this node and its descendants.
    pub fn iter(&self) -> Preorder<'_> {
        Preorder {
            inner: self.iter_with_depth(),
        }
    }

    /// Preorder walk yielding `(depth, node)`, the root being at depth 1.
    pub fn iter_with_depth(&self) -> DepthPreorder<'_> {
        DepthPreorder {
            stack: vec![(1, self)],
        }
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    pub fn find(&self, id: ComponentId) -> Option<&Component> {
        self.iter().find(|node| node.id == id)
    }

    pub fn find_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter_mut().rev());
        }
        None
    }

    /// Apply `f` to every node in preorder without recursion.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Component)) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            f(node);
            stack.extend(node.children.iter_mut().rev());
        }
    }

    /// All strings carried by this node, used for size accounting.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.text
            .as_deref()
            .into_iter()
            .chain(self.custom_data.as_deref())
            .chain(
                self.events
                    .iter()
                    .flat_map(|e| std::iter::once(e.handler.as_str()).chain(e.data.as_deref())),
            )
            .chain(self.style.iter().flat_map(|s| s.strings()))
    }
}

/// Lazy preorder traversal. Cloning it snapshots the position, so a walk can be restarted.
#[derive(Debug, Clone)]
pub struct Preorder<'a> {
    inner: DepthPreorder<'a>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Component;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, node)| node)
    }
}

#[derive(Debug, Clone)]
pub struct DepthPreorder<'a> {
    stack: Vec<(usize, &'a Component)>,
}

impl<'a> Iterator for DepthPreorder<'a> {
    type Item = (usize, &'a Component);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

/// Child-to-parent lookup built from a tree snapshot.
#[derive(Debug, Clone, Default)]
pub struct ParentIndex {
    parents: HashMap<ComponentId, ComponentId>,
}

impl ParentIndex {
    pub fn build(root: &Component) -> Self {
        let mut parents = HashMap::new();
        for node in root.iter() {
            for child in node.children() {
                parents.insert(child.id, node.id);
            }
        }
        Self { parents }
    }

    pub fn parent_of(&self, id: ComponentId) -> Option<ComponentId> {
        self.parents.get(&id).copied()
    }

    /// Ids from `id`'s parent up to the root.
    pub fn ancestors(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }
}
