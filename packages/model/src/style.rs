//! Visual properties attached to a component.
//!
//! Every variable-length list on [`Style`] is capped at [`STYLE_ARRAY_CAP`]. The cap is
//! part of the contract: writers refuse to emit more entries and readers reject files
//! that declare more. Nothing is truncated silently.

use crate::tags::tagged_enum;
use serde::{Deserialize, Serialize};

pub const STYLE_ARRAY_CAP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DimensionKind {
    Px,
    Percent,
    #[default]
    Auto,
    Flex,
}

tagged_enum!(DimensionKind { Px = 0, Percent = 1, Auto = 2, Flex = 3 });

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub kind: DimensionKind,
    pub value: f32,
}

impl Dimension {
    pub fn px(value: f32) -> Self {
        Self { kind: DimensionKind::Px, value }
    }

    pub fn percent(value: f32) -> Self {
        Self { kind: DimensionKind::Percent, value }
    }

    pub fn flex(value: f32) -> Self {
        Self { kind: DimensionKind::Flex, value }
    }

    pub fn auto() -> Self {
        Self::default()
    }

    pub fn is_auto(&self) -> bool {
        self.kind == DimensionKind::Auto
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// A color value. Gradients and style variables are referenced by id, never owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    #[default]
    Transparent,
    Solid(Rgba),
    Gradient(u32),
    Variable(u32),
}

impl Color {
    pub const TAG_TRANSPARENT: u8 = 0;
    pub const TAG_SOLID: u8 = 1;
    pub const TAG_GRADIENT: u8 = 2;
    pub const TAG_VARIABLE: u8 = 3;

    pub fn tag(&self) -> u8 {
        match self {
            Color::Transparent => Self::TAG_TRANSPARENT,
            Color::Solid(_) => Self::TAG_SOLID,
            Color::Gradient(_) => Self::TAG_GRADIENT,
            Color::Variable(_) => Self::TAG_VARIABLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spacing {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Spacing {
    pub fn uniform(value: f32) -> Self {
        Self { top: value, right: value, bottom: value, left: value }
    }

    pub fn symmetric(vertical: f32, horizontal: f32) -> Self {
        Self { top: vertical, right: horizontal, bottom: vertical, left: horizontal }
    }

    pub fn values(&self) -> [f32; 4] {
        [self.top, self.right, self.bottom, self.left]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Border {
    pub width: f32,
    pub color: Color,
    pub radius: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

tagged_enum!(TextAlign { Left = 0, Center = 1, Right = 2, Justify = 3 });

pub const DEFAULT_FONT_SIZE: f32 = 16.0;
pub const DEFAULT_FONT_WEIGHT: u16 = 400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typography {
    pub size: f32,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub weight: u16,
    pub family: Option<String>,
    pub align: TextAlign,
    /// Multiplier of the font size; 0 means the renderer default.
    pub line_height: f32,
    pub letter_spacing: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            size: DEFAULT_FONT_SIZE,
            color: Color::Transparent,
            bold: false,
            italic: false,
            weight: DEFAULT_FONT_WEIGHT,
            family: None,
            align: TextAlign::Left,
            line_height: 0.0,
            letter_spacing: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionMode {
    #[default]
    Relative,
    Absolute,
}

tagged_enum!(PositionMode { Relative = 0, Absolute = 1 });

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub mode: PositionMode,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

tagged_enum!(Easing { Linear = 0, EaseIn = 1, EaseOut = 2, EaseInOut = 3 });

impl Easing {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Easing::Linear),
            "easeIn" | "ease-in" => Some(Easing::EaseIn),
            "easeOut" | "ease-out" => Some(Easing::EaseOut),
            "easeInOut" | "ease-in-out" | "ease" => Some(Easing::EaseInOut),
            _ => None,
        }
    }
}

/// Iteration count of -1 loops forever.
pub const INFINITE_ITERATIONS: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub name: String,
    pub duration_ms: f32,
    pub delay_ms: f32,
    pub iteration_count: i32,
    pub easing: Easing,
    pub alternate: bool,
}

impl Animation {
    pub fn new(name: impl Into<String>, duration_ms: f32) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            delay_ms: 0.0,
            iteration_count: 1,
            easing: Easing::default(),
            alternate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub property: String,
    pub duration_ms: f32,
    pub delay_ms: f32,
    pub easing: Easing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PseudoState {
    Hover,
    Active,
    Focus,
    Disabled,
    Checked,
}

tagged_enum!(PseudoState { Hover = 0, Active = 1, Focus = 2, Disabled = 3, Checked = 4 });

impl PseudoState {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hover" => Some(PseudoState::Hover),
            "active" => Some(PseudoState::Active),
            "focus" => Some(PseudoState::Focus),
            "disabled" => Some(PseudoState::Disabled),
            "checked" => Some(PseudoState::Checked),
            _ => None,
        }
    }
}

/// Property overrides applied while a component is in a pseudo state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudoStyle {
    pub state: PseudoState,
    pub background: Option<Color>,
    pub text_color: Option<Color>,
    pub border_color: Option<Color>,
    pub opacity: Option<f32>,
}

impl PseudoStyle {
    pub fn new(state: PseudoState) -> Self {
        Self {
            state,
            background: None,
            text_color: None,
            border_color: None,
            opacity: None,
        }
    }
}

/// Overrides applied while the viewport width lies in `[min_width, max_width)`.
/// A `max_width` of 0 means unbounded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Breakpoint {
    pub min_width: f32,
    pub max_width: f32,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Blur,
    Brightness,
    Contrast,
    Grayscale,
    HueRotate,
    Invert,
    Opacity,
    Saturate,
    Sepia,
}

tagged_enum!(FilterKind {
    Blur = 0,
    Brightness = 1,
    Contrast = 2,
    Grayscale = 3,
    HueRotate = 4,
    Invert = 5,
    Opacity = 6,
    Saturate = 7,
    Sepia = 8,
});

impl FilterKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "blur" => Some(FilterKind::Blur),
            "brightness" => Some(FilterKind::Brightness),
            "contrast" => Some(FilterKind::Contrast),
            "grayscale" => Some(FilterKind::Grayscale),
            "hueRotate" => Some(FilterKind::HueRotate),
            "invert" => Some(FilterKind::Invert),
            "opacity" => Some(FilterKind::Opacity),
            "saturate" => Some(FilterKind::Saturate),
            "sepia" => Some(FilterKind::Sepia),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub kind: FilterKind,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Shadow {
    pub offset_x: f32,
    pub offset_y: f32,
    pub blur: f32,
    pub spread: f32,
    pub color: Color,
    pub inset: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub width: Dimension,
    pub height: Dimension,
    pub background: Color,
    pub border: Border,
    pub margin: Spacing,
    pub padding: Spacing,
    pub font: Typography,
    pub visible: bool,
    pub opacity: f32,
    pub z_index: u32,
    pub position: Position,
    pub animations: Vec<Animation>,
    pub transitions: Vec<Transition>,
    pub pseudo_styles: Vec<PseudoStyle>,
    pub breakpoints: Vec<Breakpoint>,
    pub filters: Vec<Filter>,
    pub shadows: Vec<Shadow>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            width: Dimension::auto(),
            height: Dimension::auto(),
            background: Color::Transparent,
            border: Border::default(),
            margin: Spacing::default(),
            padding: Spacing::default(),
            font: Typography::default(),
            visible: true,
            opacity: 1.0,
            z_index: 0,
            position: Position::default(),
            animations: Vec::new(),
            transitions: Vec::new(),
            pseudo_styles: Vec::new(),
            breakpoints: Vec::new(),
            filters: Vec::new(),
            shadows: Vec::new(),
        }
    }
}

impl Style {
    /// Entry counts of every capped list, keyed by field name.
    pub fn capped_lengths(&self) -> [(&'static str, usize); 6] {
        [
            ("animations", self.animations.len()),
            ("transitions", self.transitions.len()),
            ("pseudo_styles", self.pseudo_styles.len()),
            ("breakpoints", self.breakpoints.len()),
            ("filters", self.filters.len()),
            ("shadows", self.shadows.len()),
        ]
    }

    /// The first capped list holding more than [`STYLE_ARRAY_CAP`] entries.
    pub fn first_over_cap(&self) -> Option<(&'static str, usize)> {
        self.capped_lengths()
            .into_iter()
            .find(|(_, len)| *len > STYLE_ARRAY_CAP)
    }

    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.font
            .family
            .as_deref()
            .into_iter()
            .chain(self.animations.iter().map(|a| a.name.as_str()))
            .chain(self.transitions.iter().map(|t| t.property.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    Row,
    #[default]
    Column,
    RowReverse,
    ColumnReverse,
}

tagged_enum!(Direction { Row = 0, Column = 1, RowReverse = 2, ColumnReverse = 3 });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
    Stretch,
}

tagged_enum!(Alignment {
    Start = 0,
    Center = 1,
    End = 2,
    SpaceBetween = 3,
    SpaceAround = 4,
    SpaceEvenly = 5,
    Stretch = 6,
});

impl Alignment {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Alignment::Start),
            "center" => Some(Alignment::Center),
            "end" => Some(Alignment::End),
            "spaceBetween" => Some(Alignment::SpaceBetween),
            "spaceAround" => Some(Alignment::SpaceAround),
            "spaceEvenly" => Some(Alignment::SpaceEvenly),
            "stretch" => Some(Alignment::Stretch),
            _ => None,
        }
    }
}

/// Flexbox-style layout description. Purely descriptive: no geometry is solved here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub direction: Direction,
    pub wrap: bool,
    pub gap: f32,
    pub main_axis: Alignment,
    pub cross_axis: Alignment,
    pub grow: f32,
    pub shrink: f32,
    pub min_width: Dimension,
    pub max_width: Dimension,
    pub min_height: Dimension,
    pub max_height: Dimension,
    /// Width divided by height; 0 leaves it unconstrained.
    pub aspect_ratio: f32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            direction: Direction::Column,
            wrap: false,
            gap: 0.0,
            main_axis: Alignment::Start,
            cross_axis: Alignment::Start,
            grow: 0.0,
            shrink: 1.0,
            min_width: Dimension::auto(),
            max_width: Dimension::auto(),
            min_height: Dimension::auto(),
            max_height: Dimension::auto(),
            aspect_ratio: 0.0,
        }
    }
}
