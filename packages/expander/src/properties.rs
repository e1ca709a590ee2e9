//! Property vocabulary: maps `name = value` pairs onto a component's style, layout
//! and text. Anything outside the vocabulary lands in the custom-data object.

use crate::colors;
use crate::error::{CompileError, ExpandResult, SourceLocation};
use crate::value::Value;
use kir_model::{
    Alignment, Animation, Breakpoint, Color, Component, Dimension, Direction, Easing, Filter,
    FilterKind, PositionMode, PseudoState, PseudoStyle, Shadow, Spacing, Style, TextAlign,
    Transition, INFINITE_ITERATIONS, STYLE_ARRAY_CAP,
};
use serde_json::{Map, Value as Json};

/// Properties consumed by identity allocation rather than stored
pub const IDENTITY_PROPERTIES: [&str; 2] = ["id", "key"];

/// Is `name` an event handler property such as `onClick`?
pub fn is_event_property(name: &str) -> bool {
    name.strip_prefix("on")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
}

struct Prop<'a> {
    name: &'a str,
    value: &'a Value,
    location: &'a SourceLocation,
}

impl Prop<'_> {
    fn invalid(&self, expected: &str) -> CompileError {
        if let Value::Symbol(name) = self.value {
            return CompileError::UnresolvedReference {
                name: name.clone(),
                location: self.location.clone(),
                hint: Some(format!("'{}' expects {}", self.name, expected)),
            };
        }
        CompileError::invalid_property(
            self.name,
            format!("expected {}, found {}", expected, self.value.type_name()),
            self.location.clone(),
        )
    }

    fn number(&self) -> ExpandResult<f32> {
        self.value
            .as_number()
            .map(|n| n as f32)
            .ok_or_else(|| self.invalid("a number"))
    }

    fn non_negative(&self) -> ExpandResult<f32> {
        let n = self.number()?;
        if n < 0.0 {
            return Err(CompileError::invalid_property(
                self.name,
                format!("must not be negative, got {}", n),
                self.location.clone(),
            ));
        }
        Ok(n)
    }

    fn boolean(&self) -> ExpandResult<bool> {
        match self.value {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.invalid("true or false")),
        }
    }

    fn text(&self) -> ExpandResult<String> {
        match self.value {
            Value::Symbol(_) => Err(self.invalid("a value")),
            other => Ok(other.display_string()),
        }
    }

    fn dimension(&self) -> ExpandResult<Dimension> {
        to_dimension(self.value).ok_or_else(|| self.invalid("a dimension"))
    }

    fn color(&self) -> ExpandResult<Color> {
        to_color(self.value).ok_or_else(|| self.invalid("a color"))
    }

    fn word(&self, expected: &str) -> ExpandResult<&str> {
        self.value.as_word().ok_or_else(|| self.invalid(expected))
    }

    fn keyword<T>(&self, expected: &str, lookup: impl Fn(&str) -> Option<T>) -> ExpandResult<T> {
        let word = self.word(expected)?;
        lookup(word).ok_or_else(|| {
            CompileError::invalid_property(
                self.name,
                format!("expected {}, found '{}'", expected, word),
                self.location.clone(),
            )
        })
    }
}

pub fn to_dimension(value: &Value) -> Option<Dimension> {
    match value {
        Value::Number(n) => Some(Dimension::px(*n as f32)),
        Value::Dimension(d) => Some(*d),
        Value::String(s) | Value::Symbol(s) if s == "auto" => Some(Dimension::auto()),
        _ => None,
    }
}

pub fn to_color(value: &Value) -> Option<Color> {
    match value {
        Value::Color(color) => Some(*color),
        Value::String(s) if s.starts_with('#') => {
            colors::parse_hex(&s[1..]).map(Color::Solid)
        }
        Value::String(s) | Value::Symbol(s) => colors::named(s),
        _ => None,
    }
}

fn to_spacing(value: &Value) -> Option<Spacing> {
    let number = |v: &Value| v.as_number().map(|n| n as f32);
    match value {
        Value::Array(items) => match items.as_slice() {
            [all] => Some(Spacing::uniform(number(all)?)),
            [vertical, horizontal] => Some(Spacing::symmetric(number(vertical)?, number(horizontal)?)),
            [top, right, bottom, left] => Some(Spacing {
                top: number(top)?,
                right: number(right)?,
                bottom: number(bottom)?,
                left: number(left)?,
            }),
            _ => None,
        },
        other => number(other).map(Spacing::uniform),
    }
}

fn text_align(name: &str) -> Option<TextAlign> {
    match name {
        "left" | "start" => Some(TextAlign::Left),
        "center" => Some(TextAlign::Center),
        "right" | "end" => Some(TextAlign::Right),
        "justify" => Some(TextAlign::Justify),
        _ => None,
    }
}

fn direction(name: &str) -> Option<Direction> {
    match name {
        "row" => Some(Direction::Row),
        "column" => Some(Direction::Column),
        "rowReverse" => Some(Direction::RowReverse),
        "columnReverse" => Some(Direction::ColumnReverse),
        _ => None,
    }
}

fn position_mode(name: &str) -> Option<PositionMode> {
    match name {
        "relative" => Some(PositionMode::Relative),
        "absolute" => Some(PositionMode::Absolute),
        _ => None,
    }
}

fn font_weight(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) if (1.0..=1000.0).contains(n) => Some(*n as u16),
        Value::String(s) | Value::Symbol(s) => match s.as_str() {
            "thin" => Some(100),
            "light" => Some(300),
            "normal" => Some(400),
            "medium" => Some(500),
            "semibold" => Some(600),
            "bold" => Some(700),
            "black" => Some(900),
            _ => None,
        },
        _ => None,
    }
}

fn push_capped<T>(
    list: &mut Vec<T>,
    item: T,
    field: &'static str,
    location: &SourceLocation,
) -> ExpandResult<()> {
    if list.len() >= STYLE_ARRAY_CAP {
        return Err(CompileError::CapExceeded {
            field,
            cap: STYLE_ARRAY_CAP,
            location: location.clone(),
        });
    }
    list.push(item);
    Ok(())
}

/// Calls in a property value: either a single call or an array of calls
fn calls(value: &Value) -> Vec<(&str, &[Value])> {
    match value {
        Value::Call {
            function,
            arguments,
        } => vec![(function.as_str(), arguments.as_slice())],
        Value::Array(items) => items.iter().flat_map(calls).collect(),
        _ => Vec::new(),
    }
}

fn animation(args: &[Value]) -> Option<Animation> {
    let (name, rest) = args.split_first()?;
    let mut animation = Animation::new(name.as_word()?, 0.0);
    let mut numbers = 0;
    for arg in rest {
        match arg {
            Value::Number(_) | Value::Dimension(_) => {
                let n = arg.as_number()? as f32;
                match numbers {
                    0 => animation.duration_ms = n,
                    1 => animation.iteration_count = n as i32,
                    2 => animation.delay_ms = n,
                    _ => return None,
                }
                numbers += 1;
            }
            Value::String(word) | Value::Symbol(word) => match word.as_str() {
                "infinite" => animation.iteration_count = INFINITE_ITERATIONS,
                "alternate" => animation.alternate = true,
                other => animation.easing = Easing::from_name(other)?,
            },
            _ => return None,
        }
    }
    Some(animation)
}

fn transition(args: &[Value]) -> Option<Transition> {
    let (property, rest) = args.split_first()?;
    let mut transition = Transition {
        property: property.as_word()?.to_string(),
        duration_ms: 0.0,
        delay_ms: 0.0,
        easing: Easing::default(),
    };
    let mut numbers = 0;
    for arg in rest {
        if let Some(n) = arg.as_number() {
            match numbers {
                0 => transition.duration_ms = n as f32,
                1 => transition.delay_ms = n as f32,
                _ => return None,
            }
            numbers += 1;
        } else {
            transition.easing = Easing::from_name(arg.as_word()?)?;
        }
    }
    Some(transition)
}

fn shadow(args: &[Value]) -> Option<Shadow> {
    let mut shadow = Shadow {
        offset_x: 0.0,
        offset_y: 0.0,
        blur: 0.0,
        spread: 0.0,
        color: Color::Solid(kir_model::Rgba::new(0, 0, 0, 64)),
        inset: false,
    };
    let mut numbers = 0;
    for arg in args {
        if let Some(n) = arg.as_number() {
            let n = n as f32;
            match numbers {
                0 => shadow.offset_x = n,
                1 => shadow.offset_y = n,
                2 => shadow.blur = n,
                3 => shadow.spread = n,
                _ => return None,
            }
            numbers += 1;
        } else if matches!(arg, Value::Symbol(s) | Value::String(s) if s == "inset") {
            shadow.inset = true;
        } else {
            shadow.color = to_color(arg)?;
        }
    }
    Some(shadow)
}

fn filter(function: &str, args: &[Value]) -> Option<Filter> {
    let kind = FilterKind::from_name(function)?;
    let value = match args {
        [] => 1.0,
        [v] => v.as_number()? as f32,
        _ => return None,
    };
    Some(Filter { kind, value })
}

/// Apply one property. Returns `false` when the name is outside the vocabulary and
/// the value went to `custom` instead.
pub fn apply_property(
    component: &mut Component,
    name: &str,
    value: &Value,
    location: &SourceLocation,
    custom: &mut Map<String, Json>,
) -> ExpandResult<bool> {
    let prop = Prop {
        name,
        value,
        location,
    };

    match name {
        "text" => component.text = Some(prop.text()?),
        "width" => component.style_mut().width = prop.dimension()?,
        "height" => component.style_mut().height = prop.dimension()?,
        "background" => component.style_mut().background = prop.color()?,
        "color" => component.style_mut().font.color = prop.color()?,
        "borderColor" => component.style_mut().border.color = prop.color()?,
        "borderWidth" => component.style_mut().border.width = prop.non_negative()?,
        "borderRadius" => {
            component.style_mut().border.radius = prop.non_negative()?.min(255.0) as u8
        }
        "margin" => {
            component.style_mut().margin =
                to_spacing(value).ok_or_else(|| prop.invalid("a number or [v, h] / [t, r, b, l]"))?
        }
        "padding" => {
            component.style_mut().padding =
                to_spacing(value).ok_or_else(|| prop.invalid("a number or [v, h] / [t, r, b, l]"))?
        }
        "fontSize" => {
            let size = prop.number()?;
            if size <= 0.0 {
                return Err(CompileError::invalid_property(
                    name,
                    "font size must be positive",
                    location.clone(),
                ));
            }
            component.style_mut().font.size = size;
        }
        "fontWeight" => {
            component.style_mut().font.weight =
                font_weight(value).ok_or_else(|| prop.invalid("a weight between 1 and 1000"))?
        }
        "fontFamily" => component.style_mut().font.family = Some(prop.text()?),
        "bold" => component.style_mut().font.bold = prop.boolean()?,
        "italic" => component.style_mut().font.italic = prop.boolean()?,
        "lineHeight" => component.style_mut().font.line_height = prop.non_negative()?,
        "letterSpacing" => component.style_mut().font.letter_spacing = prop.number()?,
        "textAlign" => component.style_mut().font.align = prop.keyword("an alignment", text_align)?,
        "visible" => component.style_mut().visible = prop.boolean()?,
        "opacity" => {
            let opacity = prop.number()?;
            if !(0.0..=1.0).contains(&opacity) {
                return Err(CompileError::invalid_property(
                    name,
                    format!("opacity must be within 0..1, got {}", opacity),
                    location.clone(),
                ));
            }
            component.style_mut().opacity = opacity;
        }
        "zIndex" => component.style_mut().z_index = prop.non_negative()? as u32,
        "position" => {
            component.style_mut().position.mode = prop.keyword("relative or absolute", position_mode)?
        }
        "left" => component.style_mut().position.x = prop.number()?,
        "top" => component.style_mut().position.y = prop.number()?,
        "direction" => component.layout_mut().direction = prop.keyword("a direction", direction)?,
        "wrap" => component.layout_mut().wrap = prop.boolean()?,
        "gap" => component.layout_mut().gap = prop.non_negative()?,
        "justify" => {
            component.layout_mut().main_axis = prop.keyword("an alignment", Alignment::from_name)?
        }
        "align" => {
            component.layout_mut().cross_axis = prop.keyword("an alignment", Alignment::from_name)?
        }
        "grow" => component.layout_mut().grow = prop.non_negative()?,
        "shrink" => component.layout_mut().shrink = prop.non_negative()?,
        "minWidth" => component.layout_mut().min_width = prop.dimension()?,
        "maxWidth" => component.layout_mut().max_width = prop.dimension()?,
        "minHeight" => component.layout_mut().min_height = prop.dimension()?,
        "maxHeight" => component.layout_mut().max_height = prop.dimension()?,
        "aspectRatio" => component.layout_mut().aspect_ratio = prop.non_negative()?,
        "animation" | "transition" | "shadow" | "filter" => {
            let entries = calls(value);
            if entries.is_empty() {
                return Err(prop.invalid("a call such as blur(4)"));
            }
            let style = component.style_mut();
            for (function, args) in entries {
                apply_call(style, name, function, args, location)?;
            }
        }
        _ => {
            custom.insert(name.to_string(), value.to_json());
            return Ok(false);
        }
    }
    Ok(true)
}

fn apply_call(
    style: &mut Style,
    property: &str,
    function: &str,
    args: &[Value],
    location: &SourceLocation,
) -> ExpandResult<()> {
    let malformed = || {
        CompileError::invalid_property(
            property,
            format!("malformed {}(...)", function),
            location.clone(),
        )
    };

    match property {
        "animation" if function == "animation" => {
            push_capped(&mut style.animations, animation(args).ok_or_else(malformed)?, "animations", location)
        }
        "transition" if function == "transition" => {
            push_capped(&mut style.transitions, transition(args).ok_or_else(malformed)?, "transitions", location)
        }
        "shadow" if function == "shadow" => {
            push_capped(&mut style.shadows, shadow(args).ok_or_else(malformed)?, "shadows", location)
        }
        "filter" => push_capped(
            &mut style.filters,
            filter(function, args).ok_or_else(malformed)?,
            "filters",
            location,
        ),
        _ => Err(CompileError::invalid_property(
            property,
            format!("unexpected {}(...)", function),
            location.clone(),
        )),
    }
}

/// Build the style override for an `@state { ... }` block
pub fn pseudo_style(
    state: &str,
    properties: &[(String, Value, SourceLocation)],
    location: &SourceLocation,
) -> ExpandResult<PseudoStyle> {
    let state = PseudoState::from_name(state).ok_or_else(|| {
        CompileError::invalid_property(
            format!("@{}", state),
            "unknown pseudo state",
            location.clone(),
        )
    })?;
    let mut pseudo = PseudoStyle::new(state);

    for (name, value, location) in properties {
        let prop = Prop {
            name,
            value,
            location,
        };
        match name.as_str() {
            "background" => pseudo.background = Some(prop.color()?),
            "color" => pseudo.text_color = Some(prop.color()?),
            "borderColor" => pseudo.border_color = Some(prop.color()?),
            "opacity" => pseudo.opacity = Some(prop.number()?.clamp(0.0, 1.0)),
            _ => {
                return Err(CompileError::invalid_property(
                    name.as_str(),
                    "not supported in a pseudo state block",
                    location.clone(),
                ))
            }
        }
    }
    Ok(pseudo)
}

/// Build an `@breakpoint(min, max) { ... }` entry
pub fn breakpoint(
    min: &Value,
    max: &Value,
    properties: &[(String, Value, SourceLocation)],
    location: &SourceLocation,
) -> ExpandResult<Breakpoint> {
    let bound = |value: &Value, which: &str| {
        value.as_number().map(|n| n as f32).ok_or_else(|| {
            CompileError::invalid_property(
                "@breakpoint",
                format!("{} width must be a number", which),
                location.clone(),
            )
        })
    };
    let mut breakpoint = Breakpoint {
        min_width: bound(min, "min")?,
        max_width: bound(max, "max")?,
        width: None,
        height: None,
        hidden: false,
    };

    for (name, value, location) in properties {
        let prop = Prop {
            name,
            value,
            location,
        };
        match name.as_str() {
            "width" => breakpoint.width = Some(prop.dimension()?),
            "height" => breakpoint.height = Some(prop.dimension()?),
            "visible" => breakpoint.hidden = !prop.boolean()?,
            "hidden" => breakpoint.hidden = prop.boolean()?,
            _ => {
                return Err(CompileError::invalid_property(
                    name.as_str(),
                    "not supported in a breakpoint block",
                    location.clone(),
                ))
            }
        }
    }
    Ok(breakpoint)
}

pub fn push_pseudo(style: &mut Style, pseudo: PseudoStyle, location: &SourceLocation) -> ExpandResult<()> {
    push_capped(&mut style.pseudo_styles, pseudo, "pseudo_styles", location)
}

pub fn push_breakpoint(
    style: &mut Style,
    breakpoint: Breakpoint,
    location: &SourceLocation,
) -> ExpandResult<()> {
    push_capped(&mut style.breakpoints, breakpoint, "breakpoints", location)
}
