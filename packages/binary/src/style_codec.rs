//! Style and layout blocks.
//!
//! Both blocks are length-prefixed. Fields are appended per minor version and never
//! reordered, so an older reader stops early and skips the rest, and a newer reader
//! fills fields missing from an older file with their defaults.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::ReadResult;
use crate::format::{MINOR_ASPECT_RATIO, MINOR_TYPOGRAPHY_EFFECTS};
use kir_model::{
    Alignment, Animation, Breakpoint, Direction, Easing, Filter, FilterKind,
    Layout, Position, PositionMode, PseudoState, PseudoStyle, ResourceLimitExceeded, Shadow,
    Spacing, Style, Tagged, TextAlign, Transition, WarningCode, STYLE_ARRAY_CAP,
};

const PSEUDO_BACKGROUND: u8 = 1 << 0;
const PSEUDO_TEXT_COLOR: u8 = 1 << 1;
const PSEUDO_BORDER_COLOR: u8 = 1 << 2;
const PSEUDO_OPACITY: u8 = 1 << 3;

const BREAKPOINT_WIDTH: u8 = 1 << 0;
const BREAKPOINT_HEIGHT: u8 = 1 << 1;

pub(crate) fn encode_style(
    enc: &mut Encoder,
    style: &Style,
    minor: u8,
) -> Result<(), ResourceLimitExceeded> {
    let block = enc.begin_block();

    enc.put_dimension(style.width);
    enc.put_dimension(style.height);
    enc.put_color(style.background);
    enc.put_f32(style.border.width);
    enc.put_color(style.border.color);
    enc.put_u8(style.border.radius);
    put_spacing(enc, &style.margin);
    put_spacing(enc, &style.padding);

    let font = &style.font;
    enc.put_f32(font.size);
    enc.put_color(font.color);
    enc.put_bool(font.bold);
    enc.put_bool(font.italic);
    enc.put_u16(font.weight);
    enc.put_string(font.family.as_deref())?;
    enc.put_tag(font.align);

    enc.put_bool(style.visible);
    enc.put_f32(style.opacity);
    enc.put_u32(style.z_index);
    enc.put_tag(style.position.mode);
    enc.put_f32(style.position.x);
    enc.put_f32(style.position.y);

    enc.put_u8(style.animations.len() as u8);
    for animation in &style.animations {
        enc.put_str(&animation.name)?;
        enc.put_f32(animation.duration_ms);
        enc.put_f32(animation.delay_ms);
        enc.put_i32(animation.iteration_count);
        enc.put_tag(animation.easing);
        enc.put_bool(animation.alternate);
    }

    enc.put_u8(style.transitions.len() as u8);
    for transition in &style.transitions {
        enc.put_str(&transition.property)?;
        enc.put_f32(transition.duration_ms);
        enc.put_f32(transition.delay_ms);
        enc.put_tag(transition.easing);
    }

    enc.put_u8(style.pseudo_styles.len() as u8);
    for pseudo in &style.pseudo_styles {
        put_pseudo(enc, pseudo);
    }

    enc.put_u8(style.breakpoints.len() as u8);
    for breakpoint in &style.breakpoints {
        put_breakpoint(enc, breakpoint);
    }

    if minor >= MINOR_TYPOGRAPHY_EFFECTS {
        enc.put_f32(font.line_height);
        enc.put_f32(font.letter_spacing);

        enc.put_u8(style.filters.len() as u8);
        for filter in &style.filters {
            enc.put_tag(filter.kind);
            enc.put_f32(filter.value);
        }

        enc.put_u8(style.shadows.len() as u8);
        for shadow in &style.shadows {
            enc.put_f32(shadow.offset_x);
            enc.put_f32(shadow.offset_y);
            enc.put_f32(shadow.blur);
            enc.put_f32(shadow.spread);
            enc.put_color(shadow.color);
            enc.put_bool(shadow.inset);
        }
    }

    enc.end_block(block);
    Ok(())
}

fn put_spacing(enc: &mut Encoder, spacing: &Spacing) {
    for value in spacing.values() {
        enc.put_f32(value);
    }
}

fn put_pseudo(enc: &mut Encoder, pseudo: &PseudoStyle) {
    let mut mask = 0;
    if pseudo.background.is_some() {
        mask |= PSEUDO_BACKGROUND;
    }
    if pseudo.text_color.is_some() {
        mask |= PSEUDO_TEXT_COLOR;
    }
    if pseudo.border_color.is_some() {
        mask |= PSEUDO_BORDER_COLOR;
    }
    if pseudo.opacity.is_some() {
        mask |= PSEUDO_OPACITY;
    }
    enc.put_tag(pseudo.state);
    enc.put_u8(mask);
    enc.put_color(pseudo.background.unwrap_or_default());
    enc.put_color(pseudo.text_color.unwrap_or_default());
    enc.put_color(pseudo.border_color.unwrap_or_default());
    enc.put_f32(pseudo.opacity.unwrap_or(1.0));
}

fn put_breakpoint(enc: &mut Encoder, breakpoint: &Breakpoint) {
    let mut mask = 0;
    if breakpoint.width.is_some() {
        mask |= BREAKPOINT_WIDTH;
    }
    if breakpoint.height.is_some() {
        mask |= BREAKPOINT_HEIGHT;
    }
    enc.put_f32(breakpoint.min_width);
    enc.put_f32(breakpoint.max_width);
    enc.put_u8(mask);
    enc.put_dimension(breakpoint.width.unwrap_or_default());
    enc.put_dimension(breakpoint.height.unwrap_or_default());
    enc.put_bool(breakpoint.hidden);
}

pub(crate) fn decode_style(dec: &mut Decoder<'_>, minor: u8) -> ReadResult<Style> {
    let block = dec.begin_block("style")?;
    let mut style = Style::default();

    style.width = dec.get_dimension()?;
    style.height = dec.get_dimension()?;
    style.background = dec.get_color()?;
    style.border.width = dec.get_f32()?;
    style.border.color = dec.get_color()?;
    style.border.radius = dec.get_u8()?;
    style.margin = get_spacing(dec)?;
    style.padding = get_spacing(dec)?;

    let font = &mut style.font;
    font.size = dec.get_f32()?;
    font.color = dec.get_color()?;
    font.bold = dec.get_bool()?;
    font.italic = dec.get_bool()?;
    font.weight = dec.get_u16()?;
    font.family = dec.get_string("font family")?;
    font.align = dec.get_tag("text align", TextAlign::Left)?;

    style.visible = dec.get_bool()?;
    style.opacity = dec.get_f32()?;
    style.z_index = dec.get_u32()?;
    style.position = Position {
        mode: dec.get_tag("position mode", PositionMode::Relative)?,
        x: dec.get_f32()?,
        y: dec.get_f32()?,
    };

    for _ in 0..capped_count(dec, "animations")? {
        let mut animation = Animation::new(dec.get_required_string("animation name")?, 0.0);
        animation.duration_ms = dec.get_f32()?;
        animation.delay_ms = dec.get_f32()?;
        animation.iteration_count = dec.get_i32()?;
        animation.easing = dec.get_tag("easing", Easing::Linear)?;
        animation.alternate = dec.get_bool()?;
        style.animations.push(animation);
    }

    for _ in 0..capped_count(dec, "transitions")? {
        style.transitions.push(Transition {
            property: dec.get_required_string("transition property")?,
            duration_ms: dec.get_f32()?,
            delay_ms: dec.get_f32()?,
            easing: dec.get_tag("easing", Easing::Linear)?,
        });
    }

    for _ in 0..capped_count(dec, "pseudo_styles")? {
        if let Some(pseudo) = get_pseudo(dec)? {
            style.pseudo_styles.push(pseudo);
        }
    }

    for _ in 0..capped_count(dec, "breakpoints")? {
        style.breakpoints.push(get_breakpoint(dec)?);
    }

    if minor >= MINOR_TYPOGRAPHY_EFFECTS {
        style.font.line_height = dec.get_f32()?;
        style.font.letter_spacing = dec.get_f32()?;

        for _ in 0..capped_count(dec, "filters")? {
            let tag = dec.get_u8()?;
            let value = dec.get_f32()?;
            match FilterKind::from_tag(tag) {
                Some(kind) => style.filters.push(Filter { kind, value }),
                None => dec.warn(
                    WarningCode::DroppedEntry,
                    format!("dropped filter with unknown kind {}", tag),
                ),
            }
        }

        for _ in 0..capped_count(dec, "shadows")? {
            style.shadows.push(Shadow {
                offset_x: dec.get_f32()?,
                offset_y: dec.get_f32()?,
                blur: dec.get_f32()?,
                spread: dec.get_f32()?,
                color: dec.get_color()?,
                inset: dec.get_bool()?,
            });
        }
    }

    dec.end_block(block);
    Ok(style)
}

fn capped_count(dec: &mut Decoder<'_>, field: &str) -> ReadResult<usize> {
    let count = dec.get_u8()? as usize;
    if count > STYLE_ARRAY_CAP {
        return Err(dec
            .invalid(format!(
                "{} declares {} entries, cap is {}",
                field, count, STYLE_ARRAY_CAP
            ))
            .into());
    }
    Ok(count)
}

fn get_spacing(dec: &mut Decoder<'_>) -> ReadResult<Spacing> {
    Ok(Spacing {
        top: dec.get_f32()?,
        right: dec.get_f32()?,
        bottom: dec.get_f32()?,
        left: dec.get_f32()?,
    })
}

fn get_pseudo(dec: &mut Decoder<'_>) -> ReadResult<Option<PseudoStyle>> {
    let tag = dec.get_u8()?;
    let mask = dec.get_u8()?;
    let background = dec.get_color()?;
    let text_color = dec.get_color()?;
    let border_color = dec.get_color()?;
    let opacity = dec.get_f32()?;

    let Some(state) = PseudoState::from_tag(tag) else {
        dec.warn(
            WarningCode::DroppedEntry,
            format!("dropped pseudo style with unknown state {}", tag),
        );
        return Ok(None);
    };
    let present = |bit: u8| mask & bit != 0;
    Ok(Some(PseudoStyle {
        state,
        background: present(PSEUDO_BACKGROUND).then_some(background),
        text_color: present(PSEUDO_TEXT_COLOR).then_some(text_color),
        border_color: present(PSEUDO_BORDER_COLOR).then_some(border_color),
        opacity: present(PSEUDO_OPACITY).then_some(opacity),
    }))
}

fn get_breakpoint(dec: &mut Decoder<'_>) -> ReadResult<Breakpoint> {
    let min_width = dec.get_f32()?;
    let max_width = dec.get_f32()?;
    let mask = dec.get_u8()?;
    let width = dec.get_dimension()?;
    let height = dec.get_dimension()?;
    Ok(Breakpoint {
        min_width,
        max_width,
        width: (mask & BREAKPOINT_WIDTH != 0).then_some(width),
        height: (mask & BREAKPOINT_HEIGHT != 0).then_some(height),
        hidden: dec.get_bool()?,
    })
}

pub(crate) fn encode_layout(enc: &mut Encoder, layout: &Layout, minor: u8) {
    let block = enc.begin_block();
    enc.put_tag(layout.direction);
    enc.put_bool(layout.wrap);
    enc.put_f32(layout.gap);
    enc.put_tag(layout.main_axis);
    enc.put_tag(layout.cross_axis);
    enc.put_f32(layout.grow);
    enc.put_f32(layout.shrink);
    enc.put_dimension(layout.min_width);
    enc.put_dimension(layout.max_width);
    enc.put_dimension(layout.min_height);
    enc.put_dimension(layout.max_height);
    if minor >= MINOR_ASPECT_RATIO {
        enc.put_f32(layout.aspect_ratio);
    }
    enc.end_block(block);
}

pub(crate) fn decode_layout(dec: &mut Decoder<'_>, minor: u8) -> ReadResult<Layout> {
    let block = dec.begin_block("layout")?;
    let mut layout = Layout {
        direction: dec.get_tag("direction", Direction::Row)?,
        wrap: dec.get_bool()?,
        gap: dec.get_f32()?,
        main_axis: dec.get_tag("main axis alignment", Alignment::Start)?,
        cross_axis: dec.get_tag("cross axis alignment", Alignment::Start)?,
        grow: dec.get_f32()?,
        shrink: dec.get_f32()?,
        min_width: dec.get_dimension()?,
        max_width: dec.get_dimension()?,
        min_height: dec.get_dimension()?,
        max_height: dec.get_dimension()?,
        ..Layout::default()
    };
    if minor >= MINOR_ASPECT_RATIO {
        layout.aspect_ratio = dec.get_f32()?;
    }
    dec.end_block(block);
    Ok(layout)
}
