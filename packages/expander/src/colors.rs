use kir_model::{Color, Rgba};

/// Parse `rgb`, `rgba`, `rrggbb` or `rrggbbaa` hex digits (no leading `#`)
pub fn parse_hex(hex: &str) -> Option<Rgba> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();

    match hex.len() {
        3 | 4 => {
            let r = digit(0)?;
            let g = digit(1)?;
            let b = digit(2)?;
            let a = if hex.len() == 4 { digit(3)? } else { 0xf };
            Some(Rgba::new(r * 17, g * 17, b * 17, a * 17))
        }
        6 | 8 => {
            let a = if hex.len() == 8 { pair(6)? } else { 0xff };
            Some(Rgba::new(pair(0)?, pair(2)?, pair(4)?, a))
        }
        _ => None,
    }
}

/// Channel values are clamped to 0..=255; alpha is a 0..=1 fraction.
pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Rgba {
    let channel = |v: f64| if v.is_nan() { 0 } else { v.round().clamp(0.0, 255.0) as u8 };
    let alpha = if a.is_nan() { 1.0 } else { a.clamp(0.0, 1.0) };
    Rgba::new(channel(r), channel(g), channel(b), (alpha * 255.0).round() as u8)
}

pub fn named(name: &str) -> Option<Color> {
    let rgba = match name {
        "transparent" => return Some(Color::Transparent),
        "black" => Rgba::opaque(0, 0, 0),
        "white" => Rgba::opaque(255, 255, 255),
        "red" => Rgba::opaque(255, 0, 0),
        "green" => Rgba::opaque(0, 128, 0),
        "blue" => Rgba::opaque(0, 0, 255),
        "yellow" => Rgba::opaque(255, 255, 0),
        "orange" => Rgba::opaque(255, 165, 0),
        "purple" => Rgba::opaque(128, 0, 128),
        "gray" | "grey" => Rgba::opaque(128, 128, 128),
        "silver" => Rgba::opaque(192, 192, 192),
        "navy" => Rgba::opaque(0, 0, 128),
        "teal" => Rgba::opaque(0, 128, 128),
        _ => return None,
    };
    Some(Color::Solid(rgba))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_forms() {
        assert_eq!(parse_hex("fff"), Some(Rgba::new(255, 255, 255, 255)));
        assert_eq!(parse_hex("3366ff"), Some(Rgba::new(0x33, 0x66, 0xff, 0xff)));
        assert_eq!(parse_hex("00000080"), Some(Rgba::new(0, 0, 0, 0x80)));
        assert_eq!(parse_hex("12345"), None);
        assert_eq!(parse_hex("zzzzzz"), None);
    }

    #[test]
    fn test_rgba_clamps() {
        assert_eq!(rgba(300.0, -5.0, 127.6, 2.0), Rgba::new(255, 0, 128, 255));
        assert_eq!(rgba(0.0, 0.0, 0.0, 0.5), Rgba::new(0, 0, 0, 128));
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(named("transparent"), Some(Color::Transparent));
        assert_eq!(named("red"), Some(Color::Solid(Rgba::opaque(255, 0, 0))));
        assert_eq!(named("chartreuse-ish"), None);
    }
}
