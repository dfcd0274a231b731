//! CSS colour helpers for grid styling and rasterisation.

/// Colour used when an input cannot be interpreted.
const FALLBACK_RGB: (u8, u8, u8) = (224, 224, 224);

/// Derive an `rgba(...)` colour with the given opacity.
///
/// Accepts `#rgb`, `#rrggbb`, `rgb(r, g, b)` and `rgba(r, g, b, a)` (whose
/// alpha is replaced). Anything else yields light grey at that opacity.
pub fn with_opacity(color: &str, opacity: f64) -> String {
    let color = color.trim();
    let (r, g, b) = match parse_rgba(color) {
        Some((r, g, b, _)) if color != "transparent" => (r, g, b),
        _ => FALLBACK_RGB,
    };
    format!("rgba({}, {}, {}, {})", r, g, b, opacity)
}

/// Parse a CSS colour into RGBA components, alpha in `0.0..=1.0`.
pub fn parse_rgba(color: &str) -> Option<(u8, u8, u8, f64)> {
    let color = color.trim();
    if color.eq_ignore_ascii_case("transparent") {
        return Some((0, 0, 0, 0.0));
    }
    if let Some(hex) = color.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lower = color.to_ascii_lowercase();
    let (body, has_alpha) = if let Some(body) = lower.strip_prefix("rgba(") {
        (body, true)
    } else if let Some(body) = lower.strip_prefix("rgb(") {
        (body, false)
    } else {
        return None;
    };
    let body = body.strip_suffix(')')?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();

    match (parts.as_slice(), has_alpha) {
        ([r, g, b], false) => Some((channel(r)?, channel(g)?, channel(b)?, 1.0)),
        ([r, g, b, a], true) => {
            let alpha: f64 = a.parse().ok()?;
            Some((channel(r)?, channel(g)?, channel(b)?, alpha.clamp(0.0, 1.0)))
        }
        _ => None,
    }
}

fn channel(value: &str) -> Option<u8> {
    let v: f64 = value.parse().ok()?;
    Some(v.round().clamp(0.0, 255.0) as u8)
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8, f64)> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some((digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 1.0)),
        6 => Some((byte(0)?, byte(2)?, byte(4)?, 1.0)),
        _ => None,
    }
}
