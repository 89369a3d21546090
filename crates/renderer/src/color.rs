//! Line and barb color parsing.

/// Straight (non-premultiplied) RGBA.
pub type Rgba = [u8; 4];

/// Parse `#rrggbb`, `#rrggbbaa`, `#rgb` or a basic color name.
pub fn parse_color(spec: &str) -> Option<Rgba> {
    let spec = spec.trim();
    if let Some(hex) = spec.strip_prefix('#') {
        return parse_hex(hex);
    }
    let rgb = match spec.to_ascii_lowercase().as_str() {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "gray" | "grey" => [128, 128, 128],
        "darkgray" | "darkgrey" => [169, 169, 169],
        "red" => [255, 0, 0],
        "darkred" => [139, 0, 0],
        "green" => [0, 128, 0],
        "blue" => [0, 0, 255],
        "navy" => [0, 0, 128],
        "yellow" => [255, 255, 0],
        "orange" => [255, 165, 0],
        "purple" => [128, 0, 128],
        "magenta" => [255, 0, 255],
        "cyan" => [0, 255, 255],
        "brown" => [165, 42, 42],
        _ => return None,
    };
    Some([rgb[0], rgb[1], rgb[2], 255])
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    // Also keeps the byte slicing below on char boundaries.
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some([byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?, 255]),
        8 => Some([
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        ]),
        3 => {
            let nibble = |i: usize| byte(&hex[i..i + 1]).map(|v| v * 17);
            Some([nibble(0)?, nibble(1)?, nibble(2)?, 255])
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors() {
        assert_eq!(parse_color("#333333"), Some([51, 51, 51, 255]));
        assert_eq!(parse_color("#ff000080"), Some([255, 0, 0, 128]));
        assert_eq!(parse_color("#fff"), Some([255, 255, 255, 255]));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#gg0000"), None);
        assert_eq!(parse_color("#+f+f+f"), None);
    }

    #[test]
    fn test_non_ascii_hex_rejected() {
        assert_eq!(parse_color("#ééé"), None);
        assert_eq!(parse_color("#ab\u{e9}"), None);
        assert_eq!(parse_color("#\u{1f600}12"), None);
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(parse_color("white"), Some([255, 255, 255, 255]));
        assert_eq!(parse_color("Black"), Some([0, 0, 0, 255]));
        assert_eq!(parse_color("chartreuse-ish"), None);
    }
}
