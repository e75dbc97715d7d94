use glam::Vec3;

/// Parse a `#rrggbb` string into normalized RGB.
///
/// A leading `#` is optional. Each of the three byte pairs is parsed
/// independently; a pair that is missing or not valid hexadecimal becomes
/// `0.0` instead of failing, so a half-typed color never poisons the
/// shader uniforms.
pub fn parse_hex_color(hex: &str) -> Vec3 {
    let hex = hex.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);

    let channel = |start: usize| -> f32 {
        hex.get(start..start + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .map(|byte| byte as f32 / 255.0)
            .unwrap_or(0.0)
    };

    Vec3::new(channel(0), channel(2), channel(4))
}

/// True when `hex` is exactly six hex digits with an optional leading `#`.
pub fn is_hex_color(hex: &str) -> bool {
    let hex = hex.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Quantize a normalized color to 8-bit channels.
pub fn to_rgb8(color: Vec3) -> [u8; 3] {
    let scaled = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    [scaled.x as u8, scaled.y as u8, scaled.z as u8]
}

/// Format a normalized color as lowercase `#rrggbb`.
pub fn to_hex(color: Vec3) -> String {
    let [r, g, b] = to_rgb8(color);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primary_colors() {
        let red = parse_hex_color("#ff0000");
        assert!((red.x - 1.0).abs() < 1e-6);
        assert_eq!(red.y, 0.0);
        assert_eq!(red.z, 0.0);

        let blue = parse_hex_color("0000FF");
        assert_eq!(blue.x, 0.0);
        assert!((blue.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_mid_gray() {
        let gray = parse_hex_color("#808080");
        assert!((gray.x - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(gray.x, gray.y);
        assert_eq!(gray.y, gray.z);
    }

    #[test]
    fn test_malformed_pairs_become_zero() {
        let color = parse_hex_color("#zz80");
        assert_eq!(color.x, 0.0);
        assert!((color.y - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(color.z, 0.0);

        let empty = parse_hex_color("");
        assert_eq!(empty, Vec3::ZERO);
        assert!(!empty.is_nan());
    }

    #[test]
    fn test_non_ascii_input_does_not_panic() {
        let color = parse_hex_color("#é0000");
        assert!(!color.is_nan());
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#a1B2c3"));
        assert!(is_hex_color("a1b2c3"));
        assert!(!is_hex_color("#a1b2c"));
        assert!(!is_hex_color("#a1b2cg"));
        assert!(!is_hex_color("#fff"));
    }

    #[test]
    fn test_hex_round_trip_is_lowercase() {
        assert_eq!(to_hex(parse_hex_color("#FFA500")), "#ffa500");
        assert_eq!(to_rgb8(parse_hex_color("#102030")), [0x10, 0x20, 0x30]);
    }
}
