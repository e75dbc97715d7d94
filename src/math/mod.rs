mod color;

pub use color::{is_hex_color, parse_hex_color, to_hex, to_rgb8};
