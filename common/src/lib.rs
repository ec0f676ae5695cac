pub mod color;

pub use color::{color_name, parse_color, Color, ColorParseError};
