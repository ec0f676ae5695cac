pub mod command;
pub mod config;
pub mod driver;
pub mod icon;
pub mod presets;
pub mod serial;
pub mod session;

pub use common::{color_name, parse_color, Color, ColorParseError};

pub mod prelude {
    pub use crate::{
        command::*, config::*, driver::*, icon::*, presets::*, serial::*, session::*,
    };
    pub use common::{color_name, parse_color, Color, ColorParseError};
}
