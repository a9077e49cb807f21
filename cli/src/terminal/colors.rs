use colored::Color;

pub const PRIMARY: Color = Color::TrueColor {
    r: 120,
    g: 200,
    b: 160,
};
pub const ACCENT: Color = Color::BrightYellow;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const IPV4_ADDR: Color = Color::BrightCyan;
pub const IPV4_PREFIX: Color = Color::Cyan;
pub const MAC_ADDR: Color = Color::Magenta;

pub const ONLINE: Color = Color::BrightGreen;
pub const OFFLINE: Color = Color::Red;
pub const UNKNOWN: Color = Color::Yellow;
