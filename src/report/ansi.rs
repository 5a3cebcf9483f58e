//! ANSI escape codes for terminal styling.
//!
//! Every helper takes a `use_color` flag and returns the text untouched when
//! it is off, so callers never branch on colour themselves.

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";

pub const FG_RED: &str = "\x1b[31m";
pub const FG_GREEN: &str = "\x1b[32m";
pub const FG_YELLOW: &str = "\x1b[33m";
pub const FG_BLUE: &str = "\x1b[34m";
pub const FG_CYAN: &str = "\x1b[36m";
pub const FG_BRIGHT_BLACK: &str = "\x1b[90m";

fn paint(text: &str, codes: &[&str], use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    format!("{}{text}{RESET}", codes.concat())
}

pub fn red_bold(text: &str, use_color: bool) -> String {
    paint(text, &[BOLD, FG_RED], use_color)
}

pub fn green_bold(text: &str, use_color: bool) -> String {
    paint(text, &[BOLD, FG_GREEN], use_color)
}

pub fn yellow(text: &str, use_color: bool) -> String {
    paint(text, &[FG_YELLOW], use_color)
}

pub fn blue_bold(text: &str, use_color: bool) -> String {
    paint(text, &[BOLD, FG_BLUE], use_color)
}

pub fn cyan(text: &str, use_color: bool) -> String {
    paint(text, &[FG_CYAN], use_color)
}

pub fn bold(text: &str, use_color: bool) -> String {
    paint(text, &[BOLD], use_color)
}

pub fn dim(text: &str, use_color: bool) -> String {
    paint(text, &[FG_BRIGHT_BLACK], use_color)
}
