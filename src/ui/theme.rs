use ratatui::style::Color;

// Accents
pub const ACCENT: Color = Color::Rgb(92, 156, 214);        // #5C9CD6 - steel blue
pub const ACCENT_DIM: Color = Color::Rgb(62, 112, 160);
pub const SUCCESS: Color = Color::Rgb(134, 188, 111);      // Soft green
pub const WARNING: Color = Color::Rgb(229, 192, 123);      // Warm amber
pub const ERROR: Color = Color::Rgb(224, 108, 117);        // Muted red

// Text
pub const TEXT: Color = Color::Rgb(240, 240, 240);
pub const TEXT_MUTED: Color = Color::Rgb(144, 144, 144);

// Backgrounds
pub const BG_BASE: Color = Color::Rgb(30, 32, 34);
pub const BG_SURFACE: Color = Color::Rgb(44, 47, 50);
pub const BG_ELEVATED: Color = Color::Rgb(62, 66, 70);
pub const BG_INPUT: Color = Color::Rgb(52, 55, 58);

// Borders
pub const BORDER: Color = Color::Rgb(62, 66, 70);
pub const BORDER_FOCUS: Color = Color::Rgb(92, 156, 214);

// Roles
pub const USER: Color = Color::Rgb(92, 156, 214);
pub const ASSISTANT: Color = Color::Rgb(144, 144, 144);
