use bevy::prelude::*;

/// Pale grey text for dark backgrounds
pub const LABEL_TEXT: Color = Color::srgb(0.78, 0.8, 0.86);

/// Cyan text for headers
pub const HEADER_TEXT: Color = Color::srgb(0.45, 0.9, 0.95);

/// White text for buttons
pub const BUTTON_TEXT: Color = Color::srgb(0.95, 0.95, 0.97);
/// #283046
pub const BUTTON_BACKGROUND: Color = Color::srgb(0.157, 0.188, 0.275);
/// #3b4a6b
pub const BUTTON_HOVERED_BACKGROUND: Color = Color::srgb(0.231, 0.290, 0.420);
/// #1b2131
pub const BUTTON_PRESSED_BACKGROUND: Color = Color::srgb(0.106, 0.129, 0.192);

/// Dimmed backdrop behind in-game menus
pub const MENU_BACKDROP: Color = Color::srgba(0.02, 0.02, 0.04, 0.85);

/// HUD readouts
pub const HUD_TEXT: Color = Color::srgb(0.9, 0.92, 0.95);
