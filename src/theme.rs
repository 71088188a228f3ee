//! Color scheme for the terminal UI.

use ratatui::style::Color;

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub focus_border: Color,
    pub unfocused_border: Color,
    pub text: Color,
    pub text_dim: Color,
    pub accent: Color,
    pub banner_error: Color,
    pub computed: Color,
    pub pending: Color,
}

impl Theme {
    /// Nord-ish muted palette.
    pub fn dashboard() -> Self {
        Self {
            focus_border: Color::Rgb(136, 192, 208),
            unfocused_border: Color::Rgb(76, 86, 106),
            text: Color::Rgb(216, 222, 233),
            text_dim: Color::Rgb(106, 116, 136),
            accent: Color::Rgb(235, 203, 139),
            banner_error: Color::Rgb(191, 97, 106),
            computed: Color::Rgb(163, 190, 140),
            pending: Color::Rgb(208, 135, 112),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::dashboard()
    }
}
