use ratatui::style::Color;

/// A named color palette for the whole UI.
#[derive(Debug)]
pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub success: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Ink",
    bg: Color::Rgb(22, 24, 29),
    fg: Color::Rgb(220, 223, 228),
    accent: Color::Rgb(97, 175, 239),
    muted: Color::Rgb(120, 127, 140),
    border: Color::Rgb(62, 68, 81),
    highlight_fg: Color::Rgb(22, 24, 29),
    highlight_bg: Color::Rgb(97, 175, 239),
    stripe_bg: Color::Rgb(28, 31, 37),
    status: Color::Rgb(229, 192, 123),
    error: Color::Rgb(224, 108, 117),
    success: Color::Rgb(152, 195, 121),
    key_fg: Color::Rgb(22, 24, 29),
    key_bg: Color::Rgb(120, 127, 140),
  },
  Theme {
    name: "Mint",
    bg: Color::Rgb(244, 250, 246),
    fg: Color::Rgb(38, 50, 44),
    accent: Color::Rgb(30, 140, 100),
    muted: Color::Rgb(118, 138, 128),
    border: Color::Rgb(190, 214, 200),
    highlight_fg: Color::Rgb(244, 250, 246),
    highlight_bg: Color::Rgb(30, 140, 100),
    stripe_bg: Color::Rgb(232, 243, 236),
    status: Color::Rgb(176, 120, 20),
    error: Color::Rgb(192, 57, 43),
    success: Color::Rgb(30, 140, 100),
    key_fg: Color::Rgb(244, 250, 246),
    key_bg: Color::Rgb(118, 138, 128),
  },
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::Reset,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    border: Color::Gray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    status: Color::Yellow,
    error: Color::Red,
    success: Color::Green,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

/// Index of the theme called `name`, or 0.
pub fn theme_index(name: &str) -> usize {
  THEMES.iter().position(|t| t.name == name).unwrap_or(0)
}
