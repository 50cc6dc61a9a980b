use crate::config::{
    HexColor, StyleOverride, ThemeConfig as UserThemeConfig, ThemeModifier, ThemePreset, ThemeToken,
};
use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Theme {
    enabled: bool,
    styles: HashMap<ThemeToken, Style>,
}

impl Theme {
    /// `enabled = false` is the NO_COLOR rendition: no colors, prompts stay bold.
    pub fn from_config(enabled: bool, config: &UserThemeConfig) -> Self {
        let mut styles = preset_styles(config.preset);
        for (token, override_style) in &config.styles {
            let base = styles.get(token).copied().unwrap_or_default();
            styles.insert(*token, merge_style(base, override_style));
        }

        Self { enabled, styles }
    }

    pub fn style(&self, token: ThemeToken) -> Style {
        if !self.enabled {
            return disabled_style(token);
        }

        self.styles.get(&token).copied().unwrap_or_default()
    }
}

fn preset_styles(preset: ThemePreset) -> HashMap<ThemeToken, Style> {
    ThemeToken::all()
        .iter()
        .copied()
        .map(|token| (token, preset_style(preset, token)))
        .collect()
}

fn preset_style(preset: ThemePreset, token: ThemeToken) -> Style {
    let palette = match preset {
        ThemePreset::Default => &DEFAULT_PALETTE,
        ThemePreset::Light => &LIGHT_PALETTE,
        ThemePreset::HighContrast => &HIGH_CONTRAST_PALETTE,
    };
    palette.style(token)
}

struct Palette {
    accent: Color,
    user: Color,
    assistant: Color,
    text: Color,
    muted: Color,
    error: Color,
    input_bg: Color,
}

const DEFAULT_PALETTE: Palette = Palette {
    accent: Color::Rgb(122, 162, 247),
    user: Color::Rgb(158, 206, 106),
    assistant: Color::Rgb(187, 154, 247),
    text: Color::Rgb(192, 202, 245),
    muted: Color::Rgb(86, 95, 137),
    error: Color::Rgb(247, 118, 142),
    input_bg: Color::Rgb(22, 22, 30),
};

const LIGHT_PALETTE: Palette = Palette {
    accent: Color::Rgb(9, 105, 218),
    user: Color::Rgb(31, 111, 235),
    assistant: Color::Rgb(130, 80, 223),
    text: Color::Rgb(36, 41, 47),
    muted: Color::Rgb(87, 96, 106),
    error: Color::Rgb(176, 0, 32),
    input_bg: Color::Rgb(246, 248, 250),
};

const HIGH_CONTRAST_PALETTE: Palette = Palette {
    accent: Color::Rgb(0, 255, 255),
    user: Color::Rgb(0, 255, 127),
    assistant: Color::Rgb(255, 215, 0),
    text: Color::Rgb(255, 255, 255),
    muted: Color::Rgb(173, 216, 230),
    error: Color::Rgb(255, 64, 64),
    input_bg: Color::Rgb(0, 0, 0),
};

impl Palette {
    fn style(&self, token: ThemeToken) -> Style {
        match token {
            ThemeToken::Title => Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::BOLD),
            ThemeToken::Caption => Style::default()
                .fg(self.muted)
                .add_modifier(Modifier::ITALIC),
            ThemeToken::UserPrompt => Style::default().fg(self.user).add_modifier(Modifier::BOLD),
            ThemeToken::AssistantPrompt => Style::default()
                .fg(self.assistant)
                .add_modifier(Modifier::BOLD),
            ThemeToken::UserInput | ThemeToken::AssistantText => Style::default().fg(self.text),
            ThemeToken::AssistantWaiting => Style::default()
                .fg(self.assistant)
                .add_modifier(Modifier::BOLD),
            ThemeToken::SystemInfo | ThemeToken::Status => Style::default().fg(self.muted),
            ThemeToken::SystemError => Style::default().fg(self.error).add_modifier(Modifier::BOLD),
            ThemeToken::InputBlock => Style::default().bg(self.input_bg).fg(self.text),
        }
    }
}

fn disabled_style(token: ThemeToken) -> Style {
    match token {
        ThemeToken::UserPrompt | ThemeToken::AssistantPrompt | ThemeToken::Title => {
            Style::default().add_modifier(Modifier::BOLD)
        }
        _ => Style::default(),
    }
}

fn merge_style(base: Style, override_style: &StyleOverride) -> Style {
    let mut merged = base;

    if let Some(fg) = override_style.fg {
        merged = merged.fg(color_from_hex(fg));
    }

    if let Some(bg) = override_style.bg {
        merged = merged.bg(color_from_hex(bg));
    }

    if let Some(modifiers) = &override_style.modifiers {
        merged = merged
            .remove_modifier(Modifier::all())
            .add_modifier(modifiers_to_modifier(modifiers));
    }

    merged
}

fn color_from_hex(color: HexColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn modifiers_to_modifier(modifiers: &[ThemeModifier]) -> Modifier {
    modifiers
        .iter()
        .copied()
        .fold(Modifier::empty(), |acc, modifier| {
            acc | match modifier {
                ThemeModifier::Bold => Modifier::BOLD,
                ThemeModifier::Dim => Modifier::DIM,
                ThemeModifier::Italic => Modifier::ITALIC,
                ThemeModifier::Underlined => Modifier::UNDERLINED,
                ThemeModifier::Reversed => Modifier::REVERSED,
                ThemeModifier::CrossedOut => Modifier::CROSSED_OUT,
            }
        })
}
