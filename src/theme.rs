// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use ratatui::style::{Color, Modifier, Style};

// Catppuccin Mocha
pub const RED: Color = Color::Rgb(243, 139, 168);
pub const PEACH: Color = Color::Rgb(250, 179, 135);
pub const YELLOW: Color = Color::Rgb(249, 226, 175);
pub const GREEN: Color = Color::Rgb(166, 227, 161);
pub const TEAL: Color = Color::Rgb(148, 226, 213);
pub const SKY: Color = Color::Rgb(137, 220, 235);
pub const BLUE: Color = Color::Rgb(137, 180, 250);
pub const MAUVE: Color = Color::Rgb(203, 166, 247);
pub const TEXT: Color = Color::Rgb(205, 214, 244);
pub const SUBTEXT1: Color = Color::Rgb(186, 194, 222);
pub const SUBTEXT0: Color = Color::Rgb(166, 173, 200);
pub const SURFACE2: Color = Color::Rgb(88, 91, 112);
pub const SURFACE0: Color = Color::Rgb(49, 50, 68);
pub const CRUST: Color = Color::Rgb(17, 17, 27);

/// Semantic colours for every panel, picked once from the probed colour depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub border: Style,
    pub title: Style,
    pub text: Style,
    pub muted: Style,
    pub column_header: Style,
    pub selected: Style,
    pub quality_high: Style,
    pub quality_audio: Style,
    pub gauge: Style,
    pub status: Style,
    pub error: Style,
    pub key_hint: Style,
}

impl Palette {
    pub fn for_depth(colors: u16) -> Self {
        if colors >= 256 {
            Self::catppuccin()
        } else if colors >= 8 {
            Self::ansi()
        } else {
            Self::monochrome()
        }
    }

    pub fn catppuccin() -> Self {
        Self {
            border: Style::default().fg(SURFACE2),
            title: Style::default().fg(MAUVE).add_modifier(Modifier::BOLD),
            text: Style::default().fg(TEXT),
            muted: Style::default().fg(SUBTEXT0),
            column_header: Style::default().fg(YELLOW).add_modifier(Modifier::BOLD),
            selected: Style::default()
                .fg(CRUST)
                .bg(SKY)
                .add_modifier(Modifier::BOLD),
            quality_high: Style::default().fg(GREEN),
            quality_audio: Style::default().fg(PEACH),
            gauge: Style::default().fg(TEAL).bg(SURFACE0),
            status: Style::default().fg(SUBTEXT1),
            error: Style::default().fg(RED).add_modifier(Modifier::BOLD),
            key_hint: Style::default().fg(BLUE),
        }
    }

    pub fn ansi() -> Self {
        Self {
            border: Style::default().fg(Color::Cyan),
            title: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            text: Style::default().fg(Color::White),
            muted: Style::default().fg(Color::Gray),
            column_header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            quality_high: Style::default().fg(Color::Green),
            quality_audio: Style::default().fg(Color::Yellow),
            gauge: Style::default().fg(Color::Green).bg(Color::Black),
            status: Style::default().fg(Color::White),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            key_hint: Style::default().fg(Color::Cyan),
        }
    }

    pub fn monochrome() -> Self {
        let plain = Style::default();
        Self {
            border: plain,
            title: plain.add_modifier(Modifier::BOLD),
            text: plain,
            muted: plain,
            column_header: plain.add_modifier(Modifier::BOLD),
            selected: plain.add_modifier(Modifier::REVERSED | Modifier::BOLD),
            quality_high: plain,
            quality_audio: plain,
            gauge: plain.add_modifier(Modifier::REVERSED),
            status: plain,
            error: plain.add_modifier(Modifier::BOLD),
            key_hint: plain.add_modifier(Modifier::BOLD),
        }
    }
}
