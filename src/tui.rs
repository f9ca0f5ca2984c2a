// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use ratatui::{prelude::*, widgets::*};

use crate::tui_formatters::*;

use crate::format_list::FormatListModel;
use crate::progress::{ProgressMode, ProgressSnapshot};
use crate::surface::{HeaderInfo, Screen, StatusLine, View};
use crate::theme::Palette;

static APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rows the list view spends on borders, column header and separator.
pub const LIST_CHROME_ROWS: u16 = 4;

const SPINNER_PERIOD_MS: u128 = 100;

const COLUMN_WIDTHS: [Constraint; 6] = [
    Constraint::Length(4),  // #
    Constraint::Length(8),  // Format
    Constraint::Length(12), // Resolution
    Constraint::Length(6),  // Type
    Constraint::Length(10), // Size
    Constraint::Min(12),    // Quality
];

pub fn draw(f: &mut Frame, screen: &Screen) {
    let frame_area = f.area();
    // A resize may land between two draws; never paint outside the frame.
    let header_area = screen.layout.header.area.intersection(frame_area);
    let content_area = screen.layout.content.area.intersection(frame_area);
    let status_area = screen.layout.status.area.intersection(frame_area);

    draw_header(f, screen.header, screen.palette, header_area);

    match screen.view {
        View::Blank => {
            f.render_widget(Clear, content_area);
        }
        View::FormatList(model) => {
            draw_format_list(f, model, screen.palette, content_area);
        }
        View::Progress(snapshot) => match snapshot.mode() {
            ProgressMode::Determinate { percent } => {
                draw_progress(f, snapshot, percent, screen.palette, content_area);
            }
            ProgressMode::Indeterminate => {
                let frame = (snapshot.elapsed.as_millis() / SPINNER_PERIOD_MS) as usize;
                draw_indeterminate(f, &snapshot.stage, frame, screen.palette, content_area);
            }
        },
        View::Indeterminate { message, frame } => {
            draw_indeterminate(f, message, *frame, screen.palette, content_area);
        }
    }

    let show_hints = matches!(screen.view, View::FormatList(_));
    draw_status(f, screen.status, show_hints, screen.palette, status_area);
}

fn draw_header(f: &mut Frame, info: Option<&HeaderInfo>, palette: &Palette, area: Rect) {
    if area.height == 0 {
        return;
    }

    let block = Block::default()
        .title(Span::styled(
            format!(" ytfetch v{} ", APP_VERSION),
            palette.title,
        ))
        .borders(Borders::ALL)
        .border_style(palette.border);

    let Some(info) = info else {
        f.render_widget(block, area);
        return;
    };

    let max_title_len = (area.width as usize).saturating_sub(20).max(10);
    let title = truncate_with_ellipsis(info.title.as_deref().unwrap_or("N/A"), max_title_len);

    let text = vec![
        Line::from(vec![
            Span::styled("Video: ", palette.muted),
            Span::styled(title, palette.text),
        ]),
        Line::from(vec![
            Span::styled("Channel: ", palette.muted),
            Span::styled(
                format!("{:<30}", info.channel.as_deref().unwrap_or("N/A")),
                palette.text,
            ),
            Span::styled(" Duration: ", palette.muted),
            Span::styled(info.duration.as_deref().unwrap_or("N/A"), palette.text),
        ]),
    ];

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_format_list(f: &mut Frame, model: &FormatListModel, palette: &Palette, area: Rect) {
    let block = Block::default()
        .title(Span::styled(
            format!(" Available Formats ({} total) ", model.len()),
            palette.title,
        ))
        .borders(Borders::ALL)
        .border_style(palette.border);

    let header = Row::new(
        ["#", "Format", "Resolution", "Type", "Size", "Quality"]
            .into_iter()
            .map(Cell::from),
    )
    .style(palette.column_header)
    .bottom_margin(1);

    let rows = model.visible().map(|(index, variant)| {
        let is_selected = index == model.selected_index();
        let quality = variant.quality_label();

        let quality_style = if is_selected {
            palette.selected
        } else if quality.starts_with("4K") || quality == "Full HD" {
            palette.quality_high
        } else if quality.starts_with("Audio") {
            palette.quality_audio
        } else {
            palette.text
        };

        let row_style = if is_selected {
            palette.selected
        } else {
            palette.text
        };

        Row::new(vec![
            Cell::from((index + 1).to_string()),
            Cell::from(truncate_with_ellipsis(&variant.id, 8)),
            Cell::from(truncate_with_ellipsis(&variant.resolution, 12)),
            Cell::from(truncate_with_ellipsis(&variant.extension, 6)),
            Cell::from(format_optional_bytes(variant.size)),
            Cell::from(quality).style(quality_style),
        ])
        .style(row_style)
    });

    let table = Table::new(rows, COLUMN_WIDTHS).header(header).block(block);
    f.render_widget(table, area);

    if area.width < 4 || area.height < LIST_CHROME_ROWS {
        return;
    }
    let marker_x = area.right() - 3;
    if model.has_more_above() {
        let at = Rect::new(marker_x, area.y + LIST_CHROME_ROWS - 1, 1, 1);
        f.render_widget(Paragraph::new("↑").style(palette.key_hint), at);
    }
    if model.has_more_below() {
        let at = Rect::new(marker_x, area.bottom() - 2, 1, 1);
        f.render_widget(Paragraph::new("↓").style(palette.key_hint), at);
    }
}

fn draw_progress(
    f: &mut Frame,
    snapshot: &ProgressSnapshot,
    percent: f64,
    palette: &Palette,
    area: Rect,
) {
    let block = Block::default()
        .title(Span::styled(" Download Progress ", palette.title))
        .borders(Borders::ALL)
        .border_style(palette.border);
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let padded = inner_area.inner(Margin::new(1, 1));

    let mut top_lines = Vec::new();
    if !snapshot.stage.is_empty() {
        top_lines.push(Line::from(vec![
            Span::styled("Stage: ", palette.muted),
            Span::styled(snapshot.stage.as_str(), palette.text),
        ]));
        top_lines.push(Line::from(""));
    }
    top_lines.push(Line::from(vec![
        Span::styled("Downloaded: ", palette.muted),
        Span::styled(
            format!(
                "{} / {}",
                format_bytes(snapshot.downloaded_bytes),
                format_bytes(snapshot.total_bytes)
            ),
            palette.text,
        ),
    ]));
    top_lines.push(Line::from(""));

    let mut bottom_lines = Vec::new();
    if snapshot.bytes_per_second > 0.0 {
        bottom_lines.push(Line::from(""));
        bottom_lines.push(Line::from(vec![
            Span::styled("Speed: ", palette.muted),
            Span::styled(format_speed(snapshot.bytes_per_second), palette.text),
        ]));
        if let Some(eta) = snapshot.visible_eta() {
            bottom_lines.push(Line::from(vec![
                Span::styled("ETA: ", palette.muted),
                Span::styled(format_duration(eta), palette.text),
            ]));
        }
    }
    bottom_lines.push(Line::from(""));
    bottom_lines.push(Line::from(vec![
        Span::styled("Elapsed: ", palette.muted),
        Span::styled(format_duration(snapshot.elapsed), palette.text),
    ]));

    let chunks = Layout::vertical([
        Constraint::Length(top_lines.len() as u16),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(padded);

    f.render_widget(Paragraph::new(top_lines), chunks[0]);

    let ratio = (percent / 100.0).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .ratio(ratio)
        .label(format!("{:.0}%", percent.clamp(0.0, 100.0)))
        .gauge_style(palette.gauge);
    f.render_widget(gauge, chunks[1]);

    f.render_widget(Paragraph::new(bottom_lines), chunks[2]);
}

fn draw_indeterminate(f: &mut Frame, message: &str, frame: usize, palette: &Palette, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Processing ", palette.title))
        .borders(Borders::ALL)
        .border_style(palette.border);
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let vertical_chunks = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(inner_area);

    let line = Line::from(vec![
        Span::styled(message, palette.text),
        Span::raw(" "),
        Span::styled(spinner_char(frame).to_string(), palette.key_hint),
    ]);
    let paragraph = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(paragraph, vertical_chunks[1]);
}

fn draw_status(
    f: &mut Frame,
    status: &StatusLine,
    show_hints: bool,
    palette: &Palette,
    area: Rect,
) {
    if area.height == 0 {
        return;
    }
    f.render_widget(Clear, area);

    let message = match status {
        StatusLine::Message(text) => Line::from(Span::styled(format!(" {}", text), palette.status)),
        StatusLine::Error(text) => {
            Line::from(Span::styled(format!(" ERROR: {}", text), palette.error))
        }
    };

    let hints = Line::from(vec![
        Span::styled("[↑/↓]", palette.key_hint),
        Span::raw(" Navigate "),
        Span::styled("[Enter]", palette.key_hint),
        Span::raw(" Select "),
        Span::styled("[B]", palette.key_hint),
        Span::raw(" Best "),
        Span::styled("[Esc]", palette.key_hint),
        Span::raw(" Cancel "),
    ]);

    let has_room = message.width() + hints.width() + 2 <= area.width as usize;
    let is_error = matches!(status, StatusLine::Error(_));

    if !(show_hints && has_room && !is_error) {
        f.render_widget(Paragraph::new(message), area);
        return;
    }

    let chunks = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(hints.width() as u16),
    ])
    .split(area);
    f.render_widget(Paragraph::new(message), chunks[0]);
    f.render_widget(Paragraph::new(hints).style(palette.status), chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format_list::sample_variants;
    use crate::surface::PanelLayout;
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    fn render(view: &View, status: &StatusLine, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        let layout = PanelLayout::from_area(Rect::new(0, 0, width, height));
        let header = HeaderInfo {
            title: Some("A video about terminals".to_string()),
            channel: Some("Rustaceans".to_string()),
            duration: Some("3m 5s".to_string()),
        };
        let palette = Palette::monochrome();
        terminal
            .draw(|f| {
                draw(
                    f,
                    &Screen {
                        layout: &layout,
                        header: Some(&header),
                        view,
                        status,
                        palette: &palette,
                    },
                )
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn idle() -> StatusLine {
        StatusLine::Message("Select a format to download".to_string())
    }

    #[test]
    fn header_shows_video_details() {
        let text = render(&View::Blank, &idle(), 80, 12);
        assert!(text.contains("Video: A video about terminals"));
        assert!(text.contains("Channel: Rustaceans"));
        assert!(text.contains("Duration: 3m 5s"));
    }

    #[test]
    fn list_renders_visible_rows_and_scroll_markers() {
        let mut model = FormatListModel::new(sample_variants(15)).unwrap();
        model.set_viewport_lines(10);
        model.select(12);
        let text = render(&View::FormatList(model), &idle(), 100, 19);
        assert!(text.contains("Available Formats (15 total)"));
        assert!(text.contains("Resolution"));
        // Rows 4..=13 (1-based) are on screen, row 1 is scrolled away.
        assert!(text.contains("13  "));
        // One of each arrow comes from the shortcut legend.
        assert_eq!(text.matches('↑').count(), 2);
        assert_eq!(text.matches('↓').count(), 2);
        assert!(text.contains("[Enter] Select"));
    }

    #[test]
    fn progress_with_total_shows_gauge() {
        let snapshot = ProgressSnapshot {
            stage: "Downloading".to_string(),
            downloaded_bytes: 512 * 1024,
            total_bytes: 1024 * 1024,
            bytes_per_second: 2048.0,
            eta: Some(Duration::from_secs(256)),
            elapsed: Duration::from_secs(4),
        };
        let text = render(&View::Progress(snapshot), &idle(), 80, 20);
        assert!(text.contains("Download Progress"));
        assert!(text.contains("Downloaded: 512.0 KB / 1.0 MB"));
        assert!(text.contains("50%"));
        assert!(text.contains("Speed: 2.0 KB/s"));
        assert!(text.contains("ETA: 4m 16s"));
        assert!(text.contains("Elapsed: 4s"));
        assert!(!text.contains("[Enter] Select"));
    }

    #[test]
    fn progress_without_total_is_indeterminate() {
        let snapshot = ProgressSnapshot {
            stage: "Merging formats".to_string(),
            downloaded_bytes: 9_999_999,
            total_bytes: 0,
            bytes_per_second: 0.0,
            eta: None,
            elapsed: Duration::from_millis(250),
        };
        let text = render(&View::Progress(snapshot), &idle(), 80, 20);
        assert!(text.contains("Processing"));
        assert!(text.contains("Merging formats -"));
        assert!(!text.contains("Download Progress"));
        assert!(!text.contains('%'));
    }

    #[test]
    fn error_status_replaces_hints() {
        let model = FormatListModel::new(sample_variants(3)).unwrap();
        let status = StatusLine::Error("Video download failed".to_string());
        let text = render(&View::FormatList(model), &status, 100, 19);
        assert!(text.contains("ERROR: Video download failed"));
        assert!(!text.contains("[Enter] Select"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let model = FormatListModel::new(sample_variants(3)).unwrap();
        render(&View::FormatList(model), &idle(), 5, 3);
        render(
            &View::Indeterminate {
                message: "Fetching".to_string(),
                frame: 1,
            },
            &idle(),
            2,
            1,
        );
    }
}
