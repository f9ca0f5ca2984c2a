// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::{Mutex, MutexGuard};

use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::Terminal;
use tracing::{debug, warn};

use crate::errors::UiError;
use crate::format_list::FormatListModel;
use crate::progress::ProgressSnapshot;
use crate::theme::Palette;
use crate::tui;

pub const HEADER_ROWS: u16 = 4;
pub const STATUS_ROWS: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Header,
    Content,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panel {
    pub kind: PanelKind,
    pub area: Rect,
}

/// The three stacked panels, derived from the terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    pub header: Panel,
    pub content: Panel,
    pub status: Panel,
}

impl PanelLayout {
    pub fn from_area(area: Rect) -> Self {
        let chunks = Layout::vertical([
            Constraint::Length(HEADER_ROWS),
            Constraint::Min(0),
            Constraint::Length(STATUS_ROWS),
        ])
        .split(area);

        Self {
            header: Panel {
                kind: PanelKind::Header,
                area: chunks[0],
            },
            content: Panel {
                kind: PanelKind::Content,
                area: chunks[1],
            },
            status: Panel {
                kind: PanelKind::Status,
                area: chunks[2],
            },
        }
    }

    pub fn panels(&self) -> [Panel; 3] {
        [self.header, self.content, self.status]
    }

    /// Rows available to list entries; never zero.
    pub fn list_rows(&self) -> usize {
        self.content
            .area
            .height
            .saturating_sub(tui::LIST_CHROME_ROWS)
            .max(1) as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderInfo {
    pub title: Option<String>,
    pub channel: Option<String>,
    pub duration: Option<String>,
}

/// Whatever currently owns the content panel.
#[derive(Debug, Clone, Default)]
pub enum View {
    #[default]
    Blank,
    FormatList(FormatListModel),
    Progress(ProgressSnapshot),
    Indeterminate { message: String, frame: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Message(String),
    Error(String),
}

impl Default for StatusLine {
    fn default() -> Self {
        StatusLine::Message(String::new())
    }
}

/// Borrowed view of the surface state for one frame.
pub struct Screen<'a> {
    pub layout: &'a PanelLayout,
    pub header: Option<&'a HeaderInfo>,
    pub view: &'a View,
    pub status: &'a StatusLine,
    pub palette: &'a Palette,
}

struct SurfaceState<B: Backend> {
    terminal: Terminal<B>,
    layout: PanelLayout,
    header: Option<HeaderInfo>,
    view: View,
    status: StatusLine,
}

impl<B: Backend> SurfaceState<B> {
    fn render(&mut self, palette: &Palette) -> Result<(), UiError> {
        let screen = Screen {
            layout: &self.layout,
            header: self.header.as_ref(),
            view: &self.view,
            status: &self.status,
            palette,
        };
        self.terminal
            .draw(|f| tui::draw(f, &screen))
            .map_err(UiError::Render)?;
        Ok(())
    }
}

/// Owns the terminal and every panel. All mutation goes through one lock,
/// so the resize path and the progress poller never interleave frames.
pub struct RenderSurface<B: Backend> {
    state: Mutex<SurfaceState<B>>,
    palette: Palette,
}

impl<B: Backend> RenderSurface<B> {
    pub fn new(backend: B, palette: Palette) -> Result<Self, UiError> {
        let mut terminal = Terminal::new(backend).map_err(UiError::Init)?;
        let size = terminal.size().map_err(UiError::Init)?;
        terminal.clear().map_err(UiError::Init)?;

        let layout = PanelLayout::from_area(Rect::new(0, 0, size.width, size.height));
        debug!(width = size.width, height = size.height, "render surface created");

        let surface = Self {
            state: Mutex::new(SurfaceState {
                terminal,
                layout,
                header: None,
                view: View::Blank,
                status: StatusLine::default(),
            }),
            palette,
        };
        surface.redraw()?;
        Ok(surface)
    }

    #[cfg(test)]
    pub fn layout(&self) -> Result<PanelLayout, UiError> {
        Ok(self.lock()?.layout)
    }

    pub fn list_rows(&self) -> Result<usize, UiError> {
        Ok(self.lock()?.layout.list_rows())
    }

    pub fn display_info(
        &self,
        title: Option<&str>,
        channel: Option<&str>,
        duration: Option<&str>,
    ) -> Result<(), UiError> {
        self.update(|state| {
            state.header = Some(HeaderInfo {
                title: title.map(str::to_string),
                channel: channel.map(str::to_string),
                duration: duration.map(str::to_string),
            });
        })
    }

    pub fn show_list(&self, model: &FormatListModel) -> Result<(), UiError> {
        self.update(|state| state.view = View::FormatList(model.clone()))
    }

    /// Renders a gauge, or the spinner view when the total is unknown.
    pub fn show_progress(&self, snapshot: ProgressSnapshot) -> Result<(), UiError> {
        self.update(|state| state.view = View::Progress(snapshot))
    }

    pub fn show_indeterminate(&self, message: &str, frame: usize) -> Result<(), UiError> {
        self.update(|state| {
            state.view = View::Indeterminate {
                message: message.to_string(),
                frame,
            }
        })
    }

    pub fn show_status(&self, message: &str) -> Result<(), UiError> {
        self.update(|state| state.status = StatusLine::Message(message.to_string()))
    }

    pub fn show_error(&self, message: &str) -> Result<(), UiError> {
        self.update(|state| state.status = StatusLine::Error(message.to_string()))
    }

    /// Rebuilds all panels from the current terminal size and repaints
    /// whatever view was active. If the size cannot be read the previous
    /// panels are kept.
    pub fn recreate(&self) -> Result<(), UiError> {
        let mut state = self.lock()?;
        match state.terminal.size() {
            Ok(size) => {
                let area = Rect::new(0, 0, size.width, size.height);
                match state.terminal.resize(area) {
                    Ok(()) => {
                        state.layout = PanelLayout::from_area(area);
                        for panel in state.layout.panels() {
                            debug!(kind = ?panel.kind, area = ?panel.area, "panel recreated");
                        }
                    }
                    Err(e) => warn!("Failed to resize terminal, keeping previous panels: {}", e),
                }
            }
            Err(e) => warn!("Failed to query terminal size, keeping previous panels: {}", e),
        }
        state.render(&self.palette)
    }

    pub fn redraw(&self) -> Result<(), UiError> {
        self.lock()?.render(&self.palette)
    }

    #[cfg(test)]
    pub fn view(&self) -> Result<View, UiError> {
        Ok(self.lock()?.view.clone())
    }

    #[cfg(test)]
    pub fn status(&self) -> Result<StatusLine, UiError> {
        Ok(self.lock()?.status.clone())
    }

    /// Runs `f` against the backend under the render lock.
    #[cfg(test)]
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> Result<R, UiError> {
        Ok(f(self.lock()?.terminal.backend_mut()))
    }

    fn update(&self, mutate: impl FnOnce(&mut SurfaceState<B>)) -> Result<(), UiError> {
        let mut state = self.lock()?;
        mutate(&mut state);
        state.render(&self.palette)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SurfaceState<B>>, UiError> {
        self.state.lock().map_err(|_| UiError::Poisoned)
    }
}

#[cfg(test)]
pub(crate) fn buffer_text(backend: &ratatui::backend::TestBackend) -> String {
    backend
        .buffer()
        .content()
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format_list::sample_variants;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;
    use std::time::Duration;

    fn surface(width: u16, height: u16) -> RenderSurface<TestBackend> {
        RenderSurface::new(TestBackend::new(width, height), Palette::monochrome()).unwrap()
    }

    fn screen_text(surface: &RenderSurface<TestBackend>) -> String {
        surface.with_backend(|b| buffer_text(b)).unwrap()
    }

    #[test]
    fn layout_reserves_header_and_status_rows() {
        let layout = PanelLayout::from_area(Rect::new(0, 0, 100, 19));
        assert_eq!(layout.header.area.height, HEADER_ROWS);
        assert_eq!(layout.status.area.height, STATUS_ROWS);
        assert_eq!(layout.content.area.height, 14);
        assert_eq!(layout.status.area.y, 18);
        assert_eq!(layout.list_rows(), 10);
    }

    #[test]
    fn degenerate_terminal_still_has_one_list_row() {
        let layout = PanelLayout::from_area(Rect::new(0, 0, 10, 3));
        assert_eq!(layout.list_rows(), 1);
    }

    #[test]
    fn header_and_status_are_painted() {
        let surface = surface(90, 19);
        surface
            .display_info(Some("Big Buck Bunny"), Some("Blender"), Some("9m 56s"))
            .unwrap();
        surface.show_status("Fetching video information...").unwrap();

        let text = screen_text(&surface);
        assert!(text.contains("Video: Big Buck Bunny"));
        assert!(text.contains("Duration: 9m 56s"));
        assert!(text.contains("Fetching video information..."));
    }

    #[test]
    fn resize_keeps_selection_and_variants() {
        let surface = surface(100, 19);
        let variants = sample_variants(40);
        let mut model = FormatListModel::new(variants.clone()).unwrap();
        model.set_viewport_lines(surface.list_rows().unwrap());
        model.select(12);
        surface.show_list(&model).unwrap();

        surface.with_backend(|b| b.resize(100, 30)).unwrap();
        surface.recreate().unwrap();
        assert_eq!(surface.list_rows().unwrap(), 21);

        let View::FormatList(shown) = surface.view().unwrap() else {
            panic!("list view should survive a resize");
        };
        assert_eq!(shown.selected_index(), 12);
        assert!(Arc::ptr_eq(shown.variants(), &variants));
        assert!(screen_text(&surface).contains("Available Formats (40 total)"));
    }

    #[test]
    fn unknown_total_switches_to_spinner() {
        let surface = surface(80, 20);
        surface
            .show_progress(ProgressSnapshot {
                stage: "Downloading".to_string(),
                downloaded_bytes: 4096,
                total_bytes: 0,
                bytes_per_second: 0.0,
                eta: None,
                elapsed: Duration::ZERO,
            })
            .unwrap();
        let text = screen_text(&surface);
        assert!(text.contains("Processing"));
        assert!(text.contains("Downloading |"));
    }

    #[test]
    fn errors_stay_in_the_status_row() {
        let surface = surface(80, 12);
        surface.show_error("Failed to fetch video information").unwrap();
        assert_eq!(
            surface.status().unwrap(),
            StatusLine::Error("Failed to fetch video information".to_string())
        );
        assert!(screen_text(&surface).contains("ERROR: Failed to fetch video information"));
    }

    #[test]
    fn shrinking_before_recreate_does_not_panic() {
        let surface = surface(100, 30);
        let model = FormatListModel::new(sample_variants(20)).unwrap();
        surface.show_list(&model).unwrap();
        surface.with_backend(|b| b.resize(30, 8)).unwrap();
        surface.redraw().unwrap();
        surface.recreate().unwrap();
        assert_eq!(surface.layout().unwrap().content.area.height, 3);
    }
}
