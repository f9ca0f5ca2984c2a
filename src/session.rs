// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Instant;

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::style::ResetColor;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use tokio::sync::mpsc::{error::TryRecvError, Receiver};
use tracing::{debug, info, warn};

use crate::config::{ColorChoice, Settings};
use crate::download::{DownloadOutcome, UiMessage};
use crate::errors::UiError;
use crate::format_list::{FormatListModel, Selection, VariantDescriptor};
use crate::input::{Action, ControlEvent, CrosstermKeys, InputController, InputMode, KeySource};
use crate::progress::ProgressModel;
use crate::signals::SignalLatch;
use crate::surface::RenderSurface;
use crate::theme::Palette;

/// Puts the terminal back the way we found it. Safe to call more than once.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show, ResetColor);
}

/// Raw mode plus the alternate screen for as long as the guard lives.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn enter() -> Result<Self, UiError> {
        enable_raw_mode().map_err(UiError::Init)?;
        // From here on, dropping the guard undoes whatever succeeded.
        let guard = Self { _private: () };
        execute!(io::stdout(), EnterAlternateScreen, Hide).map_err(UiError::Init)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
        debug!("terminal restored");
    }
}

pub fn palette_for(choice: ColorChoice, no_color: bool, depth: u16) -> Palette {
    let depth = match choice {
        ColorChoice::Never => 0,
        ColorChoice::Always => depth.max(8),
        ColorChoice::Auto if no_color => 0,
        ColorChoice::Auto => depth,
    };
    Palette::for_depth(depth)
}

pub fn probe_palette(choice: ColorChoice) -> Palette {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    let depth = crossterm::style::available_color_count();
    debug!(%choice, no_color, depth, "colour capability probed");
    palette_for(choice, no_color, depth)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Finished,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEnd {
    Finished(DownloadOutcome),
    Interrupted,
}

pub fn failure_message(outcome: &DownloadOutcome) -> String {
    match outcome.exit_code {
        Some(code) => format!("Video download failed (exit code {})", code),
        None => "Video download failed".to_string(),
    }
}

/// The interactive half of the program: one render surface, one input
/// controller, and the shared signal latch.
pub struct Session<B: Backend, S: KeySource> {
    surface: RenderSurface<B>,
    input: InputController<S>,
    latch: Arc<SignalLatch>,
    settings: Settings,
    _guard: Option<TerminalGuard>,
}

impl Session<CrosstermBackend<Stdout>, CrosstermKeys> {
    /// Takes over the real terminal. Any error here means the caller should
    /// use the plain fallback instead.
    pub fn start(settings: &Settings, latch: Arc<SignalLatch>) -> Result<Self, UiError> {
        let guard = TerminalGuard::enter()?;
        let palette = probe_palette(settings.color);
        let surface = RenderSurface::new(CrosstermBackend::new(io::stdout()), palette)?;
        info!("Interactive session started");
        Ok(Self::with_parts(
            surface,
            CrosstermKeys,
            latch,
            settings,
            Some(guard),
        ))
    }
}

impl<B: Backend, S: KeySource> Session<B, S> {
    pub fn with_parts(
        surface: RenderSurface<B>,
        keys: S,
        latch: Arc<SignalLatch>,
        settings: &Settings,
        guard: Option<TerminalGuard>,
    ) -> Self {
        let input = InputController::new(keys, latch.clone(), settings.escape_timeout());
        Self {
            surface,
            input,
            latch,
            settings: settings.clone(),
            _guard: guard,
        }
    }

    #[cfg(test)]
    pub fn surface(&self) -> &RenderSurface<B> {
        &self.surface
    }

    pub fn display_info(
        &self,
        title: Option<&str>,
        channel: Option<&str>,
        duration: Option<&str>,
    ) -> Result<(), UiError> {
        self.surface.display_info(title, channel, duration)
    }

    pub fn show_status(&self, message: &str) -> Result<(), UiError> {
        self.surface.show_status(message)
    }

    /// Shows `message` in the status row, or on stderr if the surface is gone.
    pub fn show_error(&self, message: &str) {
        if let Err(e) = self.surface.show_error(message) {
            warn!("Status panel unavailable ({}), writing error to stderr", e);
            eprintln!("Error: {}", message);
        }
    }

    /// Runs the format picker until the user confirms, cancels, or a
    /// shutdown is requested.
    pub fn select(&mut self, variants: Arc<[VariantDescriptor]>) -> Result<Selection, UiError> {
        let mut model = FormatListModel::new(variants)?;
        self.input.set_mode(InputMode::Blocking);
        self.surface.show_status("Select a format to download")?;

        loop {
            if self.latch.take_shutdown() {
                info!("Selection interrupted");
                return Ok(Selection::Interrupted);
            }
            if self.latch.take_resize() {
                self.surface.recreate()?;
            }

            model.set_viewport_lines(self.surface.list_rows()?);
            self.surface.show_list(&model)?;

            let ControlEvent::Action(action) = self.input.next_event()? else {
                continue;
            };
            match action {
                Action::Up => model.navigate(-1),
                Action::Down => model.navigate(1),
                Action::PageUp => model.page_up(),
                Action::PageDown => model.page_down(),
                Action::Home => model.home(),
                Action::End => model.end(),
                Action::Shortcut(key) => {
                    model.apply_shortcut(key);
                }
                Action::Confirm => {
                    let selection = model.confirm();
                    info!(?selection, "Format selected");
                    return Ok(selection);
                }
                Action::Cancel => {
                    info!("Selection cancelled");
                    return Ok(Selection::Cancelled);
                }
                // The controller has already raised the shutdown latch.
                Action::Interrupt => {}
            }
        }
    }

    /// Animates the processing view until `is_done` returns true.
    pub fn run_spinner(
        &mut self,
        message: &str,
        mut is_done: impl FnMut() -> bool,
    ) -> Result<WaitOutcome, UiError> {
        self.input
            .set_mode(InputMode::Polling(self.settings.refresh_interval()));
        let mut frame = 0usize;

        loop {
            if self.latch.take_shutdown() {
                return Ok(WaitOutcome::Interrupted);
            }
            if self.latch.take_resize() {
                self.surface.recreate()?;
            }
            if is_done() {
                return Ok(WaitOutcome::Finished);
            }

            self.surface.show_indeterminate(message, frame)?;
            frame = frame.wrapping_add(1);
            self.input.next_event()?;
        }
    }

    /// Drains download notices and repaints the progress panel on every
    /// refresh tick. Quit keys are ignored here; only an interrupt ends
    /// the wait early.
    pub fn run_progress(&mut self, rx: &mut Receiver<UiMessage>) -> Result<ProgressEnd, UiError> {
        self.input
            .set_mode(InputMode::Polling(self.settings.refresh_interval()));
        let mut model = ProgressModel::new(
            "Starting download...",
            Instant::now(),
            self.settings.rate_estimator(),
        );
        let mut error_shown = false;

        loop {
            if self.latch.take_shutdown() {
                info!("Download interrupted");
                return Ok(ProgressEnd::Interrupted);
            }
            if self.latch.take_resize() {
                self.surface.recreate()?;
            }

            loop {
                match rx.try_recv() {
                    Ok(UiMessage::Progress { downloaded, total }) => {
                        model.update(downloaded, total);
                    }
                    Ok(UiMessage::Stage(stage)) => {
                        debug!(%stage, "download stage");
                        model.set_stage(stage);
                    }
                    Ok(UiMessage::Status(text)) => self.surface.show_status(&text)?,
                    Ok(UiMessage::Error(text)) => {
                        self.show_error(&text);
                        error_shown = true;
                    }
                    Ok(UiMessage::Complete(outcome)) => {
                        return self.finish_progress(&mut model, outcome, error_shown);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        warn!("Download task ended without reporting an outcome");
                        let outcome = DownloadOutcome::failed();
                        return self.finish_progress(&mut model, outcome, error_shown);
                    }
                }
            }

            self.surface.show_progress(model.snapshot())?;
            self.input.next_event()?;
        }
    }

    /// Paints the final progress frame and leaves the outcome in the status
    /// row. A downloader error already on screen is not overwritten.
    fn finish_progress(
        &mut self,
        model: &mut ProgressModel,
        outcome: DownloadOutcome,
        error_shown: bool,
    ) -> Result<ProgressEnd, UiError> {
        if outcome.success {
            model.complete("Download complete");
            self.surface.show_progress(model.snapshot())?;
            self.surface.show_status("Download complete")?;
        } else {
            self.surface.show_progress(model.snapshot())?;
            if !error_shown {
                self.show_error(&failure_message(&outcome));
            }
        }
        Ok(ProgressEnd::Finished(outcome))
    }

    /// Holds the current frame so the last status can be read. Returns early
    /// on any key or a shutdown request.
    pub fn linger(&mut self) -> Result<WaitOutcome, UiError> {
        let now = Instant::now();
        let deadline = now.checked_add(self.settings.linger()).unwrap_or(now);
        loop {
            if self.latch.take_shutdown() {
                return Ok(WaitOutcome::Interrupted);
            }
            if self.latch.take_resize() {
                self.surface.recreate()?;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(WaitOutcome::Finished);
            }

            let wait = remaining.min(self.settings.refresh_interval());
            self.input.set_mode(InputMode::Polling(wait));
            if let ControlEvent::Action(action) = self.input.next_event()? {
                debug!(?action, "final frame dismissed");
                if action == Action::Interrupt {
                    self.latch.take_shutdown();
                    return Ok(WaitOutcome::Interrupted);
                }
                return Ok(WaitOutcome::Finished);
            }
        }
    }
}
