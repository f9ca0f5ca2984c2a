// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use crate::errors::UiError;
use crate::signals::SignalLatch;

pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

// How often a blocking wait wakes up to look at the signal latch.
const LATCH_CHECK_INTERVAL: Duration = Duration::from_millis(250);

const ESC_BRACKET: char = '[';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Resized,
    Ignored,
}

/// Where keystrokes come from. `None` means the timeout elapsed.
pub trait KeySource {
    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<InputEvent>>;
}

/// Reads from the real terminal through crossterm.
#[derive(Debug, Default)]
pub struct CrosstermKeys;

impl KeySource for CrosstermKeys {
    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<InputEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let ev = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => InputEvent::Key(key),
            Event::Resize(_, _) => InputEvent::Resized,
            _ => InputEvent::Ignored,
        };
        Ok(Some(ev))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Confirm,
    Cancel,
    Shortcut(char),
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Waits until the user does something (or a latch fires).
    Blocking,
    /// Returns after at most the given interval so the caller can redraw.
    Polling(Duration),
}

/// One turn of the control loop's input wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Action(Action),
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeStep {
    NeedMore,
    Resolved(Option<Action>),
}

/// Disambiguates a lone Escape keystroke from the start of a CSI sequence
/// delivered as separate keys. A fresh decoder is used for every Escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeDecoder {
    #[default]
    Pending,
    Bracket,
    Tilde(Action),
}

impl EscapeDecoder {
    /// Feeds the next key, or `None` if nothing arrived within the timeout.
    pub fn feed(&mut self, next: Option<KeyCode>) -> EscapeStep {
        match (*self, next) {
            (EscapeDecoder::Pending, None) => EscapeStep::Resolved(Some(Action::Cancel)),
            (EscapeDecoder::Pending, Some(KeyCode::Char(ESC_BRACKET))) => {
                *self = EscapeDecoder::Bracket;
                EscapeStep::NeedMore
            }
            (EscapeDecoder::Bracket, Some(KeyCode::Char(c))) => match c {
                'A' => EscapeStep::Resolved(Some(Action::Up)),
                'B' => EscapeStep::Resolved(Some(Action::Down)),
                'H' => EscapeStep::Resolved(Some(Action::Home)),
                'F' => EscapeStep::Resolved(Some(Action::End)),
                '5' => {
                    *self = EscapeDecoder::Tilde(Action::PageUp);
                    EscapeStep::NeedMore
                }
                '6' => {
                    *self = EscapeDecoder::Tilde(Action::PageDown);
                    EscapeStep::NeedMore
                }
                _ => EscapeStep::Resolved(None),
            },
            (EscapeDecoder::Tilde(action), Some(KeyCode::Char('~'))) => {
                EscapeStep::Resolved(Some(action))
            }
            _ => EscapeStep::Resolved(None),
        }
    }
}

/// Maps a decoded keystroke to an action. Escape is handled separately.
pub fn map_key(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::Interrupt),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Up => Some(Action::Up),
        KeyCode::Down => Some(Action::Down),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Home => Some(Action::Home),
        KeyCode::End => Some(Action::End),
        KeyCode::Enter | KeyCode::Char('\n') | KeyCode::Char('\r') => Some(Action::Confirm),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Cancel),
        KeyCode::Char(c) if is_shortcut_key(c) => Some(Action::Shortcut(c)),
        _ => None,
    }
}

fn is_shortcut_key(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'b' | 'w' | 'a' | '1'..='9')
}

pub struct InputController<S: KeySource> {
    source: S,
    mode: InputMode,
    latch: Arc<SignalLatch>,
    escape_timeout: Duration,
}

impl<S: KeySource> InputController<S> {
    pub fn new(source: S, latch: Arc<SignalLatch>, escape_timeout: Duration) -> Self {
        Self {
            source,
            mode: InputMode::Blocking,
            latch,
            escape_timeout,
        }
    }

    #[cfg(test)]
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            debug!(?mode, "input mode switched");
        }
        self.mode = mode;
    }

    /// Waits for input according to the current mode.
    ///
    /// Terminal resizes raise the latch and come back as `Idle`; the caller
    /// handles them on its next pass.
    pub fn next_event(&mut self) -> Result<ControlEvent, UiError> {
        let polled = match self.mode {
            InputMode::Polling(interval) => self.poll(interval)?,
            InputMode::Blocking => loop {
                if self.latch.any_pending() {
                    return Ok(ControlEvent::Idle);
                }
                if let Some(ev) = self.poll(LATCH_CHECK_INTERVAL)? {
                    break Some(ev);
                }
            },
        };

        let key = match polled {
            Some(InputEvent::Key(key)) => key,
            Some(InputEvent::Resized) => {
                self.latch.request_resize();
                return Ok(ControlEvent::Idle);
            }
            Some(InputEvent::Ignored) | None => return Ok(ControlEvent::Idle),
        };

        let action = if key.code == KeyCode::Esc {
            self.resolve_escape()?
        } else {
            map_key(&key)
        };

        if action == Some(Action::Interrupt) {
            self.latch.request_shutdown();
        }

        Ok(action.map_or(ControlEvent::Idle, ControlEvent::Action))
    }

    fn resolve_escape(&mut self) -> Result<Option<Action>, UiError> {
        let mut decoder = EscapeDecoder::default();
        loop {
            let next = match self.poll(self.escape_timeout)? {
                Some(InputEvent::Key(key)) => Some(key.code),
                Some(InputEvent::Resized) => {
                    self.latch.request_resize();
                    return Ok(None);
                }
                // Mouse and focus noise counts as silence.
                Some(InputEvent::Ignored) | None => None,
            };
            if let EscapeStep::Resolved(action) = decoder.feed(next) {
                debug!(?action, "escape sequence resolved");
                return Ok(action);
            }
        }
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>, UiError> {
        self.source.poll_event(timeout).map_err(UiError::Input)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedKeys;
    use super::*;

    fn controller(keys: ScriptedKeys) -> (InputController<ScriptedKeys>, Arc<SignalLatch>) {
        let latch = SignalLatch::new();
        (
            InputController::new(keys, latch.clone(), DEFAULT_ESCAPE_TIMEOUT),
            latch,
        )
    }

    #[test]
    fn lone_escape_cancels() {
        let (mut input, _) = controller(ScriptedKeys::new().key(KeyCode::Esc).timeout());
        assert_eq!(input.next_event().unwrap(), ControlEvent::Action(Action::Cancel));
    }

    #[test]
    fn mouse_noise_after_escape_still_cancels() {
        let (mut input, _) = controller(ScriptedKeys::new().key(KeyCode::Esc).ignored());
        assert_eq!(input.next_event().unwrap(), ControlEvent::Action(Action::Cancel));
    }

    #[test]
    fn mode_switch_is_remembered() {
        let (mut input, _) = controller(ScriptedKeys::new());
        assert_eq!(input.mode(), InputMode::Blocking);
        input.set_mode(InputMode::Polling(DEFAULT_REFRESH_INTERVAL));
        assert_eq!(input.mode(), InputMode::Polling(DEFAULT_REFRESH_INTERVAL));
    }

    #[test]
    fn raw_arrow_sequence_navigates_instead_of_cancelling() {
        let (mut input, _) = controller(ScriptedKeys::new().key(KeyCode::Esc).chars("[A"));
        assert_eq!(input.next_event().unwrap(), ControlEvent::Action(Action::Up));

        let (mut input, _) = controller(ScriptedKeys::new().key(KeyCode::Esc).chars("[B"));
        assert_eq!(input.next_event().unwrap(), ControlEvent::Action(Action::Down));
    }

    #[test]
    fn raw_paging_sequences_need_the_tilde() {
        let (mut input, _) = controller(
            ScriptedKeys::new()
                .key(KeyCode::Esc)
                .chars("[5~")
                .key(KeyCode::Esc)
                .chars("[6x"),
        );
        assert_eq!(input.next_event().unwrap(), ControlEvent::Action(Action::PageUp));
        assert_eq!(input.next_event().unwrap(), ControlEvent::Idle);
    }

    #[test]
    fn unknown_follow_up_is_discarded() {
        let (mut input, _) = controller(
            ScriptedKeys::new()
                .key(KeyCode::Esc)
                .chars("x")
                .key(KeyCode::Esc)
                .chars("[C")
                .key(KeyCode::Down),
        );
        assert_eq!(input.next_event().unwrap(), ControlEvent::Idle);
        assert_eq!(input.next_event().unwrap(), ControlEvent::Idle);
        // Back to normal decoding afterwards.
        assert_eq!(input.next_event().unwrap(), ControlEvent::Action(Action::Down));
    }

    #[test]
    fn decoder_states() {
        let mut decoder = EscapeDecoder::default();
        assert_eq!(decoder.feed(Some(KeyCode::Char('['))), EscapeStep::NeedMore);
        assert_eq!(decoder, EscapeDecoder::Bracket);
        assert_eq!(decoder.feed(None), EscapeStep::Resolved(None));

        let mut decoder = EscapeDecoder::default();
        assert_eq!(
            decoder.feed(None),
            EscapeStep::Resolved(Some(Action::Cancel))
        );
    }

    #[test]
    fn keys_map_to_actions() {
        let key = |code| map_key(&KeyEvent::new(code, KeyModifiers::NONE));
        assert_eq!(key(KeyCode::Up), Some(Action::Up));
        assert_eq!(key(KeyCode::PageDown), Some(Action::PageDown));
        assert_eq!(key(KeyCode::Enter), Some(Action::Confirm));
        assert_eq!(key(KeyCode::Char('Q')), Some(Action::Cancel));
        assert_eq!(key(KeyCode::Char('B')), Some(Action::Shortcut('B')));
        assert_eq!(key(KeyCode::Char('7')), Some(Action::Shortcut('7')));
        assert_eq!(key(KeyCode::Char('0')), None);
        assert_eq!(key(KeyCode::Char('x')), None);
        assert_eq!(key(KeyCode::Tab), None);
    }

    #[test]
    fn ctrl_c_raises_shutdown() {
        let (mut input, latch) = controller(ScriptedKeys::new().ctrl('c'));
        assert_eq!(
            input.next_event().unwrap(),
            ControlEvent::Action(Action::Interrupt)
        );
        assert!(latch.take_shutdown());
    }

    #[test]
    fn resize_event_raises_latch() {
        let (mut input, latch) = controller(ScriptedKeys::new().resize());
        assert_eq!(input.next_event().unwrap(), ControlEvent::Idle);
        assert!(latch.take_resize());
    }

    #[test]
    fn blocking_wait_returns_when_latch_is_set() {
        let (mut input, latch) = controller(ScriptedKeys::new().timeout().timeout());
        latch.request_shutdown();
        // Nothing is read from the script: the latch short-circuits the wait.
        assert_eq!(input.next_event().unwrap(), ControlEvent::Idle);
        assert!(latch.is_shutdown_pending());
    }

    #[test]
    fn blocking_wait_skips_timeouts_polling_does_not() {
        let (mut input, _) = controller(
            ScriptedKeys::new()
                .timeout()
                .timeout()
                .key(KeyCode::Home)
                .timeout(),
        );
        assert_eq!(input.next_event().unwrap(), ControlEvent::Action(Action::Home));

        input.set_mode(InputMode::Polling(DEFAULT_REFRESH_INTERVAL));
        assert_eq!(input.next_event().unwrap(), ControlEvent::Idle);
    }

    #[test]
    fn exhausted_source_surfaces_as_input_error() {
        let (mut input, _) = controller(ScriptedKeys::new());
        assert!(matches!(input.next_event(), Err(UiError::Input(_))));
    }
}
