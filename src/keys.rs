//! Keyboard bindings.
//!
//! Maps terminal key events to player [`Command`]s and front-end
//! [`UiAction`]s. While the search input has focus, printable keys edit the
//! query instead of controlling playback.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::player::View;

/// Volume change per key press, in percent points.
pub const VOLUME_STEP: u8 = 10;

/// Seek step per key press, in percent of the track.
pub const SEEK_STEP: f64 = 5.0;

/// Operation on the player itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TogglePlay,
    Next,
    Previous,
    ToggleShuffle,
    ToggleRepeat,
    ToggleLikeCurrent,
    ShowView(View),
    VolumeUp,
    VolumeDown,
    ToggleMute,
    /// Seek relative to the current position, in percent of the track.
    SeekBy(f64),
}

/// Front-end action that does not map onto a single player operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    FocusSearch,
    InputChar(char),
    InputBackspace,
    InputSubmit,
    InputCancel,
    SelectNext,
    SelectPrevious,
    PlaySelected,
    Quit,
}

/// Result of a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    Player(Command),
    Ui(UiAction),
}

/// Translate a key press. Returns `None` for unbound keys and key releases.
pub fn action_for(key: &KeyEvent, input_focused: bool) -> Option<KeyAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Track stepping works regardless of focus.
    match key.code {
        KeyCode::Left if ctrl => return Some(KeyAction::Player(Command::Previous)),
        KeyCode::Right if ctrl => return Some(KeyAction::Player(Command::Next)),
        KeyCode::Char('c') if ctrl => return Some(KeyAction::Ui(UiAction::Quit)),
        _ => {}
    }

    if input_focused {
        return match key.code {
            KeyCode::Esc => Some(KeyAction::Ui(UiAction::InputCancel)),
            KeyCode::Enter => Some(KeyAction::Ui(UiAction::InputSubmit)),
            KeyCode::Backspace => Some(KeyAction::Ui(UiAction::InputBackspace)),
            KeyCode::Char(c) if !c.is_control() => Some(KeyAction::Ui(UiAction::InputChar(c))),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Char(' ') => KeyAction::Player(Command::TogglePlay),
        KeyCode::Char('s') => KeyAction::Player(Command::ToggleShuffle),
        KeyCode::Char('r') => KeyAction::Player(Command::ToggleRepeat),
        KeyCode::Char('l') => KeyAction::Player(Command::ToggleLikeCurrent),
        KeyCode::Char('h') | KeyCode::Char('1') => KeyAction::Player(Command::ShowView(View::Home)),
        KeyCode::Char('f') | KeyCode::Char('2') => {
            KeyAction::Player(Command::ShowView(View::Search))
        }
        KeyCode::Char('L') | KeyCode::Char('3') => {
            KeyAction::Player(Command::ShowView(View::Liked))
        }
        KeyCode::Char('+') | KeyCode::Char('=') => KeyAction::Player(Command::VolumeUp),
        KeyCode::Char('-') => KeyAction::Player(Command::VolumeDown),
        KeyCode::Char('m') => KeyAction::Player(Command::ToggleMute),
        KeyCode::Left => KeyAction::Player(Command::SeekBy(-SEEK_STEP)),
        KeyCode::Right => KeyAction::Player(Command::SeekBy(SEEK_STEP)),
        KeyCode::Char('/') => KeyAction::Ui(UiAction::FocusSearch),
        KeyCode::Char('j') | KeyCode::Down => KeyAction::Ui(UiAction::SelectNext),
        KeyCode::Char('k') | KeyCode::Up => KeyAction::Ui(UiAction::SelectPrevious),
        KeyCode::Enter => KeyAction::Ui(UiAction::PlaySelected),
        KeyCode::Char('q') => KeyAction::Ui(UiAction::Quit),
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::CONTROL)
    }

    #[test]
    fn space_toggles_play() {
        assert_eq!(
            action_for(&key(KeyCode::Char(' ')), false),
            Some(KeyAction::Player(Command::TogglePlay))
        );
    }

    #[test]
    fn space_types_into_focused_input() {
        assert_eq!(
            action_for(&key(KeyCode::Char(' ')), true),
            Some(KeyAction::Ui(UiAction::InputChar(' ')))
        );
    }

    #[test]
    fn ctrl_arrows_step_tracks_even_with_focus() {
        for focused in [false, true] {
            assert_eq!(
                action_for(&ctrl(KeyCode::Left), focused),
                Some(KeyAction::Player(Command::Previous))
            );
            assert_eq!(
                action_for(&ctrl(KeyCode::Right), focused),
                Some(KeyAction::Player(Command::Next))
            );
        }
    }

    #[test]
    fn plain_arrows_seek() {
        assert_eq!(
            action_for(&key(KeyCode::Right), false),
            Some(KeyAction::Player(Command::SeekBy(SEEK_STEP)))
        );
    }

    #[test]
    fn unbound_and_release_are_ignored() {
        assert_eq!(action_for(&key(KeyCode::F(5)), false), None);

        let mut release = key(KeyCode::Char(' '));
        release.kind = KeyEventKind::Release;
        assert_eq!(action_for(&release, false), None);
    }
}
