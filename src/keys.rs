use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// A key press as seen by the operation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Literal character input (already shifted, so `D` arrives as `Char('D')`).
    Char(char),
    /// A character pressed together with Control.
    Ctrl(char),
    Enter,
    Esc,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Other,
}

impl Key {
    /// Convert a crossterm key event. Release and repeat events map to `None`.
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        let key = match event.code {
            KeyCode::Char(c) if event.modifiers.contains(KeyModifiers::CONTROL) => Key::Ctrl(c),
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Esc => Key::Esc,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            _ => Key::Other,
        };
        Some(key)
    }

    pub fn is_quit(self) -> bool {
        matches!(self, Key::Char('q') | Key::Ctrl('c'))
    }

    /// Abandons text input.
    pub fn is_cancel(self) -> bool {
        matches!(self, Key::Esc | Key::Ctrl('c'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plain_and_shifted_chars() {
        assert_eq!(
            Key::from_event(&press(KeyCode::Char('j'), KeyModifiers::NONE)),
            Some(Key::Char('j'))
        );
        assert_eq!(
            Key::from_event(&press(KeyCode::Char('D'), KeyModifiers::SHIFT)),
            Some(Key::Char('D'))
        );
    }

    #[test]
    fn control_chars() {
        let key = Key::from_event(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)).unwrap();
        assert_eq!(key, Key::Ctrl('c'));
        assert!(key.is_quit());
        assert!(key.is_cancel());
    }

    #[test]
    fn named_keys() {
        assert_eq!(
            Key::from_event(&press(KeyCode::Enter, KeyModifiers::NONE)),
            Some(Key::Enter)
        );
        assert_eq!(
            Key::from_event(&press(KeyCode::F(5), KeyModifiers::NONE)),
            Some(Key::Other)
        );
    }

    #[test]
    fn release_events_are_dropped() {
        let release = KeyEvent {
            code: KeyCode::Char('j'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(Key::from_event(&release), None);
    }

    #[test]
    fn esc_cancels_but_does_not_quit() {
        assert!(Key::Esc.is_cancel());
        assert!(!Key::Esc.is_quit());
        assert!(Key::Char('q').is_quit());
        assert!(!Key::Char('q').is_cancel());
    }
}
