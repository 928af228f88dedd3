//! Translation from decoded crossterm events to editor key inputs.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use core_state::{Direction, KeyInput};

pub fn translate_key(key: KeyEvent) -> Option<KeyInput> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let arrow = |dir| {
        Some(KeyInput::Arrow {
            dir,
            shift,
            ctrl,
            alt,
        })
    };
    match key.code {
        KeyCode::Char(c) if ctrl => Some(KeyInput::Ctrl(c.to_ascii_lowercase())),
        KeyCode::Char(c) => Some(KeyInput::Char(c)),
        KeyCode::Enter => Some(KeyInput::Enter),
        KeyCode::Esc => Some(KeyInput::Escape),
        KeyCode::Backspace => Some(KeyInput::Backspace),
        KeyCode::Delete => Some(KeyInput::Delete),
        KeyCode::Tab => Some(KeyInput::Tab),
        KeyCode::Up => arrow(Direction::Up),
        KeyCode::Down => arrow(Direction::Down),
        KeyCode::Left => arrow(Direction::Left),
        KeyCode::Right => arrow(Direction::Right),
        KeyCode::Home => Some(KeyInput::Home { shift }),
        KeyCode::End => Some(KeyInput::End { shift }),
        KeyCode::PageUp => Some(KeyInput::PageUp { shift }),
        KeyCode::PageDown => Some(KeyInput::PageDown { shift }),
        _ => None,
    }
}
