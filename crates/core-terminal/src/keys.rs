//! Key event decoding.
//!
//! Input events are typed as Unicode text, function keys, or named keysyms,
//! plus a modifier mask. The crossterm event stream is the only source; the
//! mapping here keeps the rest of the workspace free of crossterm types.

use anyhow::Result;
use bitflags::bitflags;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mods: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Function(u8),
    Enter,
    Escape,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize(usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub mods: Mods,
}

fn mods_of(m: KeyModifiers) -> Mods {
    let mut out = Mods::empty();
    if m.contains(KeyModifiers::SHIFT) {
        out |= Mods::SHIFT;
    }
    if m.contains(KeyModifiers::CONTROL) {
        out |= Mods::CTRL;
    }
    if m.contains(KeyModifiers::ALT) {
        out |= Mods::ALT;
    }
    out
}

pub fn decode(ev: event::KeyEvent) -> Option<KeyEvent> {
    if ev.kind == KeyEventKind::Release {
        return None;
    }
    let key = match ev.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::F(n) => Key::Function(n),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Tab => Key::Tab,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Delete => Key::Delete,
        KeyCode::Insert => Key::Insert,
        _ => return None,
    };
    Some(KeyEvent {
        key,
        mods: mods_of(ev.modifiers),
    })
}

/// Block until the next key or resize. `poll_ms` bounds the wait so callers
/// can service flags (interrupt, redraw) between events.
pub fn read_key(poll_ms: u64) -> Result<Option<InputEvent>> {
    if !event::poll(Duration::from_millis(poll_ms))? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(ev) => Ok(decode(ev).map(InputEvent::Key)),
        Event::Resize(cols, rows) => Ok(Some(InputEvent::Resize(cols as usize, rows as usize))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, mods: KeyModifiers) -> event::KeyEvent {
        event::KeyEvent {
            code,
            modifiers: mods,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn chars_and_modifiers_decode() {
        let ev = decode(key(KeyCode::Char('x'), KeyModifiers::CONTROL)).unwrap();
        assert_eq!(ev.key, Key::Char('x'));
        assert_eq!(ev.mods, Mods::CTRL);
    }

    #[test]
    fn function_and_named_keys_decode() {
        assert_eq!(
            decode(key(KeyCode::F(5), KeyModifiers::NONE)).unwrap().key,
            Key::Function(5)
        );
        assert_eq!(
            decode(key(KeyCode::Esc, KeyModifiers::NONE)).unwrap().key,
            Key::Escape
        );
    }

    #[test]
    fn release_events_are_dropped() {
        let ev = event::KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(decode(ev), None);
    }
}
