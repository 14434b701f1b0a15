use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::behaviors::BehaviorId;
use crate::constants::{
    KEY_BACKWARD_RECOVERY, KEY_DROP_FORWARD, KEY_FORWARD_RECOVERY, KEY_PUSHUPS, KEY_PUSHUPS_STOP,
    KEY_WALK, KEY_WAVE,
};
use crate::error::InputError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    Escape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    KeyDown(Key),
}

/// A source of operator input events.
pub trait InputSource {
    /// Waits up to `timeout` for the next event.
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>, InputError>;
}

/// What a key press asks the controller to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Select(BehaviorId),
    Quit,
}

/// Fixed key bindings.
pub struct Keymap;

impl Keymap {
    pub fn action(event: InputEvent) -> Option<Action> {
        match event {
            InputEvent::Quit | InputEvent::KeyDown(Key::Escape) => Some(Action::Quit),
            InputEvent::KeyDown(Key::Space) => Some(Action::Select(BehaviorId::Stand)),
            InputEvent::KeyDown(Key::Char(c)) => {
                let behavior = match c.to_ascii_lowercase() {
                    KEY_WALK => BehaviorId::Walk,
                    KEY_WAVE => BehaviorId::Wave,
                    KEY_FORWARD_RECOVERY => BehaviorId::ForwardRecovery,
                    KEY_BACKWARD_RECOVERY => BehaviorId::BackwardRecovery,
                    KEY_DROP_FORWARD => BehaviorId::DropForward,
                    KEY_PUSHUPS => BehaviorId::Pushups,
                    _ => return None,
                };
                Some(Action::Select(behavior))
            }
        }
    }

    pub fn is_pushups_stop(event: InputEvent) -> bool {
        matches!(event, InputEvent::KeyDown(Key::Char(c)) if c.to_ascii_lowercase() == KEY_PUSHUPS_STOP)
    }

    pub fn print_help() {
        println!("Keyboard controls:");
        println!("  {}: Walk", KEY_WALK.to_ascii_uppercase());
        println!("  Space: Stand");
        println!("  {}: Wave", KEY_WAVE.to_ascii_uppercase());
        println!("  {}: Forward recovery", KEY_FORWARD_RECOVERY);
        println!("  {}: Backward recovery", KEY_BACKWARD_RECOVERY);
        println!("  {}: Drop forward", KEY_DROP_FORWARD);
        println!(
            "  {}: Pushups ({} to stop)",
            KEY_PUSHUPS,
            KEY_PUSHUPS_STOP.to_ascii_uppercase()
        );
        println!("  ESC / Ctrl+C: Exit program gracefully");
    }
}

/// Terminal keyboard in raw mode. Raw mode is released on drop.
pub struct KeyboardInput {
    _private: (),
}

impl KeyboardInput {
    pub fn new() -> Result<Self, InputError> {
        enable_raw_mode()?;
        debug!("keyboard::raw_mode enabled");
        Ok(Self { _private: () })
    }

    fn translate(key: KeyEvent) -> Option<InputEvent> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        // Raw mode swallows SIGINT, so Ctrl+C shows up as a key.
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c' | 'C'))
        {
            return Some(InputEvent::Quit);
        }
        match key.code {
            KeyCode::Esc => Some(InputEvent::KeyDown(Key::Escape)),
            KeyCode::Char(' ') => Some(InputEvent::KeyDown(Key::Space)),
            KeyCode::Char(c) => Some(InputEvent::KeyDown(Key::Char(c))),
            _ => None,
        }
    }
}

impl InputSource for KeyboardInput {
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>, InputError> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(Self::translate(key)),
            _ => Ok(None),
        }
    }
}

impl Drop for KeyboardInput {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to disable raw mode: {}", e);
        }
    }
}
