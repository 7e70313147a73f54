//! Keyboard input simulation
//!
//! Two backends:
//! - **EnigoInput**: synthetic key events through enigo, text either typed directly or
//!   pasted via the clipboard
//! - **DryRunInput**: logs each action instead of touching the desktop
//!
//! Neither gets feedback about which window has focus; events go wherever the OS sends them.

use arboard::Clipboard;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::thread;
use std::time::Duration;

use crate::action::KeyName;
use crate::error::AutomationError;

/// Issues synthetic keyboard events to the focused application
pub trait InputSimulator {
    /// Hold all but the last key, click the last, release in reverse order
    fn key_combo(&mut self, keys: &[KeyName]) -> Result<(), AutomationError>;
    fn key_press(&mut self, key: KeyName) -> Result<(), AutomationError>;
    fn type_text(&mut self, text: &str) -> Result<(), AutomationError>;
}

/// How text is injected
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum InputMethod {
    /// Use enigo's native text input directly
    #[default]
    Direct,
    /// Copy to clipboard, then paste with Cmd/Ctrl+V
    Clipboard,
}

impl InputMethod {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "clipboard" => InputMethod::Clipboard,
            _ => InputMethod::Direct,
        }
    }
}

fn to_enigo(key: KeyName) -> Key {
    match key {
        KeyName::Enter => Key::Return,
        KeyName::Tab => Key::Tab,
        KeyName::Escape => Key::Escape,
        KeyName::Space => Key::Space,
        KeyName::Backspace => Key::Backspace,
        KeyName::Delete => Key::Delete,
        KeyName::Up => Key::UpArrow,
        KeyName::Down => Key::DownArrow,
        KeyName::Left => Key::LeftArrow,
        KeyName::Right => Key::RightArrow,
        KeyName::Home => Key::Home,
        KeyName::End => Key::End,
        KeyName::Control => Key::Control,
        KeyName::Shift => Key::Shift,
        KeyName::Alt => Key::Alt,
        KeyName::Meta => Key::Meta,
        KeyName::Char(c) => Key::Unicode(c),
    }
}

/// Keyboard input handler using enigo
pub struct EnigoInput {
    enigo: Enigo,
    clipboard: Option<Clipboard>,
    method: InputMethod,
}

impl EnigoInput {
    pub fn new(method: InputMethod) -> Result<Self, AutomationError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| AutomationError::Input(format!("failed to initialise enigo: {}", e)))?;

        // Clipboard is only needed for paste mode; a missing one degrades to direct typing
        let clipboard = match method {
            InputMethod::Clipboard => match Clipboard::new() {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!(error = %e, "clipboard unavailable, typing directly");
                    None
                }
            },
            InputMethod::Direct => None,
        };

        Ok(Self {
            enigo,
            clipboard,
            method,
        })
    }

    fn click(&mut self, key: Key) -> Result<(), AutomationError> {
        self.enigo
            .key(key, Direction::Click)
            .map_err(|e| AutomationError::Input(format!("failed to send key: {}", e)))
    }

    fn type_via_clipboard(&mut self, text: &str) -> Result<(), AutomationError> {
        let Some(clipboard) = self.clipboard.as_mut() else {
            return self.type_direct(text);
        };

        let old_content = clipboard.get_text().ok();
        clipboard
            .set_text(text)
            .map_err(|e| AutomationError::Clipboard(format!("failed to set clipboard: {}", e)))?;

        thread::sleep(Duration::from_millis(50));

        let pasted = self.key_combo(&[KeyName::primary_modifier(), KeyName::Char('v')]);

        thread::sleep(Duration::from_millis(100));

        // Restore old clipboard content (best effort)
        if let (Some(old), Some(clipboard)) = (old_content, self.clipboard.as_mut()) {
            let _ = clipboard.set_text(old);
        }

        pasted
    }

    fn type_direct(&mut self, text: &str) -> Result<(), AutomationError> {
        self.enigo
            .text(text)
            .map_err(|e| AutomationError::Input(format!("failed to type text: {}", e)))
    }
}

impl InputSimulator for EnigoInput {
    fn key_combo(&mut self, keys: &[KeyName]) -> Result<(), AutomationError> {
        let Some((last, modifiers)) = keys.split_last() else {
            return Ok(());
        };

        for modifier in modifiers {
            self.enigo
                .key(to_enigo(*modifier), Direction::Press)
                .map_err(|e| AutomationError::Input(format!("failed to press modifier: {}", e)))?;
        }

        // Let the modifiers register before the main key
        thread::sleep(Duration::from_millis(10));
        let clicked = self.click(to_enigo(*last));
        thread::sleep(Duration::from_millis(50));

        // Always release, even if the click failed
        for modifier in modifiers.iter().rev() {
            self.enigo
                .key(to_enigo(*modifier), Direction::Release)
                .map_err(|e| AutomationError::Input(format!("failed to release modifier: {}", e)))?;
        }

        clicked
    }

    fn key_press(&mut self, key: KeyName) -> Result<(), AutomationError> {
        self.click(to_enigo(key))
    }

    fn type_text(&mut self, text: &str) -> Result<(), AutomationError> {
        if text.is_empty() {
            return Ok(());
        }

        match self.method {
            InputMethod::Direct => self.type_direct(text),
            InputMethod::Clipboard => match self.type_via_clipboard(text) {
                Ok(()) => Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "clipboard paste failed, trying direct");
                    self.type_direct(text)
                }
            },
        }
    }
}

/// Logs input actions instead of performing them
#[derive(Debug, Default)]
pub struct DryRunInput;

impl InputSimulator for DryRunInput {
    fn key_combo(&mut self, keys: &[KeyName]) -> Result<(), AutomationError> {
        let names: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        tracing::info!(combo = %names.join("+"), "dry-run: key combo");
        Ok(())
    }

    fn key_press(&mut self, key: KeyName) -> Result<(), AutomationError> {
        tracing::info!(%key, "dry-run: key press");
        Ok(())
    }

    fn type_text(&mut self, text: &str) -> Result<(), AutomationError> {
        tracing::info!(text, "dry-run: type text");
        Ok(())
    }
}
