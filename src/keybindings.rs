//! Key-to-button mapping for the terminal preview.
//!
//! Keys stand in for the panel's physical buttons. Defaults can be
//! overridden from the `[keybindings]` table in config.toml.
use crate::input::ButtonEvent;
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Button(ButtonEvent),
    Quit,
}

impl KeyAction {
    /// Name used in config.toml.
    pub fn config_name(self) -> &'static str {
        match self {
            Self::Button(ButtonEvent::NextArticle) => "next_article",
            Self::Button(ButtonEvent::PrevArticle) => "prev_article",
            Self::Button(ButtonEvent::SwitchFeed) => "switch_feed",
            Self::Quit => "quit",
        }
    }
}

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "n", "p", " "
/// - Named keys: "Enter", "Esc", "Tab", "Up", "Down", "Left", "Right", "Space"
/// - Modifier combos: "Ctrl+c"
/// - Function keys: "F1" through "F12"
pub fn parse_key_string(s: &str) -> Option<KeySpec> {
    if s == " " {
        return Some(KeySpec::plain(KeyCode::Char(' ')));
    }
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.trim().chars();
        let c = chars.next()?;
        return chars.next().is_none().then(|| KeySpec::ctrl(c));
    }

    match s.to_lowercase().as_str() {
        "enter" | "return" => return Some(KeySpec::plain(KeyCode::Enter)),
        "esc" | "escape" => return Some(KeySpec::plain(KeyCode::Esc)),
        "tab" => return Some(KeySpec::plain(KeyCode::Tab)),
        "up" => return Some(KeySpec::plain(KeyCode::Up)),
        "down" => return Some(KeySpec::plain(KeyCode::Down)),
        "left" => return Some(KeySpec::plain(KeyCode::Left)),
        "right" => return Some(KeySpec::plain(KeyCode::Right)),
        "space" => return Some(KeySpec::plain(KeyCode::Char(' '))),
        _ => {}
    }

    if let Some(n) = s.strip_prefix(['F', 'f']).and_then(|n| n.parse::<u8>().ok()) {
        if (1..=12).contains(&n) {
            return Some(KeySpec::plain(KeyCode::F(n)));
        }
    }

    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then(|| KeySpec::plain(KeyCode::Char(c)))
}

fn parse_action_name(name: &str) -> Option<KeyAction> {
    match name.to_lowercase().as_str() {
        "next_article" | "next" => Some(KeyAction::Button(ButtonEvent::NextArticle)),
        "prev_article" | "prev" | "previous" => Some(KeyAction::Button(ButtonEvent::PrevArticle)),
        "switch_feed" | "feed" => Some(KeyAction::Button(ButtonEvent::SwitchFeed)),
        "quit" => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Key lookup table with default bindings and config overrides.
#[derive(Debug, Clone)]
pub struct KeyMap {
    lookup: HashMap<KeySpec, KeyAction>,
}

impl KeyMap {
    /// Arrow keys and `n`/`p` move between articles, Tab/`f` switches feed,
    /// `q`/Esc/Ctrl+c quit.
    pub fn new() -> Self {
        let mut map = Self {
            lookup: HashMap::new(),
        };
        let next = KeyAction::Button(ButtonEvent::NextArticle);
        let prev = KeyAction::Button(ButtonEvent::PrevArticle);
        let feed = KeyAction::Button(ButtonEvent::SwitchFeed);

        map.bind(KeySpec::plain(KeyCode::Right), next);
        map.bind(KeySpec::plain(KeyCode::Char('n')), next);
        map.bind(KeySpec::plain(KeyCode::Left), prev);
        map.bind(KeySpec::plain(KeyCode::Char('p')), prev);
        map.bind(KeySpec::plain(KeyCode::Tab), feed);
        map.bind(KeySpec::plain(KeyCode::Char('f')), feed);
        map.bind(KeySpec::plain(KeyCode::Char('q')), KeyAction::Quit);
        map.bind(KeySpec::plain(KeyCode::Esc), KeyAction::Quit);
        map.bind(KeySpec::ctrl('c'), KeyAction::Quit);
        map
    }

    fn bind(&mut self, key: KeySpec, action: KeyAction) {
        self.lookup.insert(key, action);
    }

    /// Apply user keybinding overrides from config.
    ///
    /// Each override replaces every default key of that action. Returns a
    /// list of warnings for unrecognized action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };
            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            self.lookup.retain(|_, a| *a != action);
            self.bind(key, action);

            tracing::info!(
                action = action.config_name(),
                key = %key_str,
                "Applied keybinding override"
            );
        }

        warnings
    }

    pub fn action_for_key(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<KeyAction> {
        // Shifted letters arrive as uppercase chars; the SHIFT flag is noise.
        let modifiers = modifiers - KeyModifiers::SHIFT;
        self.lookup.get(&KeySpec::new(code, modifiers)).copied()
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}
