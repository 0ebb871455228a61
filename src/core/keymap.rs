/// Key symbols and the Normal-mode key bindings

use std::collections::HashMap;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::process_view::SortKey;

/// A key press reduced to what the dashboard cares about
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Key {
    Char(char),
    /// Char with the Control modifier held
    Ctrl(char),
    Code(KeyCode),
}

impl From<KeyEvent> for Key {
    fn from(event: KeyEvent) -> Self {
        match event.code {
            KeyCode::Char(c) if event.modifiers.contains(KeyModifiers::CONTROL) => {
                Key::Ctrl(c.to_ascii_lowercase())
            }
            KeyCode::Char(c) => Key::Char(c),
            other => Key::Code(other),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Ctrl(c) => write!(f, "Ctrl+{c}"),
            Key::Code(KeyCode::Up) => write!(f, "↑"),
            Key::Code(KeyCode::Down) => write!(f, "↓"),
            Key::Code(KeyCode::F(n)) => write!(f, "F{n}"),
            Key::Code(code) => write!(f, "{code:?}"),
        }
    }
}

/// Commands reachable from Normal mode
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    Quit,
    Up,
    Down,
    Sort(SortKey),
    Filter,
    KillSelected,
    Help,
}

impl Action {
    pub fn description(&self) -> &'static str {
        match self {
            Action::Quit => "Quit",
            Action::Up => "Move selection up",
            Action::Down => "Move selection down",
            Action::Sort(SortKey::Cpu) => "Sort by CPU",
            Action::Sort(SortKey::Mem) => "Sort by memory",
            Action::Sort(SortKey::Pid) => "Sort by PID",
            Action::Filter => "Filter processes",
            Action::KillSelected => "Kill selected process",
            Action::Help => "Toggle help",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyMap {
    bindings: HashMap<Key, Action>,
}

impl Default for KeyMap {
    fn default() -> Self {
        let mut bindings = HashMap::new();
        bindings.insert(Key::Char('q'), Action::Quit);
        bindings.insert(Key::Ctrl('c'), Action::Quit);
        bindings.insert(Key::Code(KeyCode::Up), Action::Up);
        bindings.insert(Key::Char('k'), Action::Up);
        bindings.insert(Key::Code(KeyCode::Down), Action::Down);
        bindings.insert(Key::Char('j'), Action::Down);
        bindings.insert(Key::Code(KeyCode::F(3)), Action::Sort(SortKey::Cpu));
        bindings.insert(Key::Char('c'), Action::Sort(SortKey::Cpu));
        bindings.insert(Key::Code(KeyCode::F(4)), Action::Sort(SortKey::Mem));
        bindings.insert(Key::Char('m'), Action::Sort(SortKey::Mem));
        bindings.insert(Key::Code(KeyCode::F(5)), Action::Sort(SortKey::Pid));
        bindings.insert(Key::Char('p'), Action::Sort(SortKey::Pid));
        bindings.insert(Key::Char('/'), Action::Filter);
        bindings.insert(Key::Char('K'), Action::KillSelected);
        bindings.insert(Key::Char('h'), Action::Help);
        bindings.insert(Key::Char('?'), Action::Help);
        Self { bindings }
    }
}

impl KeyMap {
    pub fn action(&self, key: &Key) -> Option<Action> {
        self.bindings.get(key).copied()
    }

    /// Every key bound to `action`, sorted for stable display
    pub fn keys_for(&self, action: Action) -> Vec<String> {
        let mut keys: Vec<String> = self
            .bindings
            .iter()
            .filter(|(_, a)| **a == action)
            .map(|(k, _)| k.to_string())
            .collect();
        keys.sort();
        keys
    }

    /// Help overlay rows: (keys, description)
    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        [
            Action::Up,
            Action::Down,
            Action::Sort(SortKey::Cpu),
            Action::Sort(SortKey::Mem),
            Action::Sort(SortKey::Pid),
            Action::Filter,
            Action::KillSelected,
            Action::Help,
            Action::Quit,
        ]
        .into_iter()
        .map(|action| (self.keys_for(action).join(" / "), action.description()))
        .collect()
    }
}
