//! Raw input types and ability key bindings

use serde::{Deserialize, Serialize};
use std::fmt;

/// A primary pointer press, in host seconds and world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerDown {
    pub at: f64,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    Pause,
    FastForward,
    Rewind,
    Ultimate,
}

impl AbilityKind {
    pub const ALL: [AbilityKind; 4] = [
        AbilityKind::Pause,
        AbilityKind::FastForward,
        AbilityKind::Rewind,
        AbilityKind::Ultimate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AbilityKind::Pause => "pause",
            AbilityKind::FastForward => "fast_forward",
            AbilityKind::Rewind => "rewind",
            AbilityKind::Ultimate => "ultimate",
        }
    }
}

impl fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyboard keys bound to abilities. Keys are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub pause: char,
    pub fast_forward: char,
    pub rewind: char,
    pub ultimate: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            pause: 'q',
            fast_forward: 'w',
            rewind: 'e',
            ultimate: 'r',
        }
    }
}

impl KeyBindings {
    pub fn ability_for(&self, key: char) -> Option<AbilityKind> {
        let key = key.to_ascii_lowercase();
        AbilityKind::ALL
            .into_iter()
            .find(|&kind| self.key_for(kind).to_ascii_lowercase() == key)
    }

    pub fn key_for(&self, kind: AbilityKind) -> char {
        match kind {
            AbilityKind::Pause => self.pause,
            AbilityKind::FastForward => self.fast_forward,
            AbilityKind::Rewind => self.rewind,
            AbilityKind::Ultimate => self.ultimate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_are_qwer() {
        let keys = KeyBindings::default();
        assert_eq!(keys.ability_for('q'), Some(AbilityKind::Pause));
        assert_eq!(keys.ability_for('W'), Some(AbilityKind::FastForward));
        assert_eq!(keys.ability_for('e'), Some(AbilityKind::Rewind));
        assert_eq!(keys.ability_for('r'), Some(AbilityKind::Ultimate));
        assert_eq!(keys.ability_for('x'), None);
    }

    #[test]
    fn ability_names_are_snake_case() {
        let json = serde_json::to_string(&AbilityKind::FastForward).unwrap();
        assert_eq!(json, "\"fast_forward\"");
        assert_eq!(AbilityKind::FastForward.to_string(), "fast_forward");
    }
}
