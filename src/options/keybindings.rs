use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::input::KeyAction;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "RawKeybindings")]
/// Configurable keyboard bindings mapping actions to key codes.
pub struct KeybindingOptions {
    /// Maps action → key string (e.g. `focus_scene` → `"KeyF"`).
    pub bindings: HashMap<KeyAction, String>,
    /// Reverse lookup cache (key string → action).
    #[serde(skip)]
    key_to_action: HashMap<String, KeyAction>,
}

impl Default for KeybindingOptions {
    fn default() -> Self {
        Self::from_bindings(HashMap::from([
            (KeyAction::FocusScene, "KeyF".into()),
            (KeyAction::ResetView, "KeyR".into()),
            (KeyAction::TogglePostProcessing, "KeyP".into()),
            (KeyAction::ToggleAutoRotate, "KeyA".into()),
        ]))
    }
}

impl KeybindingOptions {
    /// Bindings from an action → key map.
    #[must_use]
    pub fn from_bindings(bindings: HashMap<KeyAction, String>) -> Self {
        let mut opts = Self {
            bindings,
            key_to_action: HashMap::new(),
        };
        opts.rebuild_reverse_map();
        opts
    }

    /// Rebuild the reverse lookup map (key string → action).
    pub fn rebuild_reverse_map(&mut self) {
        self.key_to_action.clear();
        for (action, key) in &self.bindings {
            let _ = self.key_to_action.insert(key.clone(), *action);
        }
    }

    /// Look up the action for a key string.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<KeyAction> {
        self.key_to_action.get(key).copied()
    }
}

/// Serialized form; the reverse map is rebuilt on conversion.
#[derive(Deserialize)]
#[serde(default)]
struct RawKeybindings {
    bindings: HashMap<KeyAction, String>,
}

impl Default for RawKeybindings {
    fn default() -> Self {
        Self {
            bindings: KeybindingOptions::default().bindings,
        }
    }
}

impl From<RawKeybindings> for KeybindingOptions {
    fn from(raw: RawKeybindings) -> Self {
        Self::from_bindings(raw.bindings)
    }
}
