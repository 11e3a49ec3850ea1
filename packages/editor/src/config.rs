use serde::{Deserialize, Serialize};

/// Editor behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum undo levels kept (0 = unlimited)
    #[serde(default = "default_max_undo_levels")]
    pub max_undo_levels: usize,

    /// Convert typed `[^label]` tokens into footnote references
    #[serde(default = "default_input_rules")]
    pub input_rules: bool,
}

fn default_max_undo_levels() -> usize {
    100
}

fn default_input_rules() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo_levels: default_max_undo_levels(),
            input_rules: default_input_rules(),
        }
    }
}
