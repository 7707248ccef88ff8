//! Tool status phrases

use std::collections::HashMap;

/// Built-in tool identifiers and their status phrases
const BUILTIN_PHRASES: &[(&str, &str)] = &[
    ("web_search", "Searching the web"),
    ("news_search", "Searching the web"),
    ("generate_image", "Generating an image"),
];

/// Mapping from tool identifier to human-readable status phrase
#[derive(Debug, Clone)]
pub struct ToolNameTable {
    phrases: HashMap<String, String>,
}

impl Default for ToolNameTable {
    fn default() -> Self {
        Self {
            phrases: BUILTIN_PHRASES
                .iter()
                .map(|(tool, phrase)| (tool.to_string(), phrase.to_string()))
                .collect(),
        }
    }
}

impl ToolNameTable {
    /// Built-in table extended by `overrides`; configured entries win
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::default();
        table
            .phrases
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        table
    }

    pub fn phrase(&self, tool_name: &str) -> Option<&str> {
        self.phrases.get(tool_name).map(String::as_str)
    }

    /// Status note text for a started tool: the phrase followed by a blank line
    pub fn status_note(&self, tool_name: &str) -> Option<String> {
        self.phrase(tool_name).map(|phrase| format!("{}\n\n", phrase))
    }
}
