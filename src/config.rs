use crate::error::{EngineError, Result};
use crate::types::DEFAULT_TEAM_KEY_PREFIX;
use serde::{Deserialize, Serialize};

/// Rendering options for status strings. Everything else the engine does is
/// fixed by the event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Wrap the key figures of a status string in `<b>` tags.
    pub html_status: bool,
    /// Start status strings with "Team N".
    pub include_team: bool,
    pub team_key_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            html_status: false,
            include_team: true,
            team_key_prefix: DEFAULT_TEAM_KEY_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config = serde_json::from_str::<EngineConfig>(raw)
            .map_err(|e| EngineError::InvalidConfig(format!("parse config: {e}")))?;
        if config.team_key_prefix.chars().any(char::is_whitespace) {
            return Err(EngineError::InvalidConfig(format!(
                "teamKeyPrefix '{}' contains whitespace",
                config.team_key_prefix
            )));
        }
        Ok(config)
    }

    /// "frc254" -> "254". Keys without the prefix are shown as-is.
    pub fn team_number<'a>(&self, team_key: &'a str) -> &'a str {
        let trimmed = team_key.trim();
        trimmed
            .strip_prefix(self.team_key_prefix.as_str())
            .filter(|rest| !rest.is_empty())
            .unwrap_or(trimmed)
    }

    /// "254", " FRC254 " -> "frc254".
    pub fn normalize_team_key(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim().to_ascii_lowercase();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Some(format!("{}{}", self.team_key_prefix, trimmed));
        }
        Some(trimmed)
    }
}
