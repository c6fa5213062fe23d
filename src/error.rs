use crate::format::PlayoffFormat;
use crate::types::{Color, CompLevel};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Unsupported playoff format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Cannot resolve {color} alliance {teams:?} in {match_key}: {reason}")]
    UnresolvableAlliance {
        match_key: String,
        color: Color,
        teams: Vec<String>,
        reason: String,
    },

    #[error("Score breakdown for {color} in {match_key} has no '{field}'")]
    MissingTiebreakField {
        match_key: String,
        color: Color,
        field: String,
    },

    #[error("Match number {match_number} is outside the {format} layout")]
    MatchNumberOutOfRange {
        format: PlayoffFormat,
        match_number: u32,
    },

    #[error("Match number {match_number} belongs to {expected}, not {found}, in the {format} layout")]
    SlotMismatch {
        format: PlayoffFormat,
        match_number: u32,
        expected: CompLevel,
        found: CompLevel,
    },

    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// Recoverable errors degrade a single match; the rest are the caller's problem.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::UnresolvableAlliance { .. } => true,
            EngineError::MissingTiebreakField { .. } => true,
            EngineError::UnsupportedFormat { .. } => false,
            EngineError::MatchNumberOutOfRange { .. } => false,
            EngineError::SlotMismatch { .. } => false,
            EngineError::InvalidConfig(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
