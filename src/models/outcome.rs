use std::fmt;

/// Pipeline step an outcome was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyStep {
    /// Lookup and validation before any file is touched
    Validate,
    Copy,
    Thumbnail,
    Shortcuts,
}

/// One human-readable result line of an apply batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub game_name: String,
    pub success: bool,
    pub message: String,
    pub step: ApplyStep,
}

impl OperationOutcome {
    pub fn success(game_name: impl Into<String>, step: ApplyStep, message: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            success: true,
            message: message.into(),
            step,
        }
    }

    pub fn failure(game_name: impl Into<String>, step: ApplyStep, message: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            success: false,
            message: message.into(),
            step,
        }
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.success { "✅" } else { "❌" };
        write!(f, "{} {}", mark, self.message)
    }
}
