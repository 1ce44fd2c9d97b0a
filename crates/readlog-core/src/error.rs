use thiserror::Error;

/// All errors that can occur in readlog-core.
///
/// The analytics themselves are total and never produce these; only the
/// behavior store, config I/O and book-list loading do.
#[derive(Debug, Error)]
pub enum ReadlogError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Behavior store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl ReadlogError {
    pub(crate) fn poisoned(what: &str) -> Self {
        Self::Store(format!("{what} lock poisoned"))
    }
}

pub type Result<T> = std::result::Result<T, ReadlogError>;
