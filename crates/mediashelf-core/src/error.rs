use thiserror::Error;

/// All errors that can occur in mediashelf-core.
#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Keeper {keeper} is not a member of group \"{group}\"")]
    KeeperNotInGroup { keeper: String, group: String },

    #[error("Unknown media format: {0}")]
    UnknownFormat(String),

    #[error("Unknown condition: {0}")]
    UnknownCondition(String),

    #[error("Unknown collection status: {0}")]
    UnknownStatus(String),

    #[error("Config error: {0}")]
    ConfigError(String),

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

/// Error returned by a failed merge run. Deletions committed before the
/// failure are not rolled back; `removed` tells the caller how many items
/// were already gone when the run stopped.
#[derive(Debug, Error)]
#[error("Merge stopped after removing {removed} item(s): {source}")]
pub struct MergeError {
    pub removed: usize,
    #[source]
    pub source: ShelfError,
}

/// Exit codes used by the CLI.
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    StorageError = 4,
    MergeFailed = 5,
    ConfirmRequired = 8,
}

pub type Result<T> = std::result::Result<T, ShelfError>;
