use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("A task with an empty id is not allowed")]
    InvalidId,

    #[error("A task with id {0} already exists in this graph")]
    DuplicateId(String),

    #[error("Tasks {from} and {to} do not belong to the same graph")]
    CrossGraph { from: String, to: String },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Edge from {from} to {to} already exists")]
    DuplicateEdge { from: String, to: String },

    #[error("Adding edge from {from} to {to} would create a cycle")]
    Cycle { from: String, to: String },

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

pub type Result<T> = std::result::Result<T, Error>;
