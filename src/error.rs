use std::path::PathBuf;

use crate::game::Action;

/// A vector handed to the value network does not match its declared size.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{what} has length {actual}, expected {expected}")]
pub struct DimensionError {
    pub what: &'static str,
    pub expected: usize,
    pub actual: usize,
}

/// Errors that can occur while reading or writing a model file.
#[derive(Debug, thiserror::Error)]
pub enum ModelIoError {
    #[error("I/O error on model file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not a model file (bad magic)")]
    BadMagic { path: PathBuf },

    #[error("{path}: unsupported model format version {version}")]
    UnsupportedVersion { path: PathBuf, version: u32 },

    #[error("{path} is truncated: expected {expected} bytes, found {actual}")]
    Truncated {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("{path} has {extra} unexpected trailing bytes")]
    TrailingData { path: PathBuf, extra: usize },

    #[error("{path} declares dimensions {found:?}, network expects {expected:?}")]
    ShapeMismatch {
        path: PathBuf,
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },
}

/// Sampling asked for more transitions than the replay buffer holds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("replay buffer holds {available} transitions, {requested} requested")]
pub struct BufferUnderflow {
    pub requested: usize,
    pub available: usize,
}

/// Errors raised while choosing an action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("no legal actions available")]
    NoLegalActions,

    #[error("selected action is out of bounds: {0}")]
    InvalidAction(Action),

    #[error("action id {0} is outside the action space")]
    UnknownActionId(usize),

    #[error(transparent)]
    Dimension(#[from] DimensionError),
}

/// Errors reported by a rules delegate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("illegal action: {0}")]
    IllegalAction(Action),

    #[error("action outside the board: {0}")]
    OutOfBounds(Action),
}

/// Errors that stop a turn inside a game session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Rules(#[from] RulesError),
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("no 'latest' symlink found in {0}")]
    NoLatestSymlink(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("model file error: {0}")]
    Model(#[from] ModelIoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that abort a training run.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("update worker stopped unexpectedly")]
    WorkerGone,

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
