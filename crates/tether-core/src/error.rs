use std::path::PathBuf;

use thiserror::Error;

/// Agent-level errors. Any of these ends the current task.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no task set, call start_task first")]
    NoTaskSet,

    #[error("model not loaded, call init first")]
    ModelNotLoaded,

    #[error("failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("invalid working directory: {}", .0.display())]
    InvalidWorkingDirectory(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("maximum steps ({max_steps}) reached, task may be incomplete")]
    StepBudgetExceeded { max_steps: u32 },

    #[error("task already ended with an error, call start_task or reset")]
    TaskEnded,

    #[error("failed to parse model output: {raw}")]
    UnparsableOutput { raw: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("prompt error: {0}")]
    Prompt(#[from] tether_pm::PmError),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Tool-level errors. These never stop the agent; they are rendered into a
/// failed [`ToolResult`](crate::ToolResult) so the model can correct itself.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Path outside working directory: {0}")]
    PathOutsideRoot(String),

    #[error("Path too long ({len} characters). Maximum is {max}.")]
    PathTooLong { len: usize, max: usize },

    #[error("Invalid line range. {0}")]
    InvalidRange(&'static str),

    #[error("Too many lines requested ({requested}). Maximum is {max}. Narrow your request.")]
    RangeTooLarge { requested: usize, max: usize },

    #[error("{kind} not found: {path}{hint}")]
    NotFound {
        kind: &'static str,
        path: String,
        hint: &'static str,
    },

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file: {0}. Use LIST for directories.")]
    NotAFile(String),

    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(String),

    #[error("Too many lines to write ({count}). Maximum is {max}.")]
    TooManyLines { count: usize, max: usize },

    #[error("Start line {start} beyond end of file ({len} lines).")]
    StartBeyondEof { start: usize, len: usize },

    #[error("File already exists: {0}. Use WRITE to modify.")]
    AlreadyExists(String),

    #[error("Empty command.")]
    EmptyCommand,

    #[error("Unknown command: {name}\nAvailable: {available}")]
    UnknownCommand { name: String, available: String },

    #[error("Missing content block. Content should follow on the next line, ending with {end_marker}.")]
    MissingContentBlock { end_marker: &'static str },

    #[error("Invalid format. Use: {0}")]
    InvalidArguments(&'static str),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub(crate) fn not_found(kind: &'static str, path: &str) -> Self {
        Self::NotFound {
            kind,
            path: path.to_owned(),
            hint: "",
        }
    }

    /// Edits refuse to create files implicitly.
    pub(crate) fn file_not_found_for_edit(path: &str) -> Self {
        Self::NotFound {
            kind: "File",
            path: path.to_owned(),
            hint: ". Use CREATE first for new files.",
        }
    }

    pub(crate) fn io(path: &str, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_owned(),
            source,
        }
    }
}
