use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a failed generation, used by callers to pick a
/// heading and decide whether retrying makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Schema,
    Validation,
    Data,
    Persistence,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("could not read '{}': {message}", path.display())]
    Input { path: PathBuf, message: String },

    #[error("{0}")]
    Schema(String),

    #[error("{0}")]
    Validation(String),

    #[error("row {row}, column '{column}': {message}")]
    Data {
        row: u32,
        column: String,
        message: String,
    },

    #[error(
        "could not save '{}'. Please ensure the file is not open in another program and try again.\n\nError details: {message}",
        path.display()
    )]
    Persistence { path: PathBuf, message: String },
}

impl GenerationError {
    pub fn input(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        GenerationError::Input {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn data(row: u32, column: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationError::Data {
            row,
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Input { .. } => ErrorKind::Input,
            GenerationError::Schema(_) => ErrorKind::Schema,
            GenerationError::Validation(_) => ErrorKind::Validation,
            GenerationError::Data { .. } => ErrorKind::Data,
            GenerationError::Persistence { .. } => ErrorKind::Persistence,
        }
    }

    /// Heading shown above the message, e.g. in the CLI's error line.
    pub fn title(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Input => "Error Reading Input",
            ErrorKind::Schema => "Unexpected Spreadsheet Layout",
            ErrorKind::Validation => "Invalid Settings",
            ErrorKind::Data => "Invalid Source Data",
            ErrorKind::Persistence => "Error Saving Timesheets",
        }
    }
}

/// Failures of the optional steps that run after a successful generation.
/// These never turn a generation into a failure.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no PDF converter found on PATH (looked for {0})")]
    ConverterNotFound(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ConverterFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("converter finished but '{}' was not created", .0.display())]
    MissingPdf(PathBuf),

    #[error("could not reveal '{}': {source}", path.display())]
    Reveal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
