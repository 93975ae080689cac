use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// Operand dimensions are incompatible.
    InvalidShape(String),
    /// Inversion was requested for a non-square matrix.
    NotSquare { rows: usize, cols: usize },
    /// A Gauss-Jordan pivot was exactly zero.
    Singular { column: usize },
    /// The model has no learned parameters yet.
    NotFitted(String),
    InvalidConfig(String),
    InvalidData(String),
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidShape(msg) => write!(f, "invalid shape: {msg}"),
            Error::NotSquare { rows, cols } => {
                write!(f, "matrix must be square to invert, got {rows}x{cols}")
            }
            Error::Singular { column } => {
                write!(f, "matrix is singular (zero pivot in column {column})")
            }
            Error::NotFitted(msg) => write!(f, "model not fitted: {msg}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::InvalidConfig(value.to_string())
    }
}
