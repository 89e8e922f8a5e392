use std::path::PathBuf;

/// Result type alias for normalizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a source table could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("sheet '{sheet}' not found in {path} (available: {available:?})")]
    SheetNotFound {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    /// File exists but is not a readable table. Carries the full context chain.
    #[error("malformed table {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// Errors surfaced by table operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// An operation was invoked on a column of the wrong kind.
    #[error("column '{column}' is {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A companion column the operation depends on is absent.
    #[error("column '{column}' requires a '{required}' column")]
    MissingCompanion { column: String, required: String },

    #[error("column '{name}' not found")]
    ColumnNotFound { name: String },

    #[error("column '{name}' already exists")]
    DuplicateColumn { name: String },

    #[error("column '{column}' has {actual} values, table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("failed to write {path}: {message}")]
    Export { path: PathBuf, message: String },

    #[error("invalid pipeline configuration: {message}")]
    Config { message: String },
}

impl Error {
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    pub fn export(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Export {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message_names_column() {
        let err = Error::TypeMismatch {
            column: "price".to_string(),
            expected: "text",
            found: "numeric",
        };
        assert_eq!(err.to_string(), "column 'price' is numeric, expected text");
    }

    #[test]
    fn test_load_error_is_transparent() {
        let err: Error = LoadError::UnsupportedFormat("txt".to_string()).into();
        assert_eq!(err.to_string(), "unsupported file extension: .txt");
    }

    #[test]
    fn test_sheet_not_found_lists_available() {
        let err = LoadError::SheetNotFound {
            path: PathBuf::from("book.xlsx"),
            sheet: "Data".to_string(),
            available: vec!["Sheet1".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Data"));
        assert!(msg.contains("Sheet1"));
    }
}
