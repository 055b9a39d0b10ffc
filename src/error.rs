use thiserror::Error;

use crate::cif::CifParseError;
use crate::format::Format;
use crate::mmtf::MmtfError;

/// A malformed-but-recoverable condition met while decoding.
///
/// Warnings never abort a parse; they are collected on the raw dict and
/// promoted to [`Error::Strict`] only under [`StrictnessLevel::Strict`](crate::StrictnessLevel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseWarning {
    /// A category was declared more than once; the last declaration won.
    #[error("category '{0}' declared more than once, keeping the last")]
    DuplicateCategory(String),

    /// A loop's value count was not a multiple of its tag count; the
    /// incomplete trailing row was dropped.
    #[error("loop '{category}' has {values} values for {columns} columns, dropping the partial row")]
    RaggedLoop {
        category: String,
        columns: usize,
        values: usize,
    },

    /// Only the first `data_` block is decoded.
    #[error("ignoring additional data block '{0}'")]
    ExtraDataBlock(String),

    /// A `MODEL` record was never closed by `ENDMDL`.
    #[error("model {0} has no ENDMDL record")]
    UnterminatedModel(usize),
}

/// Errors raised while mapping a raw dict onto the canonical schema.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid {format} {field} value {value:?}")]
    InvalidNumber {
        format: Format,
        field: String,
        value: String,
    },

    #[error("{format} data references {kind} '{id}' which is not defined")]
    DanglingReference {
        format: Format,
        kind: &'static str,
        id: String,
    },

    #[error("{format} model {model} contains atom id {id} more than once")]
    DuplicateAtomId { format: Format, model: usize, id: i64 },
}

impl NormalizeError {
    pub fn invalid_number(format: Format, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            format,
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn dangling(format: Format, kind: &'static str, id: impl ToString) -> Self {
        Self::DanglingReference {
            format,
            kind,
            id: id.to_string(),
        }
    }

    /// Whether this error means the input was internally inconsistent, as
    /// opposed to unreadable.
    pub fn is_integrity_error(&self) -> bool {
        !matches!(self, NormalizeError::InvalidNumber { .. })
    }
}

/// Crate-level error returned by the one-shot readers in [`ReadOptions`](crate::ReadOptions).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Mmtf(#[from] MmtfError),

    #[error(transparent)]
    Cif(#[from] CifParseError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("strict parsing rejected input: {0}")]
    Strict(ParseWarning),
}
