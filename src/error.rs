use thiserror::Error;

/// Failures detected by the pipeline itself, as opposed to io or polars errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("Required column '{name}' not found")]
    MissingColumn { name: String },

    #[error("No transactions to derive {what} from")]
    EmptyTable { what: &'static str },

    #[error("Invalid reference date: {0}")]
    InvalidReferenceDate(String),

    #[error("{what} is outside the representable date range")]
    DateOutOfRange { what: String },
}

/// Fail with [`DataError::MissingColumn`] for the first absent column.
pub(crate) fn require_columns(df: &polars::prelude::DataFrame, names: &[&str]) -> crate::Result<()> {
    for name in names {
        if df.column(name).is_err() {
            return Err(DataError::MissingColumn {
                name: (*name).to_string(),
            }
            .into());
        }
    }
    Ok(())
}
