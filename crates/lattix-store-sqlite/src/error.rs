//! Error type for `lattix-store-sqlite`.

use lattix_core::store::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] lattix_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {kind} value in database: {value:?}")]
  Decode { kind: &'static str, value: String },

  /// A guarded UPDATE matched no row even though the row was read in the same
  /// transaction.
  #[error("row {0} changed underneath the transaction")]
  StaleRow(uuid::Uuid),
}

impl DomainError for Error {
  fn domain(&self) -> Option<&lattix_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
