use thiserror::Error;

/// Faults raised by a collection backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key `{key}` in {collection}")]
    Duplicate {
        collection: &'static str,
        key: String,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }

    /// Maps a Postgres unique violation on `key` to [`StoreError::Duplicate`].
    pub(crate) fn from_insert(err: sqlx::Error, collection: &'static str, key: &str) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Duplicate {
                    collection,
                    key: key.to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
