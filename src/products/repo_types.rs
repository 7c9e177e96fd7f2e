use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::ProductError;
use super::services::convert_from_epoch;

/// Product record in the products collection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: String,                  // reference code, e.g. `R-0042`
    pub name: String,
    pub reserved_by: Option<String>, // holder's user id
    pub created_at: OffsetDateTime,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            reserved_by: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn reserved_for(mut self, user_id: impl Into<String>) -> Self {
        self.reserved_by = Some(user_id.into());
        self
    }

    /// Creation date as `DD/MM/YYYY`.
    pub fn created_on(&self) -> Result<String, ProductError> {
        convert_from_epoch(self.created_at.unix_timestamp())
    }
}

/// A user's score for a product.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductReview {
    pub id: Uuid,
    pub product_id: String,
    pub user_id: String,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: OffsetDateTime,
}
