//! Collection traits over the document store and their backends.

use async_trait::async_trait;

use crate::accounts::repo_types::{Role, User, UserFilter};
use crate::chat::repo_types::ChatMessage;
use crate::error::StoreResult;
use crate::products::repo_types::{Product, ProductReview};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert-one; an existing id yields `StoreError::Duplicate`.
    async fn insert(&self, user: &User) -> StoreResult<()>;
    /// Insert or overwrite by id.
    async fn upsert(&self, user: &User) -> StoreResult<()>;
    async fn find(&self, id: &str) -> StoreResult<Option<User>>;
    /// Matching users ordered by id.
    async fn list(&self, filter: &UserFilter) -> StoreResult<Vec<User>>;
    /// Sets `role = to` only while the stored role is still `from`.
    async fn update_role(&self, id: &str, from: Role, to: Role) -> StoreResult<u64>;
    async fn update_password_hash(&self, id: &str, hash: &str) -> StoreResult<u64>;
    async fn delete(&self, id: &str) -> StoreResult<u64>;
    /// Atomically adds one and returns the new value.
    async fn increment_product_count(&self, id: &str) -> StoreResult<Option<i64>>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: &Product) -> StoreResult<()>;
    async fn find(&self, id: &str) -> StoreResult<Option<Product>>;
    async fn list_ids(&self) -> StoreResult<Vec<String>>;
    async fn find_reserved_by(&self, user_id: &str) -> StoreResult<Vec<Product>>;
    /// Sets the holder to `to` only while the current holder equals `expected`.
    async fn swap_reservation(
        &self,
        id: &str,
        expected: Option<&str>,
        to: Option<&str>,
    ) -> StoreResult<u64>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: &ChatMessage) -> StoreResult<()>;
    async fn list_for_sender(&self, sender: &str) -> StoreResult<Vec<ChatMessage>>;
    /// Deletes the sender's messages with `sent_at < before`.
    async fn delete_sent_before(&self, sender: &str, before: i64) -> StoreResult<u64>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert(&self, review: &ProductReview) -> StoreResult<()>;
    async fn list_for_product(&self, product_id: &str) -> StoreResult<Vec<ProductReview>>;
}
