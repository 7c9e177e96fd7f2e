use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MessageStore, ProductStore, ReviewStore, UserStore};
use crate::accounts::repo_types::{Role, User, UserFilter};
use crate::chat::repo_types::ChatMessage;
use crate::error::{StoreError, StoreResult};
use crate::products::repo_types::{Product, ProductReview};

/// Process-local collections with the same key and filter semantics as [`super::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<String, User>>,
    products: RwLock<BTreeMap<String, Product>>,
    messages: RwLock<Vec<ChatMessage>>,
    reviews: RwLock<Vec<ProductReview>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::Duplicate {
                collection: "users",
                key: user.id.clone(),
            });
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn upsert(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                existing.role = user.role;
                existing.password_hash = user.password_hash.clone();
                existing.product_count = user.product_count;
            }
            None => {
                users.insert(user.id.clone(), user.clone());
            }
        }
        Ok(())
    }

    async fn find(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn list(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| filter.matches(u)).cloned().collect())
    }

    async fn update_role(&self, id: &str, from: Role, to: Role) -> StoreResult<u64> {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(u) if u.role == from => {
                u.role = to;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn update_password_hash(&self, id: &str, hash: &str) -> StoreResult<u64> {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(u) => {
                u.password_hash = hash.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<u64> {
        Ok(u64::from(self.users.write().await.remove(id).is_some()))
    }

    async fn increment_product_count(&self, id: &str) -> StoreResult<Option<i64>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(id).map(|u| {
            u.product_count += 1;
            u.product_count
        }))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert(&self, product: &Product) -> StoreResult<()> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            return Err(StoreError::Duplicate {
                collection: "products",
                key: product.id.clone(),
            });
        }
        products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn list_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self.products.read().await.keys().cloned().collect())
    }

    async fn find_reserved_by(&self, user_id: &str) -> StoreResult<Vec<Product>> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|p| p.reserved_by.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn swap_reservation(
        &self,
        id: &str,
        expected: Option<&str>,
        to: Option<&str>,
    ) -> StoreResult<u64> {
        let mut products = self.products.write().await;
        match products.get_mut(id) {
            Some(p) if p.reserved_by.as_deref() == expected => {
                p.reserved_by = to.map(str::to_string);
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert(&self, message: &ChatMessage) -> StoreResult<()> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|m| m.id == message.id) {
            return Err(StoreError::Duplicate {
                collection: "chat_messages",
                key: message.id.to_string(),
            });
        }
        messages.push(message.clone());
        Ok(())
    }

    async fn list_for_sender(&self, sender: &str) -> StoreResult<Vec<ChatMessage>> {
        let mut out: Vec<ChatMessage> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.sender == sender)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.sent_at);
        Ok(out)
    }

    async fn delete_sent_before(&self, sender: &str, before: i64) -> StoreResult<u64> {
        let mut messages = self.messages.write().await;
        let len = messages.len();
        messages.retain(|m| !(m.sender == sender && m.sent_at < before));
        Ok((len - messages.len()) as u64)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert(&self, review: &ProductReview) -> StoreResult<()> {
        let mut reviews = self.reviews.write().await;
        if reviews.iter().any(|r| r.id == review.id) {
            return Err(StoreError::Duplicate {
                collection: "product_reviews",
                key: review.id.to_string(),
            });
        }
        reviews.push(review.clone());
        Ok(())
    }

    async fn list_for_product(&self, product_id: &str) -> StoreResult<Vec<ProductReview>> {
        let reviews = self.reviews.read().await;
        Ok(reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect())
    }
}
