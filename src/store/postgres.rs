use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{MessageStore, ProductStore, ReviewStore, UserStore};
use crate::accounts::repo_types::{Role, User, UserFilter};
use crate::chat::repo_types::ChatMessage;
use crate::error::{StoreError, StoreResult};
use crate::products::repo_types::{Product, ProductReview};

/// Postgres-backed collections. One table per collection, keyed by `id`.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, role, password_hash, product_count, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&user.id)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(user.product_count)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| StoreError::from_insert(e, "users", &user.id))?;
        Ok(())
    }

    async fn upsert(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, role, password_hash, product_count, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
               SET role = EXCLUDED.role,
                   password_hash = EXCLUDED.password_hash,
                   product_count = EXCLUDED.product_count
            "#,
        )
        .bind(&user.id)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(user.product_count)
        .bind(user.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find(&self, id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, role, password_hash, product_count, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, role, password_hash, product_count, created_at
            FROM users
            WHERE ($1::text IS NULL OR strpos(id, $1) > 0)
              AND ($2::smallint IS NULL OR role = $2)
            ORDER BY id
            "#,
        )
        .bind(filter.id_contains.as_deref())
        .bind(filter.role)
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn update_role(&self, id: &str, from: Role, to: Role) -> StoreResult<u64> {
        let res = sqlx::query(r#"UPDATE users SET role = $3 WHERE id = $1 AND role = $2"#)
            .bind(id)
            .bind(from)
            .bind(to)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn update_password_hash(&self, id: &str, hash: &str) -> StoreResult<u64> {
        let res = sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE id = $1"#)
            .bind(id)
            .bind(hash)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn delete(&self, id: &str) -> StoreResult<u64> {
        let res = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn increment_product_count(&self, id: &str) -> StoreResult<Option<i64>> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
               SET product_count = product_count + 1
             WHERE id = $1
            RETURNING product_count
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn insert(&self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, reserved_by, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.reserved_by.as_deref())
        .bind(product.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| StoreError::from_insert(e, "products", &product.id))?;
        Ok(())
    }

    async fn find(&self, id: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"SELECT id, name, reserved_by, created_at FROM products WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(product)
    }

    async fn list_ids(&self) -> StoreResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(r#"SELECT id FROM products"#)
            .fetch_all(&self.db)
            .await?;
        Ok(ids)
    }

    async fn find_reserved_by(&self, user_id: &str) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, reserved_by, created_at
              FROM products
             WHERE reserved_by = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn swap_reservation(
        &self,
        id: &str,
        expected: Option<&str>,
        to: Option<&str>,
    ) -> StoreResult<u64> {
        let res = sqlx::query(
            r#"
            UPDATE products
               SET reserved_by = $3
             WHERE id = $1
               AND reserved_by IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(to)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert(&self, message: &ChatMessage) -> StoreResult<()> {
        let key = message.id.to_string();
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, chat_id, sender, display_name, sent_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id)
        .bind(&message.chat_id)
        .bind(&message.sender)
        .bind(&message.display_name)
        .bind(message.sent_at)
        .execute(&self.db)
        .await
        .map_err(|e| StoreError::from_insert(e, "chat_messages", &key))?;
        Ok(())
    }

    async fn list_for_sender(&self, sender: &str) -> StoreResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, chat_id, sender, display_name, sent_at
              FROM chat_messages
             WHERE sender = $1
             ORDER BY sent_at ASC
            "#,
        )
        .bind(sender)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn delete_sent_before(&self, sender: &str, before: i64) -> StoreResult<u64> {
        let res = sqlx::query(r#"DELETE FROM chat_messages WHERE sender = $1 AND sent_at < $2"#)
            .bind(sender)
            .bind(before)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn insert(&self, review: &ProductReview) -> StoreResult<()> {
        let key = review.id.to_string();
        sqlx::query(
            r#"
            INSERT INTO product_reviews (id, product_id, user_id, score, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(review.id)
        .bind(&review.product_id)
        .bind(&review.user_id)
        .bind(review.score)
        .bind(review.comment.as_deref())
        .bind(review.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| StoreError::from_insert(e, "product_reviews", &key))?;
        Ok(())
    }

    async fn list_for_product(&self, product_id: &str) -> StoreResult<Vec<ProductReview>> {
        let rows = sqlx::query_as::<_, ProductReview>(
            r#"
            SELECT id, product_id, user_id, score, comment, created_at
              FROM product_reviews
             WHERE product_id = $1
             ORDER BY created_at ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
