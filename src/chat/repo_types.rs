use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Chat message record. `sent_at` is unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: String,
    pub sender: String,       // owning user id
    pub display_name: String,
    pub sent_at: i64,
}
