use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, CodeConfig, PasswordConfig, StoreBackend};
use crate::products::codes::CodeAllocator;
use crate::store::{MemoryStore, MessageStore, PgStore, ProductStore, ReviewStore, UserStore};

/// Handles to the four collections.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub messages: Arc<dyn MessageStore>,
    pub reviews: Arc<dyn ReviewStore>,
}

impl Stores {
    fn from_backend<S>(store: Arc<S>) -> Self
    where
        S: UserStore + ProductStore + MessageStore + ReviewStore + 'static,
    {
        Self {
            users: store.clone(),
            products: store.clone(),
            messages: store.clone(),
            reviews: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    pub codes: Arc<CodeAllocator>,
}

/// The user an operation acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let stores = match config.backend {
            StoreBackend::Postgres => {
                let pg = PgStore::connect(&config.database_url, config.max_connections).await?;
                pg.migrate().await?;
                Stores::from_backend(Arc::new(pg))
            }
            StoreBackend::Memory => Stores::from_backend(Arc::new(MemoryStore::new())),
        };
        info!(backend = ?config.backend, "store ready");

        Ok(Self::from_parts(config, stores))
    }

    pub fn from_parts(config: Arc<AppConfig>, stores: Stores) -> Self {
        Self {
            config,
            stores,
            codes: Arc::new(CodeAllocator::new()),
        }
    }

    /// In-memory state with cheap hashing parameters.
    pub fn in_memory() -> Self {
        let config = Arc::new(AppConfig {
            backend: StoreBackend::Memory,
            database_url: String::new(),
            max_connections: 1,
            codes: CodeConfig::default(),
            passwords: PasswordConfig {
                reset_length: 12,
                memory_kib: 256,
                iterations: 1,
            },
        });
        Self::from_parts(config, Stores::from_backend(Arc::new(MemoryStore::new())))
    }
}
