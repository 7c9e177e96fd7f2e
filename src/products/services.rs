use anyhow::Context;
use time::{macros::format_description, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use super::codes::{format_code, highest};
use super::error::ProductError;
use super::repo_types::Product;
use crate::error::StoreError;
use crate::state::{AppState, Session};

/// Next free reference code, unique against storage and against every code
/// this process has already handed out.
#[instrument(skip(state))]
pub async fn generate_reference_code(state: &AppState) -> anyhow::Result<String> {
    let cfg = &state.config.codes;
    let attempts = cfg.max_attempts.max(1);

    for attempt in 1..=attempts {
        let ids = state
            .stores
            .products
            .list_ids()
            .await
            .context("list product ids")?;
        let stored_max = highest(&ids).map_or(0, |(n, _)| n);
        let Some(n) = state.codes.next_after(stored_max) else {
            break;
        };

        let code = format_code(n, cfg.width);
        if state.stores.products.find(&code).await?.is_none() {
            debug!(%code, attempt, "reference code generated");
            return Ok(code);
        }
        warn!(%code, attempt, "reference code already stored; retrying");
    }

    Err(ProductError::CodeExhausted { attempts }.into())
}

/// Stores a new product under a freshly generated code. A code claimed by a
/// concurrent writer is retried with the next one.
#[instrument(skip(state))]
pub async fn create_product(state: &AppState, name: &str) -> anyhow::Result<Product> {
    let attempts = state.config.codes.max_attempts.max(1);

    for attempt in 1..=attempts {
        let code = generate_reference_code(state).await?;
        let product = Product::new(code, name);
        match state.stores.products.insert(&product).await {
            Ok(()) => {
                info!(product_id = %product.id, "product created");
                return Ok(product);
            }
            Err(StoreError::Duplicate { key, .. }) => {
                warn!(%key, attempt, "reference code collision; retrying");
            }
            Err(e) => return Err(e).context("insert product"),
        }
    }

    Err(ProductError::CodeExhausted { attempts }.into())
}

/// Stores a product under its caller-supplied id.
#[instrument(skip(state, product), fields(product_id = %product.id))]
pub async fn insert_product(state: &AppState, product: &Product) -> anyhow::Result<()> {
    state
        .stores
        .products
        .insert(product)
        .await
        .context("insert product")?;
    debug!("product stored");
    Ok(())
}

pub async fn find_product(state: &AppState, product_id: &str) -> anyhow::Result<Option<Product>> {
    state
        .stores
        .products
        .find(product_id)
        .await
        .with_context(|| format!("find product {product_id}"))
}

pub async fn find_reserved_by_user(state: &AppState, user_id: &str) -> anyhow::Result<Vec<Product>> {
    state
        .stores
        .products
        .find_reserved_by(user_id)
        .await
        .context("find reserved products")
}

/// Reserves an unreserved product for the session user.
#[instrument(skip(state))]
pub async fn reserve(state: &AppState, session: &Session, product_id: &str) -> anyhow::Result<bool> {
    let swapped = state
        .stores
        .products
        .swap_reservation(product_id, None, Some(&session.user_id))
        .await
        .context("reserve product")?;
    if swapped == 0 {
        ensure_exists(state, product_id).await?;
        debug!("product already reserved");
        return Ok(false);
    }
    info!("product reserved");
    Ok(true)
}

/// Clears the reservation if the session user holds it.
#[instrument(skip(state))]
pub async fn release(state: &AppState, session: &Session, product_id: &str) -> anyhow::Result<bool> {
    let swapped = state
        .stores
        .products
        .swap_reservation(product_id, Some(&session.user_id), None)
        .await
        .context("release product")?;
    if swapped == 0 {
        ensure_exists(state, product_id).await?;
        debug!("product not held by session user");
        return Ok(false);
    }
    info!("product released");
    Ok(true)
}

async fn ensure_exists(state: &AppState, product_id: &str) -> anyhow::Result<()> {
    if find_product(state, product_id).await?.is_none() {
        return Err(ProductError::UnknownProduct(product_id.to_string()).into());
    }
    Ok(())
}

/// Stored reference code with the highest numeric suffix.
pub async fn next_sequential_id(state: &AppState) -> anyhow::Result<Option<String>> {
    let ids = state
        .stores
        .products
        .list_ids()
        .await
        .context("list product ids")?;
    Ok(highest(&ids).map(|(_, code)| code.to_string()))
}

/// Formats a unix timestamp as a UTC `DD/MM/YYYY` date.
pub fn convert_from_epoch(unix_seconds: i64) -> Result<String, ProductError> {
    OffsetDateTime::from_unix_timestamp(unix_seconds)
        .ok()
        .and_then(|dt| dt.format(format_description!("[day]/[month]/[year]")).ok())
        .ok_or(ProductError::InvalidTimestamp(unix_seconds))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::error::StoreResult;
    use crate::state::Stores;
    use crate::store::{MemoryStore, ProductStore};

    #[tokio::test]
    async fn generated_codes_are_unique_and_unused() {
        let state = AppState::in_memory();
        let mut seen = HashSet::new();

        for i in 0..50 {
            let code = generate_reference_code(&state).await.unwrap();
            assert!(!seen.contains(&code), "code {code} generated twice");
            assert!(find_product(&state, &code).await.unwrap().is_none());

            insert_product(&state, &Product::new(code.clone(), format!("Producto{i}")))
                .await
                .unwrap();
            seen.insert(code);
        }
    }

    #[tokio::test]
    async fn generated_codes_are_unique_without_inserting() {
        let state = AppState::in_memory();
        let a = generate_reference_code(&state).await.unwrap();
        let b = generate_reference_code(&state).await.unwrap();
        assert_eq!(a, "R-0001");
        assert_eq!(b, "R-0002");
    }

    #[tokio::test]
    async fn generation_continues_after_stored_maximum() {
        let state = AppState::in_memory();
        insert_product(&state, &Product::new("R-0041", "Viejo")).await.unwrap();
        insert_product(&state, &Product::new("P1", "Otro")).await.unwrap();
        assert_eq!(generate_reference_code(&state).await.unwrap(), "R-0042");
    }

    #[tokio::test]
    async fn concurrent_creation_yields_distinct_products() {
        let state = Arc::new(AppState::in_memory());
        let mut handles = Vec::new();
        for i in 0..16 {
            let st = state.clone();
            handles.push(tokio::spawn(async move {
                create_product(&st, &format!("Libro{i}")).await.unwrap().id
            }));
        }
        let mut ids = HashSet::new();
        for h in handles {
            assert!(ids.insert(h.await.unwrap()));
        }
        assert_eq!(ids.len(), 16);
    }

    #[tokio::test]
    async fn exhausted_allocator_is_fatal() {
        let state = AppState::in_memory();
        insert_product(&state, &Product::new(format_code(u64::MAX, 4), "Ultimo"))
            .await
            .unwrap();
        let err = generate_reference_code(&state).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProductError>(),
            Some(ProductError::CodeExhausted { .. })
        ));
    }

    #[tokio::test]
    async fn finds_products_reserved_by_user() {
        let state = AppState::in_memory();
        insert_product(&state, &Product::new("P1", "Producto1").reserved_for("Usuario1"))
            .await
            .unwrap();
        insert_product(&state, &Product::new("P2", "Producto2").reserved_for("Usuario2"))
            .await
            .unwrap();

        let products = find_reserved_by_user(&state, "Usuario1").await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "P1");
    }

    #[tokio::test]
    async fn reserve_and_release_respect_holder() {
        let state = AppState::in_memory();
        insert_product(&state, &Product::new("R-0001", "Libro")).await.unwrap();
        let ana = Session::new("ana");
        let luis = Session::new("luis");

        assert!(reserve(&state, &ana, "R-0001").await.unwrap());
        assert!(!reserve(&state, &luis, "R-0001").await.unwrap());
        assert!(!release(&state, &luis, "R-0001").await.unwrap());
        assert!(release(&state, &ana, "R-0001").await.unwrap());
        assert!(reserve(&state, &luis, "R-0001").await.unwrap());

        assert!(reserve(&state, &ana, "R-9999").await.is_err());
    }

    #[tokio::test]
    async fn next_sequential_id_returns_highest_code() {
        let state = AppState::in_memory();
        insert_product(&state, &Product::new("R-0001", "Producto1")).await.unwrap();
        insert_product(&state, &Product::new("R-0002", "Producto2")).await.unwrap();

        assert_eq!(next_sequential_id(&state).await.unwrap().as_deref(), Some("R-0002"));
    }

    #[tokio::test]
    async fn next_sequential_id_is_none_when_empty() {
        let state = AppState::in_memory();
        assert_eq!(next_sequential_id(&state).await.unwrap(), None);
    }

    #[test]
    fn converts_epoch_to_day_month_year() {
        assert_eq!(convert_from_epoch(1640995200).unwrap(), "01/01/2022");
        assert_eq!(convert_from_epoch(0).unwrap(), "01/01/1970");
        assert!(convert_from_epoch(i64::MAX).is_err());
    }

    #[tokio::test]
    async fn large_suffixes_drive_next_id_and_generation() {
        let state = AppState::in_memory();
        insert_product(&state, &Product::new("R-0001", "Producto1")).await.unwrap();
        insert_product(&state, &Product::new("R-5000000000", "Producto2")).await.unwrap();

        assert_eq!(
            next_sequential_id(&state).await.unwrap().as_deref(),
            Some("R-5000000000")
        );
        assert_eq!(generate_reference_code(&state).await.unwrap(), "R-5000000001");
    }

    /// Products collection where a rival writer claims codes first.
    #[derive(Default)]
    struct ContendedProducts {
        inner: MemoryStore,
        taken_on_find: AtomicU32,   // lookups that report the code as stored
        taken_on_insert: AtomicU32, // inserts lost to a rival who stores the code
        always_reject: bool,
        inserts: AtomicU32,
    }

    fn claim(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    #[async_trait]
    impl ProductStore for ContendedProducts {
        async fn insert(&self, product: &Product) -> StoreResult<()> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            let duplicate = StoreError::Duplicate {
                collection: "products",
                key: product.id.clone(),
            };
            if self.always_reject {
                return Err(duplicate);
            }
            if claim(&self.taken_on_insert) {
                ProductStore::insert(&self.inner, &Product::new(product.id.clone(), "rival"))
                    .await?;
                return Err(duplicate);
            }
            ProductStore::insert(&self.inner, product).await
        }

        async fn find(&self, id: &str) -> StoreResult<Option<Product>> {
            if claim(&self.taken_on_find) {
                return Ok(Some(Product::new(id, "rival")));
            }
            ProductStore::find(&self.inner, id).await
        }

        async fn list_ids(&self) -> StoreResult<Vec<String>> {
            self.inner.list_ids().await
        }

        async fn find_reserved_by(&self, user_id: &str) -> StoreResult<Vec<Product>> {
            self.inner.find_reserved_by(user_id).await
        }

        async fn swap_reservation(
            &self,
            id: &str,
            expected: Option<&str>,
            to: Option<&str>,
        ) -> StoreResult<u64> {
            self.inner.swap_reservation(id, expected, to).await
        }
    }

    fn contended_state(products: Arc<ContendedProducts>, max_attempts: u32) -> AppState {
        let mut config = (*AppState::in_memory().config).clone();
        config.codes.max_attempts = max_attempts;
        let mem = Arc::new(MemoryStore::new());
        let stores = Stores {
            users: mem.clone(),
            products,
            messages: mem.clone(),
            reviews: mem,
        };
        AppState::from_parts(Arc::new(config), stores)
    }

    #[tokio::test]
    async fn generation_skips_code_found_in_store() {
        let products = Arc::new(ContendedProducts {
            taken_on_find: AtomicU32::new(1),
            ..Default::default()
        });
        let state = contended_state(products, 4);

        assert_eq!(generate_reference_code(&state).await.unwrap(), "R-0002");
    }

    #[tokio::test]
    async fn create_retries_after_losing_insert_race() {
        let products = Arc::new(ContendedProducts {
            taken_on_insert: AtomicU32::new(1),
            ..Default::default()
        });
        let state = contended_state(products.clone(), 4);

        let product = create_product(&state, "Libro").await.unwrap();
        assert_eq!(product.id, "R-0002");
        assert_eq!(products.inserts.load(Ordering::SeqCst), 2);

        let rival = find_product(&state, "R-0001").await.unwrap().unwrap();
        assert_eq!(rival.name, "rival");
        let mine = find_product(&state, "R-0002").await.unwrap().unwrap();
        assert_eq!(mine.name, "Libro");
    }

    #[tokio::test]
    async fn create_gives_up_after_max_attempts() {
        let products = Arc::new(ContendedProducts {
            always_reject: true,
            ..Default::default()
        });
        let state = contended_state(products.clone(), 3);

        let err = create_product(&state, "Libro").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProductError>(),
            Some(ProductError::CodeExhausted { attempts: 3 })
        ));
        assert_eq!(products.inserts.load(Ordering::SeqCst), 3);
    }
}
