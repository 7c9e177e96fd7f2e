use anyhow::Context;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::error::ProductError;
use super::repo_types::ProductReview;
use super::services::find_product;
use crate::state::{AppState, Session};

/// Records the session user's 1..=5 score for an existing product.
#[instrument(skip(state, comment))]
pub async fn rate_product(
    state: &AppState,
    session: &Session,
    product_id: &str,
    score: u8,
    comment: Option<String>,
) -> anyhow::Result<ProductReview> {
    if !(1..=5).contains(&score) {
        return Err(ProductError::InvalidScore(score).into());
    }
    if find_product(state, product_id).await?.is_none() {
        return Err(ProductError::UnknownProduct(product_id.to_string()).into());
    }

    let review = ProductReview {
        id: Uuid::new_v4(),
        product_id: product_id.to_string(),
        user_id: session.user_id.clone(),
        score: i16::from(score),
        comment,
        created_at: OffsetDateTime::now_utc(),
    };
    state
        .stores
        .reviews
        .insert(&review)
        .await
        .context("insert review")?;
    info!(review_id = %review.id, "product rated");
    Ok(review)
}

pub async fn reviews_for(state: &AppState, product_id: &str) -> anyhow::Result<Vec<ProductReview>> {
    state
        .stores
        .reviews
        .list_for_product(product_id)
        .await
        .context("list reviews")
}

/// Mean score, `None` if the product has no reviews.
pub async fn average_score(state: &AppState, product_id: &str) -> anyhow::Result<Option<f64>> {
    let reviews = reviews_for(state, product_id).await?;
    if reviews.is_empty() {
        return Ok(None);
    }
    let total: f64 = reviews.iter().map(|r| f64::from(r.score)).sum();
    Ok(Some(total / reviews.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::repo_types::Product;
    use crate::products::services::insert_product;

    #[tokio::test]
    async fn averages_scores_per_product() {
        let state = AppState::in_memory();
        insert_product(&state, &Product::new("R-0001", "Libro")).await.unwrap();
        insert_product(&state, &Product::new("R-0002", "Revista")).await.unwrap();

        rate_product(&state, &Session::new("ana"), "R-0001", 5, None).await.unwrap();
        rate_product(&state, &Session::new("luis"), "R-0001", 2, Some("meh".into()))
            .await
            .unwrap();

        assert_eq!(reviews_for(&state, "R-0001").await.unwrap().len(), 2);
        assert_eq!(average_score(&state, "R-0001").await.unwrap(), Some(3.5));
        assert_eq!(average_score(&state, "R-0002").await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_bad_scores_and_unknown_products() {
        let state = AppState::in_memory();
        insert_product(&state, &Product::new("R-0001", "Libro")).await.unwrap();
        let ana = Session::new("ana");

        let err = rate_product(&state, &ana, "R-0001", 0, None).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ProductError>(), Some(ProductError::InvalidScore(0))));
        let err = rate_product(&state, &ana, "R-0404", 3, None).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ProductError>(), Some(ProductError::UnknownProduct(_))));
    }
}
