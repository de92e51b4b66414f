//! Product Service - catalog listing and admin product management

use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;

use crate::domain::catalog::{discounted_price, is_draft_name};
use crate::domain::{DomainError, ProductCleanup, ProductFilter, ProductInput};
use crate::infrastructure::AppState;
use crate::integrations::StorageSigner;
use crate::models::Product;
use crate::models::category::Entity as Category;
use crate::services::promotion_service;

/// Product as shown to clients: promotion price and signed image URL resolved
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub effective_price_cents: i64,
    pub discount_percent: Option<i32>,
    pub stock: i32,
    pub category_id: Option<i32>,
    pub image_path: Option<String>,
    pub image_url: Option<String>,
    pub is_draft: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<ProductView>,
    pub total: u64,
}

impl ProductView {
    pub fn build(product: Product, discount: Option<i32>, storage: &StorageSigner) -> Self {
        let image_url = product
            .image_path
            .as_deref()
            .and_then(|path| match storage.sign(path) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Cannot sign image of product {}: {}", product.id, e);
                    None
                }
            });

        Self {
            effective_price_cents: discount
                .map(|d| discounted_price(product.price_cents, d))
                .unwrap_or(product.price_cents),
            discount_percent: discount,
            image_url,
            id: product.id,
            name: product.name,
            description: product.description,
            price_cents: product.price_cents,
            stock: product.stock,
            category_id: product.category_id,
            image_path: product.image_path,
            is_draft: product.is_draft,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Resolve promotion prices and image URLs for a batch of products
pub async fn to_views(
    state: &AppState,
    products: Vec<Product>,
) -> Result<Vec<ProductView>, DomainError> {
    let ids: Vec<i32> = products.iter().map(|p| p.id).collect();
    let discounts = promotion_service::best_discounts(state.db(), &ids, Utc::now()).await?;

    Ok(products
        .into_iter()
        .map(|p| {
            let discount = discounts.get(&p.id).copied();
            ProductView::build(p, discount, &state.storage)
        })
        .collect())
}

async fn validate_input(db: &DatabaseConnection, input: &ProductInput) -> Result<(), DomainError> {
    if input.name.trim().is_empty() {
        return Err(DomainError::Validation("name is required".to_string()));
    }
    if input.price_cents < 0 {
        return Err(DomainError::Validation(
            "price_cents cannot be negative".to_string(),
        ));
    }
    if input.stock < 0 {
        return Err(DomainError::Validation("stock cannot be negative".to_string()));
    }
    if let Some(category_id) = input.category_id
        && Category::find_by_id(category_id).one(db).await?.is_none()
    {
        return Err(DomainError::Validation(format!(
            "category {} does not exist",
            category_id
        )));
    }
    Ok(())
}

pub async fn list_products(
    state: &AppState,
    filter: ProductFilter,
) -> Result<ProductPage, DomainError> {
    let page = state.product_repo.find_all(filter).await?;
    Ok(ProductPage {
        products: to_views(state, page.products).await?,
        total: page.total,
    })
}

/// Storefront lookup; drafts are only visible when `include_drafts` is set.
pub async fn get_product(
    state: &AppState,
    id: i32,
    include_drafts: bool,
) -> Result<ProductView, DomainError> {
    let product = state
        .product_repo
        .find_by_id(id)
        .await?
        .filter(|p| include_drafts || !p.is_draft)
        .ok_or(DomainError::NotFound)?;

    to_views(state, vec![product])
        .await?
        .pop()
        .ok_or(DomainError::NotFound)
}

pub async fn create_product(
    state: &AppState,
    mut input: ProductInput,
) -> Result<ProductView, DomainError> {
    input.name = input.name.trim().to_string();
    validate_input(state.db(), &input).await?;

    let product = state.product_repo.create(input).await?;
    tracing::info!("Created product {} ({})", product.id, product.name);
    Ok(ProductView::build(product, None, &state.storage))
}

pub async fn create_draft_product(state: &AppState) -> Result<ProductView, DomainError> {
    let draft = state.product_repo.create_draft().await?;
    Ok(ProductView::build(draft, None, &state.storage))
}

pub async fn update_product(
    state: &AppState,
    id: i32,
    mut input: ProductInput,
) -> Result<ProductView, DomainError> {
    input.name = input.name.trim().to_string();
    validate_input(state.db(), &input).await?;

    let product = state.product_repo.update(id, input).await?;
    to_views(state, vec![product])
        .await?
        .pop()
        .ok_or(DomainError::NotFound)
}

/// Make a draft visible; it must have been given a real name and a price first
pub async fn publish_product(state: &AppState, id: i32) -> Result<ProductView, DomainError> {
    let product = state
        .product_repo
        .find_by_id(id)
        .await?
        .ok_or(DomainError::NotFound)?;

    if is_draft_name(&product.name) {
        return Err(DomainError::Validation(
            "give the product a name before publishing".to_string(),
        ));
    }
    if product.price_cents <= 0 {
        return Err(DomainError::Validation(
            "set a price before publishing".to_string(),
        ));
    }

    let published = state.product_repo.publish(id).await?;
    tracing::info!("Published product {} ({})", published.id, published.name);
    to_views(state, vec![published])
        .await?
        .pop()
        .ok_or(DomainError::NotFound)
}

pub async fn delete_product(state: &AppState, id: i32) -> Result<ProductCleanup, DomainError> {
    state.product_repo.delete(id).await
}
