//! SeaORM implementation of ProductRepository

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, Value,
};

use crate::domain::catalog::{DRAFT_PREFIX, next_draft_name};
use crate::domain::{
    DomainError, PaginatedProducts, ProductCleanup, ProductFilter, ProductInput,
    ProductRepository,
};
use crate::models::Product;
use crate::models::product::{ActiveModel, Column, Entity as ProductEntity};
use crate::models::{cart_item, order_item, promotion_product, wishlist_item};

/// `%text%` with LIKE wildcards in the search text taken literally
fn contains_pattern(text: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape('\\')
}

/// SeaORM-based implementation of ProductRepository
pub struct SeaOrmProductRepository {
    db: DatabaseConnection,
}

impl SeaOrmProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for SeaOrmProductRepository {
    async fn find_all(&self, filter: ProductFilter) -> Result<PaginatedProducts, DomainError> {
        let mut query = ProductEntity::find();

        if !filter.include_drafts {
            query = query.filter(Column::IsDraft.eq(false));
        }

        if let Some(category_id) = filter.category_id {
            query = query.filter(Column::CategoryId.eq(category_id));
        }

        if let Some(q) = &filter.query
            && !q.trim().is_empty()
        {
            let pattern = contains_pattern(q.trim());
            let cond = Condition::any()
                .add(Expr::col((ProductEntity, Column::Name)).like(pattern.clone()))
                .add(Expr::col((ProductEntity, Column::Description)).like(pattern));
            query = query.filter(cond);
        }

        // Apply sorting
        match filter.sort.as_deref() {
            Some("price_asc") => query = query.order_by_asc(Column::PriceCents),
            Some("price_desc") => query = query.order_by_desc(Column::PriceCents),
            Some("recent") => query = query.order_by_desc(Column::CreatedAt),
            _ => query = query.order_by_asc(Column::Name),
        }
        query = query.order_by_asc(Column::Id);

        // Fetch with pagination and total count
        let (products, total) = if let Some(limit) = filter.limit {
            let page = filter.page.unwrap_or(0);
            let limit = limit.max(1);
            // SQLite offsets are signed 64-bit
            if page
                .checked_mul(limit)
                .is_none_or(|offset| offset > i64::MAX as u64)
            {
                return Err(DomainError::Validation(format!("page {} is out of range", page)));
            }
            let paginator = query.paginate(&self.db, limit);
            let total = paginator.num_items().await?;
            let items = paginator.fetch_page(page).await?;
            (items, total)
        } else {
            let items = query.all(&self.db).await?;
            let total = items.len() as u64;
            (items, total)
        };

        Ok(PaginatedProducts { products, total })
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>, DomainError> {
        Ok(ProductEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Product>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(ProductEntity::find()
            .filter(Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await?)
    }

    async fn create(&self, input: ProductInput) -> Result<Product, DomainError> {
        let now = chrono::Utc::now().to_rfc3339();

        let product = ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            price_cents: Set(input.price_cents),
            stock: Set(input.stock),
            category_id: Set(input.category_id),
            image_path: Set(input.image_path),
            is_draft: Set(false),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(product.insert(&self.db).await?)
    }

    async fn create_draft(&self) -> Result<Product, DomainError> {
        let txn = self.db.begin().await?;

        let existing: Vec<String> = ProductEntity::find()
            .filter(Column::Name.starts_with(DRAFT_PREFIX))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();
        let name = match next_draft_name(DRAFT_PREFIX, &existing) {
            Ok(name) => name,
            Err(e) => {
                txn.rollback().await?;
                return Err(e);
            }
        };

        let now = chrono::Utc::now().to_rfc3339();
        let draft = ActiveModel {
            name: Set(name),
            price_cents: Set(0),
            stock: Set(0),
            is_draft: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        tracing::info!("Created draft product {} ({})", draft.id, draft.name);
        Ok(draft)
    }

    async fn update(&self, id: i32, input: ProductInput) -> Result<Product, DomainError> {
        let existing = ProductEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);
        active.description = Set(input.description);
        active.price_cents = Set(input.price_cents);
        active.stock = Set(input.stock);
        active.category_id = Set(input.category_id);
        active.image_path = Set(input.image_path);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn publish(&self, id: i32) -> Result<Product, DomainError> {
        let existing = ProductEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: ActiveModel = existing.into();
        active.is_draft = Set(false);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<ProductCleanup, DomainError> {
        if ProductEntity::find_by_id(id).one(&self.db).await?.is_none() {
            return Err(DomainError::NotFound);
        }

        let txn = self.db.begin().await?;

        let cart_items = cart_item::Entity::delete_many()
            .filter(cart_item::Column::ProductId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        let wishlist_items = wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::ProductId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        let promotion_links = promotion_product::Entity::delete_many()
            .filter(promotion_product::Column::ProductId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        // Order lines keep their snapshot name and price
        let order_items_detached = order_item::Entity::update_many()
            .col_expr(order_item::Column::ProductId, Expr::value(Value::Int(None)))
            .filter(order_item::Column::ProductId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        ProductEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        let cleanup = ProductCleanup {
            cart_items,
            wishlist_items,
            promotion_links,
            order_items_detached,
        };
        tracing::info!("Deleted product {} ({:?})", id, cleanup);
        Ok(cleanup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QuerySelect, QueryTrait};

    #[test]
    fn search_text_wildcards_are_escaped() {
        let sql = ProductEntity::find()
            .select_only()
            .column(Column::Id)
            .filter(Expr::col((ProductEntity, Column::Name)).like(contains_pattern("50%_off")))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r"%50\%\_off%"), "{}", sql);
        assert!(sql.contains("ESCAPE"), "{}", sql);
    }
}
