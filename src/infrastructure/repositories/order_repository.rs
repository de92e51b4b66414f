//! SeaORM implementation of OrderRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::domain::{
    DomainError, NewOrder, OrderFilter, OrderRepository, OrderStatus, OrderWithItems,
};
use crate::models::order::{self, ActiveModel, Column, Entity as OrderEntity};
use crate::models::{Order, cart_item, order_item, product};

/// SeaORM-based implementation of OrderRepository
pub struct SeaOrmOrderRepository {
    db: DatabaseConnection,
}

impl SeaOrmOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn insert_order(
        txn: &DatabaseTransaction,
        new_order: &NewOrder,
    ) -> Result<OrderWithItems, DomainError> {
        let now = chrono::Utc::now().to_rfc3339();

        let saved = ActiveModel {
            user_id: Set(new_order.user_id),
            email: Set(new_order.email.clone()),
            payment_intent_id: Set(new_order.payment_intent_id.clone()),
            total_cents: Set(new_order.total_cents),
            status: Set(OrderStatus::InPreparazione.as_str().to_string()),
            shipping_address: Set(new_order.shipping_address.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        let mut items = Vec::with_capacity(new_order.items.len());
        for item in &new_order.items {
            let line = order_item::ActiveModel {
                order_id: Set(saved.id),
                product_id: Set(Some(item.product_id)),
                product_name: Set(item.product_name.clone()),
                unit_price_cents: Set(item.unit_price_cents),
                quantity: Set(item.quantity),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            items.push(line);

            // Stock never goes below zero; overselling is handled by hand
            if let Some(p) = product::Entity::find_by_id(item.product_id).one(txn).await? {
                let remaining = (p.stock - item.quantity).max(0);
                let mut active: product::ActiveModel = p.into();
                active.stock = Set(remaining);
                active.updated_at = Set(now.clone());
                active.update(txn).await?;
            }
        }

        if let Some(user_id) = new_order.user_id {
            cart_item::Entity::delete_many()
                .filter(cart_item::Column::UserId.eq(user_id))
                .exec(txn)
                .await?;
        }

        Ok(OrderWithItems::from_parts(saved, items))
    }
}

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    async fn find_all(&self, filter: OrderFilter) -> Result<Vec<OrderWithItems>, DomainError> {
        let mut query = OrderEntity::find();

        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status.as_str()));
        }

        if let Some(email) = &filter.email
            && !email.trim().is_empty()
        {
            query = query.filter(Column::Email.eq(email.trim().to_lowercase()));
        }

        let rows = query
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .find_with_related(order_item::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderWithItems::from_parts(order, items))
            .collect())
    }

    async fn find_by_user(&self, user_id: i32) -> Result<Vec<OrderWithItems>, DomainError> {
        let rows = OrderEntity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .find_with_related(order_item::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderWithItems::from_parts(order, items))
            .collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<OrderWithItems>, DomainError> {
        let Some(order) = OrderEntity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let items = order.find_related(order_item::Entity).all(&self.db).await?;
        Ok(Some(OrderWithItems::from_parts(order, items)))
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<OrderWithItems>, DomainError> {
        let Some(order) = OrderEntity::find()
            .filter(Column::PaymentIntentId.eq(payment_intent_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let items = order.find_related(order_item::Entity).all(&self.db).await?;
        Ok(Some(OrderWithItems::from_parts(order, items)))
    }

    async fn create(&self, new_order: NewOrder) -> Result<(OrderWithItems, bool), DomainError> {
        if let Some(existing) = self
            .find_by_payment_intent(&new_order.payment_intent_id)
            .await?
        {
            tracing::info!(
                "Order {} already exists for {}, skipping",
                existing.id,
                new_order.payment_intent_id
            );
            return Ok((existing, false));
        }

        let txn = self.db.begin().await?;
        match Self::insert_order(&txn, &new_order).await {
            Ok(created) => {
                txn.commit().await?;
                tracing::info!(
                    "Created order {} for {} ({} items)",
                    created.id,
                    created.email,
                    created.items.len()
                );
                Ok((created, true))
            }
            // A concurrent delivery of the same event won the insert
            Err(DomainError::Conflict(_)) => {
                txn.rollback().await?;
                let existing = self
                    .find_by_payment_intent(&new_order.payment_intent_id)
                    .await?
                    .ok_or(DomainError::NotFound)?;
                Ok((existing, false))
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn update_status(&self, id: i32, status: OrderStatus) -> Result<Order, DomainError> {
        let existing = OrderEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(active.update(&self.db).await?)
    }
}
