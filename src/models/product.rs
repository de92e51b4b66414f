use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    /// List price in euro cents, before promotions.
    pub price_cents: i64,
    pub stock: i32,
    pub category_id: Option<i32>,
    /// Object key inside the product image bucket.
    pub image_path: Option<String>,
    pub is_draft: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::promotion::Entity> for Entity {
    fn to() -> RelationDef {
        super::promotion_product::Relation::Promotion.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::promotion_product::Relation::Product.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
