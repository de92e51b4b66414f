use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: i32,
    pub starts_at: String,
    pub ends_at: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        super::promotion_product::Relation::Product.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::promotion_product::Relation::Promotion.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
