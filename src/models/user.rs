use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CUSTOMER: &str = "customer";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    /// `customer` or `admin`
    pub role: String,
    pub email_confirmed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    #[sea_orm(has_many = "super::device_token::Entity")]
    DeviceTokens,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::device_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub email_confirmed: bool,
    pub created_at: String,
}

impl From<Model> for UserDto {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            phone: model.phone,
            role: model.role,
            email_confirmed: model.email_confirmed,
            created_at: model.created_at,
        }
    }
}
