//! User Service - registration, login, profiles and admin user management

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{
    create_confirmation_token, create_jwt, decode_confirmation_token, hash_password,
    verify_password,
};
use crate::models::user::{self, Entity as User, ROLE_ADMIN, ROLE_CUSTOMER, UserDto};
use crate::models::{cart_item, device_token, message, order, wishlist_item};

pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

/// Rows removed or detached when a user is deleted
#[derive(Debug, Default, Serialize)]
pub struct UserCleanup {
    pub cart_items: u64,
    pub wishlist_items: u64,
    pub device_tokens: u64,
    pub messages: u64,
    pub orders_detached: u64,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn find_user(db: &DatabaseConnection, id: i32) -> Result<user::Model, DomainError> {
    User::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)
}

/// Create a customer account and mail the confirmation link.
/// The email is best effort; registration succeeds without it.
pub async fn register(state: &AppState, request: RegisterRequest) -> Result<UserDto, DomainError> {
    let db = state.db();
    let email = normalize_email(&request.email);
    if !email.contains('@') {
        return Err(DomainError::Validation("a valid email is required".to_string()));
    }
    if request.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(DomainError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }

    if User::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?
        .is_some()
    {
        return Err(DomainError::Conflict("email already registered".to_string()));
    }

    let password_hash = hash_password(&request.password).map_err(DomainError::Internal)?;
    let now = Utc::now().to_rfc3339();
    let created = user::ActiveModel {
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        full_name: Set(blank_to_none(request.full_name)),
        phone: Set(blank_to_none(request.phone)),
        role: Set(ROLE_CUSTOMER.to_string()),
        email_confirmed: Set(false),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!("Registered customer {} ({})", created.id, created.email);

    match create_confirmation_token(&created.email, created.id) {
        Ok(token) => {
            let link = format!(
                "{}/conferma-email?token={}",
                state.config.public_base_url.trim_end_matches('/'),
                urlencoding::encode(&token)
            );
            if let Err(e) = state.email.send_account_confirmation(&created.email, &link).await {
                tracing::warn!("Confirmation email to {} not sent: {}", created.email, e);
            }
        }
        Err(e) => tracing::warn!("Cannot create confirmation token: {}", e),
    }

    Ok(created.into())
}

pub async fn confirm_email(db: &DatabaseConnection, token: &str) -> Result<UserDto, DomainError> {
    let uid = decode_confirmation_token(token).map_err(DomainError::Validation)?;
    let user = find_user(db, uid).await?;
    if user.email_confirmed {
        return Ok(user.into());
    }

    let mut active: user::ActiveModel = user.into();
    active.email_confirmed = Set(true);
    active.updated_at = Set(Utc::now().to_rfc3339());
    Ok(active.update(db).await?.into())
}

pub async fn login(
    db: &DatabaseConnection,
    request: LoginRequest,
) -> Result<LoginResponse, DomainError> {
    let email = normalize_email(&request.email);
    tracing::info!("Login attempt for {}", email);

    let invalid = || DomainError::Unauthorized("Invalid credentials".to_string());
    let user = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Unknown user: {}", email);
            invalid()
        })?;

    if !verify_password(&request.password, &user.password_hash).unwrap_or(false) {
        tracing::warn!("Password verification failed for {}", email);
        return Err(invalid());
    }

    let token = create_jwt(&user.email, user.id, &user.role).map_err(DomainError::Internal)?;
    Ok(LoginResponse {
        token,
        user: user.into(),
    })
}

pub async fn me(db: &DatabaseConnection, uid: i32) -> Result<UserDto, DomainError> {
    Ok(find_user(db, uid).await?.into())
}

pub async fn update_profile(
    db: &DatabaseConnection,
    uid: i32,
    update: ProfileUpdate,
) -> Result<UserDto, DomainError> {
    let mut active: user::ActiveModel = find_user(db, uid).await?.into();
    active.full_name = Set(blank_to_none(update.full_name));
    active.phone = Set(blank_to_none(update.phone));
    active.updated_at = Set(Utc::now().to_rfc3339());
    Ok(active.update(db).await?.into())
}

pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<UserDto>, DomainError> {
    Ok(User::find()
        .order_by_asc(user::Column::Email)
        .all(db)
        .await?
        .into_iter()
        .map(UserDto::from)
        .collect())
}

pub async fn set_role(
    db: &DatabaseConnection,
    acting_uid: i32,
    target_uid: i32,
    role: &str,
) -> Result<UserDto, DomainError> {
    if role != ROLE_ADMIN && role != ROLE_CUSTOMER {
        return Err(DomainError::Validation(format!("unknown role: {}", role)));
    }
    if acting_uid == target_uid && role != ROLE_ADMIN {
        return Err(DomainError::Forbidden);
    }

    let mut active: user::ActiveModel = find_user(db, target_uid).await?.into();
    active.role = Set(role.to_string());
    active.updated_at = Set(Utc::now().to_rfc3339());
    let updated = active.update(db).await?;
    tracing::info!("User {} is now {}", updated.id, updated.role);
    Ok(updated.into())
}

/// Delete a user with their cart, wishlist, devices and chat.
/// Their orders stay, detached from the account.
pub async fn delete_user(
    db: &DatabaseConnection,
    acting_uid: i32,
    target_uid: i32,
) -> Result<UserCleanup, DomainError> {
    if acting_uid == target_uid {
        return Err(DomainError::Forbidden);
    }

    let txn = db.begin().await?;

    if User::find_by_id(target_uid).one(&txn).await?.is_none() {
        txn.rollback().await?;
        return Err(DomainError::NotFound);
    }

    let cleanup = UserCleanup {
        cart_items: cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(target_uid))
            .exec(&txn)
            .await?
            .rows_affected,
        wishlist_items: wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::UserId.eq(target_uid))
            .exec(&txn)
            .await?
            .rows_affected,
        device_tokens: device_token::Entity::delete_many()
            .filter(device_token::Column::UserId.eq(target_uid))
            .exec(&txn)
            .await?
            .rows_affected,
        messages: message::Entity::delete_many()
            .filter(message::Column::CustomerId.eq(target_uid))
            .exec(&txn)
            .await?
            .rows_affected,
        orders_detached: order::Entity::update_many()
            .col_expr(order::Column::UserId, Expr::value(Value::Int(None)))
            .filter(order::Column::UserId.eq(target_uid))
            .exec(&txn)
            .await?
            .rows_affected,
    };

    User::delete_by_id(target_uid).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!("Deleted user {}: {:?}", target_uid, cleanup);
    Ok(cleanup)
}
