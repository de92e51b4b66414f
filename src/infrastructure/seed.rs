use chrono::{Duration, Utc};
use sea_orm::*;

use crate::domain::DomainError;
use crate::infrastructure::auth::hash_password;
use crate::models::user::{ROLE_ADMIN, ROLE_CUSTOMER};
use crate::models::{category, product, promotion, promotion_product, user};

pub const DEMO_ADMIN_EMAIL: &str = "admin@ferramentalucini.it";
pub const DEMO_ADMIN_PASSWORD: &str = "admin-demo-2024";
pub const DEMO_CUSTOMER_EMAIL: &str = "cliente@example.it";
pub const DEMO_CUSTOMER_PASSWORD: &str = "cliente-demo-2024";

// (name, description, price_cents, stock, category index)
const DEMO_PRODUCTS: [(&str, &str, i64, i32, usize); 8] = [
    ("Martello da carpentiere 500 g", "Manico in fibra di vetro", 1890, 25, 0),
    ("Set cacciaviti 6 pezzi", "Punte a taglio e a croce", 1450, 40, 0),
    ("Trapano avvitatore 18V", "Due batterie al litio incluse", 8990, 8, 1),
    ("Smerigliatrice angolare 115 mm", "Potenza 850 W", 5490, 5, 1),
    ("Viti per legno 4x40 (200 pz)", "Zincate, testa svasata", 690, 120, 2),
    ("Tasselli nylon 8 mm (100 pz)", "Per muratura piena", 540, 90, 2),
    ("Vernice per esterni 2,5 L", "Bianco opaco, base acqua", 2790, 14, 3),
    ("Pennello piatto 50 mm", "Setole sintetiche", 390, 60, 3),
];

const DEMO_CATEGORIES: [(&str, &str); 4] = [
    ("Utensili manuali", "Martelli, cacciaviti, pinze"),
    ("Elettroutensili", "Trapani, smerigliatrici, seghe"),
    ("Viteria e fissaggi", "Viti, tasselli, bulloni"),
    ("Vernici", "Pitture, smalti e accessori"),
];

async fn insert_user(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    full_name: &str,
    role: &str,
) -> Result<user::Model, DomainError> {
    let now = Utc::now().to_rfc3339();
    let password_hash = hash_password(password).map_err(DomainError::Internal)?;

    Ok(user::ActiveModel {
        email: Set(email.to_owned()),
        password_hash: Set(password_hash),
        full_name: Set(Some(full_name.to_owned())),
        phone: Set(None),
        role: Set(role.to_owned()),
        email_confirmed: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Insert demo accounts, categories, products and a running promotion.
///
/// Does nothing when the demo admin already exists. Returns whether data
/// was inserted.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<bool, DomainError> {
    if user::Entity::find()
        .filter(user::Column::Email.eq(DEMO_ADMIN_EMAIL))
        .one(db)
        .await?
        .is_some()
    {
        tracing::info!("Demo data already present, skipping seed");
        return Ok(false);
    }

    // 1. Users
    insert_user(db, DEMO_ADMIN_EMAIL, DEMO_ADMIN_PASSWORD, "Staff Lucini", ROLE_ADMIN).await?;
    insert_user(
        db,
        DEMO_CUSTOMER_EMAIL,
        DEMO_CUSTOMER_PASSWORD,
        "Mario Rossi",
        ROLE_CUSTOMER,
    )
    .await?;

    let now = Utc::now();
    let stamp = now.to_rfc3339();

    // 2. Categories
    let mut category_ids = Vec::with_capacity(DEMO_CATEGORIES.len());
    for (name, description) in DEMO_CATEGORIES {
        let saved = category::ActiveModel {
            name: Set(name.to_owned()),
            description: Set(Some(description.to_owned())),
            created_at: Set(stamp.clone()),
            updated_at: Set(stamp.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        category_ids.push(saved.id);
    }

    // 3. Products
    let mut product_ids = Vec::with_capacity(DEMO_PRODUCTS.len());
    for (name, description, price_cents, stock, category) in DEMO_PRODUCTS {
        let saved = product::ActiveModel {
            name: Set(name.to_owned()),
            description: Set(Some(description.to_owned())),
            price_cents: Set(price_cents),
            stock: Set(stock),
            category_id: Set(category_ids.get(category).copied()),
            image_path: Set(None),
            is_draft: Set(false),
            created_at: Set(stamp.clone()),
            updated_at: Set(stamp.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        product_ids.push(saved.id);
    }

    // 4. A promotion on power tools, running for a month
    let promo = promotion::ActiveModel {
        title: Set("Settimana degli elettroutensili".to_owned()),
        description: Set(Some("Sconto su trapani e smerigliatrici".to_owned())),
        discount_percent: Set(15),
        starts_at: Set((now - Duration::days(1)).to_rfc3339()),
        ends_at: Set((now + Duration::days(30)).to_rfc3339()),
        active: Set(true),
        created_at: Set(stamp.clone()),
        updated_at: Set(stamp),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for (product_id, (_, _, _, _, category)) in product_ids.iter().zip(DEMO_PRODUCTS) {
        if category == 1 {
            promotion_product::ActiveModel {
                promotion_id: Set(promo.id),
                product_id: Set(*product_id),
            }
            .insert(db)
            .await?;
        }
    }

    tracing::info!(
        "Seeded {} categories, {} products and 1 promotion",
        category_ids.len(),
        product_ids.len()
    );
    Ok(true)
}
