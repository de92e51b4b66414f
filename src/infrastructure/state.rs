//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{OrderRepository, ProductRepository};
use crate::infrastructure::config::Config;
use crate::infrastructure::{SeaOrmOrderRepository, SeaOrmProductRepository};
use crate::integrations::{EmailClient, FcmClient, StorageSigner, StripeClient, TwilioClient};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection for handlers that query tables directly
    db: DatabaseConnection,
    pub config: Arc<Config>,
    /// Product repository
    pub product_repo: Arc<dyn ProductRepository>,
    /// Order repository
    pub order_repo: Arc<dyn OrderRepository>,
    pub stripe: StripeClient,
    pub twilio: TwilioClient,
    pub fcm: Arc<FcmClient>,
    pub email: EmailClient,
    pub storage: StorageSigner,
}

impl AppState {
    /// Create a new AppState with all repositories and clients initialized
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let product_repo = Arc::new(SeaOrmProductRepository::new(db.clone()));
        let order_repo = Arc::new(SeaOrmOrderRepository::new(db.clone()));

        Self {
            stripe: StripeClient::new(&config.stripe),
            twilio: TwilioClient::new(&config.twilio),
            fcm: Arc::new(FcmClient::new(&config.fcm)),
            email: EmailClient::new(&config.email),
            storage: StorageSigner::new(&config.storage),
            config: Arc::new(config),
            db,
            product_repo,
            order_repo,
        }
    }

    /// Get the database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
