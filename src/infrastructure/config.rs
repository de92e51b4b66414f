use std::env;

/// Stripe account settings
#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: String,
    pub publishable_key: String,
    pub webhook_secret: String,
    pub api_base: String,
}

/// Twilio account settings for the SMS queue
#[derive(Clone, Debug)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
}

/// Firebase Cloud Messaging settings.
///
/// `access_token` wins over `service_account_json` when both are set.
#[derive(Clone, Debug)]
pub struct FcmConfig {
    pub project_id: String,
    pub access_token: Option<String>,
    pub service_account_json: Option<String>,
    pub api_base: String,
}

/// Transactional email API settings
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_base: String,
    pub api_key: String,
    pub from: String,
}

/// Object storage settings used to sign product image URLs
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub public_url: String,
    pub bucket: String,
    pub jwt_secret: String,
    pub url_ttl_secs: i64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Base URL of the storefront, used in links sent by email
    pub public_base_url: String,
    pub sms_poll_interval_secs: u64,
    pub stripe: StripeConfig,
    pub twilio: TwilioConfig,
    pub fcm: FcmConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Self {
            database_url: var_or("DATABASE_URL", &defaults.database_url),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            public_base_url: var_or("PUBLIC_BASE_URL", &defaults.public_base_url),
            sms_poll_interval_secs: env::var("SMS_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.sms_poll_interval_secs),
            stripe: StripeConfig {
                secret_key: var_or("STRIPE_SECRET_KEY", &defaults.stripe.secret_key),
                publishable_key: var_or(
                    "STRIPE_PUBLISHABLE_KEY",
                    &defaults.stripe.publishable_key,
                ),
                webhook_secret: var_or("STRIPE_WEBHOOK_SECRET", &defaults.stripe.webhook_secret),
                api_base: var_or("STRIPE_API_BASE", &defaults.stripe.api_base),
            },
            twilio: TwilioConfig {
                account_sid: var_or("TWILIO_ACCOUNT_SID", &defaults.twilio.account_sid),
                auth_token: var_or("TWILIO_AUTH_TOKEN", &defaults.twilio.auth_token),
                from_number: var_or("TWILIO_FROM_NUMBER", &defaults.twilio.from_number),
                api_base: var_or("TWILIO_API_BASE", &defaults.twilio.api_base),
            },
            fcm: FcmConfig {
                project_id: var_or("FCM_PROJECT_ID", &defaults.fcm.project_id),
                access_token: env::var("FCM_ACCESS_TOKEN").ok(),
                service_account_json: env::var("FCM_SERVICE_ACCOUNT_JSON").ok(),
                api_base: var_or("FCM_API_BASE", &defaults.fcm.api_base),
            },
            email: EmailConfig {
                api_base: var_or("EMAIL_API_BASE", &defaults.email.api_base),
                api_key: var_or("EMAIL_API_KEY", &defaults.email.api_key),
                from: var_or("EMAIL_FROM", &defaults.email.from),
            },
            storage: StorageConfig {
                public_url: var_or("STORAGE_PUBLIC_URL", &defaults.storage.public_url),
                bucket: var_or("STORAGE_BUCKET", &defaults.storage.bucket),
                jwt_secret: var_or("STORAGE_JWT_SECRET", &defaults.storage.jwt_secret),
                url_ttl_secs: env::var("STORAGE_URL_TTL_SECS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.storage.url_ttl_secs),
            },
        }
    }
}

impl Default for Config {
    /// Local development values; every provider key is empty.
    fn default() -> Self {
        Self {
            database_url: "sqlite://ferramenta.db?mode=rwc".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
            public_base_url: "http://localhost:5173".to_string(),
            sms_poll_interval_secs: 30,
            stripe: StripeConfig {
                secret_key: String::new(),
                publishable_key: String::new(),
                webhook_secret: String::new(),
                api_base: "https://api.stripe.com".to_string(),
            },
            twilio: TwilioConfig {
                account_sid: String::new(),
                auth_token: String::new(),
                from_number: String::new(),
                api_base: "https://api.twilio.com".to_string(),
            },
            fcm: FcmConfig {
                project_id: String::new(),
                access_token: None,
                service_account_json: None,
                api_base: "https://fcm.googleapis.com".to_string(),
            },
            email: EmailConfig {
                api_base: "https://api.resend.com".to_string(),
                api_key: String::new(),
                from: "Ferramenta Lucini <ordini@ferramentalucini.it>".to_string(),
            },
            storage: StorageConfig {
                public_url: "http://localhost:54321/storage/v1".to_string(),
                bucket: "product-images".to_string(),
                jwt_secret: "storage-dev-secret".to_string(),
                url_ttl_secs: 3600,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        // SAFETY: serialised with the other env tests
        unsafe {
            env::set_var("PORT", "9123");
            env::set_var("CORS_ALLOWED_ORIGINS", "http://a.test, ,http://b.test");
            env::set_var("STRIPE_API_BASE", "http://stripe.local");
        }

        let config = Config::from_env();
        assert_eq!(config.port, 9123);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(config.stripe.api_base, "http://stripe.local");
        assert_eq!(config.twilio.api_base, "https://api.twilio.com");

        unsafe {
            env::remove_var("PORT");
            env::remove_var("CORS_ALLOWED_ORIGINS");
            env::remove_var("STRIPE_API_BASE");
        }
    }
}
