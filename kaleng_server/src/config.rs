use std::env;

use chrono::Duration;
use kls_common::Secret;
use log::*;
use midtrans_tools::MidtransConfig;
use rand::{distributions::Alphanumeric, Rng};

use crate::{errors::ServerError, integrations::ShippingConfig};

const DEFAULT_KLS_HOST: &str = "127.0.0.1";
const DEFAULT_KLS_PORT: u16 = 8360;
/// How long a customer gets to pay before the order is swept up and its stock released.
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::minutes(15);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// The time before an unpaid order is cancelled and its reserved stock returned.
    pub unpaid_order_timeout: Duration,
    /// Bearer secret that the external cron caller must present on the on-demand sweep endpoint.
    pub cron_secret: Secret<String>,
    /// Payment gateway configuration.
    pub midtrans: MidtransConfig,
    /// Courier rate aggregator configuration.
    pub shipping: ShippingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_KLS_HOST.to_string(),
            port: DEFAULT_KLS_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
            cron_secret: Secret::default(),
            midtrans: MidtransConfig::default(),
            shipping: ShippingConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("KLS_HOST").ok().unwrap_or_else(|| DEFAULT_KLS_HOST.into());
        let port = env::var("KLS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for KLS_PORT. {e} Using the default, {DEFAULT_KLS_PORT}, instead."
                    );
                    DEFAULT_KLS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_KLS_PORT);
        let database_url = env::var("KLS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ KLS_DATABASE_URL is not set. Please set it to the URL for the storefront database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for =
            env::var("KLS_USE_X_FORWARDED_FOR").map(|s| &s == "1" || &s == "true").unwrap_or(false);
        let use_forwarded = env::var("KLS_USE_FORWARDED").map(|s| &s == "1" || &s == "true").unwrap_or(false);
        let unpaid_order_timeout = configure_order_timeout();
        let cron_secret = Secret::new(env::var("KLS_CRON_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ KLS_CRON_SECRET is not set. The on-demand expiry endpoint will reject all callers.");
            String::default()
        }));
        let midtrans = MidtransConfig::new_from_env_or_default();
        let shipping = ShippingConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            auth,
            use_x_forwarded_for,
            use_forwarded,
            unpaid_order_timeout,
            cron_secret,
            midtrans,
            shipping,
        }
    }
}

fn configure_order_timeout() -> Duration {
    env::var("KLS_UNPAID_ORDER_TIMEOUT_MINS")
        .map_err(|_| {
            info!(
                "🪛️ KLS_UNPAID_ORDER_TIMEOUT_MINS is not set. Using the default value of {} minutes.",
                DEFAULT_UNPAID_ORDER_TIMEOUT.num_minutes()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::minutes)
                .map_err(|e| warn!("🪛️ Invalid configuration value for KLS_UNPAID_ORDER_TIMEOUT_MINS. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_UNPAID_ORDER_TIMEOUT)
}

//-------------------------------------------------  AuthConfig  ------------------------------------------------------
/// Session tokens are issued by the external auth service and validated here with a shared HS256 secret.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT shared secret has not been set. I'm using a random value for this session, so every \
             existing session token will be rejected. DO NOT operate in production like this; set KLS_JWT_SECRET to \
             the secret your auth service signs with. 🚨️🚨️🚨️"
        );
        let secret: String = rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("KLS_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [KLS_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "KLS_JWT_SECRET must be at least 32 characters long.".to_string(),
            ));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}
