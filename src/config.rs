use {
    crate::adapters::mercadopago::client::DEFAULT_API_BASE,
    crate::domain::transition::DEFAULT_PENDING_NOTIFY_AFTER_MINUTES,
    crate::services::dispatcher::DEFAULT_ADMIN_FANOUT,
    std::env,
    thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmConfig {
    pub project_id: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub mp_access_token: String,
    pub mp_webhook_secret: String,
    pub mp_api_base: String,
    pub mp_notification_url: Option<String>,
    /// `None` disables direct push; every notification is queued instead.
    pub fcm: Option<FcmConfig>,
    /// `None` leaves queued emails pending.
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub admin_fanout: usize,
    pub pending_notify_after_minutes: i64,
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = move |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let fcm = match (lookup("FCM_PROJECT_ID"), lookup("FCM_ACCESS_TOKEN")) {
            (Some(project_id), Some(access_token)) => Some(FcmConfig {
                project_id,
                access_token,
            }),
            _ => None,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&lookup, "PORT", 3000)?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 20)?,
            mp_access_token: required("MP_ACCESS_TOKEN")?,
            mp_webhook_secret: required("MP_WEBHOOK_SECRET")?,
            mp_api_base: lookup("MP_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            mp_notification_url: lookup("MP_NOTIFICATION_URL"),
            fcm,
            resend_api_key: lookup("RESEND_API_KEY"),
            email_from: lookup("EMAIL_FROM")
                .unwrap_or_else(|| "Motos <no-reply@motos.app>".to_string()),
            admin_fanout: parsed(&lookup, "ADMIN_FANOUT", DEFAULT_ADMIN_FANOUT)?,
            pending_notify_after_minutes: parsed(
                &lookup,
                "PENDING_NOTIFY_AFTER_MINUTES",
                DEFAULT_PENDING_NOTIFY_AFTER_MINUTES,
            )?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
