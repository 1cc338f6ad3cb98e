use std::net::IpAddr;

use chrono::Duration;

/// Lifetime of a password reset link unless overridden.
pub const DEFAULT_RESET_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub registration: RegistrationMode,
    pub log_level: String,
    pub reset: ResetConfig,
    pub session: SessionConfig,
    pub smtp: Option<SmtpConfig>,
    pub social: Option<SocialConfig>,
}

#[derive(Debug, Clone)]
pub struct ResetConfig {
    pub ttl: Duration,
    pub revoke_previous: bool,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(DEFAULT_RESET_TTL_MINUTES),
            revoke_previous: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub idle_minutes: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

/// OAuth 2.0 client settings for the social posting API.
#[derive(Debug, Clone)]
pub struct SocialConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationMode {
    Open,
    Closed,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;

        let host: IpAddr = env_or("SHOPFRONT_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SHOPFRONT_HOST: {e}"))?;

        let port: u16 = env_or("SHOPFRONT_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid SHOPFRONT_PORT: {e}"))?;

        let base_url = env_or("SHOPFRONT_BASE_URL", &format!("http://{host}:{port}"))
            .trim_end_matches('/')
            .to_string();

        let registration = match env_or("SHOPFRONT_REGISTRATION", "open").as_str() {
            "closed" => RegistrationMode::Closed,
            _ => RegistrationMode::Open,
        };

        let log_level = env_or("SHOPFRONT_LOG_LEVEL", "info");

        let ttl_minutes: i64 = env_or(
            "SHOPFRONT_RESET_TOKEN_TTL_MINUTES",
            &DEFAULT_RESET_TTL_MINUTES.to_string(),
        )
        .parse()
        .map_err(|e| format!("Invalid SHOPFRONT_RESET_TOKEN_TTL_MINUTES: {e}"))?;
        if ttl_minutes <= 0 {
            return Err("SHOPFRONT_RESET_TOKEN_TTL_MINUTES must be positive".to_string());
        }

        let reset = ResetConfig {
            ttl: Duration::minutes(ttl_minutes),
            revoke_previous: env_bool("SHOPFRONT_RESET_REVOKE_PREVIOUS", true)?,
        };

        let session = SessionConfig {
            idle_minutes: env_or("SHOPFRONT_SESSION_IDLE_MINUTES", "120")
                .parse()
                .map_err(|e| format!("Invalid SHOPFRONT_SESSION_IDLE_MINUTES: {e}"))?,
            cookie_secure: env_bool("SHOPFRONT_COOKIE_SECURE", true)?,
        };

        let smtp = match (
            std::env::var("SHOPFRONT_SMTP_HOST").ok(),
            std::env::var("SHOPFRONT_SMTP_PORT").ok(),
            std::env::var("SHOPFRONT_SMTP_USER").ok(),
            std::env::var("SHOPFRONT_SMTP_PASS").ok(),
            std::env::var("SHOPFRONT_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid SHOPFRONT_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            host,
            port,
            base_url,
            registration,
            log_level,
            reset,
            session,
            smtp,
            social: SocialConfig::from_env()?,
        })
    }
}

impl SocialConfig {
    /// Returns `Ok(None)` when no client id is configured.
    pub fn from_env() -> Result<Option<Self>, String> {
        let Ok(client_id) = std::env::var("SHOPFRONT_SOCIAL_CLIENT_ID") else {
            return Ok(None);
        };

        Ok(Some(SocialConfig {
            client_id,
            client_secret: std::env::var("SHOPFRONT_SOCIAL_CLIENT_SECRET").ok(),
            redirect_uri: env_required("SHOPFRONT_SOCIAL_REDIRECT_URI")?,
            authorize_url: env_or(
                "SHOPFRONT_SOCIAL_AUTHORIZE_URL",
                "https://twitter.com/i/oauth2/authorize",
            ),
            token_url: env_or(
                "SHOPFRONT_SOCIAL_TOKEN_URL",
                "https://api.twitter.com/2/oauth2/token",
            ),
            api_base: env_or("SHOPFRONT_SOCIAL_API_BASE", "https://api.twitter.com"),
            access_token: std::env::var("SHOPFRONT_SOCIAL_ACCESS_TOKEN").ok(),
        }))
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> Result<bool, String> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => parse_bool(&value).ok_or_else(|| format!("Invalid {key}: '{value}'")),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
