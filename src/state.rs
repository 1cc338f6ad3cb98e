use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::Config;
use crate::db::reset_tokens::PgTokenStore;
use crate::db::users::PgUserDirectory;
use crate::email::{EmailChannel, SystemMailer};
use crate::rate_limit::{KeyedRateLimiter, LoginRateLimiter};
use crate::reset::{ResetPolicy, ResetTokenService, SystemClock};
use crate::social::{self, SocialClient};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub resets: ResetTokenService,
    pub mailer: Option<Arc<dyn EmailChannel>>,
    pub social: Option<Arc<SocialClient>>,
    pub login_limiter: LoginRateLimiter,
    pub reset_limiter: KeyedRateLimiter,
}

impl AppState {
    /// Wires collaborators from configuration. SMTP or social setup failures downgrade
    /// to "not configured" with a warning.
    pub fn new(pool: PgPool, config: Config) -> Self {
        let mailer = config.smtp.as_ref().and_then(|smtp| match SystemMailer::new(smtp) {
            Ok(mailer) => {
                tracing::info!("System SMTP configured");
                Some(Arc::new(mailer) as Arc<dyn EmailChannel>)
            }
            Err(e) => {
                tracing::warn!("System SMTP not available: {e}");
                None
            }
        });

        let social = config.social.as_ref().and_then(|social_config| {
            let token = social_config.access_token.as_ref()?;
            match social::http_client() {
                Ok(http) => {
                    tracing::info!("Social announcements enabled");
                    Some(Arc::new(SocialClient::with_access_token(
                        http,
                        &social_config.api_base,
                        token.clone(),
                    )))
                }
                Err(e) => {
                    tracing::warn!("Social client not available: {e}");
                    None
                }
            }
        });

        let resets = ResetTokenService::new(
            Arc::new(PgTokenStore::new(pool.clone())),
            Arc::new(PgUserDirectory::new(pool.clone())),
            Arc::new(SystemClock),
            ResetPolicy::from(&config.reset),
        );

        Self {
            pool,
            config,
            resets,
            mailer,
            social,
            login_limiter: LoginRateLimiter::new(),
            reset_limiter: KeyedRateLimiter::new(3, Duration::from_secs(15 * 60)),
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn EmailChannel>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_social(mut self, client: SocialClient) -> Self {
        self.social = Some(Arc::new(client));
        self
    }
}
