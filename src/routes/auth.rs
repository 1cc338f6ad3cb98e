use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::auth::{password, SESSION_USER_KEY};
use crate::config::RegistrationMode;
use crate::db;
use crate::email::OutgoingEmail;
use crate::error::AppError;
use crate::models::{Permission, User};
use crate::reset::{self, ResetError, SESSION_RESET_TOKEN_KEY};
use crate::state::SharedState;

pub const RESET_REQUESTED_MESSAGE: &str = "If that email is registered, a reset link has been sent.";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirmation: String,
    /// Takes precedence over a token remembered in the session.
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub permissions: Vec<Permission>,
}

impl AccountResponse {
    fn new(user: &User, mut permissions: Vec<Permission>) -> Self {
        permissions.sort_by_key(|p| p.codename());
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            permissions,
        }
    }
}

async fn start_session(session: &Session, user_id: Uuid) -> Result<(), AppError> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, user_id).await?;
    Ok(())
}

pub async fn register(
    State(state): State<SharedState>,
    session: Session,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let username = req.username.trim();
    let email = req.email.trim();

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    password::check_length(&req.password).map_err(AppError::BadRequest)?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    // Advisory lock serialises the "first account" decision
    let mut tx = state.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    let existing = db::users::count_all(&mut *tx).await?;
    if existing > 0 && state.config.registration == RegistrationMode::Closed {
        return Err(AppError::Forbidden(
            "Registration is disabled. Contact your administrator.".to_string(),
        ));
    }

    let user = db::users::create(&mut *tx, username, email, &pw_hash)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                AppError::Conflict("Username or email is already taken".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

    // The bootstrap account manages the catalogue; everyone else may browse it.
    let permissions = if existing == 0 {
        Permission::ALL.to_vec()
    } else {
        vec![Permission::ViewProducts]
    };
    db::permissions::grant(&mut *tx, user.id, &permissions).await?;

    tx.commit().await?;

    start_session(&session, user.id).await?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(AccountResponse::new(&user, permissions)))
}

pub async fn login(
    State(state): State<SharedState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    if state.login_limiter.check(&req.username).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let Some(user) = db::users::find_by_username(&state.pool, &req.username).await? else {
        state.login_limiter.record_failure(&req.username);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    };

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;

    if !valid {
        state.login_limiter.record_failure(&req.username);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    state.login_limiter.clear(&req.username);
    start_session(&session, user.id).await?;

    let permissions = db::permissions::list_for_user(&state.pool, user.id).await?;
    Ok(Json(AccountResponse::new(&user, permissions)))
}

pub async fn logout(session: Session) -> Result<Json<MessageResponse>, AppError> {
    session.flush().await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

pub async fn me(current: CurrentUser) -> Json<AccountResponse> {
    let permissions = current.permissions.iter().copied().collect();
    Json(AccountResponse::new(&current.user, permissions))
}

pub async fn forgot_password(
    State(state): State<SharedState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = req.email.trim().to_string();
    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".to_string()));
    }

    // Same answer whether or not the account exists
    let response = Json(MessageResponse {
        message: RESET_REQUESTED_MESSAGE.to_string(),
    });

    if state.reset_limiter.check(&email).is_err() {
        tracing::warn!("Password reset requests throttled");
        return Ok(response);
    }

    tokio::spawn(async move {
        match send_reset_link(&state, &email).await {
            Ok(()) => {}
            Err(ResetError::UnknownAccount) => {
                tracing::debug!("Password reset requested for unknown email");
            }
            Err(e) => tracing::error!("Failed to issue password reset token: {e}"),
        }
    });

    Ok(response)
}

async fn send_reset_link(state: &SharedState, email: &str) -> Result<(), ResetError> {
    let (user, issued) = state.resets.issue_for_email(email).await?;
    let link = reset::reset_link(&state.config.base_url, &issued.secret);

    match &state.mailer {
        Some(mailer) => {
            let valid_minutes = state.resets.policy().ttl.num_minutes();
            let email = OutgoingEmail::password_reset(&user.email, &user.username, &link, valid_minutes);
            if let Err(e) = mailer.send(&email).await {
                tracing::error!(user_id = %user.id, "Failed to send password reset email: {e}");
            }
        }
        None => {
            tracing::warn!(user_id = %user.id, "System SMTP not configured. Password reset link: {link}");
        }
    }

    Ok(())
}

pub async fn reset_password(
    State(state): State<SharedState>,
    session: Session,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let parked = session.get::<String>(SESSION_RESET_TOKEN_KEY).await?;

    // An explicit token is what the caller asked to redeem.
    let token = match req.token.filter(|t| !t.trim().is_empty()) {
        Some(token) => token,
        None => parked.clone().ok_or_else(|| {
            AppError::BadRequest("Missing reset token or session expired".to_string())
        })?,
    };
    let from_session = parked.as_deref() == Some(token.as_str());

    if req.password != req.password_confirmation {
        return Err(ResetError::Mismatch.into());
    }
    password::check_length(&req.password).map_err(AppError::BadRequest)?;

    let outcome = state
        .resets
        .consume(&token, &req.password, &req.password_confirmation)
        .await;

    if from_session && matches!(outcome, Ok(_) | Err(ResetError::Invalid | ResetError::Expired)) {
        session.remove::<String>(SESSION_RESET_TOKEN_KEY).await?;
    }

    outcome?;
    Ok(Json(MessageResponse {
        message: "Password reset successfully".to_string(),
    }))
}
