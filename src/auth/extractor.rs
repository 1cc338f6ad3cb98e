use std::collections::HashSet;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::SESSION_USER_KEY;
use crate::db;
use crate::error::AppError;
use crate::models::{Permission, User};
use crate::state::SharedState;

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub permissions: HashSet<Permission>,
}

impl CurrentUser {
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "You do not have the '{permission}' permission"
            )))
        }
    }
}

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;

        let user_id = session
            .get::<Uuid>(SESSION_USER_KEY)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))?;

        let user = db::users::find_by_id(&state.pool, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))?;

        let permissions = db::permissions::list_for_user(&state.pool, user_id)
            .await?
            .into_iter()
            .collect();

        Ok(CurrentUser { user, permissions })
    }
}
