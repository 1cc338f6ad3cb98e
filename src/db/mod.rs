pub mod permissions;
pub mod products;
pub mod reset_tokens;
pub mod users;

/// Postgres SQLSTATE for unique constraint violations.
pub const UNIQUE_VIOLATION: &str = "23505";

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}
