pub mod extractor;
pub mod password;

/// Session key holding the logged-in user's id.
pub const SESSION_USER_KEY: &str = "user_id";
