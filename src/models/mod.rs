mod password_reset_token;
mod permission;
mod product;
mod user;

pub use password_reset_token::PasswordResetToken;
pub use permission::Permission;
pub use product::Product;
pub use user::User;
