// handlers/public - no authentication required

pub mod auth;
pub mod health;

pub use auth::{login, register};
pub use health::health;
