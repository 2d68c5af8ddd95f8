pub mod auth;
pub mod response;

pub use auth::{require_admin_layer, require_identity, CurrentUser};
pub use response::{ApiResponse, ApiResult};
