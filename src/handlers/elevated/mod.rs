// handlers/elevated - bearer token + admin role
//
// Routes sit behind `require_identity` then `require_admin_layer`; the order
// makes a missing token a 401 before the role check can answer 403.

pub mod responses;
pub mod stats;

pub use responses::{delete_response, list_responses};
pub use stats::stats;
