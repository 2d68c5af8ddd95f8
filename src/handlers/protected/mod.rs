// handlers/protected - bearer token required
//
// Every route here sits behind `middleware::require_identity`, which binds
// `CurrentUser` into the request extensions.

pub mod me;
pub mod responses;

pub use me::me;
pub use responses::{my_response, submit_response};
