use axum::Extension;
use serde::Serialize;

use crate::database::models::UserView;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

#[derive(Debug, Serialize)]
pub struct MeBody {
    pub user: UserView,
}

/// GET /api/auth/me - the identity bound to the token
pub async fn me(Extension(CurrentUser(identity)): Extension<CurrentUser>) -> ApiResult<MeBody> {
    Ok(ApiResponse::success(MeBody {
        user: UserView::from(&identity),
    }))
}
