use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::database::models::{ResponseFilter, ResponseWithOwner};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::responses::RESPONSE_NOT_FOUND;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    /// Blank values and the dashboard's `all` mean no constraint.
    fn into_filter(self) -> Result<ResponseFilter, ApiError> {
        Ok(ResponseFilter {
            industry: parse_facet(self.industry, "industry")?,
            company_size: parse_facet(self.company_size, "company size")?,
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

fn parse_facet<T: FromStr>(value: Option<String>, label: &str) -> Result<Option<T>, ApiError> {
    match value.as_deref().map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ApiError::validation(format!("Invalid {} filter", label))),
    }
}

#[derive(Debug, Serialize)]
pub struct ListBody {
    pub count: usize,
    pub responses: Vec<ResponseWithOwner>,
}

#[derive(Debug, Serialize)]
pub struct DeletedBody {
    pub message: &'static str,
}

/// GET /api/admin/responses - every response, newest first, with its owner
pub async fn list_responses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListBody> {
    let filter = query.into_filter()?;
    let responses = state.responses.find_all(&filter).await?;
    Ok(ApiResponse::success(ListBody {
        count: responses.len(),
        responses,
    }))
}

/// DELETE /api/admin/responses/:id - remove a response and reopen the
/// questionnaire for its owner
pub async fn delete_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedBody> {
    // A malformed id cannot name a stored response
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::not_found(RESPONSE_NOT_FOUND))?;
    state.responses.delete_by_id(id).await?;
    Ok(ApiResponse::success(DeletedBody {
        message: "Response deleted successfully",
    }))
}
