use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::dashboard::DashboardResponse,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::dashboard_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[utoipa::path(
    get,
    path = "/api/customer/dashboard",
    responses(
        (status = 200, description = "Customer dashboard", body = ApiResponse<DashboardResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Customer"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardResponse>>> {
    let resp = dashboard_service::customer_dashboard(&state, &user).await?;
    Ok(Json(resp))
}
