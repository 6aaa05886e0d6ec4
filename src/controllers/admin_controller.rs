use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    middlewares::mw_auth::AdminCtx,
    models::{
        admin::{ActivityPage, ActivityQuery, DashboardStats},
        database_helpers::ApiResponse,
    },
    services::admin_service::AdminService,
    AppState, Result,
};

pub struct AdminController;

impl AdminController {
    pub async fn dashboard_stats(
        State(state): State<AppState>,
        _admin: AdminCtx,
    ) -> Result<Json<ApiResponse<DashboardStats>>> {
        let stats = AdminService::get_stats(&state.db).await?;
        Ok(Json(ApiResponse::ok(stats)))
    }

    /// Latest events by default, paginated once `page`, `limit` or `type` is given.
    pub async fn dashboard_activity(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Query(query): Query<ActivityQuery>,
    ) -> Result<Json<ApiResponse<ActivityPage>>> {
        let page = if query.page.is_none() && query.limit.is_none() && query.kind.is_none() {
            AdminService::recent_activity(&state.db).await?
        } else {
            AdminService::paged_activity(&state.db, query).await?
        };
        Ok(Json(ApiResponse::ok(page)))
    }
}
