use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::repositories::{
    app_users::AppUserRepository, subscriptions::SubscriptionRepository,
};
use crate::domain::value_objects::subscriptions::SetTierRequest;
use crate::infrastructure::axum_http::error_responses::forbidden;
use crate::infrastructure::postgres::{
    postgres_connection::PgPoolSquad,
    repositories::{app_users::AppUserPostgres, subscriptions::SubscriptionPostgres},
};
use crate::usecases::quota::{QuotaError, QuotaUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let subscription_repo = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let app_user_repo = AppUserPostgres::new(Arc::clone(&db_pool));
    let quota_usecase = QuotaUseCase::new(Arc::new(subscription_repo), Arc::new(app_user_repo));

    Router::new()
        .route("/me", get(get_my_subscription))
        .route("/tiers", get(list_tiers))
        .route("/admin/tier/:user_id", post(admin_set_tier))
        .with_state(Arc::new(quota_usecase))
}

pub async fn get_my_subscription<S, U>(
    State(quota_usecase): State<Arc<QuotaUseCase<S, U>>>,
    auth: AuthUser,
) -> Result<Response, QuotaError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
{
    let details = quota_usecase.get_details(auth.user_id).await?;
    Ok((StatusCode::OK, Json(details)).into_response())
}

pub async fn list_tiers<S, U>(
    State(quota_usecase): State<Arc<QuotaUseCase<S, U>>>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
{
    (StatusCode::OK, Json(quota_usecase.list_tiers()))
}

pub async fn admin_set_tier<S, U>(
    State(quota_usecase): State<Arc<QuotaUseCase<S, U>>>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(set_tier_request): Json<SetTierRequest>,
) -> Result<Response, QuotaError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
{
    if !auth.is_admin() {
        return Ok(forbidden("Admin role required"));
    }

    quota_usecase
        .admin_set_tier(user_id, &set_tier_request.tier)
        .await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": format!("Upgraded {} to {}", user_id, set_tier_request.tier)
        })),
    )
        .into_response())
}
