use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};

use crate::auth::AuthUser;
use crate::domain::repositories::{
    app_users::AppUserRepository, subscriptions::SubscriptionRepository,
};
use crate::domain::value_objects::quota::{CheckUsageRequest, CommitUsageRequest};
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
        .route("/check", post(check))
        .route("/commit", post(commit))
        .with_state(Arc::new(quota_usecase))
}

/// First phase of the check/commit protocol. Returns 200 with the decision
/// whether the request is allowed or denied; a deny is not an HTTP error.
pub async fn check<S, U>(
    State(quota_usecase): State<Arc<QuotaUseCase<S, U>>>,
    auth: AuthUser,
    Json(check_usage_request): Json<CheckUsageRequest>,
) -> Result<Response, QuotaError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
{
    let decision = quota_usecase
        .check(
            auth.user_id,
            check_usage_request.media_type,
            check_usage_request.file_size_mb,
            check_usage_request.duration_seconds,
        )
        .await?;

    Ok((StatusCode::OK, Json(decision)).into_response())
}

/// Second phase: the caller reports that the gated processing succeeded.
pub async fn commit<S, U>(
    State(quota_usecase): State<Arc<QuotaUseCase<S, U>>>,
    auth: AuthUser,
    Json(commit_usage_request): Json<CommitUsageRequest>,
) -> Result<Response, QuotaError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
{
    quota_usecase
        .commit_usage(auth.user_id, commit_usage_request.media_type)
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
