use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    repositories::{app_users::AppUserRepository, subscriptions::SubscriptionRepository},
    value_objects::{
        enums::{media_types::MediaType, tiers::Tier},
        quota::{Decision, DecisionCode},
        subscriptions::{SubscriptionDetailsDto, TierDto},
    },
};

/// Length of one usage period. Rolling, not calendar-aligned.
pub const PERIOD_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("user not found")]
    UserNotFound,
    #[error("unknown tier: {0}")]
    InvalidTier(String),
    #[error("subscription was updated concurrently, retry the request")]
    Conflict,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl QuotaError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            QuotaError::UserNotFound => StatusCode::NOT_FOUND,
            QuotaError::InvalidTier(_) => StatusCode::BAD_REQUEST,
            QuotaError::Conflict => StatusCode::CONFLICT,
            QuotaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, QuotaError>;

/// Whether the subscription's period has elapsed at `now`. Strictly
/// greater-than: a request arriving at the exact boundary instant still
/// counts against the old period.
pub fn period_expired(subscription: &SubscriptionEntity, now: DateTime<Utc>) -> bool {
    now > subscription.current_period_end
}

pub fn next_period(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::days(PERIOD_DAYS))
}

/// Evaluates one processing request against the subscription's tier limits.
/// First failing check wins: count, then size, then duration. Size and
/// duration are non-strict limits — a file exactly at the limit passes.
pub fn evaluate(
    subscription: &SubscriptionEntity,
    media_type: MediaType,
    file_size_mb: Option<f64>,
    duration_seconds: Option<i32>,
) -> Decision {
    let limits = subscription.tier().limits(media_type);

    let used = match media_type {
        MediaType::Image => subscription.images_used_this_month,
        MediaType::Video => subscription.videos_used_this_month,
    };
    if used >= limits.count_per_month {
        return Decision::deny(
            DecisionCode::MonthlyLimitReached,
            format!(
                "Monthly {} limit reached ({}). Upgrade to process more.",
                media_type, limits.count_per_month
            ),
        );
    }

    if let Some(file_size_mb) = file_size_mb {
        if file_size_mb > limits.max_size_mb {
            return Decision::deny(
                DecisionCode::FileTooLarge,
                format!("File too large. Max size: {}MB", limits.max_size_mb),
            );
        }
    }

    if media_type == MediaType::Video {
        if let (Some(duration_seconds), Some(max_duration_seconds)) =
            (duration_seconds, limits.max_duration_seconds)
        {
            if duration_seconds > max_duration_seconds {
                return Decision::deny(
                    DecisionCode::VideoTooLong,
                    format!(
                        "Video too long. Max duration: {} minutes",
                        max_duration_seconds as f64 / 60.0
                    ),
                );
            }
        }
    }

    Decision::allow()
}

fn free_subscription(user_id: Uuid, now: DateTime<Utc>) -> InsertSubscriptionEntity {
    let (current_period_start, current_period_end) = next_period(now);
    InsertSubscriptionEntity {
        user_id,
        tier: Tier::Free.to_string(),
        images_used_this_month: 0,
        videos_used_this_month: 0,
        current_period_start,
        current_period_end,
    }
}

pub struct QuotaUseCase<S, U>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    app_user_repo: Arc<U>,
}

impl<S, U> QuotaUseCase<S, U>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, app_user_repo: Arc<U>) -> Self {
        Self {
            subscription_repo,
            app_user_repo,
        }
    }

    /// Checks whether the user may process one more file of `media_type`.
    /// Read-mostly, but rolls the period over as a side effect when it has
    /// expired. Callers that proceed with processing must report the outcome
    /// via [`commit_usage`](Self::commit_usage) afterwards.
    pub async fn check(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        file_size_mb: Option<f64>,
        duration_seconds: Option<i32>,
    ) -> UseCaseResult<Decision> {
        let subscription = self.load_current(user_id).await?;
        let decision = evaluate(&subscription, media_type, file_size_mb, duration_seconds);

        if decision.allowed {
            info!(%user_id, %media_type, "quota: request allowed");
        } else {
            info!(
                %user_id,
                %media_type,
                code = ?decision.code,
                reason = %decision.reason,
                "quota: request denied"
            );
        }

        Ok(decision)
    }

    /// Second phase of the check/commit protocol: records one successfully
    /// processed file. Must only be called after the gated operation has
    /// verifiably succeeded, never before — the engine does not enforce the
    /// ordering itself.
    pub async fn commit_usage(&self, user_id: Uuid, media_type: MediaType) -> UseCaseResult<()> {
        self.subscription_repo
            .get_or_create(free_subscription(user_id, Utc::now()))
            .await
            .map_err(QuotaError::Internal)?;

        self.subscription_repo
            .increment_usage(user_id, media_type)
            .await
            .map_err(QuotaError::Internal)?;

        info!(%user_id, %media_type, "quota: usage committed");
        Ok(())
    }

    pub async fn get_details(&self, user_id: Uuid) -> UseCaseResult<SubscriptionDetailsDto> {
        let subscription = self.load_current(user_id).await?;
        Ok(SubscriptionDetailsDto::from(&subscription))
    }

    /// Privileged tier override. Validates the tier name before any mutation
    /// and leaves usage counters and period boundaries untouched, so a
    /// mid-period upgrade keeps the usage already accumulated.
    pub async fn admin_set_tier(&self, user_id: Uuid, tier_name: &str) -> UseCaseResult<()> {
        let tier = Tier::from_str(tier_name).ok_or_else(|| {
            let err = QuotaError::InvalidTier(tier_name.to_string());
            warn!(
                %user_id,
                tier_name,
                status = err.status_code().as_u16(),
                "quota: tier override with unknown tier"
            );
            err
        })?;

        self.app_user_repo
            .find_by_id(user_id)
            .await
            .map_err(QuotaError::Internal)?
            .ok_or_else(|| {
                let err = QuotaError::UserNotFound;
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "quota: tier override for unknown user"
                );
                err
            })?;

        self.subscription_repo
            .get_or_create(free_subscription(user_id, Utc::now()))
            .await
            .map_err(QuotaError::Internal)?;

        self.subscription_repo
            .set_tier(user_id, tier)
            .await
            .map_err(QuotaError::Internal)?;

        info!(%user_id, %tier, "quota: tier overridden");
        Ok(())
    }

    pub fn list_tiers(&self) -> Vec<TierDto> {
        Tier::ALL.into_iter().map(TierDto::from).collect()
    }

    /// Loads the subscription (creating the free one on first access) and
    /// rolls the period over if it has expired. The rollover is a
    /// compare-and-set against the store; on conflict the row is reloaded and
    /// the rollover retried once before surfacing [`QuotaError::Conflict`].
    async fn load_current(&self, user_id: Uuid) -> UseCaseResult<SubscriptionEntity> {
        let mut subscription = self
            .subscription_repo
            .get_or_create(free_subscription(user_id, Utc::now()))
            .await
            .map_err(QuotaError::Internal)?;

        for _ in 0..2 {
            let now = Utc::now();
            if !period_expired(&subscription, now) {
                return Ok(subscription);
            }

            let (new_start, new_end) = next_period(now);
            match self
                .subscription_repo
                .roll_over_period(user_id, subscription.current_period_end, new_start, new_end)
                .await
                .map_err(QuotaError::Internal)?
            {
                Some(updated) => {
                    info!(
                        %user_id,
                        period_end = %updated.current_period_end,
                        "quota: usage period rolled over"
                    );
                    return Ok(updated);
                }
                None => {
                    warn!(%user_id, "quota: concurrent period rollover, reloading");
                    subscription = self
                        .subscription_repo
                        .find_by_user_id(user_id)
                        .await
                        .map_err(QuotaError::Internal)?
                        .ok_or_else(|| {
                            QuotaError::Internal(anyhow!("subscription row vanished during rollover"))
                        })?;
                }
            }
        }

        Err(QuotaError::Conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{
        app_users::MockAppUserRepository, subscriptions::MockSubscriptionRepository,
    };
    use crate::domain::entities::app_users::AppUserEntity;
    use mockall::predicate::eq;

    fn sample_subscription(
        user_id: Uuid,
        tier: Tier,
        images_used: i32,
        videos_used: i32,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> SubscriptionEntity {
        SubscriptionEntity {
            id: 1,
            user_id,
            tier: tier.to_string(),
            images_used_this_month: images_used,
            videos_used_this_month: videos_used,
            current_period_start: period_start,
            current_period_end: period_end,
            created_at: period_start,
        }
    }

    fn current_subscription(user_id: Uuid, tier: Tier, images: i32, videos: i32) -> SubscriptionEntity {
        let now = Utc::now();
        sample_subscription(
            user_id,
            tier,
            images,
            videos,
            now - Duration::days(1),
            now + Duration::days(29),
        )
    }

    fn sample_user(user_id: Uuid) -> AppUserEntity {
        AppUserEntity {
            id: user_id,
            display_name: None,
            status: "active".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn boundary_instant_does_not_expire_period() {
        let now = Utc::now();
        let subscription =
            sample_subscription(Uuid::new_v4(), Tier::Free, 0, 0, now - Duration::days(30), now);

        assert!(!period_expired(&subscription, now));
        assert!(period_expired(&subscription, now + Duration::seconds(1)));
    }

    #[test]
    fn next_period_spans_exactly_thirty_days() {
        let now = Utc::now();
        let (start, end) = next_period(now);
        assert_eq!(start, now);
        assert_eq!(end - start, Duration::days(30));
    }

    #[test]
    fn evaluate_denies_when_monthly_count_reached() {
        let subscription = current_subscription(Uuid::new_v4(), Tier::Free, 5, 0);
        let decision = evaluate(&subscription, MediaType::Image, None, None);

        assert!(!decision.allowed);
        assert_eq!(decision.code, DecisionCode::MonthlyLimitReached);
        assert!(decision.reason.contains("Monthly image limit reached (5)"));
    }

    #[test]
    fn evaluate_allows_file_exactly_at_size_limit() {
        let subscription = current_subscription(Uuid::new_v4(), Tier::Basic, 0, 0);
        let decision = evaluate(&subscription, MediaType::Image, Some(20.0), None);

        assert!(decision.allowed);
        assert_eq!(decision.reason, "OK");
    }

    #[test]
    fn evaluate_denies_oversized_file() {
        let subscription = current_subscription(Uuid::new_v4(), Tier::Free, 0, 0);
        let decision = evaluate(&subscription, MediaType::Image, Some(5.5), None);

        assert!(!decision.allowed);
        assert_eq!(decision.code, DecisionCode::FileTooLarge);
        assert_eq!(decision.reason, "File too large. Max size: 5MB");
    }

    #[test]
    fn evaluate_denies_overlong_video_in_minutes() {
        let subscription = current_subscription(Uuid::new_v4(), Tier::Free, 0, 0);
        let decision = evaluate(&subscription, MediaType::Video, Some(10.0), Some(31));

        assert!(!decision.allowed);
        assert_eq!(decision.code, DecisionCode::VideoTooLong);
        assert_eq!(decision.reason, "Video too long. Max duration: 0.5 minutes");
    }

    #[test]
    fn evaluate_count_check_wins_over_size_check() {
        let subscription = current_subscription(Uuid::new_v4(), Tier::Free, 5, 0);
        let decision = evaluate(&subscription, MediaType::Image, Some(100.0), None);

        assert_eq!(decision.code, DecisionCode::MonthlyLimitReached);
    }

    #[test]
    fn evaluate_ignores_duration_for_images() {
        let subscription = current_subscription(Uuid::new_v4(), Tier::Free, 0, 0);
        let decision = evaluate(&subscription, MediaType::Image, Some(1.0), Some(99999));

        assert!(decision.allowed);
    }

    #[test]
    fn evaluate_skips_size_check_when_size_unknown() {
        let subscription = current_subscription(Uuid::new_v4(), Tier::Free, 0, 0);
        let decision = evaluate(&subscription, MediaType::Image, None, None);

        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn first_check_creates_free_subscription() {
        let user_id = Uuid::new_v4();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_get_or_create()
            .withf(move |insert| {
                insert.user_id == user_id
                    && insert.tier == "free"
                    && insert.images_used_this_month == 0
                    && insert.videos_used_this_month == 0
                    && insert.current_period_end - insert.current_period_start
                        == Duration::days(30)
            })
            .returning(|insert| {
                let created = SubscriptionEntity {
                    id: 1,
                    user_id: insert.user_id,
                    tier: insert.tier.clone(),
                    images_used_this_month: insert.images_used_this_month,
                    videos_used_this_month: insert.videos_used_this_month,
                    current_period_start: insert.current_period_start,
                    current_period_end: insert.current_period_end,
                    created_at: insert.current_period_start,
                };
                Box::pin(async move { Ok(created) })
            });

        let usecase = QuotaUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(MockAppUserRepository::new()),
        );

        let decision = usecase
            .check(user_id, MediaType::Image, Some(1.0), None)
            .await
            .unwrap();

        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn check_rolls_over_expired_period() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let expired =
            sample_subscription(user_id, Tier::Free, 5, 2, now - Duration::days(31), now - Duration::days(1));
        let expired_end = expired.current_period_end;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_get_or_create()
            .returning(move |_| {
                let expired = expired.clone();
                Box::pin(async move { Ok(expired) })
            });
        subscription_repo
            .expect_roll_over_period()
            .withf(move |_, observed_end, new_start, new_end| {
                *observed_end == expired_end && *new_end - *new_start == Duration::days(30)
            })
            .returning(move |user_id, _, new_start, new_end| {
                let rolled = sample_subscription(user_id, Tier::Free, 0, 0, new_start, new_end);
                Box::pin(async move { Ok(Some(rolled)) })
            });

        let usecase = QuotaUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(MockAppUserRepository::new()),
        );

        // The old period had exhausted the free image quota; the rollover
        // must reset it so the request is allowed again.
        let decision = usecase
            .check(user_id, MediaType::Image, None, None)
            .await
            .unwrap();

        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn rollover_conflict_reloads_winner_row() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let expired =
            sample_subscription(user_id, Tier::Free, 5, 2, now - Duration::days(31), now - Duration::days(1));
        let fresh = sample_subscription(user_id, Tier::Free, 0, 0, now, now + Duration::days(30));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_get_or_create()
            .returning(move |_| {
                let expired = expired.clone();
                Box::pin(async move { Ok(expired) })
            });
        subscription_repo
            .expect_roll_over_period()
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Ok(None) }));
        subscription_repo
            .expect_find_by_user_id()
            .with(eq(user_id))
            .times(1)
            .returning(move |_| {
                let fresh = fresh.clone();
                Box::pin(async move { Ok(Some(fresh)) })
            });

        let usecase = QuotaUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(MockAppUserRepository::new()),
        );

        let decision = usecase
            .check(user_id, MediaType::Image, None, None)
            .await
            .unwrap();

        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn persistent_rollover_conflict_surfaces_as_conflict() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let expired =
            sample_subscription(user_id, Tier::Free, 0, 0, now - Duration::days(31), now - Duration::days(1));
        let reloaded = expired.clone();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_get_or_create()
            .returning(move |_| {
                let expired = expired.clone();
                Box::pin(async move { Ok(expired) })
            });
        subscription_repo
            .expect_roll_over_period()
            .times(2)
            .returning(|_, _, _, _| Box::pin(async { Ok(None) }));
        subscription_repo
            .expect_find_by_user_id()
            .times(2)
            .returning(move |_| {
                let reloaded = reloaded.clone();
                Box::pin(async move { Ok(Some(reloaded)) })
            });

        let usecase = QuotaUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(MockAppUserRepository::new()),
        );

        let result = usecase.check(user_id, MediaType::Image, None, None).await;

        assert!(matches!(result, Err(QuotaError::Conflict)));
    }

    #[tokio::test]
    async fn commit_usage_increments_matching_counter() {
        let user_id = Uuid::new_v4();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_get_or_create()
            .returning(move |insert| {
                let existing = SubscriptionEntity {
                    id: 1,
                    user_id: insert.user_id,
                    tier: insert.tier.clone(),
                    images_used_this_month: 0,
                    videos_used_this_month: 0,
                    current_period_start: insert.current_period_start,
                    current_period_end: insert.current_period_end,
                    created_at: insert.current_period_start,
                };
                Box::pin(async move { Ok(existing) })
            });
        subscription_repo
            .expect_increment_usage()
            .with(eq(user_id), eq(MediaType::Video))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = QuotaUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(MockAppUserRepository::new()),
        );

        usecase
            .commit_usage(user_id, MediaType::Video)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn admin_set_tier_rejects_unknown_tier_before_any_mutation() {
        let user_id = Uuid::new_v4();

        // No expectations: any repository call would panic the test.
        let usecase = QuotaUseCase::new(
            Arc::new(MockSubscriptionRepository::new()),
            Arc::new(MockAppUserRepository::new()),
        );

        let result = usecase.admin_set_tier(user_id, "platinum").await;

        assert!(matches!(result, Err(QuotaError::InvalidTier(_))));
    }

    #[tokio::test]
    async fn admin_set_tier_rejects_unknown_user() {
        let user_id = Uuid::new_v4();

        let mut app_user_repo = MockAppUserRepository::new();
        app_user_repo
            .expect_find_by_id()
            .with(eq(user_id))
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = QuotaUseCase::new(
            Arc::new(MockSubscriptionRepository::new()),
            Arc::new(app_user_repo),
        );

        let result = usecase.admin_set_tier(user_id, "pro").await;

        assert!(matches!(result, Err(QuotaError::UserNotFound)));
    }

    #[tokio::test]
    async fn admin_set_tier_updates_tier_only() {
        let user_id = Uuid::new_v4();

        let mut app_user_repo = MockAppUserRepository::new();
        app_user_repo
            .expect_find_by_id()
            .with(eq(user_id))
            .returning(move |user_id| {
                let user = sample_user(user_id);
                Box::pin(async move { Ok(Some(user)) })
            });

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_get_or_create()
            .returning(move |insert| {
                let mid_period = SubscriptionEntity {
                    id: 1,
                    user_id: insert.user_id,
                    tier: Tier::Free.to_string(),
                    images_used_this_month: 3,
                    videos_used_this_month: 1,
                    current_period_start: insert.current_period_start,
                    current_period_end: insert.current_period_end,
                    created_at: insert.current_period_start,
                };
                Box::pin(async move { Ok(mid_period) })
            });
        subscription_repo
            .expect_set_tier()
            .with(eq(user_id), eq(Tier::Pro))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = QuotaUseCase::new(Arc::new(subscription_repo), Arc::new(app_user_repo));

        usecase.admin_set_tier(user_id, "pro").await.unwrap();
    }

    #[tokio::test]
    async fn upgraded_tier_applies_to_preexisting_usage() {
        let user_id = Uuid::new_v4();
        // 6 images used would exceed the free limit but not the pro one.
        let subscription = current_subscription(user_id, Tier::Pro, 6, 0);

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_get_or_create()
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(subscription) })
            });

        let usecase = QuotaUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(MockAppUserRepository::new()),
        );

        let decision = usecase
            .check(user_id, MediaType::Image, None, None)
            .await
            .unwrap();

        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn details_project_usage_against_limits() {
        let user_id = Uuid::new_v4();
        let subscription = current_subscription(user_id, Tier::Basic, 7, 2);

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_get_or_create()
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(subscription) })
            });

        let usecase = QuotaUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(MockAppUserRepository::new()),
        );

        let details = usecase.get_details(user_id).await.unwrap();

        assert_eq!(details.tier, Tier::Basic);
        assert_eq!(details.tier_name, "Basic");
        assert_eq!(details.price_minor, 2500);
        assert_eq!(details.images_used, 7);
        assert_eq!(details.images_limit, 50);
        assert_eq!(details.videos_used, 2);
        assert_eq!(details.videos_limit, 20);
        assert_eq!(details.max_video_duration_seconds, 300);
        assert_eq!(details.max_image_resolution, "3840x2160");
    }

    #[test]
    fn list_tiers_covers_whole_catalog() {
        let usecase = QuotaUseCase::new(
            Arc::new(MockSubscriptionRepository::new()),
            Arc::new(MockAppUserRepository::new()),
        );

        let tiers = usecase.list_tiers();

        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].tier, Tier::Free);
        assert_eq!(tiers[2].tier, Tier::Pro);
        assert_eq!(tiers[2].price_minor, 7500);
    }
}
