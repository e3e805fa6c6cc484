use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity};
use crate::domain::value_objects::enums::{media_types::MediaType, tiers::Tier};

/// Persistence contract for subscription rows. All mutations are serialized
/// by the store, not by in-process locks: requests may be handled by
/// independent processes sharing one database.
#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    /// Returns the user's row, inserting `insert` if none exists yet. The
    /// `user_id` unique constraint resolves concurrent first-access: the
    /// loser of the race must reload and return the winner's row.
    async fn get_or_create(&self, insert: InsertSubscriptionEntity) -> Result<SubscriptionEntity>;

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    /// Compare-and-set period rollover: resets both counters and moves the
    /// period to `[new_start, new_end)`, but only while the stored
    /// `current_period_end` still equals `expired_period_end`. Returns `None`
    /// when a concurrent writer advanced the period first.
    async fn roll_over_period(
        &self,
        user_id: Uuid,
        expired_period_end: DateTime<Utc>,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Atomic in-database `counter + 1` for the matching media type.
    async fn increment_usage(&self, user_id: Uuid, media_type: MediaType) -> Result<()>;

    /// Administrative tier override. Leaves counters and period untouched.
    async fn set_tier(&self, user_id: Uuid, tier: Tier) -> Result<()>;
}
