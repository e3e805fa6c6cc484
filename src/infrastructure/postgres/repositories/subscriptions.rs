use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
    value_objects::enums::{media_types::MediaType, tiers::Tier},
};
use crate::infrastructure::postgres::{
    postgres_connection::PgPoolSquad,
    schema::subscriptions,
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn get_or_create(&self, insert: InsertSubscriptionEntity) -> Result<SubscriptionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        if let Some(existing) = subscriptions::table
            .filter(subscriptions::user_id.eq(insert.user_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?
        {
            return Ok(existing);
        }

        // The unique constraint on user_id decides concurrent first access:
        // the loser inserts nothing and reloads the winner's row.
        let created = insert_into(subscriptions::table)
            .values(&insert)
            .on_conflict(subscriptions::user_id)
            .do_nothing()
            .returning(SubscriptionEntity::as_returning())
            .get_result::<SubscriptionEntity>(&mut conn)
            .optional()?;

        match created {
            Some(subscription) => Ok(subscription),
            None => Ok(subscriptions::table
                .filter(subscriptions::user_id.eq(insert.user_id))
                .select(SubscriptionEntity::as_select())
                .first::<SubscriptionEntity>(&mut conn)?),
        }
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(subscription)
    }

    async fn roll_over_period(
        &self,
        user_id: Uuid,
        expired_period_end: DateTime<Utc>,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Guarding on the observed period end makes the rollover a
        // compare-and-set: a concurrent writer that already advanced the
        // period leaves this update matching zero rows.
        let updated = update(subscriptions::table)
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::current_period_end.eq(expired_period_end))
            .set((
                subscriptions::images_used_this_month.eq(0),
                subscriptions::videos_used_this_month.eq(0),
                subscriptions::current_period_start.eq(new_start),
                subscriptions::current_period_end.eq(new_end),
            ))
            .returning(SubscriptionEntity::as_returning())
            .get_result::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(updated)
    }

    async fn increment_usage(&self, user_id: Uuid, media_type: MediaType) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Counter arithmetic happens in the database so concurrent commits
        // never lose updates.
        match media_type {
            MediaType::Image => {
                update(subscriptions::table)
                    .filter(subscriptions::user_id.eq(user_id))
                    .set(
                        subscriptions::images_used_this_month
                            .eq(subscriptions::images_used_this_month + 1),
                    )
                    .execute(&mut conn)?;
            }
            MediaType::Video => {
                update(subscriptions::table)
                    .filter(subscriptions::user_id.eq(user_id))
                    .set(
                        subscriptions::videos_used_this_month
                            .eq(subscriptions::videos_used_this_month + 1),
                    )
                    .execute(&mut conn)?;
            }
        }

        Ok(())
    }

    async fn set_tier(&self, user_id: Uuid, tier: Tier) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(subscriptions::table)
            .filter(subscriptions::user_id.eq(user_id))
            .set(subscriptions::tier.eq(tier.to_string()))
            .execute(&mut conn)?;

        Ok(())
    }
}
