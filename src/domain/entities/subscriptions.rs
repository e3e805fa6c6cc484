use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::tiers::Tier;
use crate::infrastructure::postgres::schema::subscriptions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: i64,
    pub user_id: Uuid,
    pub tier: String,
    pub images_used_this_month: i32,
    pub videos_used_this_month: i32,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    /// Stored tier text parsed back to the catalog enum. Unknown values fall
    /// back to the free tier rather than failing the request.
    pub fn tier(&self) -> Tier {
        Tier::from_str(&self.tier).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: Uuid,
    pub tier: String,
    pub images_used_this_month: i32,
    pub videos_used_this_month: i32,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}
