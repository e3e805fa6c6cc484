use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::subscriptions::SubscriptionEntity;
use crate::domain::value_objects::enums::{media_types::MediaType, tiers::Tier};

/// Full subscription view returned to the account page: usage against limits
/// for both media types plus the advertised tier metadata.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionDetailsDto {
    pub tier: Tier,
    pub tier_name: String,
    pub price_minor: i32,

    pub images_used: i32,
    pub images_limit: i32,
    pub videos_used: i32,
    pub videos_limit: i32,

    pub max_image_size_mb: f64,
    pub max_video_size_mb: f64,
    pub max_video_duration_seconds: i32,
    pub max_image_resolution: String,
    pub max_video_resolution: String,

    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,

    pub features: Vec<String>,
}

impl From<&SubscriptionEntity> for SubscriptionDetailsDto {
    fn from(subscription: &SubscriptionEntity) -> Self {
        let tier = subscription.tier();
        let config = tier.config();
        let image_limits = tier.limits(MediaType::Image);
        let video_limits = tier.limits(MediaType::Video);

        Self {
            tier,
            tier_name: config.name.to_string(),
            price_minor: config.price_minor,
            images_used: subscription.images_used_this_month,
            images_limit: image_limits.count_per_month,
            videos_used: subscription.videos_used_this_month,
            videos_limit: video_limits.count_per_month,
            max_image_size_mb: image_limits.max_size_mb,
            max_video_size_mb: video_limits.max_size_mb,
            max_video_duration_seconds: video_limits.max_duration_seconds.unwrap_or(0),
            max_image_resolution: image_limits.max_resolution.to_string(),
            max_video_resolution: video_limits.max_resolution.to_string(),
            current_period_start: subscription.current_period_start,
            current_period_end: subscription.current_period_end,
            features: config.features.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Pricing-page projection of one catalog tier.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TierDto {
    pub tier: Tier,
    pub name: String,
    pub price_minor: i32,
    pub features: Vec<String>,
    pub image_limit: i32,
    pub video_limit: i32,
    pub max_video_duration_seconds: i32,
}

impl From<Tier> for TierDto {
    fn from(tier: Tier) -> Self {
        let config = tier.config();
        Self {
            tier,
            name: config.name.to_string(),
            price_minor: config.price_minor,
            features: config.features.iter().map(|f| f.to_string()).collect(),
            image_limit: config.image.count_per_month,
            video_limit: config.video.count_per_month,
            max_video_duration_seconds: config.video.max_duration_seconds.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetTierRequest {
    pub tier: String,
}
