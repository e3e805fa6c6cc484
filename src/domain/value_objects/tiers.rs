use serde::Serialize;

use crate::domain::value_objects::enums::{media_types::MediaType, tiers::Tier};

/// Per-media-type limits attached to a tier.
///
/// `max_resolution` is advertised to clients but never enforced by the quota
/// engine; it is informational metadata only.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct MediaLimits {
    pub count_per_month: i32,
    pub max_size_mb: f64,
    pub max_resolution: &'static str,
    pub max_duration_seconds: Option<i32>,
}

/// Immutable configuration of a subscription tier. The catalog is a
/// process-wide constant: there is no runtime mutation path, and lookup is
/// exhaustive by construction over all tiers and media types.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TierConfig {
    pub name: &'static str,
    pub price_minor: i32,
    pub image: MediaLimits,
    pub video: MediaLimits,
    pub features: &'static [&'static str],
}

const FREE_CONFIG: TierConfig = TierConfig {
    name: "Free",
    price_minor: 0,
    image: MediaLimits {
        count_per_month: 5,
        max_size_mb: 5.0,
        max_resolution: "1920x1080",
        max_duration_seconds: None,
    },
    video: MediaLimits {
        count_per_month: 2,
        max_size_mb: 50.0,
        max_resolution: "1280x720",
        max_duration_seconds: Some(30),
    },
    features: &[
        "5 images/month",
        "2 videos/month (30 sec max)",
        "HD quality (720p)",
        "Basic enhancement",
    ],
};

const BASIC_CONFIG: TierConfig = TierConfig {
    name: "Basic",
    price_minor: 2500,
    image: MediaLimits {
        count_per_month: 50,
        max_size_mb: 20.0,
        max_resolution: "3840x2160",
        max_duration_seconds: None,
    },
    video: MediaLimits {
        count_per_month: 20,
        max_size_mb: 500.0,
        max_resolution: "1920x1080",
        max_duration_seconds: Some(300),
    },
    features: &[
        "50 images/month",
        "20 videos/month (5 min max)",
        "Full HD quality (1080p)",
        "Advanced enhancement",
        "Priority processing",
    ],
};

const PRO_CONFIG: TierConfig = TierConfig {
    name: "Pro",
    price_minor: 7500,
    image: MediaLimits {
        count_per_month: 200,
        max_size_mb: 50.0,
        max_resolution: "7680x4320",
        max_duration_seconds: None,
    },
    video: MediaLimits {
        count_per_month: 100,
        max_size_mb: 5000.0,
        max_resolution: "3840x2160",
        max_duration_seconds: Some(1800),
    },
    features: &[
        "200 images/month",
        "100 videos/month (30 min max)",
        "4K quality",
        "Premium enhancement",
        "Fastest processing",
        "Bulk processing",
        "API access",
    ],
};

impl Tier {
    pub fn config(&self) -> &'static TierConfig {
        match self {
            Tier::Free => &FREE_CONFIG,
            Tier::Basic => &BASIC_CONFIG,
            Tier::Pro => &PRO_CONFIG,
        }
    }

    pub fn limits(&self, media_type: MediaType) -> &'static MediaLimits {
        let config = self.config();
        match media_type {
            MediaType::Image => &config.image,
            MediaType::Video => &config.video,
        }
    }
}
