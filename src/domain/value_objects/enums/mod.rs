pub mod media_types;
pub mod tiers;
