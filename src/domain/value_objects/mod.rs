pub mod enums;
pub mod quota;
pub mod subscriptions;
pub mod tiers;
