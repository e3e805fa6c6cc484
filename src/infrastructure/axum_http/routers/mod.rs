pub mod subscriptions;
pub mod usage;
