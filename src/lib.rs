pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod notifications;
pub mod observability;
pub mod orders;
pub mod providers;
pub mod quotes;
pub mod resilience;
pub mod webhooks;
