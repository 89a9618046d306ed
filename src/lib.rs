pub mod config;
pub mod domain;
pub mod health;
pub mod messaging;
pub mod metrics;
pub mod redelivery;
pub mod store;
pub mod utils;
