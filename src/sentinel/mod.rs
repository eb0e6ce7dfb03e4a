pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod kql;
pub mod models;
pub mod ownership;
pub mod provision;
pub mod purge;
