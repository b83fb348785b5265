pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod listing;
pub mod messaging;
pub mod metrics;
pub mod model;
pub mod oracle;
pub mod ranking;
pub mod ratings;
pub mod server;
pub mod store;
pub mod text;
