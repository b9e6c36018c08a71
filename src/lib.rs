pub mod config;
pub mod controller;
pub mod error;
pub mod fixture;
pub mod grader;
pub mod http_client;
pub mod lifecycle;
pub mod messages;
pub mod notify;
pub mod prediction;
pub mod provider;
pub mod selection;
pub mod session;
pub mod store;
