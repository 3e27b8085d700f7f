pub mod auth;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod import;
pub mod messages;
pub mod middleware;
pub mod models;
pub mod redemption;
pub mod stats;
pub mod store;
pub mod util;

pub use handlers::app;
