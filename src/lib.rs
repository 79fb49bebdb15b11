pub mod api;
pub mod config;
pub mod frontend;
pub mod services;
pub mod types;
