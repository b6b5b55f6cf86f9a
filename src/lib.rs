pub mod config;
pub mod error;
pub mod handlers;
pub mod media;
pub mod models;
pub mod policy;
pub mod state;
pub mod store;
