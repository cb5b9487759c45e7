pub mod actors;
pub mod api;
pub mod error;
pub mod render;
pub mod server;
pub mod store;
pub mod types;
