pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod presence;
pub mod projection;
pub mod routes;
pub mod state;
pub mod store;
pub mod websocket;
