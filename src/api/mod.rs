// API module for the countries HTTP server

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod request_log;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::ApiServer;
