pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod rooms;
pub mod routes;
pub mod state;
pub mod store;
