//! HTTP surface of the hospital API

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::configure;
