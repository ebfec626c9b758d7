//! HTTP transport for the race API

pub mod routes;

pub use routes::build_router;
