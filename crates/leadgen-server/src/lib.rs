//! REST API server: routes, IP allow-listing, DTOs, archives and OpenAPI documentation.

pub mod archive;
pub mod auth;
pub mod background;
pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;
