//! HTTP API handlers for rsvp-server

pub mod health;
pub mod submit;

pub use health::health_routes;
pub use submit::{submit_routes, submit_rsvp};
