//! Long-lived service objects built on the API gateway.

pub mod auth;
