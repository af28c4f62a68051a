//! HTTP handlers for entity CRUD and authentication.

pub mod auth;
pub mod entity;
