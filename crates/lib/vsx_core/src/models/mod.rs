//! Domain models shared by the token store and lifecycle manager.

pub mod auth;
