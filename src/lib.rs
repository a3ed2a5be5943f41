//! Authentication microservice: user registration, credential login and
//! signed session tokens, reachable over message-pattern RPC.
//!
//! Failures come back as `{code, message}`. Business rejections use code 400;
//! store, hashing and signing faults use code 500 with a generic message.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
