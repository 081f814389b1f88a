// src/lib.rs
pub mod cache;
pub mod config;
pub mod gate;
pub mod metrics;
pub mod outputs;
pub mod server;
pub mod validate;
