//! Core infrastructure: configuration, error types, logging setup

pub mod config;
pub mod error;
pub mod logger;
