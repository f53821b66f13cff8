pub mod config;
pub mod error;
pub mod event;
pub mod sanitize;
pub mod service;
pub mod session;
pub mod stats;
pub mod store;
