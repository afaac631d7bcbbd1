pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod propagate;
pub mod service;
pub mod setup;
pub mod store;
pub mod student;
