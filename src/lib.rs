pub mod api;
pub mod auth;
pub mod cache;
pub mod codegen;
pub mod config;
pub mod error;
pub mod models;
pub mod redirect;
pub mod scheduler;
pub mod service;
pub mod store;
