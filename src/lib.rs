pub mod auth;
pub mod common;
pub mod config;
pub mod domain;
pub mod errors;

pub mod database;
pub mod server;
pub mod services;
