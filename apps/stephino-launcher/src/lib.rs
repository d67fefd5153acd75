pub mod auth;
pub mod config;
pub mod session;
pub mod shell;
pub mod telemetry;
pub mod terminal;
