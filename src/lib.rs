pub mod api;
pub mod app;
pub mod app_state;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod modules;
pub mod pricing;
pub mod retry;
pub mod scheduling;
pub mod sessions;
pub mod state;
pub mod telemetry;
pub mod websocket;
