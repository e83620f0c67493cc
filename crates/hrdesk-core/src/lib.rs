pub mod config;
pub mod logging;

pub mod api;
pub mod classify;
pub mod runner;
