// Infrastructure module - External dependencies and adapters
pub mod api;
pub mod config;
pub mod logging;
pub mod storage;
