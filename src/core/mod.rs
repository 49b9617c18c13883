// Core module - Session security domain logic
pub mod auth;
pub mod lifecycle;
pub mod session;
