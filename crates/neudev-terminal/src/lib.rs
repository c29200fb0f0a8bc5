//! NEUDev terminal front end: configuration, logging setup and text rendering.
//!
//! Separated from main.rs so these pieces can be unit tested.

pub mod config;
pub mod logging;
pub mod render;
