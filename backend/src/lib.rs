//! Adaptive notification engine
//!
//! Background reminder schedulers for the fitness app: hydration nudges,
//! daily calorie progress, and weekly weigh-in / progress-photo prompts,
//! delivered over Firebase Cloud Messaging.

pub mod config;
pub mod db;
pub mod error;
pub mod push;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
