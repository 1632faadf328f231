//! Utility modules.

pub mod user_agent;
